//! Errors raised while driving WebGL, converted to `JsValue` at the wasm boundary.

use gllab_core::{GeometryError, ObjError, ProjectionError, SceneError};
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("browser environment unavailable: missing {0}")]
    Environment(&'static str),

    #[error("canvas `{0}` not found")]
    CanvasNotFound(String),

    #[error("WebGL2 is not supported by this browser")]
    ContextUnavailable,

    #[error("failed to create {0}")]
    Allocation(&'static str),

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("program link failed: {0}")]
    ProgramLink(String),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("invalid OBJ: {0}")]
    Obj(#[from] ObjError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("invalid projection: {0}")]
    Projection(#[from] ProjectionError),

    #[error("JavaScript error: {0}")]
    Js(String),
}

impl WebError {
    pub fn js(value: JsValue) -> Self {
        WebError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<WebError> for JsValue {
    fn from(error: WebError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}
