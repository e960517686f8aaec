/// gllab Web - WebGL2 front end compiled to wasm
///
/// JavaScript owns the animation-frame loop and DOM events and forwards them
/// to a [`WebRenderer`]; everything else (scene state, matrices, OBJ parsing)
/// lives in `gllab-core`.
use gllab_core::{
    obj, Camera, FaceMode, GeometryKind, IndexedGeometry, Key, Lighting, ModelTransform,
    ParseOptions, Placement, RotationState, SceneConfig, SceneState, SpinState, Strictness,
};
use nalgebra::Vector3;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlImageElement, WebGl2RenderingContext as Gl};

pub mod error;
pub mod frame;
pub mod model;
pub mod shader;
pub mod texture;

pub use error::WebError;
pub use frame::{FrameMatrices, Motion};
pub use model::GpuModel;
pub use shader::ShaderProgram;
pub use texture::Texture;

#[wasm_bindgen]
pub struct WebRenderer {
    gl: Gl,
    canvas: HtmlCanvasElement,
    program: ShaderProgram,
    /// One uploaded model per placed scene object
    models: Vec<GpuModel>,
    texture: Option<Texture>,
    scene: SceneState,
    camera: Camera,
    transform: ModelTransform,
    motion: Motion,
}

#[wasm_bindgen]
impl WebRenderer {
    /// Renderer for the final lesson scene: a lit, mipmapped cube.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebRenderer, JsValue> {
        Ok(Self::with_config(canvas_id, &SceneConfig::default())?)
    }

    /// Renderer preset to one of the seven lesson scenes.
    pub fn with_lesson(canvas_id: &str, lesson: u8) -> Result<WebRenderer, JsValue> {
        let config = SceneConfig::lesson(lesson).map_err(WebError::from)?;
        Ok(Self::with_config(canvas_id, &config)?)
    }

    /// Replace the scene's objects with one built-in shape: triangle,
    /// square, pyramid or cube.
    pub fn use_builtin(&mut self, name: &str) -> Result<(), JsValue> {
        let kind: GeometryKind = name.parse().map_err(WebError::from)?;
        self.show_single(&kind.build())?;
        Ok(())
    }

    /// Parse OBJ text leniently and upload it in place of the scene's
    /// objects. Returns the triangle count.
    ///
    /// Faces are not triangulated: polygons with more than three corners
    /// draw as scrambled triangles. Use `load_obj_with(text, true, false)`
    /// for files that are not already triangulated.
    pub fn load_obj(&mut self, text: &str) -> Result<u32, JsValue> {
        self.load_obj_with(text, false, false)
    }

    /// Like [`WebRenderer::load_obj`], with fan triangulation and strict
    /// index checking selectable.
    pub fn load_obj_with(&mut self, text: &str, fan: bool, strict: bool) -> Result<u32, JsValue> {
        let mut options = ParseOptions::default();
        if fan {
            options = options.with_face_mode(FaceMode::Fan);
        }
        if strict {
            options = options.with_strictness(Strictness::Strict);
        }

        let mesh = obj::parse_obj(text, options).map_err(WebError::from)?;
        if mesh.is_empty() {
            tracing::warn!("OBJ text holds no vertices or faces");
        }
        tracing::info!(
            vertices = mesh.vertices.len(),
            triangles = mesh.triangle_count(),
            "OBJ model parsed"
        );
        self.show_single(&mesh.to_geometry())?;
        Ok(mesh.triangle_count() as u32)
    }

    /// Texture the model with an already loaded image.
    pub fn set_texture(&mut self, image: &HtmlImageElement) -> Result<(), JsValue> {
        let texture = Texture::from_image(&self.gl, image, self.scene.filter)?;
        if let Some(old) = self.texture.replace(texture) {
            old.release(&self.gl);
        }
        Ok(())
    }

    /// DOM `keydown` keyCode. Unknown codes are ignored.
    pub fn key_down(&mut self, code: u32) {
        if let Some(key) = Key::from_key_code(code) {
            self.scene.key_down(key);
        }
    }

    pub fn key_up(&mut self, code: u32) {
        if let Some(key) = Key::from_key_code(code) {
            self.scene.key_up(key);
        }
    }

    /// Scenes without lights pick up the default lighting when enabled.
    pub fn set_lighting(&mut self, enabled: bool) {
        if enabled && self.scene.lighting.is_none() {
            self.scene.lighting = Some(Lighting::default());
        }
        self.scene.lighting_enabled = enabled;
    }

    pub fn set_ambient(&mut self, r: f32, g: f32, b: f32) {
        self.lighting_mut().ambient = Vector3::new(r, g, b);
    }

    pub fn set_light_direction(&mut self, x: f32, y: f32, z: f32) {
        self.lighting_mut().direction = Vector3::new(x, y, z);
    }

    pub fn set_directional(&mut self, r: f32, g: f32, b: f32) {
        self.lighting_mut().directional = Vector3::new(r, g, b);
    }

    /// Switch between keyboard control and the fixed-step spin.
    pub fn set_spin(&mut self, enabled: bool) {
        self.motion = if enabled {
            Motion::Spin(SpinState::default())
        } else {
            Motion::Keyboard
        };
    }

    pub fn set_model_position(&mut self, x: f32, y: f32, z: f32) {
        self.transform = self.transform.with_position(x, y, z);
    }

    pub fn set_model_scale(&mut self, x: f32, y: f32, z: f32) {
        self.transform = self.transform.with_scale(x, y, z);
    }

    pub fn set_model_rotation(&mut self, x_deg: f32, y_deg: f32, z_deg: f32) {
        self.transform = self
            .transform
            .with_rotation(RotationState::new(x_deg, y_deg, z_deg));
    }

    /// Follow a canvas size change.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.camera.resize(width, height);
    }

    /// Draw one frame at the animation-frame timestamp `timestamp_ms`.
    pub fn frame(&mut self, timestamp_ms: f64) -> Result<(), JsValue> {
        self.scene.handle_keys();
        self.draw()?;
        self.scene.animate(timestamp_ms);
        Ok(())
    }
}

impl WebRenderer {
    pub fn with_config(canvas_id: &str, config: &SceneConfig) -> Result<Self, WebError> {
        let window = web_sys::window().ok_or(WebError::Environment("window"))?;
        let document = window
            .document()
            .ok_or(WebError::Environment("document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| WebError::CanvasNotFound(canvas_id.to_string()))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| WebError::CanvasNotFound(canvas_id.to_string()))?;

        let gl = canvas
            .get_context("webgl2")
            .map_err(WebError::js)?
            .ok_or(WebError::ContextUnavailable)?
            .dyn_into::<Gl>()
            .map_err(|_| WebError::ContextUnavailable)?;

        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.enable(Gl::DEPTH_TEST);
        gl.depth_func(Gl::LEQUAL);

        let program = ShaderProgram::new(&gl)?;
        let camera = Camera::new(canvas.width(), canvas.height());

        let mut renderer = Self {
            gl,
            canvas,
            program,
            models: Vec::new(),
            texture: None,
            scene: SceneState::new(config),
            camera,
            transform: ModelTransform::new(),
            motion: Motion::Keyboard,
        };
        let geometries: Vec<IndexedGeometry> =
            config.objects.iter().map(|o| o.geometry.build()).collect();
        renderer.upload(&geometries)?;

        tracing::info!(
            canvas = canvas_id,
            objects = renderer.scene.object_count(),
            "WebGL2 renderer ready"
        );
        Ok(renderer)
    }

    /// Replace every object with one model at the scene origin.
    fn show_single(&mut self, geometry: &IndexedGeometry) -> Result<(), WebError> {
        self.upload(std::slice::from_ref(geometry))?;
        self.scene.set_placements(vec![Placement::default()]);
        Ok(())
    }

    /// Upload `geometries`, then free the models they replace.
    fn upload(&mut self, geometries: &[IndexedGeometry]) -> Result<(), WebError> {
        let mut models = Vec::with_capacity(geometries.len());
        for geometry in geometries {
            match GpuModel::upload(&self.gl, &self.program.attributes, geometry) {
                Ok(model) => models.push(model),
                Err(e) => {
                    for model in models {
                        model.release(&self.gl);
                    }
                    return Err(e);
                }
            }
        }

        for old in std::mem::replace(&mut self.models, models) {
            old.release(&self.gl);
        }
        Ok(())
    }

    fn lighting_mut(&mut self) -> &mut Lighting {
        self.scene.lighting.get_or_insert_with(Lighting::default)
    }

    fn draw(&mut self) -> Result<(), WebError> {
        let gl = &self.gl;
        gl.viewport(0, 0, self.canvas.width() as i32, self.canvas.height() as i32);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);

        if self.models.is_empty() {
            return Ok(());
        }

        let matrices =
            FrameMatrices::compute(&mut self.motion, &self.scene, &self.transform, &self.camera)?;

        let uniforms = &self.program.uniforms;
        gl.use_program(Some(&self.program.program));
        gl.uniform_matrix4fv_with_f32_array(
            uniforms.projection.as_ref(),
            false,
            matrices.projection.as_slice(),
        );

        match self.scene.active_lighting() {
            Some(lighting) => {
                let towards = lighting.towards_light();
                gl.uniform1i(uniforms.use_lighting.as_ref(), 1);
                gl.uniform3f(
                    uniforms.ambient.as_ref(),
                    lighting.ambient.x,
                    lighting.ambient.y,
                    lighting.ambient.z,
                );
                gl.uniform3f(
                    uniforms.light_direction.as_ref(),
                    towards.x,
                    towards.y,
                    towards.z,
                );
                gl.uniform3f(
                    uniforms.directional.as_ref(),
                    lighting.directional.x,
                    lighting.directional.y,
                    lighting.directional.z,
                );
            }
            None => gl.uniform1i(uniforms.use_lighting.as_ref(), 0),
        }

        let texture_bound = match &mut self.texture {
            Some(texture) => {
                texture.bind(gl, self.scene.filter);
                gl.uniform1i(uniforms.sampler.as_ref(), 0);
                true
            }
            None => false,
        };

        for (model, object) in self.models.iter().zip(&matrices.objects) {
            gl.uniform_matrix4fv_with_f32_array(
                uniforms.model_view.as_ref(),
                false,
                object.model_view.as_slice(),
            );
            gl.uniform_matrix3fv_with_f32_array(
                uniforms.normal_matrix.as_ref(),
                false,
                object.normal.as_slice(),
            );
            let textured = texture_bound && model.has_tex_coords();
            gl.uniform1i(uniforms.use_texture.as_ref(), textured as i32);
            model.draw(gl);
        }
        Ok(())
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::info!("gllab-web loaded");
    Ok(())
}
