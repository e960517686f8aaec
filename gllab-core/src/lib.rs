/// gllab Core Library - Shared geometry and transformation logic
///
/// This library provides the platform-free half of the renderer: matrix
/// helpers, model transforms, OBJ parsing, built-in geometry and the
/// per-frame scene state that both the web and terminal front ends drive.

pub mod geometry;
pub mod matrix;
pub mod obj;
pub mod projection;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use geometry::{GeometryError, IndexedGeometry, Mesh, Triangle, Vertex};
pub use matrix::{build_transform, multiply, perspective, spin_matrix, ProjectionError, SpinState};
pub use obj::{parse_obj, parse_obj_lenient, FaceMode, ObjError, ObjMesh, ParseOptions, Strictness};
pub use projection::Camera;
pub use scene::{
    GeometryKind, Key, Lighting, Placement, SceneConfig, SceneError, SceneObject, SceneState,
    TextureFilter,
};
pub use transform::{ModelTransform, RotationState, Transform};
