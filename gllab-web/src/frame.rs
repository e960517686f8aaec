//! Per-frame matrices, kept free of WebGL so they can be tested natively.

use gllab_core::{
    build_transform, multiply, Camera, ModelTransform, ProjectionError, SceneState, SpinState,
    Transform,
};
use nalgebra::{Matrix3, Matrix4};

/// Clip planes of the self-spinning model view.
pub const SPIN_NEAR: f32 = 1.0;
pub const SPIN_FAR: f32 = 1000.0;

/// Where the view part of the model-view matrix comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Rotation speeds and zoom driven by the keyboard
    Keyboard,
    /// Fixed-step spin about Y at a set distance
    Spin(SpinState),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectMatrices {
    pub model_view: Matrix4<f32>,
    pub normal: Matrix3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameMatrices {
    pub projection: Matrix4<f32>,
    /// One entry per placed object, in scene order
    pub objects: Vec<ObjectMatrices>,
}

impl FrameMatrices {
    /// Build this frame's matrices. A spinning view advances one step.
    ///
    /// Each object is transformed by `model`, then by its own placement,
    /// then by the view.
    pub fn compute(
        motion: &mut Motion,
        scene: &SceneState,
        model: &ModelTransform,
        camera: &Camera,
    ) -> Result<Self, ProjectionError> {
        let (projection, view) = match motion {
            Motion::Keyboard => (camera.checked_projection_matrix()?, scene.model_view()),
            Motion::Spin(state) => (
                camera
                    .with_planes(SPIN_NEAR, SPIN_FAR)
                    .checked_projection_matrix()?,
                build_transform(state),
            ),
        };

        let model = model.matrix();
        let objects = scene
            .object_matrices()
            .iter()
            .map(|object| {
                let model_view = multiply(&multiply(&model, object), &view);
                ObjectMatrices {
                    model_view,
                    normal: Transform::normal_matrix(&model_view),
                }
            })
            .collect();

        Ok(Self {
            projection,
            objects,
        })
    }
}
