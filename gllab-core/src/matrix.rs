//! Matrix helpers operating on column-major `Matrix4<f32>`.
//!
//! All matrices are stored the way WebGL expects them in `uniformMatrix4fv`,
//! so `m.as_slice()` can be uploaded directly.
use nalgebra::{Matrix4, Vector3};
use thiserror::Error;

/// Rotation increment applied by [`build_transform`] on every call, in degrees.
pub const SPIN_STEP_DEG: f32 = 0.3;

/// Distance the spinning model is pushed away from the camera.
pub const SPIN_DISTANCE: f32 = 6.0;

/// Reasons [`try_perspective`] refuses to build a projection.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ProjectionError {
    #[error("near plane must be positive, got {0}")]
    NearNotPositive(f32),

    #[error("far plane ({far}) must lie beyond near plane ({near})")]
    FarNotBeyondNear { near: f32, far: f32 },

    #[error("aspect ratio must be positive, got {0}")]
    InvalidAspect(f32),

    #[error("field of view must be within (0, 180) degrees, got {0}")]
    InvalidFov(f32),
}

pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Compose two transforms so that `a` is applied first and `b` second.
///
/// This is the row-by-column product of the two flat 16-float arrays. With
/// column-major storage that equals `b * a`, which is why chains are written
/// in application order: `multiply(multiply(scale, rotate), translate)`.
pub fn multiply(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    b * a
}

/// Perspective projection using the `near * tan(fov / 2)` frustum limit.
///
/// `fov_deg` is the vertical field of view in degrees. No validation is done:
/// `near == far` yields non-finite coefficients. Use [`try_perspective`] when
/// the inputs come from outside.
pub fn perspective(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let y_limit = near * (fov_deg * std::f32::consts::PI / 360.0).tan();
    let a = -(far + near) / (far - near);
    let b = -2.0 * far * near / (far - near);
    let c = (2.0 * near) / ((y_limit * aspect) * 2.0);
    let d = (2.0 * near) / (y_limit * 2.0);

    Matrix4::new(
        c, 0.0, 0.0, 0.0,
        0.0, d, 0.0, 0.0,
        0.0, 0.0, a, b,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Validated form of [`perspective`].
pub fn try_perspective(
    fov_deg: f32,
    aspect: f32,
    near: f32,
    far: f32,
) -> Result<Matrix4<f32>, ProjectionError> {
    if !(near > 0.0) {
        return Err(ProjectionError::NearNotPositive(near));
    }
    if !(far > near) {
        return Err(ProjectionError::FarNotBeyondNear { near, far });
    }
    if !(aspect > 0.0) {
        return Err(ProjectionError::InvalidAspect(aspect));
    }
    if !(fov_deg > 0.0 && fov_deg < 180.0) {
        return Err(ProjectionError::InvalidFov(fov_deg));
    }
    Ok(perspective(fov_deg, aspect, near, far))
}

/// Y-axis rotation by `angle_deg` followed by a push of [`SPIN_DISTANCE`] into the screen.
pub fn spin_matrix(angle_deg: f32) -> Matrix4<f32> {
    let rotation = Matrix4::new_rotation(Vector3::new(0.0, deg_to_rad(angle_deg), 0.0));
    let translation = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -SPIN_DISTANCE));
    multiply(&rotation, &translation)
}

/// Angle of a model that spins a little every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpinState {
    pub rotation_deg: f32,
}

impl SpinState {
    pub fn new(rotation_deg: f32) -> Self {
        Self { rotation_deg }
    }

    pub fn advance(&mut self, delta_deg: f32) {
        self.rotation_deg += delta_deg;
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        spin_matrix(self.rotation_deg)
    }
}

/// One animation step: returns the matrix for the current angle, then
/// advances the state by [`SPIN_STEP_DEG`].
pub fn build_transform(state: &mut SpinState) -> Matrix4<f32> {
    let matrix = state.matrix();
    state.advance(SPIN_STEP_DEG);
    matrix
}
