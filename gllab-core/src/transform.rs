/// Per-model placement: scale, Euler rotation and position
use nalgebra::{Matrix4, Vector3};

use crate::matrix::{deg_to_rad, multiply};

/// Rotation around three axes (in degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in degrees)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Placement of a single model in the world.
///
/// `position.z` counts distance into the screen, so it is negated when the
/// matrix is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub rotation: RotationState,
}

impl ModelTransform {
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: RotationState::zero(),
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }

    pub fn with_rotation(mut self, rotation: RotationState) -> Self {
        self.rotation = rotation;
        self
    }

    /// Scale, then rotate about X, Y and Z, then translate.
    pub fn matrix(&self) -> Matrix4<f32> {
        let steps = [
            Matrix4::new_nonuniform_scaling(&self.scale),
            Transform::rotation_x(self.rotation.x),
            Transform::rotation_y(self.rotation.y),
            Transform::rotation_z(self.rotation.z),
            Transform::translation_matrix(self.position.x, self.position.y, -self.position.z),
        ];

        steps
            .iter()
            .fold(Matrix4::identity(), |acc, step| multiply(&acc, step))
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    pub fn rotation_x(degrees: f32) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::new(deg_to_rad(degrees), 0.0, 0.0))
    }

    pub fn rotation_y(degrees: f32) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::new(0.0, deg_to_rad(degrees), 0.0))
    }

    pub fn rotation_z(degrees: f32) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::new(0.0, 0.0, deg_to_rad(degrees)))
    }

    /// Rotation about an arbitrary axis; a zero axis yields the identity.
    pub fn rotation_about(axis: Vector3<f32>, degrees: f32) -> Matrix4<f32> {
        match axis.try_normalize(f32::EPSILON) {
            Some(unit) => Matrix4::new_rotation(unit * deg_to_rad(degrees)),
            None => Matrix4::identity(),
        }
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals.
    /// Falls back to the plain 3x3 when the matrix is singular.
    pub fn normal_matrix(model_view: &Matrix4<f32>) -> nalgebra::Matrix3<f32> {
        let upper = model_view.fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        state.rotate(10.0, 20.0, 30.0);
        assert_eq!(state, RotationState::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_default_model_is_identity() {
        let matrix = ModelTransform::default().matrix();
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_position_z_points_into_screen() {
        let matrix = ModelTransform::new().with_position(1.0, 2.0, 5.0).matrix();
        assert_eq!(matrix[(0, 3)], 1.0);
        assert_eq!(matrix[(1, 3)], 2.0);
        assert_eq!(matrix[(2, 3)], -5.0);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let matrix = ModelTransform::new()
            .with_scale(2.0, 2.0, 2.0)
            .with_position(1.0, 0.0, 0.0)
            .matrix();
        let moved = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((moved - Point3::new(3.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_rotation_y_quarter_turn() {
        let matrix = ModelTransform::new()
            .with_rotation(RotationState::new(0.0, 90.0, 0.0))
            .matrix();
        let turned = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((turned - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_zero_axis_rotation_is_identity() {
        let matrix = Transform::rotation_about(Vector3::zeros(), 45.0);
        assert_eq!(matrix, Matrix4::identity());
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let normal = Transform::normal_matrix(&Matrix4::new_scaling(2.0));
        assert!((normal[(0, 0)] - 0.5).abs() < 1e-6);
    }
}
