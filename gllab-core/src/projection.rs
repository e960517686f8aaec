/// Camera projection utilities
use nalgebra::{Matrix4, Point3, Vector4};

use crate::matrix::{perspective, try_perspective, ProjectionError};

/// Perspective camera sitting at the origin and looking down -Z.
///
/// Placement of the scene in front of it is the model-view matrix's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_deg: 45.0,
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn with_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Follow a viewport resize. A zero height leaves the aspect unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        perspective(self.fov_deg, self.aspect, self.near, self.far)
    }

    /// Projection matrix, refusing settings that would produce NaN or inf.
    pub fn checked_projection_matrix(&self) -> Result<Matrix4<f32>, ProjectionError> {
        try_perspective(self.fov_deg, self.aspect, self.near, self.far)
    }

    /// Project a model-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with the origin in the top-left corner and
    /// depth in NDC (`-1` near, `1` far), or `None` when the point falls
    /// outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_view: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip = self.projection_matrix() * model_view * Vector4::new(point.x, point.y, point.z, 1.0);

        // Behind the eye or on the eye plane
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        if ndc.iter().any(|v| !(-1.0..=1.0).contains(v)) {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!(camera.checked_projection_matrix().is_ok());
    }

    #[test]
    fn test_resize_ignores_zero_height() {
        let mut camera = Camera::new(100, 100);
        camera.resize(200, 0);
        assert_eq!(camera.aspect, 1.0);
        camera.resize(200, 100);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_point_ahead_projects_to_center() {
        let camera = Camera::new(100, 100);
        let model_view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -5.0));
        let (x, y, depth) = camera
            .project_to_screen(&Point3::origin(), &model_view, 100, 100)
            .unwrap();
        assert!((x - 50.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_point_behind_is_clipped() {
        let camera = Camera::new(100, 100);
        let model_view = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0));
        assert!(camera
            .project_to_screen(&Point3::origin(), &model_view, 100, 100)
            .is_none());
    }

    #[test]
    fn test_nearer_points_have_smaller_depth() {
        let camera = Camera::new(100, 100);
        let near = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -2.0));
        let far = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -20.0));
        let (_, _, d_near) = camera.project_to_screen(&Point3::origin(), &near, 100, 100).unwrap();
        let (_, _, d_far) = camera.project_to_screen(&Point3::origin(), &far, 100, 100).unwrap();
        assert!(d_near < d_far);
    }
}
