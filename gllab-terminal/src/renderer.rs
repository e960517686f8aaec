/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use gllab_core::{Camera, Lighting, Mesh, Transform, Triangle};
use nalgebra::{Matrix3, Matrix4, Vector3};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Brightness used for every face when lighting is off
const UNLIT_BRIGHTNESS: f32 = 0.7;

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
        }
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Character at a cell, for inspection in tests and overlays
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        model_view: &Matrix4<f32>,
        camera: &Camera,
        lighting: Option<&Lighting>,
    ) {
        let normal_matrix = Transform::normal_matrix(model_view);
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, model_view, &normal_matrix, camera, lighting);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_view: &Matrix4<f32>,
        normal_matrix: &Matrix3<f32>,
        camera: &Camera,
        lighting: Option<&Lighting>,
    ) {
        // Project vertices to screen space; a single clipped corner drops the face
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(
                &vertex.position,
                model_view,
                self.width as u32,
                self.height as u32,
            ) {
                Some(projected) => *slot = projected,
                None => return,
            }
        }

        let brightness = match lighting {
            Some(lighting) => {
                let normal = triangle
                    .vertices
                    .iter()
                    .fold(Vector3::zeros(), |acc, v| acc + v.normal);
                let eye_normal = (normal_matrix * normal)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3::zeros);
                lighting.weight(&eye_normal).mean()
            }
            None => UNLIT_BRIGHTNESS,
        };

        self.rasterize_triangle(&screen_coords, shade(brightness));
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };

                // Accept either winding; back faces lose the depth test anyway
                let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0)
                    || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
                if !inside {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Map a 0..1 brightness onto the ramp, never choosing the blank cell
fn shade(brightness: f32) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (brightness.clamp(0.0, 1.0) * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.clamp(1, last)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gllab_core::{IndexedGeometry, SceneConfig, SceneState};

    fn cube_in_front() -> (Mesh, Matrix4<f32>) {
        let mesh = IndexedGeometry::cube(2.0).to_mesh();
        let model_view = Transform::translation_matrix(0.0, 0.0, -5.0);
        (mesh, model_view)
    }

    #[test]
    fn test_cube_covers_center() {
        let (mesh, model_view) = cube_in_front();
        let mut renderer = AsciiRenderer::new(40, 40);
        renderer.render_mesh(&mesh, &model_view, &Camera::new(40, 40), None);
        assert_eq!(renderer.cell(20, 20), Some(shade(UNLIT_BRIGHTNESS)));
        assert_eq!(renderer.cell(0, 0), Some(' '));
    }

    #[test]
    fn test_lit_face_is_brighter_than_ambient() {
        let (mesh, model_view) = cube_in_front();
        let lighting = Lighting {
            direction: Vector3::new(0.0, 0.0, -1.0),
            ..Lighting::default()
        };
        let mut renderer = AsciiRenderer::new(40, 40);
        renderer.render_mesh(&mesh, &model_view, &Camera::new(40, 40), Some(&lighting));
        assert_eq!(renderer.cell(20, 20), Some('@'));
    }

    #[test]
    fn test_lesson_pair_draws_both_objects() {
        let config = SceneConfig::lesson(1).unwrap();
        let scene = SceneState::new(&config);
        let camera = Camera::new(80, 40);
        let mut renderer = AsciiRenderer::new(80, 40);

        let meshes: Vec<Mesh> = config
            .objects
            .iter()
            .map(|object| object.geometry.build().to_mesh())
            .collect();
        for (mesh, model_view) in meshes.iter().zip(scene.object_model_views()) {
            renderer.render_mesh(mesh, &model_view, &camera, None);
        }

        assert_ne!(renderer.cell(26, 20), Some(' '));
        assert_ne!(renderer.cell(54, 20), Some(' '));
        assert_eq!(renderer.cell(40, 20), Some(' '));
    }

    #[test]
    fn test_clear_resets_buffers() {
        let (mesh, model_view) = cube_in_front();
        let mut renderer = AsciiRenderer::new(20, 20);
        renderer.render_mesh(&mesh, &model_view, &Camera::new(20, 20), None);
        renderer.clear();
        assert!((0..20).all(|x| renderer.cell(x, 10) == Some(' ')));
    }

    #[test]
    fn test_shade_bounds() {
        assert_eq!(shade(-1.0), '.');
        assert_eq!(shade(2.0), '@');
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
    }
}
