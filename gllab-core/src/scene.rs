//! Scene configuration and per-frame state.
//!
//! A [`SceneConfig`] lists the objects to draw and picks lighting and the
//! texture filter; the numbered lesson presets are just different configs. [`SceneState`] holds
//! everything that changes between frames and is owned by whichever renderer
//! drives it.
use std::collections::HashSet;
use std::str::FromStr;

use nalgebra::{Matrix4, Vector3};
use thiserror::Error;

use crate::geometry::IndexedGeometry;
use crate::matrix::multiply;
use crate::transform::{RotationState, Transform};

/// Camera distance change per frame while PageUp/PageDown is held.
pub const ZOOM_STEP: f32 = 0.05;

/// Spin speed change per frame while an arrow key is held, in degrees per second.
pub const SPEED_STEP: f32 = 1.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("no lesson preset numbered {0}")]
    UnknownLesson(u8),

    #[error("unknown geometry `{0}`, expected triangle, square, pyramid or cube")]
    UnknownGeometry(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeometryKind {
    Triangle,
    Square,
    Pyramid,
    #[default]
    Cube,
}

impl GeometryKind {
    pub fn build(self) -> IndexedGeometry {
        match self {
            GeometryKind::Triangle => IndexedGeometry::triangle(),
            GeometryKind::Square => IndexedGeometry::square(),
            GeometryKind::Pyramid => IndexedGeometry::pyramid(),
            GeometryKind::Cube => IndexedGeometry::cube(2.0),
        }
    }
}

impl FromStr for GeometryKind {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "triangle" => Ok(GeometryKind::Triangle),
            "square" => Ok(GeometryKind::Square),
            "pyramid" => Ok(GeometryKind::Pyramid),
            "cube" => Ok(GeometryKind::Cube),
            _ => Err(SceneError::UnknownGeometry(s.to_string())),
        }
    }
}

/// Texture sampling mode, cycled with the F key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    #[default]
    Mipmap,
}

impl TextureFilter {
    pub fn next(self) -> Self {
        match self {
            TextureFilter::Nearest => TextureFilter::Linear,
            TextureFilter::Linear => TextureFilter::Mipmap,
            TextureFilter::Mipmap => TextureFilter::Nearest,
        }
    }
}

/// Ambient plus one directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: Vector3<f32>,
    /// Direction the light travels in
    pub direction: Vector3<f32>,
    pub directional: Vector3<f32>,
}

impl Lighting {
    /// Unit vector pointing from a surface towards the light.
    pub fn towards_light(&self) -> Vector3<f32> {
        self.direction
            .try_normalize(f32::EPSILON)
            .map(|d| -d)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Per-channel light weight for a surface with the given unit normal.
    pub fn weight(&self, normal: &Vector3<f32>) -> Vector3<f32> {
        let diffuse = normal.dot(&self.towards_light()).max(0.0);
        self.ambient + self.directional * diffuse
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: Vector3::new(0.2, 0.2, 0.2),
            direction: Vector3::new(-0.25, -0.25, -1.0),
            directional: Vector3::new(0.8, 0.8, 0.8),
        }
    }
}

/// Where an object sits relative to the scene origin and how it spins on
/// its own, independent of the keyboard-driven scene rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub offset: Vector3<f32>,
    pub spin_axis: Vector3<f32>,
    /// Degrees per second
    pub spin_speed: f32,
}

impl Placement {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            offset: Vector3::new(x, y, z),
            spin_axis: Vector3::y(),
            spin_speed: 0.0,
        }
    }

    pub fn spinning(mut self, axis: Vector3<f32>, speed: f32) -> Self {
        self.spin_axis = axis;
        self.spin_speed = speed;
        self
    }

    /// Spin by `angle_deg` about the axis, then move to the offset.
    pub fn matrix(&self, angle_deg: f32) -> Matrix4<f32> {
        let spin = Transform::rotation_about(self.spin_axis, angle_deg);
        let shift = Transform::translation_matrix(self.offset.x, self.offset.y, self.offset.z);
        multiply(&spin, &shift)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::at(0.0, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObject {
    pub geometry: GeometryKind,
    pub placement: Placement,
}

impl SceneObject {
    pub fn new(geometry: GeometryKind, placement: Placement) -> Self {
        Self {
            geometry,
            placement,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub objects: Vec<SceneObject>,
    pub lighting: Option<Lighting>,
    pub texture_filter: TextureFilter,
    /// Initial translation along Z; negative is into the screen
    pub start_z: f32,
    /// Initial scene spin speeds in degrees per second
    pub x_speed: f32,
    pub y_speed: f32,
    pub z_speed: f32,
}

impl SceneConfig {
    /// Settings matching each numbered lesson.
    pub fn lesson(number: u8) -> Result<Self, SceneError> {
        let base = Self {
            lighting: None,
            x_speed: 0.0,
            y_speed: 0.0,
            z_speed: 0.0,
            ..Self::default()
        };

        let pair = |left: SceneObject, right: SceneObject| Self {
            objects: vec![left, right],
            start_z: -7.0,
            ..base.clone()
        };
        let left = Placement::at(-2.0, 0.0, 0.0);
        let right = Placement::at(2.0, 0.0, 0.0);

        let config = match number {
            // Lesson 2 only recolours lesson 1
            1 | 2 => pair(
                SceneObject::new(GeometryKind::Triangle, left),
                SceneObject::new(GeometryKind::Square, right),
            ),
            3 => pair(
                SceneObject::new(GeometryKind::Triangle, left.spinning(Vector3::y(), 90.0)),
                SceneObject::new(GeometryKind::Square, right.spinning(Vector3::x(), 75.0)),
            ),
            4 => pair(
                SceneObject::new(GeometryKind::Pyramid, left.spinning(Vector3::y(), 90.0)),
                SceneObject::new(
                    GeometryKind::Cube,
                    right.spinning(Vector3::new(1.0, 1.0, 1.0), 75.0),
                ),
            ),
            5 => Self {
                x_speed: 90.0,
                y_speed: 90.0,
                z_speed: 90.0,
                ..base.clone()
            },
            6 => Self {
                texture_filter: TextureFilter::Nearest,
                ..base.clone()
            },
            7 => Self::default(),
            other => return Err(SceneError::UnknownLesson(other)),
        };
        Ok(config)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            objects: vec![SceneObject::new(GeometryKind::Cube, Placement::default())],
            lighting: Some(Lighting::default()),
            texture_filter: TextureFilter::Mipmap,
            start_z: -5.0,
            x_speed: 3.0,
            y_speed: -3.0,
            z_speed: 0.0,
        }
    }
}

/// Keys the scene reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    PageUp,
    PageDown,
    Left,
    Up,
    Right,
    Down,
    Filter,
}

impl Key {
    /// Map a DOM `keyCode`.
    pub fn from_key_code(code: u32) -> Option<Self> {
        match code {
            33 => Some(Key::PageUp),
            34 => Some(Key::PageDown),
            37 => Some(Key::Left),
            38 => Some(Key::Up),
            39 => Some(Key::Right),
            40 => Some(Key::Down),
            70 => Some(Key::Filter),
            _ => None,
        }
    }
}

/// Mutable state of a running scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub rotation: RotationState,
    pub x_speed: f32,
    pub y_speed: f32,
    pub z_speed: f32,
    pub z: f32,
    pub filter: TextureFilter,
    pub lighting: Option<Lighting>,
    pub lighting_enabled: bool,
    placements: Vec<Placement>,
    /// Current spin angle of each placed object, in degrees
    spins: Vec<f32>,
    last_time_ms: Option<f64>,
    pressed: HashSet<Key>,
}

impl SceneState {
    pub fn new(config: &SceneConfig) -> Self {
        let placements: Vec<Placement> = config.objects.iter().map(|o| o.placement).collect();
        Self {
            rotation: RotationState::zero(),
            x_speed: config.x_speed,
            y_speed: config.y_speed,
            z_speed: config.z_speed,
            z: config.start_z,
            filter: config.texture_filter,
            lighting: config.lighting,
            lighting_enabled: config.lighting.is_some(),
            spins: vec![0.0; placements.len()],
            placements,
            last_time_ms: None,
            pressed: HashSet::new(),
        }
    }

    /// Swap the placed objects, e.g. when a loaded model replaces the
    /// preset shapes. Spin angles restart at zero.
    pub fn set_placements(&mut self, placements: Vec<Placement>) {
        self.spins = vec![0.0; placements.len()];
        self.placements = placements;
    }

    pub fn object_count(&self) -> usize {
        self.placements.len()
    }

    pub fn key_down(&mut self, key: Key) {
        // Filter cycles once per press, not per frame
        if key == Key::Filter && !self.pressed.contains(&key) {
            self.filter = self.filter.next();
            tracing::debug!(filter = ?self.filter, "texture filter changed");
        }
        self.pressed.insert(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    /// Apply held keys. Called once per frame.
    pub fn handle_keys(&mut self) {
        if self.is_pressed(Key::PageUp) {
            self.z -= ZOOM_STEP;
        }
        if self.is_pressed(Key::PageDown) {
            self.z += ZOOM_STEP;
        }
        if self.is_pressed(Key::Left) {
            self.y_speed -= SPEED_STEP;
        }
        if self.is_pressed(Key::Right) {
            self.y_speed += SPEED_STEP;
        }
        if self.is_pressed(Key::Up) {
            self.x_speed -= SPEED_STEP;
        }
        if self.is_pressed(Key::Down) {
            self.x_speed += SPEED_STEP;
        }
    }

    /// Spin the scene and every object by their speeds over `elapsed_ms`.
    pub fn advance(&mut self, elapsed_ms: f64) {
        let seconds = (elapsed_ms / 1000.0) as f32;
        self.rotation.rotate(
            self.x_speed * seconds,
            self.y_speed * seconds,
            self.z_speed * seconds,
        );
        for (angle, placement) in self.spins.iter_mut().zip(&self.placements) {
            *angle += placement.spin_speed * seconds;
        }
    }

    /// Advance to the frame timestamp `now_ms`. The first call only records
    /// the time.
    pub fn animate(&mut self, now_ms: f64) {
        if let Some(last) = self.last_time_ms {
            self.advance((now_ms - last).max(0.0));
        }
        self.last_time_ms = Some(now_ms);
    }

    /// Lighting to apply this frame, if any.
    pub fn active_lighting(&self) -> Option<&Lighting> {
        self.lighting.as_ref().filter(|_| self.lighting_enabled)
    }

    /// Rotate about Z, Y and X, then push the scene `z` along the view axis.
    pub fn model_view(&self) -> Matrix4<f32> {
        let rz = Transform::rotation_z(self.rotation.z);
        let ry = Transform::rotation_y(self.rotation.y);
        let rx = Transform::rotation_x(self.rotation.x);
        let push = Transform::translation_matrix(0.0, 0.0, self.z);
        multiply(&multiply(&multiply(&rz, &ry), &rx), &push)
    }

    /// Each object's own spin and offset, before the scene transform.
    pub fn object_matrices(&self) -> Vec<Matrix4<f32>> {
        self.placements
            .iter()
            .zip(&self.spins)
            .map(|(placement, &angle)| placement.matrix(angle))
            .collect()
    }

    /// Full model-view matrix of each object, in placement order.
    pub fn object_model_views(&self) -> Vec<Matrix4<f32>> {
        let view = self.model_view();
        self.object_matrices()
            .iter()
            .map(|object| multiply(object, &view))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn close(a: &Matrix4<f32>, b: &Matrix4<f32>) -> bool {
        (a - b).abs().max() < 1e-5
    }

    fn geometries(config: &SceneConfig) -> Vec<GeometryKind> {
        config.objects.iter().map(|o| o.geometry).collect()
    }

    #[test]
    fn test_lesson_presets() {
        assert_eq!(SceneConfig::lesson(7), Ok(SceneConfig::default()));
        assert_eq!(SceneConfig::lesson(9), Err(SceneError::UnknownLesson(9)));
        assert_eq!(SceneConfig::lesson(0), Err(SceneError::UnknownLesson(0)));
    }

    #[test]
    fn test_lesson_one_places_triangle_and_square_apart() {
        let config = SceneConfig::lesson(1).unwrap();
        assert_eq!(
            geometries(&config),
            vec![GeometryKind::Triangle, GeometryKind::Square]
        );
        assert_eq!(config.objects[0].placement, Placement::at(-2.0, 0.0, 0.0));
        assert_eq!(config.objects[1].placement, Placement::at(2.0, 0.0, 0.0));
        assert_eq!(config.start_z, -7.0);

        let state = SceneState::new(&config);
        let centres: Vec<_> = state
            .object_model_views()
            .iter()
            .map(|m| m.transform_point(&Point3::origin()))
            .collect();
        assert!((centres[0] - Point3::new(-2.0, 0.0, -7.0)).norm() < 1e-6);
        assert!((centres[1] - Point3::new(2.0, 0.0, -7.0)).norm() < 1e-6);
    }

    #[test]
    fn test_lesson_three_spins_each_object_on_its_own_axis() {
        let mut state = SceneState::new(&SceneConfig::lesson(3).unwrap());
        state.animate(0.0);
        state.animate(1000.0);

        assert_eq!(state.rotation, RotationState::zero());
        let objects = state.object_matrices();
        let triangle = multiply(
            &Transform::rotation_y(90.0),
            &Transform::translation_matrix(-2.0, 0.0, 0.0),
        );
        let square = multiply(
            &Transform::rotation_x(75.0),
            &Transform::translation_matrix(2.0, 0.0, 0.0),
        );
        assert!(close(&objects[0], &triangle));
        assert!(close(&objects[1], &square));
    }

    #[test]
    fn test_lesson_four_cube_spins_about_diagonal() {
        let config = SceneConfig::lesson(4).unwrap();
        assert_eq!(
            geometries(&config),
            vec![GeometryKind::Pyramid, GeometryKind::Cube]
        );

        let mut state = SceneState::new(&config);
        state.advance(1000.0);
        let cube = state.object_matrices()[1];
        let expected = multiply(
            &Transform::rotation_about(Vector3::new(1.0, 1.0, 1.0), 75.0),
            &Transform::translation_matrix(2.0, 0.0, 0.0),
        );
        assert!(close(&cube, &expected));

        // Points on the spin axis stay put
        let on_axis = cube.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((on_axis - Point3::new(3.0, 1.0, 1.0)).norm() < 1e-5);
    }

    #[test]
    fn test_lesson_five_spins_all_three_axes() {
        let config = SceneConfig::lesson(5).unwrap();
        assert_eq!(geometries(&config), vec![GeometryKind::Cube]);

        let mut state = SceneState::new(&config);
        state.animate(0.0);
        state.animate(1000.0);
        assert!((state.rotation.x - 90.0).abs() < 1e-4);
        assert!((state.rotation.y - 90.0).abs() < 1e-4);
        assert!((state.rotation.z - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_set_placements_resets_spins() {
        let mut state = SceneState::new(&SceneConfig::lesson(3).unwrap());
        state.advance(500.0);
        state.set_placements(vec![Placement::default()]);
        assert_eq!(state.object_count(), 1);
        assert!(close(&state.object_matrices()[0], &Matrix4::identity()));
    }

    #[test]
    fn test_geometry_from_str() {
        assert_eq!("Cube".parse::<GeometryKind>(), Ok(GeometryKind::Cube));
        assert!("teapot".parse::<GeometryKind>().is_err());
    }

    #[test]
    fn test_held_keys_change_speed_and_zoom() {
        let mut state = SceneState::new(&SceneConfig::default());
        state.key_down(Key::Left);
        state.key_down(Key::PageUp);
        state.handle_keys();
        state.handle_keys();
        assert_eq!(state.y_speed, -5.0);
        assert!((state.z - -5.1).abs() < 1e-6);

        state.key_up(Key::Left);
        state.handle_keys();
        assert_eq!(state.y_speed, -5.0);
    }

    #[test]
    fn test_filter_cycles_once_per_press() {
        let mut state = SceneState::new(&SceneConfig::lesson(6).unwrap());
        assert_eq!(state.filter, TextureFilter::Nearest);
        state.key_down(Key::Filter);
        state.key_down(Key::Filter);
        assert_eq!(state.filter, TextureFilter::Linear);
        state.key_up(Key::Filter);
        state.key_down(Key::Filter);
        assert_eq!(state.filter, TextureFilter::Mipmap);
        state.key_up(Key::Filter);
        state.key_down(Key::Filter);
        assert_eq!(state.filter, TextureFilter::Nearest);
    }

    #[test]
    fn test_animate_uses_elapsed_time() {
        let mut state = SceneState::new(&SceneConfig::default());
        state.animate(500.0);
        assert_eq!(state.rotation, RotationState::zero());
        state.animate(1500.0);
        assert!((state.rotation.x - 3.0).abs() < 1e-5);
        assert!((state.rotation.y + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_key_code(37), Some(Key::Left));
        assert_eq!(Key::from_key_code(70), Some(Key::Filter));
        assert_eq!(Key::from_key_code(65), None);
    }

    #[test]
    fn test_model_view_pushes_along_z() {
        let state = SceneState::new(&SceneConfig::default());
        let moved = state.model_view().transform_point(&Point3::origin());
        assert!((moved - Point3::new(0.0, 0.0, -5.0)).norm() < 1e-6);
    }

    #[test]
    fn test_model_view_rotates_before_push() {
        let mut state = SceneState::new(&SceneConfig::default());
        state.rotation = RotationState::new(30.0, 50.0, 0.0);
        state.z = -4.0;

        // Column-vector form: translate * Rx * Ry
        let expected = Transform::translation_matrix(0.0, 0.0, -4.0)
            * Transform::rotation_x(30.0)
            * Transform::rotation_y(50.0);
        assert!(close(&state.model_view(), &expected));

        let moved = state.model_view().transform_point(&Point3::new(1.0, 0.0, 0.0));
        let spun = Transform::rotation_y(50.0).transform_point(&Point3::new(1.0, 0.0, 0.0));
        let tilted = Transform::rotation_x(30.0).transform_point(&spun);
        assert!((moved - (tilted + Vector3::new(0.0, 0.0, -4.0))).norm() < 1e-5);
    }

    #[test]
    fn test_model_view_applies_z_spin_first() {
        let mut state = SceneState::new(&SceneConfig::lesson(5).unwrap());
        state.rotation = RotationState::new(10.0, 20.0, 30.0);

        let expected = Transform::translation_matrix(0.0, 0.0, state.z)
            * Transform::rotation_x(10.0)
            * Transform::rotation_y(20.0)
            * Transform::rotation_z(30.0);
        assert!(close(&state.model_view(), &expected));
    }

    #[test]
    fn test_lighting_weight() {
        let lighting = Lighting::default();
        let facing = lighting.towards_light();
        let lit = lighting.weight(&facing);
        assert!((lit.x - 1.0).abs() < 1e-5);

        let unlit = lighting.weight(&-facing);
        assert!((unlit.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_lighting_toggle() {
        let mut state = SceneState::new(&SceneConfig::default());
        assert!(state.active_lighting().is_some());
        state.lighting_enabled = false;
        assert!(state.active_lighting().is_none());
    }
}
