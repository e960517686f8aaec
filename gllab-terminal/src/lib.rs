/// Terminal front end: drives a scene and rasterizes it as ASCII
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use gllab_core::{Camera, Key, Lighting, Mesh, Placement, SceneConfig, SceneState};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: u32 = 2;

/// Frame budget for roughly 30 FPS
const FRAME_TIME: Duration = Duration::from_millis(33);

/// Interactive terminal viewer for a single mesh
pub struct TerminalApp {
    /// One mesh per placed scene object
    meshes: Vec<Mesh>,
    scene: SceneState,
    camera: Camera,
    renderer: AsciiRenderer,
    running: bool,
    started: Instant,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Show the config's objects, or `model` alone at the origin in their place.
    pub fn new(config: &SceneConfig, model: Option<Mesh>) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let now = Instant::now();

        let mut scene = SceneState::new(config);
        let meshes = match model {
            Some(mesh) => {
                scene.set_placements(vec![Placement::default()]);
                vec![mesh]
            }
            None => config
                .objects
                .iter()
                .map(|object| object.geometry.build().to_mesh())
                .collect(),
        };

        Ok(Self {
            meshes,
            scene,
            camera: Camera::new(width as u32, height as u32 * CELL_ASPECT),
            renderer: AsciiRenderer::new(width as usize, height as usize),
            running: true,
            started: now,
            last_sample: now,
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            self.scene.handle_keys();
            self.render()?;
            self.scene
                .animate(self.started.elapsed().as_secs_f64() * 1000.0);

            self.frame_count += 1;
            if let Some(idle) = FRAME_TIME.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(idle);
            }

            let now = Instant::now();
            let window = now - self.last_sample;
            if window.as_secs() >= 1 {
                self.fps = self.frame_count as f32 / window.as_secs_f32();
                self.frame_count = 0;
                self.last_sample = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                self.handle_key(code)
            }
            Event::Resize(width, height) => {
                self.camera
                    .resize(width as u32, height as u32 * CELL_ASPECT);
                self.renderer = AsciiRenderer::new(width as usize, height as usize);
                tracing::debug!(width, height, "terminal resized");
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('l') => {
                if self.scene.lighting.is_none() {
                    self.scene.lighting = Some(Lighting::default());
                }
                self.scene.lighting_enabled = !self.scene.lighting_enabled;
            }
            _ => {
                if let Some(key) = scene_key(code) {
                    // Terminals rarely report key releases, so a press acts for one frame
                    self.scene.key_down(key);
                    self.scene.handle_keys();
                    self.scene.key_up(key);
                }
            }
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();
        let lighting = self.scene.active_lighting();
        for (mesh, model_view) in self.meshes.iter().zip(self.scene.object_model_views()) {
            self.renderer
                .render_mesh(mesh, &model_view, &self.camera, lighting);
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Status line over the first row
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "gllab | FPS: {:.1} | spin {:.0}/{:.0} deg/s | Arrows=Spin PgUp/PgDn=Zoom L=Light Q=Quit",
                self.fps, self.scene.x_speed, self.scene.y_speed
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Scene key bound to a terminal key code
fn scene_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::PageUp | KeyCode::Char('w') => Some(Key::PageUp),
        KeyCode::PageDown | KeyCode::Char('s') => Some(Key::PageDown),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Char('f') => Some(Key::Filter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_aliases() {
        assert_eq!(scene_key(KeyCode::Char('w')), Some(Key::PageUp));
        assert_eq!(scene_key(KeyCode::PageDown), Some(Key::PageDown));
    }

    #[test]
    fn test_app_keys_are_not_scene_keys() {
        assert_eq!(scene_key(KeyCode::Char('q')), None);
        assert_eq!(scene_key(KeyCode::Char('l')), None);
        assert_eq!(scene_key(KeyCode::Esc), None);
    }
}
