/// gllab Terminal Demo
///
/// Renders an OBJ file, or one of the built-in lesson scenes, as ASCII art.
///
/// Usage: gllab-terminal [model.obj] [--lesson N] [--fan] [--strict]
///
/// Controls:
///   - Arrow Keys: Change spin speed
///   - PgUp/PgDn (or W/S): Zoom
///   - L: Toggle lighting
///   - Q/ESC: Quit
use std::env;
use std::fs;
use std::io;

use gllab_core::{obj, FaceMode, ParseOptions, SceneConfig, Strictness};
use gllab_terminal::TerminalApp;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log filter when `RUST_LOG` is unset. stderr shares the raw-mode TTY with
/// the frame, so only warnings get through by default.
const DEFAULT_LOG_FILTER: &str = "warn";

struct Args {
    model: Option<String>,
    lesson: Option<u8>,
    options: ParseOptions,
}

fn parse_args() -> io::Result<Args> {
    let mut args = Args {
        model: None,
        lesson: None,
        options: ParseOptions::default(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--fan" => args.options = args.options.with_face_mode(FaceMode::Fan),
            "--strict" => args.options = args.options.with_strictness(Strictness::Strict),
            "--lesson" => {
                let value = iter.next().and_then(|n| n.parse().ok()).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "--lesson expects a number")
                })?;
                args.lesson = Some(value);
            }
            other if other.starts_with("--") => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown option {other}"),
                ));
            }
            path => args.model = Some(path.to_string()),
        }
    }

    Ok(args)
}

fn main() -> io::Result<()> {
    // Redirect stderr when raising RUST_LOG, or lines land on the frame
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = parse_args()?;

    let config = match args.lesson {
        Some(number) => SceneConfig::lesson(number)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?,
        None => SceneConfig::default(),
    };

    let model = match &args.model {
        Some(path) => {
            tracing::info!(path = %path, "loading OBJ model");
            let text = fs::read_to_string(path).map_err(|e| {
                io::Error::new(e.kind(), format!("Failed to read OBJ file {path}: {e}"))
            })?;
            let parsed = obj::parse_obj(&text, args.options).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Failed to parse OBJ: {e}"))
            })?;
            if parsed.is_empty() {
                tracing::warn!(path = %path, "OBJ file holds no vertices or faces");
            }
            tracing::info!(
                vertices = parsed.vertices.len(),
                triangles = parsed.triangle_count(),
                "model loaded"
            );
            Some(parsed.to_mesh())
        }
        None => None,
    };

    tracing::info!(custom_model = model.is_some(), "starting terminal renderer");

    let mut app = TerminalApp::new(&config, model)?;
    app.run()?;

    tracing::info!("renderer closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_filter_hides_info() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
