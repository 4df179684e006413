use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use strata_engine::{resolve_app_paths, LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::scenes;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenes: Vec<Box<dyn Scene>>,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Strata Startup ===");

    let paths = resolve_app_paths().map_err(|error| error.to_string())?;
    let config = load_config(&paths.config_path)?;
    info!(
        config = %paths.config_path.display(),
        title = %config.window_title,
        width = config.window_width,
        height = config.window_height,
        "config_loaded"
    );

    Ok(AppWiring {
        config,
        scenes: scenes::build_scenes(),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// A missing config file is not an error; every field has a default.
pub(crate) fn load_config(path: &Path) -> Result<LoopConfig, String> {
    match fs::read_to_string(path) {
        Ok(raw) => parse_config_json(&raw).map_err(|error| format!("{}: {error}", path.display())),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "config_missing_using_defaults");
            Ok(LoopConfig::default())
        }
        Err(error) => Err(format!("read config '{}': {error}", path.display())),
    }
}

fn parse_config_json(raw: &str) -> Result<LoopConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, LoopConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}
