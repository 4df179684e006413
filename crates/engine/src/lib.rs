use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod math;

pub use app::{
    run_app, AppError, Camera2D, CollisionError, CollisionIndex, Color, CursorIcon, DrawSurface,
    Easing, Engine, EngineError, EngineStatus, EventBus, EventData, GameObject, InputSnapshot, LoopConfig,
    LoopControl, ObjectId, PointerButton, PointerEvent, PreloadContext, PreloadStatus, Renderer,
    Scene, SceneCommand, SceneError, SceneManager, SceneStatus, SceneWorld, Tween,
    TweenLoop, Viewport,
};
pub use assets::{AssetCache, AssetError, ImageAsset, LoadProgress, SpritesheetConfig};
pub use math::{Rect, Vector2};

pub const ROOT_ENV_VAR: &str = "STRATA_ROOT";
pub const CONFIG_ENV_VAR: &str = "STRATA_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "strata.json";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    /// May not exist; callers fall back to defaults.
    pub config_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "STRATA_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/strata\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let config_override = match env::var(CONFIG_ENV_VAR) {
        Ok(value) => Some(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: CONFIG_ENV_VAR,
                source,
            })
        }
    };
    let config_path = config_path(&root, config_override);
    Ok(AppPaths { root, config_path })
}

fn config_path(root: &Path, config_override: Option<PathBuf>) -> PathBuf {
    match config_override {
        Some(path) if path.is_absolute() => path,
        Some(path) => root.join(path),
        None => root.join(DEFAULT_CONFIG_FILE),
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
