use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod atomic_io;
pub mod content;

pub use app::{
    run_app, run_app_with_metrics, world_to_screen, AnimationError, AnimationMixer, AppError,
    AudioError, AudioSink, CameraRig, ClipboardRoute, CueLog, DebugShape, EffectCounts,
    HostPlatform, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    NativePlatform, PlatformError, PlatformOutcome, PlatformRequest, Quat, RenderableDesc,
    RenderableKind, Renderer, Scene, SceneHost, SceneObject, SceneObjectId, SceneWorld, Toast,
    Transform, Vec3, Viewport, PIXELS_PER_WORLD, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    load_world_defs, ContentErrorCode, ContentLoadError, ContentRequest, InteractableActionDef,
    InteractableDef, PortalDef, PortalTransit, SegmentDef, SourceLocation, VehicleDef,
    WorldDefDatabase, WorldSegment,
};

pub const ROOT_ENV_VAR: &str = "FOLIO_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn tuning_path(&self) -> PathBuf {
        self.base_content_dir.join("tuning.json")
    }
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
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "FOLIO_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and assets/base/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/base/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/folio\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = app_paths_for_root(&root);

    fs::create_dir_all(&paths.cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: paths.cache_dir.clone(),
        source,
    })?;

    Ok(paths)
}

pub fn app_paths_for_root(root: &Path) -> AppPaths {
    AppPaths {
        root: root.to_path_buf(),
        base_content_dir: root.join("assets").join("base"),
        mods_dir: root.join("mods"),
        cache_dir: root.join("cache"),
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
    path.join("Cargo.toml").is_file() && path.join("assets").join("base").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
