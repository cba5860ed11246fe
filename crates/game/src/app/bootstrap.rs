use folio_engine::{resolve_app_paths, ContentRequest, LoopConfig, Scene, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, TuningError};

const ENABLED_MODS_ENV_VAR: &str = "FOLIO_ENABLED_MODS";

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Tuning(#[from] TuningError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Folio Startup ===");

    let app_paths = resolve_app_paths()?;
    let tuning = gameplay::load_tuning(&app_paths.tuning_path())?;
    let config = LoopConfig {
        content_request: ContentRequest {
            enabled_mods: parse_enabled_mods(std::env::var(ENABLED_MODS_ENV_VAR).ok().as_deref()),
        },
        audio_cues: gameplay::AUDIO_CUES.iter().map(ToString::to_string).collect(),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: gameplay::build_scene(tuning),
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

fn parse_enabled_mods(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    })
    .unwrap_or_default()
}
