use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{ContentRequest, DiscoveryError};

pub(crate) const BASE_MOD_ID: &str = "base";

#[derive(Debug, Clone)]
pub(crate) struct ModSource {
    pub mod_id: String,
    pub source_dir: PathBuf,
}

/// Base content first, then enabled mods in request order.
pub(crate) fn discover_mod_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ModSource>, DiscoveryError> {
    if !app_paths.base_content_dir.is_dir() {
        return Err(DiscoveryError::BaseMissing(
            app_paths.base_content_dir.clone(),
        ));
    }

    let mut seen = HashSet::<&str>::new();
    let mut sources = vec![ModSource {
        mod_id: BASE_MOD_ID.to_string(),
        source_dir: app_paths.base_content_dir.clone(),
    }];

    for mod_id in &request.enabled_mods {
        let trimmed = mod_id.trim();
        if trimmed.is_empty() {
            return Err(DiscoveryError::EmptyEnabledMod);
        }
        if trimmed == BASE_MOD_ID || !seen.insert(trimmed) {
            return Err(DiscoveryError::DuplicateEnabledMod {
                mod_id: trimmed.to_string(),
            });
        }
        let mod_dir = app_paths.mods_dir.join(trimmed);
        ensure_dir_exists(trimmed, &mod_dir)?;
        sources.push(ModSource {
            mod_id: trimmed.to_string(),
            source_dir: mod_dir,
        });
    }

    Ok(sources)
}

fn ensure_dir_exists(mod_id: &str, path: &Path) -> Result<(), DiscoveryError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DiscoveryError::EnabledModMissing {
            mod_id: mod_id.to_string(),
            expected_dir: path.to_path_buf(),
        })
    }
}
