use tracing::info;

use crate::AppPaths;

use super::compiler::compile_world_defs;
use super::database::WorldDefDatabase;
use super::types::{ContentLoadError, ContentRequest};

/// Discovers base content and enabled mods, merges them and validates
/// cross-references. Any failure is fatal for startup.
pub fn load_world_defs(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<WorldDefDatabase, ContentLoadError> {
    let compiled = compile_world_defs(app_paths, request)?;
    for (mod_load_index, (mod_id, xml_file_count)) in compiled.xml_files_by_mod.iter().enumerate() {
        info!(
            mod_id = %mod_id,
            mod_load_index,
            xml_file_count,
            "content_mod_loaded"
        );
    }

    let (segments, portals, interactables, vehicles) = compiled.database.def_counts();
    info!(
        segments,
        portals,
        interactables,
        vehicles,
        enabled_mods = request.enabled_mods.len(),
        "content_loaded"
    );
    Ok(compiled.database)
}
