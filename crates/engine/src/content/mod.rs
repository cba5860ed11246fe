mod compiler;
mod database;
mod discovery;
mod pipeline;
mod types;

pub use database::{
    InteractableActionDef, InteractableDef, PortalDef, PortalTransit, SegmentDef, VehicleDef,
    WorldDefDatabase,
};
pub use pipeline::load_world_defs;
pub use types::{ContentErrorCode, ContentLoadError, ContentRequest, SourceLocation, WorldSegment};
