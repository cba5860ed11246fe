use folio_engine::Scene;

mod avatar;
mod camera;
mod control;
mod interactable;
mod layout;
mod scene;
mod tuning;
mod vehicle;
mod zones;

pub(crate) use tuning::{load_tuning, Tuning, TuningError};

pub(crate) const CUE_FOOTSTEP: &str = "footstep";
pub(crate) const CUE_VEHICLE_ENTER: &str = "vehicle_enter";
pub(crate) const CUE_VEHICLE_EXIT: &str = "vehicle_exit";
pub(crate) const CUE_PORTAL_ENTER: &str = "portal_enter";
pub(crate) const CUE_PORTAL_ARRIVE: &str = "portal_arrive";
pub(crate) const CUE_INTERACT: &str = "interact";

/// Every cue the scene can emit, registered with the audio sink at startup.
pub(crate) const AUDIO_CUES: [&str; 6] = [
    CUE_FOOTSTEP,
    CUE_VEHICLE_ENTER,
    CUE_VEHICLE_EXIT,
    CUE_PORTAL_ENTER,
    CUE_PORTAL_ARRIVE,
    CUE_INTERACT,
];

pub(crate) fn build_scene(tuning: Tuning) -> Box<dyn Scene> {
    Box::new(scene::ExplorationScene::new(tuning))
}
