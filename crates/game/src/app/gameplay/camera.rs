use folio_engine::{CameraRig, Vec3};

use super::tuning::CameraTuning;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CameraFollowController {
    tuning: CameraTuning,
}

impl CameraFollowController {
    pub(crate) fn new(tuning: CameraTuning) -> Self {
        Self { tuning }
    }

    /// Eases the rig toward `target + offset`. Without a target the rig is left
    /// where it is.
    pub(crate) fn update(
        &self,
        target: Option<Vec3>,
        in_transition: bool,
        dt_seconds: f32,
        rig: &mut CameraRig,
    ) {
        let Some(target) = target else {
            return;
        };
        let (offset, rate) = if in_transition {
            (self.tuning.transition_offset, self.tuning.transition_rate)
        } else {
            (self.tuning.follow_offset, self.tuning.follow_rate)
        };
        let factor = (rate * dt_seconds).min(1.0);
        rig.position = rig.position.lerp(target + offset, factor);
        rig.look_at = target;
    }

    pub(crate) fn snap(&self, target: Vec3, rig: &mut CameraRig) {
        rig.position = target + self.tuning.follow_offset;
        rig.look_at = target;
    }
}
