use std::time::Duration;

use folio_engine::{AnimationMixer, Quat, SceneObjectId, SceneWorld, Transform, Vec3};
use tracing::{debug, info, warn};

use super::control::ControlVector;
use super::tuning::AvatarTuning;
use super::vehicle::VehicleController;
use super::{CUE_FOOTSTEP, CUE_VEHICLE_ENTER, CUE_VEHICLE_EXIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Locomotion {
    Idle,
    Walk,
    Run,
}

impl Locomotion {
    pub(crate) const CLIPS: [&'static str; 3] = ["idle", "walk", "run"];

    pub(crate) fn clip(self) -> &'static str {
        match self {
            Locomotion::Idle => "idle",
            Locomotion::Walk => "walk",
            Locomotion::Run => "run",
        }
    }
}

pub(crate) fn select_animation(control: &ControlVector, in_vehicle: bool) -> Locomotion {
    if in_vehicle || !control.has_direction() {
        Locomotion::Idle
    } else if control.sprint {
        Locomotion::Run
    } else {
        Locomotion::Walk
    }
}

pub(crate) fn avatar_mixer() -> AnimationMixer {
    let mut mixer = AnimationMixer::with_clips(Locomotion::CLIPS);
    if let Err(error) = mixer.play(Locomotion::Idle.clip()) {
        warn!(error = %error, "avatar_idle_clip_missing");
    }
    mixer
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AvatarState {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
    pub in_vehicle: bool,
    pub transitioning: bool,
}

impl AvatarState {
    fn at(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            orientation: Quat::from_rotation_y(yaw),
            scale: Vec3::ONE,
            in_vehicle: false,
            transitioning: false,
        }
    }

    pub(crate) fn yaw(&self) -> f32 {
        let forward = self.orientation * Vec3::Z;
        forward.x.atan2(forward.z)
    }
}

/// Owns the avatar pose and mode. The vehicle is attached through
/// `register_vehicle` by the scene that constructed both.
#[derive(Debug)]
pub(crate) struct AvatarController {
    tuning: AvatarTuning,
    state: AvatarState,
    object: Option<SceneObjectId>,
    vehicle: Option<SceneObjectId>,
    locomotion: Locomotion,
    last_footstep_at: Option<Duration>,
}

impl AvatarController {
    pub(crate) fn new(tuning: AvatarTuning, position: Vec3, yaw: f32) -> Self {
        Self {
            tuning,
            state: AvatarState::at(position, yaw),
            object: None,
            vehicle: None,
            locomotion: Locomotion::Idle,
            last_footstep_at: None,
        }
    }

    pub(crate) fn state(&self) -> &AvatarState {
        &self.state
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.state.position
    }

    pub(crate) fn in_vehicle(&self) -> bool {
        self.state.in_vehicle
    }

    pub(crate) fn locomotion(&self) -> Locomotion {
        self.locomotion
    }

    pub(crate) fn object(&self) -> Option<SceneObjectId> {
        self.object
    }

    pub(crate) fn attach_object(&mut self, id: SceneObjectId) {
        self.object = Some(id);
    }

    /// One-time attachment. Later calls are ignored until `clear_vehicle`.
    pub(crate) fn register_vehicle(&mut self, vehicle: SceneObjectId) -> bool {
        if let Some(existing) = self.vehicle {
            debug!(
                existing = existing.0,
                ignored = vehicle.0,
                "vehicle_registration_ignored"
            );
            return false;
        }
        self.vehicle = Some(vehicle);
        true
    }

    pub(crate) fn registered_vehicle(&self) -> Option<SceneObjectId> {
        self.vehicle
    }

    pub(crate) fn clear_vehicle(&mut self) {
        self.vehicle = None;
        self.state.in_vehicle = false;
    }

    /// Per-call step: speed and turn blend are not scaled by frame time, so
    /// `_dt_seconds` is accepted but unused.
    pub(crate) fn update_movement(&mut self, control: &ControlVector, _dt_seconds: f32) {
        if self.state.in_vehicle {
            return;
        }
        let direction = control.direction();
        if direction == Vec3::ZERO {
            return;
        }

        let speed = if control.sprint {
            self.tuning.sprint_speed
        } else {
            self.tuning.walk_speed
        };
        let target = Quat::from_rotation_y(direction.x.atan2(direction.z));
        self.state.orientation = self
            .state
            .orientation
            .slerp(target, self.tuning.turn_blend)
            .normalize();
        self.state.position += direction * speed;
    }

    /// Cross-fades on a locomotion change and paces footstep cues against the
    /// session clock.
    pub(crate) fn apply_animation(
        &mut self,
        locomotion: Locomotion,
        now: Duration,
        world: &mut SceneWorld,
    ) {
        if locomotion != self.locomotion {
            self.locomotion = locomotion;
            self.last_footstep_at = None;
            if let Some(object) = self.object.and_then(|id| world.find_object_mut(id)) {
                if let Err(error) = object
                    .animation
                    .cross_fade(locomotion.clip(), self.tuning.animation_fade_seconds)
                {
                    warn!(error = %error, "avatar_cross_fade_failed");
                }
            }
        }

        let interval = match locomotion {
            Locomotion::Idle => return,
            Locomotion::Walk => self.tuning.walk_footstep_interval_seconds,
            Locomotion::Run => self.tuning.run_footstep_interval_seconds,
        };
        let due = self.last_footstep_at.map_or(true, |last| {
            now.saturating_sub(last) >= Duration::from_secs_f32(interval)
        });
        if due {
            self.last_footstep_at = Some(now);
            world.emit_cue(CUE_FOOTSTEP);
        }
    }

    pub(crate) fn enter_vehicle(&mut self, vehicle: &VehicleController, world: &mut SceneWorld) -> bool {
        if self.state.in_vehicle || self.state.transitioning || self.vehicle.is_none() {
            return false;
        }
        self.state.transitioning = true;
        self.state.in_vehicle = true;
        self.mirror_vehicle(vehicle.position(), vehicle.yaw());
        world.emit_cue(CUE_VEHICLE_ENTER);
        info!(vehicle = vehicle.object().0, "vehicle_entered");
        true
    }

    /// The vehicle returns to its origin pose and the avatar steps out ahead
    /// of it.
    pub(crate) fn exit_vehicle(
        &mut self,
        vehicle: &mut VehicleController,
        world: &mut SceneWorld,
    ) -> bool {
        if !self.state.in_vehicle || self.state.transitioning || self.vehicle.is_none() {
            return false;
        }
        self.state.transitioning = true;
        self.state.in_vehicle = false;
        vehicle.restore_origin();
        let yaw = vehicle.yaw();
        self.state.position = vehicle.position() + vehicle.forward() * self.tuning.vehicle_exit_offset;
        self.state.orientation = Quat::from_rotation_y(yaw);
        world.emit_cue(CUE_VEHICLE_EXIT);
        info!(vehicle = vehicle.object().0, "vehicle_exited");
        true
    }

    pub(crate) fn mirror_vehicle(&mut self, position: Vec3, yaw: f32) {
        self.state.position = position;
        self.state.orientation = Quat::from_rotation_y(yaw);
    }

    pub(crate) fn apply_portal_pull(&mut self, position: Vec3, scale: Vec3) {
        self.state.position = position;
        self.state.scale = scale;
    }

    /// Segment change: pose and scale reset, vehicle detached.
    pub(crate) fn reset_to(&mut self, position: Vec3, yaw: f32) {
        self.state = AvatarState::at(position, yaw);
        self.vehicle = None;
    }

    pub(crate) fn end_frame(&mut self) {
        self.state.transitioning = false;
    }

    pub(crate) fn sync_to_world(&self, world: &mut SceneWorld) {
        let Some(object) = self.object.and_then(|id| world.find_object_mut(id)) else {
            return;
        };
        object.transform = Transform {
            position: self.state.position,
            rotation: self.state.orientation,
            scale: self.state.scale,
        };
        object.visible = !self.state.in_vehicle;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use folio_engine::{RenderableDesc, RenderableKind, VehicleDef, WorldSegment};

    use super::super::tuning::VehicleTuning;
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn controller() -> AvatarController {
        AvatarController::new(AvatarTuning::default(), Vec3::ZERO, 0.0)
    }

    fn only(set: fn(&mut ControlVector)) -> ControlVector {
        let mut control = ControlVector::default();
        set(&mut control);
        control
    }

    fn angle_delta(a: f32, b: f32) -> f32 {
        let delta = (a - b).rem_euclid(2.0 * PI);
        delta.min(2.0 * PI - delta)
    }

    #[test]
    fn single_direction_converges_to_cardinal_facing() {
        let cases: [(fn(&mut ControlVector), f32); 4] = [
            (|c| c.move_forward = true, 0.0),
            (|c| c.move_left = true, FRAC_PI_2),
            (|c| c.move_right = true, -FRAC_PI_2),
            (|c| c.move_backward = true, PI),
        ];
        for (set, expected) in cases {
            let mut avatar = AvatarController::new(AvatarTuning::default(), Vec3::ZERO, 0.3);
            let control = only(set);
            for _ in 0..120 {
                avatar.update_movement(&control, DT);
            }
            assert!(
                angle_delta(avatar.state().yaw(), expected) < 1e-3,
                "expected {expected}, got {}",
                avatar.state().yaw()
            );
        }
    }

    #[test]
    fn sprint_covers_at_least_walk_distance() {
        let mut walker = controller();
        let mut sprinter = controller();
        let walk = only(|c| c.move_forward = true);
        let sprint = ControlVector {
            sprint: true,
            ..walk
        };
        for _ in 0..30 {
            walker.update_movement(&walk, DT);
            sprinter.update_movement(&sprint, DT);
            assert!(sprinter.position().length() >= walker.position().length());
        }
        assert!((walker.position().z - 3.0).abs() < 1e-4);
        assert!((sprinter.position().z - 9.0).abs() < 1e-3);
    }

    #[test]
    fn identical_inputs_reproduce_identical_trajectories() {
        let inputs = [
            only(|c| c.move_forward = true),
            ControlVector {
                move_forward: true,
                move_left: true,
                sprint: true,
                ..ControlVector::default()
            },
            ControlVector::default(),
            only(|c| c.move_right = true),
        ];
        let run = || {
            let mut avatar = controller();
            let mut trace = Vec::new();
            for step in 0..80 {
                avatar.update_movement(&inputs[step % inputs.len()], DT);
                trace.push(*avatar.state());
            }
            trace
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn movement_is_skipped_in_vehicle() {
        let mut avatar = controller();
        avatar.state.in_vehicle = true;
        avatar.update_movement(&only(|c| c.move_forward = true), DT);
        assert_eq!(avatar.position(), Vec3::ZERO);
    }

    #[test]
    fn animation_selection_follows_mode_and_sprint() {
        let walk = only(|c| c.move_left = true);
        let run = ControlVector {
            sprint: true,
            ..walk
        };
        assert_eq!(select_animation(&walk, false), Locomotion::Walk);
        assert_eq!(select_animation(&run, false), Locomotion::Run);
        assert_eq!(select_animation(&run, true), Locomotion::Idle);
        assert_eq!(
            select_animation(&only(|c| c.sprint = true), false),
            Locomotion::Idle
        );
    }

    #[test]
    fn footsteps_fire_at_most_once_per_interval() {
        let mut world = SceneWorld::default();
        let id = world.spawn_animated(
            Transform::default(),
            RenderableDesc::new(RenderableKind::Avatar, "avatar"),
            avatar_mixer(),
        );
        world.apply_pending();
        let mut avatar = controller();
        avatar.attach_object(id);

        let mut now = Duration::ZERO;
        for _ in 0..60 {
            avatar.apply_animation(Locomotion::Walk, now, &mut world);
            now += Duration::from_millis(20);
        }
        // 1.2 s of walking at a 0.6 s cadence.
        let steps = world
            .drain_cues()
            .into_iter()
            .filter(|cue| cue == CUE_FOOTSTEP)
            .count();
        assert_eq!(steps, 2);

        let object = world.find_object(id).expect("avatar");
        assert_eq!(object.animation.active_clip(), Some("walk"));

        avatar.apply_animation(Locomotion::Idle, now, &mut world);
        assert!(world.drain_cues().is_empty());
    }

    #[test]
    fn register_vehicle_is_one_time() {
        let mut avatar = controller();
        assert!(avatar.register_vehicle(SceneObjectId(7)));
        assert!(!avatar.register_vehicle(SceneObjectId(8)));
        assert_eq!(avatar.registered_vehicle(), Some(SceneObjectId(7)));

        avatar.clear_vehicle();
        assert!(avatar.register_vehicle(SceneObjectId(8)));
    }

    #[test]
    fn reset_restores_scale_and_detaches_vehicle() {
        let mut avatar = controller();
        avatar.register_vehicle(SceneObjectId(1));
        avatar.apply_portal_pull(Vec3::new(1.0, 0.0, 1.0), Vec3::splat(0.01));
        avatar.reset_to(Vec3::new(0.0, 0.0, 5.0), PI);

        assert_eq!(avatar.state().scale, Vec3::ONE);
        assert_eq!(avatar.position(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(avatar.registered_vehicle(), None);
    }

    fn with_vehicle() -> (AvatarController, VehicleController, SceneWorld) {
        let mut world = SceneWorld::default();
        let def = VehicleDef {
            def_name: "buggy".to_string(),
            segment: WorldSegment::Hub,
            position: Vec3::new(3.0, 0.0, 4.0),
            yaw: 0.0,
        };
        let vehicle = VehicleController::spawn(VehicleTuning::default(), &def, &mut world);
        world.apply_pending();
        let mut avatar = controller();
        avatar.register_vehicle(vehicle.object());
        (avatar, vehicle, world)
    }

    fn count_cue(cues: &[String], cue: &str) -> usize {
        cues.iter().filter(|c| *c == cue).count()
    }

    #[test]
    fn second_enter_in_same_frame_is_rejected() {
        let (mut avatar, vehicle, mut world) = with_vehicle();
        assert!(avatar.enter_vehicle(&vehicle, &mut world));
        let pose = *avatar.state();

        assert!(!avatar.enter_vehicle(&vehicle, &mut world));
        assert_eq!(avatar.state(), &pose);
        assert!(avatar.state().transitioning);
        assert_eq!(count_cue(&world.drain_cues(), CUE_VEHICLE_ENTER), 1);
    }

    #[test]
    fn enter_while_seated_is_rejected_after_frame_ends() {
        let (mut avatar, vehicle, mut world) = with_vehicle();
        assert!(avatar.enter_vehicle(&vehicle, &mut world));
        avatar.end_frame();
        let pose = *avatar.state();

        assert!(!avatar.enter_vehicle(&vehicle, &mut world));
        assert_eq!(avatar.state(), &pose);
        assert!(avatar.in_vehicle());
        assert_eq!(count_cue(&world.drain_cues(), CUE_VEHICLE_ENTER), 1);
    }

    #[test]
    fn exit_in_the_frame_of_entry_is_blocked() {
        let (mut avatar, mut vehicle, mut world) = with_vehicle();
        assert!(avatar.enter_vehicle(&vehicle, &mut world));
        let pose = *avatar.state();

        assert!(!avatar.exit_vehicle(&mut vehicle, &mut world));
        assert_eq!(avatar.state(), &pose);
        assert!(avatar.in_vehicle());
        let cues = world.drain_cues();
        assert_eq!(count_cue(&cues, CUE_VEHICLE_ENTER), 1);
        assert_eq!(count_cue(&cues, CUE_VEHICLE_EXIT), 0);

        avatar.end_frame();
        assert!(avatar.exit_vehicle(&mut vehicle, &mut world));
        assert!(!avatar.in_vehicle());
    }
}
