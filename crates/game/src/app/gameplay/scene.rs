use folio_engine::{
    InputSnapshot, RenderableDesc, RenderableKind, Scene, SceneWorld, Transform, Vec3,
    WorldDefDatabase, WorldSegment,
};
use serde::Serialize;
use tracing::{info, warn};

use super::avatar::{avatar_mixer, select_animation, AvatarController, Locomotion};
use super::camera::CameraFollowController;
use super::control::{ControlVector, PressEdge};
use super::interactable::ActionContext;
use super::layout::{arrival_for, build_segment, SegmentLayout};
use super::tuning::Tuning;
use super::vehicle::VehicleController;
use super::zones::{horizontal_distance, ArrivalPose, ZoneStep, ZoneTransitionStateMachine};
use super::{CUE_PORTAL_ARRIVE, CUE_PORTAL_ENTER};

/// Coordinating owner: builds the avatar and the segment's vehicle, wires
/// them together and advances every controller in dependency order.
pub(crate) struct ExplorationScene {
    pub(super) tuning: Tuning,
    pub(super) defs: Option<WorldDefDatabase>,
    pub(super) avatar: AvatarController,
    pub(super) vehicle: Option<VehicleController>,
    pub(super) zones: Option<ZoneTransitionStateMachine>,
    pub(super) camera: CameraFollowController,
    pub(super) layout: Option<SegmentLayout>,
    interact_edge: PressEdge,
    diagnostic_count: u64,
}

#[derive(Debug, Serialize)]
struct DiagnosticSnapshot<'a> {
    sequence: u64,
    world_state: String,
    session_seconds: f32,
    avatar: AvatarDiagnostic,
    vehicle: Option<VehicleDiagnostic>,
    camera: [Vec3; 2],
    interactables: Vec<InteractableDiagnostic<'a>>,
    recent_toasts: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct AvatarDiagnostic {
    position: Vec3,
    yaw: f32,
    scale: f32,
    in_vehicle: bool,
    vehicle_registered: bool,
    locomotion: &'static str,
}

#[derive(Debug, Serialize)]
struct VehicleDiagnostic {
    position: Vec3,
    yaw: f32,
    current_speed: f32,
    target_speed: f32,
    steering_angle: f32,
}

#[derive(Debug, Serialize)]
struct InteractableDiagnostic<'a> {
    name: &'a str,
    scale: f32,
    visible: bool,
}

impl ExplorationScene {
    pub(crate) fn new(tuning: Tuning) -> Self {
        Self {
            avatar: AvatarController::new(tuning.avatar, Vec3::ZERO, 0.0),
            camera: CameraFollowController::new(tuning.camera),
            tuning,
            defs: None,
            vehicle: None,
            zones: None,
            layout: None,
            interact_edge: PressEdge::default(),
            diagnostic_count: 0,
        }
    }

    pub(crate) fn segment(&self) -> Option<WorldSegment> {
        self.zones.as_ref().map(|zones| zones.state().segment())
    }

    fn build_active_segment(&mut self, segment: WorldSegment, world: &mut SceneWorld) {
        let Some(defs) = self.defs.as_ref() else {
            return;
        };
        let built = build_segment(defs, segment, world);
        if let Some(zones) = self.zones.as_mut() {
            zones.set_anchors(built.anchors);
        }
        self.vehicle = built.vehicle.map(|def| {
            let vehicle = VehicleController::spawn(self.tuning.vehicle, &def, world);
            self.avatar.register_vehicle(vehicle.object());
            vehicle
        });
        self.layout = Some(built.layout);
    }

    fn teardown_segment(&mut self, world: &mut SceneWorld) {
        if let Some(layout) = self.layout.take() {
            layout.despawn(world);
        }
        if let Some(vehicle) = self.vehicle.take() {
            vehicle.despawn(world);
        }
        self.avatar.clear_vehicle();
    }

    fn enter_segment(
        &mut self,
        from: WorldSegment,
        to: WorldSegment,
        arrival: ArrivalPose,
        world: &mut SceneWorld,
    ) {
        self.teardown_segment(world);
        self.avatar.reset_to(arrival.position, arrival.yaw);
        self.build_active_segment(to, world);
        world.emit_cue(CUE_PORTAL_ARRIVE);
        info!(from = %from, to = %to, "segment_entered");
    }

    fn handle_interact(&mut self, world: &mut SceneWorld) {
        let Some(vehicle) = self.vehicle.as_mut() else {
            return;
        };
        if self.avatar.in_vehicle() {
            self.avatar.exit_vehicle(vehicle, world);
        } else if horizontal_distance(self.avatar.position(), vehicle.position())
            <= self.tuning.avatar.vehicle_enter_radius
        {
            self.avatar.enter_vehicle(vehicle, world);
        }
    }

    fn apply_zone_step(&mut self, step: ZoneStep, world: &mut SceneWorld) {
        match step {
            ZoneStep::Steady => {}
            ZoneStep::PortalEntered { from, to } => {
                world.emit_cue(CUE_PORTAL_ENTER);
                info!(from = %from, to = %to, "portal_transit_started");
            }
            ZoneStep::Shrinking { position, scale } => {
                self.avatar.apply_portal_pull(position, scale);
            }
            ZoneStep::Arrived { from, to, arrival } => {
                self.enter_segment(from, to, arrival, world);
            }
        }
    }

    fn update_interactables(&mut self, confirm: bool, world: &mut SceneWorld) {
        let Some(layout) = self.layout.as_mut() else {
            return;
        };
        let avatar_position = self.avatar.position();
        let mut ctx = ActionContext {
            world: &mut *world,
            warp_request: None,
        };
        for slot in &mut layout.interactables {
            if slot.interactable.update(avatar_position, confirm, &mut ctx) {
                info!(interactable = %slot.interactable.name, "interactable_fired");
            }
        }
        let warp_request = ctx.warp_request;
        layout.sync_to_world(world);

        let Some(target) = warp_request else {
            return;
        };
        let (Some(zones), Some(defs)) = (self.zones.as_mut(), self.defs.as_ref()) else {
            return;
        };
        let step = zones.warp(target, arrival_for(defs, target));
        self.apply_zone_step(step, world);
    }

    fn log_diagnostic_snapshot(&mut self, world: &SceneWorld) {
        self.diagnostic_count += 1;
        let state = self.avatar.state();
        let snapshot = DiagnosticSnapshot {
            sequence: self.diagnostic_count,
            world_state: self
                .zones
                .as_ref()
                .map(|zones| zones.state().label())
                .unwrap_or_else(|| "unloaded".to_string()),
            session_seconds: world.session_elapsed().as_secs_f32(),
            avatar: AvatarDiagnostic {
                position: state.position,
                yaw: state.yaw(),
                scale: state.scale.x,
                in_vehicle: state.in_vehicle,
                vehicle_registered: self.avatar.registered_vehicle().is_some(),
                locomotion: self.avatar.locomotion().clip(),
            },
            vehicle: self.vehicle.as_ref().map(|vehicle| {
                let vehicle_state = vehicle.state();
                VehicleDiagnostic {
                    position: vehicle_state.position,
                    yaw: vehicle_state.yaw,
                    current_speed: vehicle_state.current_speed,
                    target_speed: vehicle_state.target_speed,
                    steering_angle: vehicle_state.steering_angle,
                }
            }),
            camera: [world.camera().position, world.camera().look_at],
            interactables: self
                .layout
                .iter()
                .flat_map(|layout| layout.interactables.iter())
                .map(|slot| InteractableDiagnostic {
                    name: &slot.interactable.name,
                    scale: slot.interactable.scale(),
                    visible: slot.interactable.is_visible(),
                })
                .collect(),
            recent_toasts: world
                .toasts()
                .iter()
                .map(|toast| toast.message.as_str())
                .collect(),
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!(snapshot = %json, "diagnostic_snapshot"),
            Err(error) => warn!(error = %error, "diagnostic_snapshot_failed"),
        }
    }
}

impl Scene for ExplorationScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let Some(defs) = world.world_defs().cloned() else {
            warn!("world_defs_missing");
            return;
        };
        let Some(first) = defs.first_segment() else {
            warn!("world_defs_empty");
            return;
        };
        let spawn = arrival_for(&defs, first);
        self.defs = Some(defs);
        self.zones = Some(ZoneTransitionStateMachine::new(self.tuning.portal, first));

        self.avatar = AvatarController::new(self.tuning.avatar, spawn.position, spawn.yaw);
        let avatar_object = world.spawn_animated(
            Transform::at(spawn.position).with_yaw(spawn.yaw),
            RenderableDesc::new(RenderableKind::Avatar, "avatar"),
            avatar_mixer(),
        );
        self.avatar.attach_object(avatar_object);
        self.build_active_segment(first, world);
        self.camera.snap(spawn.position, world.camera_mut());
        info!(segment = %first, "exploration_scene_loaded");
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        let control = ControlVector::from_input(input);
        if input.diagnostic_pressed() {
            self.log_diagnostic_snapshot(world);
        }
        world.clear_debug_shapes();

        let Some(transient) = self.zones.as_ref().map(|zones| zones.state().is_transient()) else {
            return;
        };

        let interact_pressed = self.interact_edge.update(control.interact);
        if interact_pressed && !transient {
            self.handle_interact(world);
        }

        if !transient {
            self.avatar.update_movement(&control, fixed_dt_seconds);
            if self.avatar.in_vehicle() {
                if let Some(vehicle) = self.vehicle.as_mut() {
                    vehicle.update(&control);
                    self.avatar.mirror_vehicle(vehicle.position(), vehicle.yaw());
                }
            }
        }
        let locomotion = if transient {
            Locomotion::Idle
        } else {
            select_animation(&control, self.avatar.in_vehicle())
        };
        self.avatar
            .apply_animation(locomotion, world.session_elapsed(), world);

        let state = self.avatar.state();
        let step = match self.zones.as_mut() {
            Some(zones) => zones.update(fixed_dt_seconds, state.position, state.scale),
            None => ZoneStep::Steady,
        };
        self.apply_zone_step(step, world);

        self.avatar.sync_to_world(world);
        if let Some(vehicle) = self.vehicle.as_ref() {
            vehicle.sync_to_world(world);
        }

        let target = self
            .avatar
            .object()
            .and_then(|id| world.transform(id))
            .map(|transform| transform.position);
        let in_transition = self
            .zones
            .as_ref()
            .is_some_and(|zones| zones.state().is_transient());
        self.camera
            .update(target, in_transition, fixed_dt_seconds, world.camera_mut());

        // Interactables keep animating in transit but cannot fire.
        self.update_interactables(control.confirm && !in_transition, world);

        if let (Some(layout), Some(zones)) = (self.layout.as_ref(), self.zones.as_ref()) {
            layout.push_debug_shapes(zones.anchors(), world);
        }
        self.avatar.end_frame();
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        self.teardown_segment(world);
        if let Some(object) = self.avatar.object() {
            world.despawn(object);
        }
        info!("exploration_scene_unloaded");
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let segment = self.segment()?;
        let label = self
            .defs
            .as_ref()
            .and_then(|defs| defs.segment(segment))
            .map(|def| def.label.as_str())
            .unwrap_or(segment.token());
        Some(format!("Folio | {label}"))
    }

    fn debug_lines(&self, _world: &SceneWorld) -> Vec<String> {
        let Some(zones) = self.zones.as_ref() else {
            return vec!["world: unloaded".to_string()];
        };
        let state = self.avatar.state();
        let mut lines = vec![
            format!("world: {}", zones.state().label()),
            format!(
                "avatar: ({:.1}, {:.1}) yaw {:.2} {}",
                state.position.x,
                state.position.z,
                state.yaw(),
                if state.in_vehicle { "driving" } else { self.avatar.locomotion().clip() }
            ),
        ];
        if let Some(vehicle) = self.vehicle.as_ref() {
            let vehicle_state = vehicle.state();
            lines.push(format!(
                "vehicle: speed {:.3} steer {:.3}",
                vehicle_state.current_speed, vehicle_state.steering_angle
            ));
        }
        lines
    }
}
