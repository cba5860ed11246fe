use folio_engine::{
    Quat, RenderableDesc, RenderableKind, SceneObjectId, SceneWorld, Transform, Vec3, VehicleDef,
};

use super::control::ControlVector;
use super::tuning::VehicleTuning;

const WHEEL_SCALE: f32 = 0.35;
/// Local wheel mounts: front-left, front-right, rear-left, rear-right.
const WHEEL_OFFSETS: [Vec3; 4] = [
    Vec3::new(0.7, 0.0, 1.0),
    Vec3::new(-0.7, 0.0, 1.0),
    Vec3::new(0.7, 0.0, -1.0),
    Vec3::new(-0.7, 0.0, -1.0),
];
const STEER_NEUTRAL: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct VehicleState {
    pub position: Vec3,
    pub yaw: f32,
    pub current_speed: f32,
    pub target_speed: f32,
    pub steering_angle: f32,
    pub front_wheel_roll: f32,
    pub rear_wheel_roll: f32,
    pub front_wheel_yaw: f32,
}

impl VehicleState {
    fn parked(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            current_speed: 0.0,
            target_speed: 0.0,
            steering_angle: 0.0,
            front_wheel_roll: 0.0,
            rear_wheel_roll: 0.0,
            front_wheel_yaw: 0.0,
        }
    }
}

/// Kinematic car: speed and steering ease toward targets by fixed per-frame
/// steps.
#[derive(Debug)]
pub(crate) struct VehicleController {
    tuning: VehicleTuning,
    object: SceneObjectId,
    wheels: [SceneObjectId; 4],
    origin: (Vec3, f32),
    state: VehicleState,
}

impl VehicleController {
    pub(crate) fn spawn(tuning: VehicleTuning, def: &VehicleDef, world: &mut SceneWorld) -> Self {
        let object = world.spawn(
            Transform::at(def.position).with_yaw(def.yaw),
            RenderableDesc::new(RenderableKind::Vehicle, def.def_name.clone()),
        );
        let wheels = WHEEL_OFFSETS.map(|_| {
            world.spawn(
                Transform {
                    scale: Vec3::splat(WHEEL_SCALE),
                    ..Transform::at(def.position)
                },
                RenderableDesc::new(RenderableKind::Wheel, format!("{}.wheel", def.def_name)),
            )
        });
        Self {
            tuning,
            object,
            wheels,
            origin: (def.position, def.yaw),
            state: VehicleState::parked(def.position, def.yaw),
        }
    }

    pub(crate) fn object(&self) -> SceneObjectId {
        self.object
    }

    pub(crate) fn state(&self) -> &VehicleState {
        &self.state
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.state.position
    }

    pub(crate) fn yaw(&self) -> f32 {
        self.state.yaw
    }

    pub(crate) fn forward(&self) -> Vec3 {
        forward(self.state.yaw)
    }

    pub(crate) fn restore_origin(&mut self) {
        let (position, yaw) = self.origin;
        self.state = VehicleState::parked(position, yaw);
    }

    pub(crate) fn update(&mut self, control: &ControlVector) {
        let tuning = &self.tuning;
        let state = &mut self.state;

        let max_speed = if control.sprint {
            tuning.sprint_max_speed
        } else {
            tuning.max_speed
        };
        state.target_speed = match (control.move_forward, control.move_backward) {
            (true, false) => max_speed,
            (false, true) => -max_speed,
            _ => 0.0,
        };
        state.current_speed = approach_speed(
            state.current_speed,
            state.target_speed,
            tuning.acceleration,
            tuning.deceleration,
        );

        state.steering_angle = match (control.move_left, control.move_right) {
            (true, false) => (state.steering_angle - tuning.steer_step).max(-tuning.max_steer),
            (false, true) => (state.steering_angle + tuning.steer_step).min(tuning.max_steer),
            _ => move_toward(state.steering_angle, 0.0, tuning.steer_relax),
        };

        let moving = state.current_speed.abs() > tuning.min_moving_speed;
        if moving {
            state.yaw += -state.steering_angle * state.current_speed * tuning.turn_constant;
        }
        state.position += forward(state.yaw) * state.current_speed;

        state.front_wheel_yaw = -state.steering_angle;
        let roll = state.current_speed / tuning.wheel_radius;
        if moving && state.steering_angle.abs() < STEER_NEUTRAL {
            state.front_wheel_roll += roll;
        }
        state.rear_wheel_roll += roll.abs();
    }

    pub(crate) fn sync_to_world(&self, world: &mut SceneWorld) {
        let body = Quat::from_rotation_y(self.state.yaw);
        if let Some(transform) = world.transform_mut(self.object) {
            transform.position = self.state.position;
            transform.rotation = body;
        }
        for (index, (&wheel, offset)) in self.wheels.iter().zip(WHEEL_OFFSETS).enumerate() {
            let Some(transform) = world.transform_mut(wheel) else {
                continue;
            };
            transform.position = self.state.position + body * offset;
            // Roll spins each wheel about its axle after the yaw is applied.
            transform.rotation = if index < 2 {
                Quat::from_rotation_y(self.state.yaw + self.state.front_wheel_yaw)
                    * Quat::from_rotation_x(self.state.front_wheel_roll)
            } else {
                body * Quat::from_rotation_x(self.state.rear_wheel_roll)
            };
        }
    }

    pub(crate) fn despawn(&self, world: &mut SceneWorld) {
        world.despawn(self.object);
        for wheel in self.wheels {
            world.despawn(wheel);
        }
    }
}

pub(crate) fn forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Speeding up uses `acceleration`; slowing down or reversing uses
/// `deceleration`. Never overshoots `target`.
pub(crate) fn approach_speed(current: f32, target: f32, acceleration: f32, deceleration: f32) -> f32 {
    let speeding_up = target.abs() > current.abs() && current * target >= 0.0;
    let step = if speeding_up { acceleration } else { deceleration };
    move_toward(current, target, step)
}

fn move_toward(current: f32, target: f32, step: f32) -> f32 {
    if (target - current).abs() <= step {
        target
    } else {
        current + step * (target - current).signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> VehicleDef {
        VehicleDef {
            def_name: "buggy".to_string(),
            segment: folio_engine::WorldSegment::Hub,
            position: Vec3::new(2.0, 0.0, 3.0),
            yaw: 0.0,
        }
    }

    fn spawned() -> (VehicleController, SceneWorld) {
        let mut world = SceneWorld::default();
        let vehicle = VehicleController::spawn(VehicleTuning::default(), &def(), &mut world);
        world.apply_pending();
        (vehicle, world)
    }

    fn forward_only() -> ControlVector {
        ControlVector {
            move_forward: true,
            ..ControlVector::default()
        }
    }

    #[test]
    fn speed_never_overshoots_and_takes_at_least_54_frames() {
        let (mut vehicle, _world) = spawned();
        let mut frames = 0;
        while vehicle.state().current_speed < vehicle.state().target_speed || frames == 0 {
            vehicle.update(&forward_only());
            frames += 1;
            assert!(vehicle.state().current_speed <= vehicle.state().target_speed);
            assert!(frames < 1_000);
        }
        assert!(frames >= 54, "reached max speed after {frames} frames");
        assert!((vehicle.state().current_speed - 0.8).abs() < 1e-6);
    }

    #[test]
    fn release_decelerates_at_slower_rate() {
        let (mut vehicle, _world) = spawned();
        for _ in 0..100 {
            vehicle.update(&forward_only());
        }
        vehicle.update(&ControlVector::default());
        assert!((vehicle.state().current_speed - 0.79).abs() < 1e-5);
        assert_eq!(vehicle.state().target_speed, 0.0);
    }

    #[test]
    fn reversing_from_forward_uses_deceleration() {
        assert!((approach_speed(0.5, -0.8, 0.015, 0.01) - 0.49).abs() < 1e-6);
        assert!((approach_speed(0.0, -0.8, 0.015, 0.01) + 0.015).abs() < 1e-6);
        assert_eq!(approach_speed(0.005, 0.0, 0.015, 0.01), 0.0);
    }

    #[test]
    fn steering_is_bounded_and_relaxes() {
        let (mut vehicle, _world) = spawned();
        let left = ControlVector {
            move_left: true,
            ..ControlVector::default()
        };
        for _ in 0..30 {
            vehicle.update(&left);
        }
        assert!((vehicle.state().steering_angle + 0.2).abs() < 1e-6);

        vehicle.update(&ControlVector::default());
        assert!((vehicle.state().steering_angle + 0.195).abs() < 1e-6);
    }

    #[test]
    fn steering_turns_only_while_moving() {
        let (mut vehicle, _world) = spawned();
        let left = ControlVector {
            move_left: true,
            ..ControlVector::default()
        };
        for _ in 0..10 {
            vehicle.update(&left);
        }
        assert_eq!(vehicle.yaw(), 0.0);
        assert_eq!(vehicle.state().front_wheel_roll, 0.0);

        let left_forward = ControlVector {
            move_forward: true,
            ..left
        };
        for _ in 0..20 {
            vehicle.update(&left_forward);
        }
        // Left steer turns the heading toward +X.
        assert!(vehicle.yaw() > 0.0);
        assert!(vehicle.state().front_wheel_yaw > 0.0);
        assert_eq!(vehicle.state().front_wheel_roll, 0.0);
        assert!(vehicle.state().rear_wheel_roll > 0.0);
    }

    #[test]
    fn front_wheels_roll_when_straight() {
        let (mut vehicle, _world) = spawned();
        for _ in 0..10 {
            vehicle.update(&forward_only());
        }
        assert!(vehicle.state().front_wheel_roll > 0.0);
        assert!(vehicle.position().z > 3.0);
        assert_eq!(vehicle.yaw(), 0.0);
    }

    #[test]
    fn restore_origin_parks_vehicle() {
        let (mut vehicle, mut world) = spawned();
        for _ in 0..40 {
            vehicle.update(&forward_only());
        }
        vehicle.restore_origin();
        vehicle.sync_to_world(&mut world);

        assert_eq!(vehicle.state(), &VehicleState::parked(Vec3::new(2.0, 0.0, 3.0), 0.0));
        let body = world.transform(vehicle.object()).expect("vehicle");
        assert_eq!(body.position, Vec3::new(2.0, 0.0, 3.0));
    }

    #[test]
    fn wheels_follow_body_pose() {
        let (vehicle, mut world) = spawned();
        vehicle.sync_to_world(&mut world);
        let front_left = world.transform(vehicle.wheels[0]).expect("wheel");
        assert!((front_left.position - Vec3::new(2.7, 0.0, 4.0)).length() < 1e-5);
        assert_eq!(world.object_count(), 5);

        vehicle.despawn(&mut world);
        world.apply_pending();
        assert_eq!(world.object_count(), 0);
    }

    #[test]
    fn driving_spins_wheels_relative_to_body() {
        let (mut vehicle, mut world) = spawned();
        for _ in 0..60 {
            vehicle.update(&forward_only());
        }
        vehicle.sync_to_world(&mut world);

        let body = world.transform(vehicle.object()).expect("vehicle").rotation;
        let front = world.transform(vehicle.wheels[0]).expect("front wheel").rotation;
        let rear = world.transform(vehicle.wheels[2]).expect("rear wheel").rotation;
        assert!(!rear.abs_diff_eq(body, 1e-4), "rear wheel did not spin");
        assert!(!front.abs_diff_eq(body, 1e-4), "front wheel did not spin");
        assert!(rear.abs_diff_eq(
            body * Quat::from_rotation_x(vehicle.state().rear_wheel_roll),
            1e-5
        ));
    }
}
