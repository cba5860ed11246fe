use folio_engine::{InputAction, InputSnapshot, Vec3};

/// Held-key state sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ControlVector {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub sprint: bool,
    pub interact: bool,
    pub confirm: bool,
}

impl ControlVector {
    pub(crate) fn from_input(input: &InputSnapshot) -> Self {
        Self {
            move_forward: input.is_down(InputAction::MoveForward),
            move_backward: input.is_down(InputAction::MoveBackward),
            move_left: input.is_down(InputAction::MoveLeft),
            move_right: input.is_down(InputAction::MoveRight),
            sprint: input.is_down(InputAction::Sprint),
            interact: input.is_down(InputAction::Interact),
            confirm: input.is_down(InputAction::Confirm),
        }
    }

    pub(crate) fn has_direction(&self) -> bool {
        self.move_forward || self.move_backward || self.move_left || self.move_right
    }

    /// Normalized ground-plane direction; forward is +Z and left is +X.
    /// Opposing keys cancel.
    pub(crate) fn direction(&self) -> Vec3 {
        let mut direction = Vec3::ZERO;
        if self.move_forward {
            direction.z += 1.0;
        }
        if self.move_backward {
            direction.z -= 1.0;
        }
        if self.move_left {
            direction.x += 1.0;
        }
        if self.move_right {
            direction.x -= 1.0;
        }
        direction.normalize_or_zero()
    }
}

/// Rising-edge detector. Each consumer owns one.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PressEdge {
    previous: bool,
}

impl PressEdge {
    pub(crate) fn update(&mut self, raw: bool) -> bool {
        let pressed = raw && !self.previous;
        self.previous = raw;
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_direction_is_normalized() {
        let control = ControlVector {
            move_forward: true,
            move_left: true,
            ..ControlVector::default()
        };
        let direction = control.direction();
        assert!((direction.length() - 1.0).abs() < 1e-6);
        assert!(direction.x > 0.0 && direction.z > 0.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let control = ControlVector {
            move_forward: true,
            move_backward: true,
            ..ControlVector::default()
        };
        assert!(control.has_direction());
        assert_eq!(control.direction(), Vec3::ZERO);
    }

    #[test]
    fn press_edge_fires_once_per_press() {
        let mut edge = PressEdge::default();
        let fired: Vec<bool> = [false, true, true, true, false, true]
            .into_iter()
            .map(|raw| edge.update(raw))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn snapshot_maps_to_control_flags() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveRight, true)
            .with_action_down(InputAction::Sprint, true)
            .with_action_down(InputAction::Confirm, true);
        let control = ControlVector::from_input(&input);
        assert!(control.move_right && control.sprint && control.confirm);
        assert!(!control.move_left && !control.interact);
    }
}
