use folio_engine::{PortalTransit, Vec3, WorldSegment};
use tracing::{debug, info};

use super::tuning::PortalTuning;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ArrivalPose {
    pub position: Vec3,
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PortalAnchor {
    pub def_name: String,
    pub segment: WorldSegment,
    pub destination: WorldSegment,
    pub position: Vec3,
    pub radius: f32,
    pub arrival: ArrivalPose,
    pub transit: PortalTransit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WorldState {
    Playing(WorldSegment),
    EnteringPortal {
        from: WorldSegment,
        to: WorldSegment,
        center: Vec3,
        arrival: ArrivalPose,
    },
}

impl WorldState {
    pub(crate) fn segment(&self) -> WorldSegment {
        match *self {
            WorldState::Playing(segment) => segment,
            WorldState::EnteringPortal { from, .. } => from,
        }
    }

    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, WorldState::EnteringPortal { .. })
    }

    pub(crate) fn label(&self) -> String {
        match self {
            WorldState::Playing(segment) => format!("playing:{segment}"),
            WorldState::EnteringPortal { from, to, .. } => format!("portal:{from}->{to}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ZoneEvent<'a> {
    PortalReached(&'a PortalAnchor),
    ShrinkComplete,
    Warp {
        to: WorldSegment,
        arrival: ArrivalPose,
    },
}

/// Transition table. `None` means the event does not apply in that state.
pub(crate) fn transition(state: &WorldState, event: &ZoneEvent<'_>) -> Option<WorldState> {
    match (*state, *event) {
        (WorldState::Playing(current), ZoneEvent::PortalReached(anchor))
            if anchor.segment == current =>
        {
            Some(match anchor.transit {
                PortalTransit::Animated => WorldState::EnteringPortal {
                    from: current,
                    to: anchor.destination,
                    center: anchor.position,
                    arrival: anchor.arrival,
                },
                PortalTransit::Instant => WorldState::Playing(anchor.destination),
            })
        }
        (WorldState::EnteringPortal { to, .. }, ZoneEvent::ShrinkComplete) => {
            Some(WorldState::Playing(to))
        }
        (WorldState::Playing(current), ZoneEvent::Warp { to, .. }) if to != current => {
            Some(WorldState::Playing(to))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ZoneStep {
    Steady,
    PortalEntered {
        from: WorldSegment,
        to: WorldSegment,
    },
    Shrinking {
        position: Vec3,
        scale: Vec3,
    },
    Arrived {
        from: WorldSegment,
        to: WorldSegment,
        arrival: ArrivalPose,
    },
}

pub(crate) fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Sole writer of `WorldState`. Anchors are checked in declaration order and
/// only while playing.
#[derive(Debug)]
pub(crate) struct ZoneTransitionStateMachine {
    tuning: PortalTuning,
    state: WorldState,
    anchors: Vec<PortalAnchor>,
}

impl ZoneTransitionStateMachine {
    pub(crate) fn new(tuning: PortalTuning, initial: WorldSegment) -> Self {
        Self {
            tuning,
            state: WorldState::Playing(initial),
            anchors: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &WorldState {
        &self.state
    }

    pub(crate) fn anchors(&self) -> &[PortalAnchor] {
        &self.anchors
    }

    pub(crate) fn set_anchors(&mut self, anchors: Vec<PortalAnchor>) {
        self.anchors = anchors;
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, avatar_position: Vec3, avatar_scale: Vec3) -> ZoneStep {
        match self.state {
            WorldState::Playing(current) => {
                let Some(anchor) = self.anchors.iter().find(|anchor| {
                    anchor.segment == current
                        && horizontal_distance(avatar_position, anchor.position) < anchor.radius
                }) else {
                    return ZoneStep::Steady;
                };
                let Some(next) = transition(&self.state, &ZoneEvent::PortalReached(anchor)) else {
                    return ZoneStep::Steady;
                };
                info!(
                    portal = %anchor.def_name,
                    from = %current,
                    to = %anchor.destination,
                    transit = ?anchor.transit,
                    "portal_triggered"
                );
                let arrival = anchor.arrival;
                self.state = next;
                match next {
                    WorldState::Playing(to) => ZoneStep::Arrived {
                        from: current,
                        to,
                        arrival,
                    },
                    WorldState::EnteringPortal { to, .. } => ZoneStep::PortalEntered { from: current, to },
                }
            }
            WorldState::EnteringPortal {
                from,
                to,
                center,
                arrival,
            } => {
                let factor = (self.tuning.shrink_rate * dt_seconds).min(1.0);
                let position = avatar_position.lerp(center, factor);
                let scale = avatar_scale.lerp(Vec3::ZERO, factor);
                if scale.length() >= self.tuning.resolve_scale {
                    return ZoneStep::Shrinking { position, scale };
                }
                match transition(&self.state, &ZoneEvent::ShrinkComplete) {
                    Some(next) => {
                        self.state = next;
                        ZoneStep::Arrived { from, to, arrival }
                    }
                    None => ZoneStep::Shrinking { position, scale },
                }
            }
        }
    }

    /// Instant jump from any playing state. Ignored mid-transit or when already
    /// in `to`.
    pub(crate) fn warp(&mut self, to: WorldSegment, arrival: ArrivalPose) -> ZoneStep {
        let from = self.state.segment();
        match transition(&self.state, &ZoneEvent::Warp { to, arrival }) {
            Some(next) => {
                self.state = next;
                ZoneStep::Arrived { from, to, arrival }
            }
            None => {
                debug!(state = %self.state.label(), to = %to, "warp_ignored");
                ZoneStep::Steady
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(name: &str, position: Vec3, radius: f32, transit: PortalTransit) -> PortalAnchor {
        PortalAnchor {
            def_name: name.to_string(),
            segment: WorldSegment::Hub,
            destination: WorldSegment::Gallery,
            position,
            radius,
            arrival: ArrivalPose {
                position: Vec3::new(0.0, 0.0, 5.0),
                yaw: 0.0,
            },
            transit,
        }
    }

    fn machine(anchors: Vec<PortalAnchor>) -> ZoneTransitionStateMachine {
        let mut machine = ZoneTransitionStateMachine::new(PortalTuning::default(), WorldSegment::Hub);
        machine.set_anchors(anchors);
        machine
    }

    fn example_anchor() -> PortalAnchor {
        anchor(
            "gallery_door",
            Vec3::new(-20.0, 7.5, -20.0),
            2.0,
            PortalTransit::Animated,
        )
    }

    #[test]
    fn proximity_uses_horizontal_distance_only() {
        let mut inside = machine(vec![example_anchor()]);
        let step = inside.update(1.0 / 60.0, Vec3::new(-20.0, 0.0, -18.5), Vec3::ONE);
        assert_eq!(
            step,
            ZoneStep::PortalEntered {
                from: WorldSegment::Hub,
                to: WorldSegment::Gallery
            }
        );
        assert!(inside.state().is_transient());

        let mut outside = machine(vec![example_anchor()]);
        let step = outside.update(1.0 / 60.0, Vec3::new(-20.0, 0.0, -17.0), Vec3::ONE);
        assert_eq!(step, ZoneStep::Steady);
        assert_eq!(outside.state(), &WorldState::Playing(WorldSegment::Hub));
    }

    #[test]
    fn anchor_centre_triggers_and_radius_plus_epsilon_does_not() {
        let mut at_centre = machine(vec![example_anchor()]);
        assert_ne!(
            at_centre.update(0.016, Vec3::new(-20.0, 0.0, -20.0), Vec3::ONE),
            ZoneStep::Steady
        );

        let mut at_edge = machine(vec![example_anchor()]);
        assert_eq!(
            at_edge.update(0.016, Vec3::new(-20.0, 0.0, -17.999), Vec3::ONE),
            ZoneStep::Steady
        );
    }

    #[test]
    fn shrink_strictly_decreases_and_resolves_once() {
        let mut zones = machine(vec![example_anchor()]);
        let mut position = Vec3::new(-20.0, 0.0, -18.5);
        let mut scale = Vec3::ONE;
        zones.update(1.0 / 60.0, position, scale);

        let mut arrivals = 0;
        for _ in 0..1_000 {
            match zones.update(1.0 / 60.0, position, scale) {
                ZoneStep::Shrinking {
                    position: next_position,
                    scale: next_scale,
                } => {
                    assert!(next_scale.length() < scale.length());
                    assert!(next_scale.length() >= 0.05);
                    position = next_position;
                    scale = next_scale;
                }
                ZoneStep::Arrived { to, .. } => {
                    assert_eq!(to, WorldSegment::Gallery);
                    arrivals += 1;
                    break;
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
        assert_eq!(arrivals, 1);
        assert_eq!(zones.state(), &WorldState::Playing(WorldSegment::Gallery));
        // Destination has no anchors of its own here.
        assert_eq!(zones.update(1.0 / 60.0, position, Vec3::ONE), ZoneStep::Steady);
    }

    #[test]
    fn proximity_is_not_evaluated_mid_transit() {
        let mut zones = machine(vec![
            example_anchor(),
            anchor("other", Vec3::new(-20.0, 0.0, -18.0), 5.0, PortalTransit::Instant),
        ]);
        zones.update(0.016, Vec3::new(-20.0, 0.0, -19.0), Vec3::ONE);
        let step = zones.update(0.016, Vec3::new(-20.0, 0.0, -19.0), Vec3::ONE);
        assert!(matches!(step, ZoneStep::Shrinking { .. }));
    }

    #[test]
    fn instant_anchor_resolves_same_frame() {
        let mut zones = machine(vec![anchor(
            "short",
            Vec3::new(3.0, 0.0, 3.0),
            1.0,
            PortalTransit::Instant,
        )]);
        let step = zones.update(0.016, Vec3::new(3.2, 4.0, 3.0), Vec3::ONE);
        assert!(matches!(
            step,
            ZoneStep::Arrived {
                to: WorldSegment::Gallery,
                ..
            }
        ));
        assert_eq!(zones.state(), &WorldState::Playing(WorldSegment::Gallery));
    }

    #[test]
    fn overlapping_anchors_resolve_in_declaration_order() {
        let mut first = anchor("first", Vec3::ZERO, 3.0, PortalTransit::Instant);
        first.destination = WorldSegment::Arcade;
        let second = anchor("second", Vec3::new(0.5, 0.0, 0.0), 3.0, PortalTransit::Instant);
        let mut zones = machine(vec![first, second]);

        let step = zones.update(0.016, Vec3::new(0.25, 0.0, 0.0), Vec3::ONE);
        assert!(matches!(
            step,
            ZoneStep::Arrived {
                to: WorldSegment::Arcade,
                ..
            }
        ));
    }

    #[test]
    fn anchors_of_other_segments_are_ignored() {
        let mut foreign = example_anchor();
        foreign.segment = WorldSegment::Arcade;
        let mut zones = machine(vec![foreign]);
        assert_eq!(
            zones.update(0.016, Vec3::new(-20.0, 0.0, -20.0), Vec3::ONE),
            ZoneStep::Steady
        );
    }

    #[test]
    fn warp_is_ignored_mid_transit_and_for_current_segment() {
        let arrival = ArrivalPose {
            position: Vec3::ZERO,
            yaw: 0.0,
        };
        let mut zones = machine(vec![example_anchor()]);
        assert_eq!(zones.warp(WorldSegment::Hub, arrival), ZoneStep::Steady);

        zones.update(0.016, Vec3::new(-20.0, 0.0, -20.0), Vec3::ONE);
        assert_eq!(zones.warp(WorldSegment::Arcade, arrival), ZoneStep::Steady);

        let mut playing = machine(Vec::new());
        assert!(matches!(
            playing.warp(WorldSegment::Arcade, arrival),
            ZoneStep::Arrived {
                from: WorldSegment::Hub,
                to: WorldSegment::Arcade,
                ..
            }
        ));
    }

    #[test]
    fn transition_table_rejects_inapplicable_events() {
        let playing = WorldState::Playing(WorldSegment::Hub);
        assert_eq!(transition(&playing, &ZoneEvent::ShrinkComplete), None);

        let mut foreign = example_anchor();
        foreign.segment = WorldSegment::Gallery;
        assert_eq!(transition(&playing, &ZoneEvent::PortalReached(&foreign)), None);
    }
}
