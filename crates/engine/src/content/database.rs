use glam::Vec3;

use super::types::WorldSegment;

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDef {
    pub def_name: String,
    pub segment: WorldSegment,
    pub label: String,
    pub spawn: Vec3,
    pub spawn_yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalTransit {
    Animated,
    Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalDef {
    pub def_name: String,
    pub segment: WorldSegment,
    pub destination: WorldSegment,
    pub position: Vec3,
    pub radius: f32,
    pub arrival: Option<Vec3>,
    pub arrival_yaw: Option<f32>,
    pub transit: PortalTransit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractableActionDef {
    OpenUrl {
        url: String,
    },
    CopyText {
        text: String,
        toast: Option<String>,
    },
    StartGame {
        segment: WorldSegment,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractableDef {
    pub def_name: String,
    pub label: String,
    pub segment: WorldSegment,
    pub position: Vec3,
    pub facing_yaw: f32,
    pub approach_offset: f32,
    pub far_radius: f32,
    pub near_radius: f32,
    pub action: InteractableActionDef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDef {
    pub def_name: String,
    pub segment: WorldSegment,
    pub position: Vec3,
    pub yaw: f32,
}

/// Merged, validated world content. Every list keeps declaration order, which
/// is also evaluation priority for overlapping portals.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WorldDefDatabase {
    segments: Vec<SegmentDef>,
    portals: Vec<PortalDef>,
    interactables: Vec<InteractableDef>,
    vehicles: Vec<VehicleDef>,
}

impl WorldDefDatabase {
    /// Builds a database from already-validated parts, in declaration order.
    pub fn from_parts(
        segments: Vec<SegmentDef>,
        portals: Vec<PortalDef>,
        interactables: Vec<InteractableDef>,
        vehicles: Vec<VehicleDef>,
    ) -> Self {
        Self {
            segments,
            portals,
            interactables,
            vehicles,
        }
    }

    pub fn first_segment(&self) -> Option<WorldSegment> {
        self.segments.first().map(|def| def.segment)
    }

    pub fn segment(&self, segment: WorldSegment) -> Option<&SegmentDef> {
        self.segments.iter().find(|def| def.segment == segment)
    }

    pub fn segments(&self) -> &[SegmentDef] {
        &self.segments
    }

    pub fn portals_in(&self, segment: WorldSegment) -> impl Iterator<Item = &PortalDef> {
        self.portals.iter().filter(move |def| def.segment == segment)
    }

    pub fn interactables_in(&self, segment: WorldSegment) -> impl Iterator<Item = &InteractableDef> {
        self.interactables
            .iter()
            .filter(move |def| def.segment == segment)
    }

    pub fn vehicle_in(&self, segment: WorldSegment) -> Option<&VehicleDef> {
        self.vehicles.iter().find(|def| def.segment == segment)
    }

    pub fn def_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.segments.len(),
            self.portals.len(),
            self.interactables.len(),
            self.vehicles.len(),
        )
    }
}
