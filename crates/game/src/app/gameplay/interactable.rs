use folio_engine::{SceneWorld, Vec3, WorldSegment};

use super::control::PressEdge;
use super::vehicle::forward;
use super::zones::horizontal_distance;

/// What an interactable action may touch when it fires.
pub(crate) struct ActionContext<'w> {
    pub world: &'w mut SceneWorld,
    pub warp_request: Option<WorldSegment>,
}

pub(crate) type InteractAction = Box<dyn FnMut(&mut ActionContext<'_>)>;

/// Approach-point proximity trigger shared by every decorative object.
pub(crate) struct ProximityInteractable {
    pub name: String,
    anchor: Vec3,
    facing_yaw: f32,
    approach_offset: f32,
    far_radius: f32,
    near_radius: f32,
    scale: f32,
    visible: bool,
    confirm_edge: PressEdge,
    action: InteractAction,
}

impl std::fmt::Debug for ProximityInteractable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximityInteractable")
            .field("name", &self.name)
            .field("anchor", &self.anchor)
            .field("scale", &self.scale)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl ProximityInteractable {
    /// `near_radius` is clamped to `far_radius`.
    pub(crate) fn new(
        name: impl Into<String>,
        anchor: Vec3,
        facing_yaw: f32,
        approach_offset: f32,
        far_radius: f32,
        near_radius: f32,
        action: InteractAction,
    ) -> Self {
        Self {
            name: name.into(),
            anchor,
            facing_yaw,
            approach_offset,
            far_radius,
            near_radius: near_radius.min(far_radius),
            scale: 0.0,
            visible: false,
            confirm_edge: PressEdge::default(),
            action,
        }
    }

    pub(crate) fn approach_point(&self) -> Vec3 {
        self.anchor + forward(self.facing_yaw) * self.approach_offset
    }

    pub(crate) fn scale(&self) -> f32 {
        self.scale
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn radii(&self) -> (f32, f32) {
        (self.near_radius, self.far_radius)
    }

    /// Refreshes scale and visibility, then fires the action on a confirm
    /// press edge inside the near radius. Returns whether it fired.
    pub(crate) fn update(
        &mut self,
        avatar_position: Vec3,
        confirm: bool,
        ctx: &mut ActionContext<'_>,
    ) -> bool {
        let distance = horizontal_distance(avatar_position, self.approach_point());
        self.scale = affordance_scale(distance, self.near_radius, self.far_radius);
        self.visible = distance < self.far_radius;

        let pressed = self.confirm_edge.update(confirm);
        if pressed && distance < self.near_radius {
            (self.action)(ctx);
            return true;
        }
        false
    }
}

pub(crate) fn affordance_scale(distance: f32, near_radius: f32, far_radius: f32) -> f32 {
    let span = far_radius - near_radius;
    if span <= f32::EPSILON {
        return if distance <= near_radius { 1.0 } else { 0.0 };
    }
    (1.0 - (distance - near_radius) / span).clamp(0.0, 1.0)
}
