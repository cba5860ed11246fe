use folio_engine::{
    DebugShape, InteractableActionDef, InteractableDef, PlatformRequest, RenderableDesc,
    RenderableKind, SceneObjectId, SceneWorld, Transform, Vec3, VehicleDef, WorldDefDatabase,
    WorldSegment,
};
use tracing::info;

use super::interactable::{ActionContext, InteractAction, ProximityInteractable};
use super::zones::{ArrivalPose, PortalAnchor};
use super::CUE_INTERACT;

const PORTAL_RGBA: [u8; 4] = [120, 90, 230, 200];
const NEAR_RGBA: [u8; 4] = [90, 210, 120, 180];
const FAR_RGBA: [u8; 4] = [90, 140, 210, 90];

#[derive(Debug)]
pub(crate) struct InteractableSlot {
    pub interactable: ProximityInteractable,
    sign: SceneObjectId,
    affordance: SceneObjectId,
}

/// Scene objects and triggers belonging to the active segment.
#[derive(Debug)]
pub(crate) struct SegmentLayout {
    pub segment: WorldSegment,
    pub interactables: Vec<InteractableSlot>,
    portal_objects: Vec<SceneObjectId>,
}

pub(crate) struct BuiltSegment {
    pub layout: SegmentLayout,
    pub anchors: Vec<PortalAnchor>,
    pub vehicle: Option<VehicleDef>,
}

pub(crate) fn arrival_for(defs: &WorldDefDatabase, segment: WorldSegment) -> ArrivalPose {
    defs.segment(segment)
        .map(|def| ArrivalPose {
            position: def.spawn,
            yaw: def.spawn_yaw,
        })
        .unwrap_or(ArrivalPose {
            position: Vec3::ZERO,
            yaw: 0.0,
        })
}

pub(crate) fn build_segment(
    defs: &WorldDefDatabase,
    segment: WorldSegment,
    world: &mut SceneWorld,
) -> BuiltSegment {
    let mut anchors = Vec::new();
    let mut portal_objects = Vec::new();
    for portal in defs.portals_in(segment) {
        let fallback = arrival_for(defs, portal.destination);
        anchors.push(PortalAnchor {
            def_name: portal.def_name.clone(),
            segment,
            destination: portal.destination,
            position: portal.position,
            radius: portal.radius,
            arrival: ArrivalPose {
                position: portal.arrival.unwrap_or(fallback.position),
                yaw: portal.arrival_yaw.unwrap_or(fallback.yaw),
            },
            transit: portal.transit,
        });
        portal_objects.push(world.spawn(
            Transform {
                scale: Vec3::splat(portal.radius),
                ..Transform::at(portal.position)
            },
            RenderableDesc::new(RenderableKind::Portal, portal.def_name.clone()),
        ));
    }

    let interactables = defs
        .interactables_in(segment)
        .map(|def| spawn_interactable(def, world))
        .collect::<Vec<_>>();

    info!(
        segment = %segment,
        portals = anchors.len(),
        interactables = interactables.len(),
        "segment_layout_built"
    );

    BuiltSegment {
        layout: SegmentLayout {
            segment,
            interactables,
            portal_objects,
        },
        anchors,
        vehicle: defs.vehicle_in(segment).cloned(),
    }
}

fn spawn_interactable(def: &InteractableDef, world: &mut SceneWorld) -> InteractableSlot {
    let interactable = ProximityInteractable::new(
        def.label.clone(),
        def.position,
        def.facing_yaw,
        def.approach_offset,
        def.far_radius,
        def.near_radius,
        action_for(&def.action),
    );
    let sign = world.spawn(
        Transform::at(def.position).with_yaw(def.facing_yaw),
        RenderableDesc::new(RenderableKind::Prop, def.def_name.clone()),
    );
    let affordance = world.spawn(
        Transform {
            scale: Vec3::ZERO,
            ..Transform::at(interactable.approach_point())
        },
        RenderableDesc::new(RenderableKind::Interactable, format!("{}.affordance", def.def_name)),
    );
    InteractableSlot {
        interactable,
        sign,
        affordance,
    }
}

fn action_for(action: &InteractableActionDef) -> InteractAction {
    match action.clone() {
        InteractableActionDef::OpenUrl { url } => Box::new(move |ctx: &mut ActionContext<'_>| {
            ctx.world
                .request_platform(PlatformRequest::OpenUrl { url: url.clone() });
            ctx.world.emit_cue(CUE_INTERACT);
        }),
        InteractableActionDef::CopyText { text, toast } => {
            Box::new(move |ctx: &mut ActionContext<'_>| {
                ctx.world.request_platform(PlatformRequest::CopyToClipboard {
                    text: text.clone(),
                    confirmation: toast.clone(),
                });
                ctx.world.emit_cue(CUE_INTERACT);
            })
        }
        InteractableActionDef::StartGame { segment } => {
            Box::new(move |ctx: &mut ActionContext<'_>| {
                ctx.warp_request = Some(segment);
                ctx.world.emit_cue(CUE_INTERACT);
            })
        }
    }
}

impl SegmentLayout {
    pub(crate) fn sync_to_world(&self, world: &mut SceneWorld) {
        for slot in &self.interactables {
            let Some(object) = world.find_object_mut(slot.affordance) else {
                continue;
            };
            object.transform.scale = Vec3::splat(slot.interactable.scale());
            object.visible = slot.interactable.is_visible();
        }
    }

    pub(crate) fn push_debug_shapes(&self, anchors: &[PortalAnchor], world: &mut SceneWorld) {
        for anchor in anchors.iter().filter(|anchor| anchor.segment == self.segment) {
            world.push_debug_shape(DebugShape::Circle {
                center: anchor.position,
                radius: anchor.radius,
                rgba: PORTAL_RGBA,
            });
        }
        for slot in &self.interactables {
            let center = slot.interactable.approach_point();
            let (near, far) = slot.interactable.radii();
            world.push_debug_shape(DebugShape::Circle {
                center,
                radius: far,
                rgba: FAR_RGBA,
            });
            world.push_debug_shape(DebugShape::Circle {
                center,
                radius: near,
                rgba: NEAR_RGBA,
            });
        }
    }

    pub(crate) fn despawn(&self, world: &mut SceneWorld) {
        for &id in &self.portal_objects {
            world.despawn(id);
        }
        for slot in &self.interactables {
            world.despawn(slot.sign);
            world.despawn(slot.affordance);
        }
    }
}
