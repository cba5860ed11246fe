use std::time::Duration;

pub use glam::{Quat, Vec3};

use super::animation::AnimationMixer;
use super::input::{ActionStates, InputAction};
use super::platform::PlatformRequest;
use crate::content::WorldDefDatabase;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    diagnostic_pressed: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        diagnostic_pressed: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            diagnostic_pressed,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn diagnostic_pressed(&self) -> bool {
        self.diagnostic_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_diagnostic_pressed(mut self, diagnostic_pressed: bool) -> Self {
        self.diagnostic_pressed = diagnostic_pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_yaw(mut self, yaw_radians: f32) -> Self {
        self.rotation = Quat::from_rotation_y(yaw_radians);
        self
    }

    /// Horizontal heading of `rotation`, measured from +Z toward +X.
    pub fn yaw(&self) -> f32 {
        let forward = self.rotation * Vec3::Z;
        forward.x.atan2(forward.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    Avatar,
    Vehicle,
    Wheel,
    Portal,
    Interactable,
    Prop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub debug_name: String,
}

impl RenderableDesc {
    pub fn new(kind: RenderableKind, debug_name: impl Into<String>) -> Self {
        Self {
            kind,
            debug_name: debug_name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: SceneObjectId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub animation: AnimationMixer,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebugShape {
    Circle {
        center: Vec3,
        radius: f32,
        rgba: [u8; 4],
    },
    Line {
        from: Vec3,
        to: Vec3,
        rgba: [u8; 4],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, -10.0),
            look_at: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub expires_at: Duration,
}

#[derive(Debug, Default)]
pub struct SceneObjectIdAllocator {
    next: u64,
}

impl SceneObjectIdAllocator {
    pub fn allocate(&mut self) -> SceneObjectId {
        let id = SceneObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: SceneObjectIdAllocator,
    objects: Vec<SceneObject>,
    pending_spawns: Vec<SceneObject>,
    pending_despawns: Vec<SceneObjectId>,
    camera: CameraRig,
    debug_shapes: Vec<DebugShape>,
    cue_outbox: Vec<String>,
    platform_outbox: Vec<PlatformRequest>,
    toasts: Vec<Toast>,
    session_elapsed: Duration,
    world_defs: Option<WorldDefDatabase>,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> SceneObjectId {
        self.spawn_animated(transform, renderable, AnimationMixer::default())
    }

    pub fn spawn_animated(
        &mut self,
        transform: Transform,
        renderable: RenderableDesc,
        animation: AnimationMixer,
    ) -> SceneObjectId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(SceneObject {
            id,
            transform,
            renderable,
            animation,
            visible: true,
        });
        id
    }

    pub fn despawn(&mut self, id: SceneObjectId) -> bool {
        let exists_now = self.objects.iter().any(|object| object.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|object| object.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_spawns.is_empty() {
            self.objects.append(&mut self.pending_spawns);
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.objects
                .retain(|object| pending.binary_search(&object.id).is_err());
            self.pending_despawns.clear();
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.camera = CameraRig::default();
        self.debug_shapes.clear();
        self.cue_outbox.clear();
        self.platform_outbox.clear();
        self.toasts.clear();
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn find_object(&self, id: SceneObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn find_object_mut(&mut self, id: SceneObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    pub fn transform(&self, id: SceneObjectId) -> Option<Transform> {
        self.find_object(id).map(|object| object.transform)
    }

    pub fn transform_mut(&mut self, id: SceneObjectId) -> Option<&mut Transform> {
        self.find_object_mut(id).map(|object| &mut object.transform)
    }

    pub fn advance_animations(&mut self, dt_seconds: f32) {
        for object in &mut self.objects {
            object.animation.advance(dt_seconds);
        }
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn push_debug_shape(&mut self, shape: DebugShape) {
        self.debug_shapes.push(shape);
    }

    pub fn clear_debug_shapes(&mut self) {
        self.debug_shapes.clear();
    }

    pub fn debug_shapes(&self) -> &[DebugShape] {
        &self.debug_shapes
    }

    pub fn emit_cue(&mut self, cue: impl Into<String>) {
        self.cue_outbox.push(cue.into());
    }

    pub fn drain_cues(&mut self) -> Vec<String> {
        std::mem::take(&mut self.cue_outbox)
    }

    pub fn request_platform(&mut self, request: PlatformRequest) {
        self.platform_outbox.push(request);
    }

    pub fn drain_platform_requests(&mut self) -> Vec<PlatformRequest> {
        std::mem::take(&mut self.platform_outbox)
    }

    pub fn push_toast(&mut self, message: impl Into<String>, lifetime: Duration) {
        self.toasts.push(Toast {
            message: message.into(),
            expires_at: self.session_elapsed.saturating_add(lifetime),
        });
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn expire_toasts(&mut self) {
        let now = self.session_elapsed;
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    /// Wall-clock time since the session started, as last published by the host.
    pub fn session_elapsed(&self) -> Duration {
        self.session_elapsed
    }

    pub fn set_session_elapsed(&mut self, elapsed: Duration) {
        self.session_elapsed = elapsed;
    }

    pub fn set_world_defs(&mut self, world_defs: WorldDefDatabase) {
        self.world_defs = Some(world_defs);
    }

    pub fn world_defs(&self) -> Option<&WorldDefDatabase> {
        self.world_defs.as_ref()
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    fn debug_lines(&self, _world: &SceneWorld) -> Vec<String> {
        Vec::new()
    }
}

pub struct SceneHost {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneHost {
    pub fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub fn set_world_defs(&mut self, world_defs: WorldDefDatabase) {
        self.world.set_world_defs(world_defs);
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    /// Runs one fixed tick: scene update, deferred spawns, animation advance.
    pub fn tick(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) {
        if !self.is_loaded {
            return;
        }
        self.scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.apply_pending();
        self.world.advance_animations(fixed_dt_seconds);
        self.world.expire_toasts();
    }

    pub fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }

    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    pub fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub fn debug_lines(&self) -> Vec<String> {
        self.scene.debug_lines(&self.world)
    }
}
