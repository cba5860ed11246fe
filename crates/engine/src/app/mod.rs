mod animation;
mod audio;
mod input;
mod loop_runner;
mod metrics;
mod platform;
mod rendering;
mod scene;

pub use animation::{AnimationError, AnimationMixer};
pub use audio::{AudioError, AudioSink, CueLog};
pub use input::InputAction;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{EffectCounts, LoopMetricsSnapshot, MetricsHandle};
pub use platform::{
    ClipboardRoute, ClipboardTool, HostPlatform, NativePlatform, PlatformError, PlatformOutcome,
    PlatformRequest,
};
pub use rendering::{world_to_screen, Renderer, Viewport, PIXELS_PER_WORLD};
pub use scene::{
    CameraRig, DebugShape, InputSnapshot, Quat, RenderableDesc, RenderableKind, Scene, SceneHost,
    SceneObject, SceneObjectId, SceneWorld, Toast, Transform, Vec3,
};
