use std::env;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{load_world_defs, resolve_app_paths, ContentLoadError, ContentRequest, StartupError};

use super::input::ActionStates;
use super::metrics::{EffectCounts, MetricsAccumulator};
use super::platform::PlatformWorker;
use super::rendering::OverlayData;
use super::{
    AudioSink, CueLog, InputAction, InputSnapshot, MetricsHandle, NativePlatform,
    PlatformOutcome, Renderer, Scene, SceneHost, SceneWorld,
};

pub const SLOW_FRAME_ENV_VAR: &str = "FOLIO_SLOW_FRAME_MS";
pub const TOAST_LIFETIME: Duration = Duration::from_millis(2_500);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub content_request: ContentRequest,
    pub audio_cues: Vec<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Folio".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            content_request: ContentRequest::default(),
            audio_cues: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load world definitions: {0}")]
    ContentLoad(#[from] ContentLoadError),
    #[error("failed to spawn platform worker thread: {0}")]
    SpawnPlatformWorker(#[source] io::Error),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut host = SceneHost::new(scene);
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        base_content_dir = %app_paths.base_content_dir.display(),
        mods_dir = %app_paths.mods_dir.display(),
        cache_dir = %app_paths.cache_dir.display(),
        "startup"
    );
    let world_defs = load_world_defs(&app_paths, &config.content_request)?;
    let platform_worker =
        PlatformWorker::spawn(Box::new(NativePlatform::new(&app_paths.cache_dir)))
            .map_err(AppError::SpawnPlatformWorker)?;
    let mut audio = CueLog::with_cues(config.audio_cues.iter().cloned());

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::new(config.window_width, config.window_height);

    host.set_world_defs(world_defs);
    host.load();
    info!(object_count = host.world().object_count(), "scene_loaded");

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let session_start = Instant::now();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    input_collector.release_all_actions();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.repeat {
                        return;
                    }
                    input_collector.handle_physical_key(
                        event.physical_key,
                        event.state == ElementState::Pressed,
                    );
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    if slow_frame_delay > Duration::ZERO {
                        // Explicit debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        host.world_mut()
                            .set_session_elapsed(session_start.elapsed());
                        host.tick(fixed_dt_seconds, &input_snapshot);
                        let effects =
                            pump_scene_effects(host.world_mut(), &platform_worker, &mut audio);
                        metrics_accumulator.record_effects(effects);
                        metrics_accumulator.record_tick();
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        let dropped_ticks = whole_ticks(step_plan.dropped_backlog, fixed_dt);
                        metrics_accumulator.record_dropped_ticks(dropped_ticks);
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            dropped_ticks,
                            max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                    }

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let overlay = overlay_visible.then(|| OverlayData {
                        metrics: metrics_handle.snapshot(),
                        render_fps_cap: effective_render_cap,
                        slow_frame_delay_ms: slow_frame_delay.as_millis() as u64,
                        object_count: host.world().object_count(),
                        scene_lines: host.debug_lines(),
                        recent_cues: audio.recent().map(str::to_string).collect(),
                    });
                    if let Err(error) = renderer.render_world(host.world(), overlay.as_ref()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = host.debug_title();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            dropped_ticks = snapshot.dropped_ticks,
                            cues_played = snapshot.effects.cues_played,
                            platform_requests = snapshot.effects.platform_requests,
                            platform_failures = snapshot.effects.platform_failures,
                            object_count = host.world().object_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                host.shutdown();
                info!(cues_played = audio.played(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Routes the scene's queued side effects to their sinks and folds finished
/// platform work back into the world as toasts. Failures are logged and
/// counted.
fn pump_scene_effects(
    world: &mut SceneWorld,
    worker: &PlatformWorker,
    audio: &mut dyn AudioSink,
) -> EffectCounts {
    let mut counts = EffectCounts::default();
    for cue in world.drain_cues() {
        match audio.play_cue(&cue) {
            Ok(()) => counts.cues_played += 1,
            Err(error) => {
                counts.cues_rejected += 1;
                warn!(cue = cue.as_str(), error = %error, "audio_cue_failed");
            }
        }
    }

    for request in world.drain_platform_requests() {
        let kind = request.kind();
        match worker.submit(request) {
            Ok(()) => counts.platform_requests += 1,
            Err(error) => {
                counts.platform_failures += 1;
                warn!(request = kind, error = %error, "platform_request_dropped");
            }
        }
    }

    for outcome in worker.drain() {
        counts += apply_platform_outcome(world, outcome);
    }
    counts
}

fn apply_platform_outcome(world: &mut SceneWorld, outcome: PlatformOutcome) -> EffectCounts {
    let mut counts = EffectCounts::default();
    match outcome {
        PlatformOutcome::Opened { url } => {
            info!(url = url.as_str(), "url_opened");
        }
        PlatformOutcome::Copied {
            route,
            confirmation,
        } => {
            info!(route = ?route, "clipboard_written");
            if let Some(message) = confirmation {
                world.push_toast(message, TOAST_LIFETIME);
                counts.toasts_raised += 1;
            }
        }
        PlatformOutcome::Failed { request, error } => {
            counts.platform_failures += 1;
            warn!(request, error = %error, "platform_request_failed");
        }
    }
    counts
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    diagnostic_is_down: bool,
    diagnostic_pressed_edge: bool,
    overlay_toggle_pressed_edge: bool,
    action_states: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.diagnostic_pressed_edge,
            self.action_states,
            self.window_width,
            self.window_height,
        );
        self.diagnostic_pressed_edge = false;
        snapshot
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        let was_pressed = self.overlay_toggle_pressed_edge;
        self.overlay_toggle_pressed_edge = false;
        was_pressed
    }

    fn handle_diagnostic_key_state(&mut self, is_pressed: bool) {
        if is_pressed {
            if !self.diagnostic_is_down {
                self.diagnostic_pressed_edge = true;
                self.overlay_toggle_pressed_edge = true;
            }
            self.diagnostic_is_down = true;
        } else {
            self.diagnostic_is_down = false;
        }
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        if code == KeyCode::F3 {
            self.handle_diagnostic_key_state(is_pressed);
            return;
        }
        let Some(action) = action_for_key(code) else {
            return;
        };
        self.action_states.set(action, is_pressed);
        if action == InputAction::Quit && is_pressed {
            self.mark_quit_requested();
        }
    }

    /// Focus loss swallows key-up events; drop held state so nothing sticks.
    fn release_all_actions(&mut self) {
        for action in InputAction::ALL {
            self.action_states.set(action, false);
        }
        self.diagnostic_is_down = false;
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveForward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveBackward),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(InputAction::Sprint),
        KeyCode::KeyE => Some(InputAction::Interact),
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => Some(InputAction::Confirm),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn whole_ticks(backlog: Duration, fixed_dt: Duration) -> u32 {
    if fixed_dt.is_zero() {
        return 0;
    }
    u32::try_from(backlog.as_nanos() / fixed_dt.as_nanos()).unwrap_or(u32::MAX)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
