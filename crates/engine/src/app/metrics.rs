use std::mem;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

/// Scene side effects the loop routed to audio and the platform worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectCounts {
    pub cues_played: u32,
    pub cues_rejected: u32,
    pub platform_requests: u32,
    pub platform_failures: u32,
    pub toasts_raised: u32,
}

impl EffectCounts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for EffectCounts {
    fn add_assign(&mut self, other: Self) {
        self.cues_played = self.cues_played.saturating_add(other.cues_played);
        self.cues_rejected = self.cues_rejected.saturating_add(other.cues_rejected);
        self.platform_requests = self
            .platform_requests
            .saturating_add(other.platform_requests);
        self.platform_failures = self
            .platform_failures
            .saturating_add(other.platform_failures);
        self.toasts_raised = self.toasts_raised.saturating_add(other.toasts_raised);
    }
}

/// Pacing for the last interval plus effect counts for the interval and the
/// whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub dropped_ticks: u32,
    pub effects: EffectCounts,
    pub session_effects: EffectCounts,
}

/// Shared read side of the loop metrics. Clones observe the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
    poison_warned: Arc<AtomicBool>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                self.warn_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut guard = self.snapshot.write().unwrap_or_else(|poisoned| {
            self.warn_poison_once("write");
            poisoned.into_inner()
        });
        *guard = snapshot;
    }

    fn warn_poison_once(&self, operation: &'static str) {
        if !self.poison_warned.swap(true, Ordering::Relaxed) {
            warn!(operation, "metrics_lock_poisoned");
        }
    }
}

#[derive(Debug, Default)]
struct IntervalCounters {
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    dropped_ticks: u32,
    effects: EffectCounts,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    current: IntervalCounters,
    session_effects: EffectCounts,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            current: IntervalCounters::default(),
            session_effects: EffectCounts::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.current.frames = self.current.frames.saturating_add(1);
        self.current.frame_time_sum = self.current.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.current.ticks = self.current.ticks.saturating_add(1);
    }

    /// Ticks owed by the accumulator but discarded by the per-frame cap.
    pub(crate) fn record_dropped_ticks(&mut self, dropped: u32) {
        self.current.dropped_ticks = self.current.dropped_ticks.saturating_add(dropped);
    }

    pub(crate) fn record_effects(&mut self, effects: EffectCounts) {
        self.current.effects += effects;
        self.session_effects += effects;
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        self.interval_start = now;
        let counters = mem::take(&mut self.current);

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match counters.frames {
            0 => 0.0,
            frames => counters.frame_time_sum.as_secs_f32() * 1000.0 / frames as f32,
        };
        Some(LoopMetricsSnapshot {
            fps: counters.frames as f32 / elapsed_seconds,
            tps: counters.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            dropped_ticks: counters.dropped_ticks,
            effects: counters.effects,
            session_effects: self.session_effects,
        })
    }
}
