use std::collections::{BTreeSet, VecDeque};

use thiserror::Error;
use tracing::debug;

const RECENT_CUE_CAPACITY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio cue '{0}' has no registered sound")]
    UnknownCue(String),
}

/// Receives fire-and-forget sound cues drained from the scene each tick.
pub trait AudioSink {
    fn play_cue(&mut self, cue: &str) -> Result<(), AudioError>;
}

/// Cue sink without a mixer backend: validates cue names, logs them, and keeps
/// the most recent few for the debug overlay.
#[derive(Debug, Clone, Default)]
pub struct CueLog {
    known: BTreeSet<String>,
    recent: VecDeque<String>,
    played: u64,
}

impl CueLog {
    pub fn with_cues<I, S>(cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: cues.into_iter().map(Into::into).collect(),
            recent: VecDeque::with_capacity(RECENT_CUE_CAPACITY),
            played: 0,
        }
    }

    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    pub fn played(&self) -> u64 {
        self.played
    }
}

impl AudioSink for CueLog {
    fn play_cue(&mut self, cue: &str) -> Result<(), AudioError> {
        if !self.known.contains(cue) {
            return Err(AudioError::UnknownCue(cue.to_string()));
        }

        debug!(cue, "audio_cue");
        if self.recent.len() == RECENT_CUE_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(cue.to_string());
        self.played = self.played.saturating_add(1);
        Ok(())
    }
}
