use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("animation clip '{0}' is not registered on this object")]
    UnknownClip(String),
}

#[derive(Debug, Clone, PartialEq)]
struct ClipTrack {
    name: String,
    weight: f32,
    time_seconds: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct CrossFade {
    from: usize,
    to: usize,
    duration_seconds: f32,
    elapsed_seconds: f32,
}

/// Named clip weights for one scene object.
///
/// Clips are registered up front; `play` snaps to a clip and `cross_fade`
/// blends weights linearly over the requested duration. Weights of all tracks
/// always sum to one once any clip has been started.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationMixer {
    tracks: Vec<ClipTrack>,
    active: Option<usize>,
    fade: Option<CrossFade>,
}

impl AnimationMixer {
    pub fn with_clips<I, S>(clips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracks: clips
                .into_iter()
                .map(|name| ClipTrack {
                    name: name.into(),
                    weight: 0.0,
                    time_seconds: 0.0,
                })
                .collect(),
            active: None,
            fade: None,
        }
    }

    pub fn play(&mut self, clip: &str) -> Result<(), AnimationError> {
        let index = self.index_of(clip)?;
        for track in &mut self.tracks {
            track.weight = 0.0;
        }
        self.tracks[index].weight = 1.0;
        self.tracks[index].time_seconds = 0.0;
        self.active = Some(index);
        self.fade = None;
        Ok(())
    }

    pub fn cross_fade(&mut self, clip: &str, duration_seconds: f32) -> Result<(), AnimationError> {
        let index = self.index_of(clip)?;
        let Some(from) = self.active else {
            return self.play(clip);
        };
        if from == index {
            return Ok(());
        }
        if duration_seconds <= 0.0 {
            return self.play(clip);
        }

        self.settle_fade();
        self.tracks[index].time_seconds = 0.0;
        self.active = Some(index);
        self.fade = Some(CrossFade {
            from,
            to: index,
            duration_seconds,
            elapsed_seconds: 0.0,
        });
        Ok(())
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        for track in &mut self.tracks {
            if track.weight > 0.0 {
                track.time_seconds += dt_seconds;
            }
        }

        let Some(fade) = self.fade.as_mut() else {
            return;
        };
        fade.elapsed_seconds += dt_seconds;
        let t = (fade.elapsed_seconds / fade.duration_seconds).clamp(0.0, 1.0);
        let (from, to) = (fade.from, fade.to);
        self.tracks[from].weight = 1.0 - t;
        self.tracks[to].weight = t;
        if t >= 1.0 {
            self.fade = None;
        }
    }

    pub fn active_clip(&self) -> Option<&str> {
        self.active.map(|index| self.tracks[index].name.as_str())
    }

    pub fn weight(&self, clip: &str) -> Option<f32> {
        self.tracks
            .iter()
            .find(|track| track.name == clip)
            .map(|track| track.weight)
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    fn settle_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            for track in &mut self.tracks {
                track.weight = 0.0;
            }
            self.tracks[fade.to].weight = 1.0;
        }
    }

    fn index_of(&self, clip: &str) -> Result<usize, AnimationError> {
        self.tracks
            .iter()
            .position(|track| track.name == clip)
            .ok_or_else(|| AnimationError::UnknownClip(clip.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer() -> AnimationMixer {
        AnimationMixer::with_clips(["idle", "walk", "run"])
    }

    #[test]
    fn play_snaps_weights_to_single_clip() {
        let mut mixer = mixer();
        mixer.play("walk").expect("walk");
        assert_eq!(mixer.active_clip(), Some("walk"));
        assert_eq!(mixer.weight("walk"), Some(1.0));
        assert_eq!(mixer.weight("idle"), Some(0.0));
    }

    #[test]
    fn cross_fade_blends_over_duration() {
        let mut mixer = mixer();
        mixer.play("idle").expect("idle");
        mixer.cross_fade("run", 0.5).expect("run");

        mixer.advance(0.25);
        let run = mixer.weight("run").expect("run weight");
        let idle = mixer.weight("idle").expect("idle weight");
        assert!((run - 0.5).abs() < 1e-5);
        assert!((run + idle - 1.0).abs() < 1e-5);

        mixer.advance(0.5);
        assert_eq!(mixer.weight("run"), Some(1.0));
        assert_eq!(mixer.weight("idle"), Some(0.0));
        assert!(!mixer.is_fading());
    }

    #[test]
    fn cross_fade_interrupting_a_fade_settles_previous_target() {
        let mut mixer = mixer();
        mixer.play("idle").expect("idle");
        mixer.cross_fade("walk", 0.5).expect("walk");
        mixer.advance(0.1);
        mixer.cross_fade("run", 0.5).expect("run");

        assert_eq!(mixer.weight("idle"), Some(0.0));
        assert_eq!(mixer.weight("walk"), Some(1.0));
        mixer.advance(0.5);
        assert_eq!(mixer.weight("run"), Some(1.0));
        assert_eq!(mixer.weight("walk"), Some(0.0));
    }

    #[test]
    fn unknown_clip_is_reported() {
        let mut mixer = mixer();
        assert_eq!(
            mixer.cross_fade("swim", 0.5),
            Err(AnimationError::UnknownClip("swim".to_string()))
        );
        assert_eq!(mixer.active_clip(), None);
    }

    #[test]
    fn cross_fade_without_active_clip_plays_directly() {
        let mut mixer = mixer();
        mixer.cross_fade("walk", 0.5).expect("walk");
        assert_eq!(mixer.weight("walk"), Some(1.0));
        assert!(!mixer.is_fading());
    }
}
