use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use folio_engine::Vec3;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AvatarTuning {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub turn_blend: f32,
    pub animation_fade_seconds: f32,
    pub walk_footstep_interval_seconds: f32,
    pub run_footstep_interval_seconds: f32,
    pub vehicle_enter_radius: f32,
    pub vehicle_exit_offset: f32,
}

impl Default for AvatarTuning {
    fn default() -> Self {
        Self {
            walk_speed: 0.1,
            sprint_speed: 0.3,
            turn_blend: 0.25,
            animation_fade_seconds: 0.5,
            walk_footstep_interval_seconds: 0.6,
            run_footstep_interval_seconds: 0.45,
            vehicle_enter_radius: 3.0,
            vehicle_exit_offset: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct VehicleTuning {
    pub max_speed: f32,
    pub sprint_max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub steer_step: f32,
    pub max_steer: f32,
    pub steer_relax: f32,
    pub turn_constant: f32,
    pub wheel_radius: f32,
    pub min_moving_speed: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_speed: 0.8,
            sprint_max_speed: 1.2,
            acceleration: 0.015,
            deceleration: 0.01,
            steer_step: 0.02,
            max_steer: 0.2,
            steer_relax: 0.005,
            turn_constant: 0.15,
            wheel_radius: 0.35,
            min_moving_speed: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CameraTuning {
    pub follow_offset: Vec3,
    pub transition_offset: Vec3,
    pub follow_rate: f32,
    pub transition_rate: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            follow_offset: Vec3::new(0.0, 10.0, -10.0),
            transition_offset: Vec3::new(0.0, 4.0, -4.0),
            follow_rate: 5.0,
            transition_rate: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PortalTuning {
    pub shrink_rate: f32,
    pub resolve_scale: f32,
}

impl Default for PortalTuning {
    fn default() -> Self {
        Self {
            shrink_rate: 2.0,
            resolve_scale: 0.05,
        }
    }
}

/// Optional overrides read from `tuning.json`; absent fields keep defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Tuning {
    pub avatar: AvatarTuning,
    pub vehicle: VehicleTuning,
    pub camera: CameraTuning,
    pub portal: PortalTuning,
}

#[derive(Debug, Error)]
pub(crate) enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tuning file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid tuning value at {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A missing file yields defaults. A present but broken file is an error.
pub(crate) fn load_tuning(path: &Path) -> Result<Tuning, TuningError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Tuning::default()),
        Err(source) => {
            return Err(TuningError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let tuning = parse_tuning(&raw).map_err(|error| match error {
        ParseFailure::Json { json_path, source } => TuningError::Parse {
            path: path.to_path_buf(),
            json_path,
            source,
        },
        ParseFailure::Invalid(invalid) => invalid,
    })?;
    Ok(tuning)
}

enum ParseFailure {
    Json {
        json_path: String,
        source: serde_json::Error,
    },
    Invalid(TuningError),
}

fn parse_tuning(raw: &str) -> Result<Tuning, ParseFailure> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let tuning = serde_path_to_error::deserialize::<_, Tuning>(&mut deserializer).map_err(
        |error| {
            let json_path = error.path().to_string();
            ParseFailure::Json {
                json_path,
                source: error.into_inner(),
            }
        },
    )?;
    validate_tuning(&tuning).map_err(ParseFailure::Invalid)?;
    Ok(tuning)
}

fn validate_tuning(tuning: &Tuning) -> Result<(), TuningError> {
    let positive = [
        ("avatar.walk_speed", tuning.avatar.walk_speed),
        ("avatar.sprint_speed", tuning.avatar.sprint_speed),
        ("avatar.turn_blend", tuning.avatar.turn_blend),
        (
            "avatar.walk_footstep_interval_seconds",
            tuning.avatar.walk_footstep_interval_seconds,
        ),
        (
            "avatar.run_footstep_interval_seconds",
            tuning.avatar.run_footstep_interval_seconds,
        ),
        ("avatar.vehicle_enter_radius", tuning.avatar.vehicle_enter_radius),
        ("vehicle.max_speed", tuning.vehicle.max_speed),
        ("vehicle.sprint_max_speed", tuning.vehicle.sprint_max_speed),
        ("vehicle.acceleration", tuning.vehicle.acceleration),
        ("vehicle.deceleration", tuning.vehicle.deceleration),
        ("vehicle.steer_step", tuning.vehicle.steer_step),
        ("vehicle.max_steer", tuning.vehicle.max_steer),
        ("vehicle.steer_relax", tuning.vehicle.steer_relax),
        ("vehicle.wheel_radius", tuning.vehicle.wheel_radius),
        ("camera.follow_rate", tuning.camera.follow_rate),
        ("camera.transition_rate", tuning.camera.transition_rate),
        ("portal.shrink_rate", tuning.portal.shrink_rate),
        ("portal.resolve_scale", tuning.portal.resolve_scale),
    ];
    for (field, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(TuningError::Invalid {
                field,
                reason: format!("expected a finite value > 0, got {value}"),
            });
        }
    }
    if tuning.avatar.turn_blend > 1.0 {
        return Err(TuningError::Invalid {
            field: "avatar.turn_blend",
            reason: format!("expected <= 1, got {}", tuning.avatar.turn_blend),
        });
    }
    if tuning.avatar.sprint_speed < tuning.avatar.walk_speed {
        return Err(TuningError::Invalid {
            field: "avatar.sprint_speed",
            reason: "must not be slower than avatar.walk_speed".to_string(),
        });
    }
    Ok(())
}
