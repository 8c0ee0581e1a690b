use nudge_core::{EpochMillis, Reminder};
use nudge_geo::Coordinate;
use nudge_tracker::{PositionError, PositionErrorKind, PositionSample, PositionUpdate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A recorded walk: the reminders in play and the position updates to replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub reminders: Vec<Reminder>,
    pub route: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteStep {
    Fix {
        latitude: f64,
        longitude: f64,
        #[serde(default = "default_accuracy")]
        accuracy_m: f64,
    },
    Error {
        error: PositionErrorKind,
        #[serde(default)]
        message: Option<String>,
    },
}

fn default_accuracy() -> f64 {
    10.0
}

impl RouteStep {
    pub fn to_update(&self, timestamp_ms: EpochMillis) -> PositionUpdate {
        match self {
            Self::Fix {
                latitude,
                longitude,
                accuracy_m,
            } => Ok(PositionSample::new(
                Coordinate::new(*latitude, *longitude),
                *accuracy_m,
                timestamp_ms,
            )),
            Self::Error { error, message } => Err(PositionError::new(
                *error,
                message.clone().unwrap_or_else(|| error.to_string()),
            )),
        }
    }
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}
