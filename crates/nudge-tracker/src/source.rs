use async_trait::async_trait;
use nudge_core::EpochMillis;
use nudge_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the source may return. Zero means always fresh.
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// Settings for a continuous watch.
    pub fn watch() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(5),
            maximum_age: Duration::ZERO,
        }
    }

    /// Settings for a single "where am I now" request.
    pub fn one_shot() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            ..Self::watch()
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::watch()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    pub accuracy_m: f64,
    pub timestamp_ms: EpochMillis,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, accuracy_m: f64, timestamp_ms: EpochMillis) -> Self {
        Self {
            coordinate,
            accuracy_m,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Unknown,
}

impl PositionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PositionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PositionError {
    pub kind: PositionErrorKind,
    pub message: String,
}

impl PositionError {
    pub fn new(kind: PositionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied() -> Self {
        Self::new(PositionErrorKind::PermissionDenied, "location permission denied")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(PositionErrorKind::PositionUnavailable, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            PositionErrorKind::Timeout,
            format!("no position fix within {} ms", after.as_millis()),
        )
    }

    pub fn unsupported() -> Self {
        Self::new(PositionErrorKind::Unsupported, "position sensing is not available")
    }
}

pub type PositionUpdate = Result<PositionSample, PositionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A live position subscription. Updates arrive in the order the source
/// produced them; the channel closes when the source drops the watch.
#[derive(Debug)]
pub struct PositionWatch {
    pub id: WatchId,
    pub updates: mpsc::UnboundedReceiver<PositionUpdate>,
}

/// Host position-sensing capability.
#[async_trait]
pub trait PositionSource: Send + Sync {
    fn is_supported(&self) -> bool;

    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, PositionError>;

    /// Cancels a watch. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, PositionError>;
}
