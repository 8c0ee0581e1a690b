use crate::source::{PositionError, PositionErrorKind, PositionSample};
use nudge_core::{EpochMillis, now_epoch_millis};
use nudge_geo::Coordinate;
use serde::{Deserialize, Serialize};

/// Live tracker state for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub last_position: Option<Coordinate>,
    pub accuracy_m: Option<f64>,
    pub is_active: bool,
    pub last_error: Option<PositionErrorKind>,
    pub last_error_message: Option<String>,
    /// Bumped on every error so repeated errors of one kind stay distinguishable.
    pub error_count: u64,
    pub updated_at_ms: Option<EpochMillis>,
}

impl TrackingStatus {
    pub(crate) fn record_fix(&mut self, sample: &PositionSample) {
        self.last_position = Some(sample.coordinate);
        self.accuracy_m = Some(sample.accuracy_m);
        self.is_active = true;
        self.clear_error();
        self.touch();
    }

    pub(crate) fn record_error(&mut self, error: &PositionError) {
        self.is_active = false;
        self.last_error = Some(error.kind);
        self.last_error_message = Some(error.message.clone());
        self.error_count += 1;
        self.touch();
    }

    pub(crate) fn mark_subscribed(&mut self) {
        self.is_active = true;
        self.clear_error();
        self.touch();
    }

    pub(crate) fn mark_idle(&mut self) {
        self.is_active = false;
        self.touch();
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.last_error_message = None;
    }

    fn touch(&mut self) {
        self.updated_at_ms = Some(now_epoch_millis());
    }
}
