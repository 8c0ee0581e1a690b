//! Geofence trigger evaluation for location-based reminders.
//!
//! A [`GeofenceTracker`] watches a [`PositionSource`], checks every fix
//! against the geofences derived from the current reminder snapshot and
//! calls back once per arrive/leave transition.

pub mod fence;
pub mod locate;
pub mod simulated;
pub mod source;
pub mod status;
pub mod tracker;

pub use fence::{Geofence, WatchedReminder, active_geofences};
pub use locate::{capture_location, current_coordinate};
pub use simulated::SimulatedPositionSource;
pub use source::{
    PositionError, PositionErrorKind, PositionOptions, PositionSample, PositionSource,
    PositionUpdate, PositionWatch, WatchId,
};
pub use status::TrackingStatus;
pub use tracker::{GeofenceTracker, StopHandle, TransitionCallback, is_transition};
