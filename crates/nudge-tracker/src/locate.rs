//! One-shot position capture for pinning a reminder's location.

use crate::source::{PositionError, PositionOptions, PositionSource};
use nudge_core::{LocationTriggerType, ReminderLocation};
use nudge_geo::Coordinate;

/// Decimal places kept when a fix is saved as a location.
pub const SAVED_COORDINATE_DECIMALS: u32 = 6;

pub async fn current_coordinate<S: PositionSource + ?Sized>(
    source: &S,
    options: &PositionOptions,
) -> Result<Coordinate, PositionError> {
    if !source.is_supported() {
        return Err(PositionError::unsupported());
    }
    let sample = source.current_position(options).await.map_err(|err| {
        tracing::warn!(error = %err, "current position request failed");
        err
    })?;
    tracing::debug!(accuracy_m = sample.accuracy_m, "current position captured");
    Ok(sample.coordinate.rounded(SAVED_COORDINATE_DECIMALS))
}

/// Builds a pinned location at the device's current position.
pub async fn capture_location<S: PositionSource + ?Sized>(
    source: &S,
    options: &PositionOptions,
    name: impl Into<String>,
    radius_m: Option<f64>,
    trigger_type: LocationTriggerType,
) -> Result<ReminderLocation, PositionError> {
    let coordinate = current_coordinate(source, options).await?;
    Ok(ReminderLocation {
        name: name.into(),
        latitude: Some(coordinate.latitude),
        longitude: Some(coordinate.longitude),
        radius_m,
        trigger_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedPositionSource;
    use crate::source::{PositionErrorKind, PositionSample};
    use std::time::Duration;

    fn cached() -> PositionOptions {
        PositionOptions {
            maximum_age: Duration::from_secs(60),
            ..PositionOptions::one_shot()
        }
    }

    #[tokio::test]
    async fn capture_rounds_the_fix() {
        let source = SimulatedPositionSource::new();
        source.push_sample(PositionSample::new(
            Coordinate::new(37.56654321, 126.97801789),
            12.0,
            nudge_core::now_epoch_millis(),
        ));

        let location = capture_location(
            &source,
            &cached(),
            "Office",
            Some(200.0),
            LocationTriggerType::Leave,
        )
        .await
        .unwrap();

        assert_eq!(location.latitude, Some(37.566543));
        assert_eq!(location.longitude, Some(126.978018));
        assert_eq!(location.radius_m, Some(200.0));
        assert!(location.is_pinned());
    }

    #[tokio::test]
    async fn unsupported_source_is_reported() {
        let source = SimulatedPositionSource::unsupported();
        let err = current_coordinate(&source, &cached()).await.unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn timeout_propagates() {
        let source = SimulatedPositionSource::new();
        let options = PositionOptions {
            timeout: Duration::from_millis(10),
            ..PositionOptions::one_shot()
        };
        let err = current_coordinate(&source, &options).await.unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::Timeout);
    }
}
