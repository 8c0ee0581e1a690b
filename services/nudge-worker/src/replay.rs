use crate::scenario::RouteStep;
use nudge_config::TrackerConfig;
use nudge_core::now_epoch_millis;
use nudge_tracker::{PositionOptions, SimulatedPositionSource};
use std::time::Duration;

pub fn watch_options(config: &TrackerConfig) -> PositionOptions {
    PositionOptions {
        high_accuracy: config.high_accuracy,
        timeout: Duration::from_millis(config.watch_timeout_ms),
        maximum_age: Duration::from_millis(config.maximum_age_ms),
    }
}

/// Feeds route steps into the simulated source, one per tick. Returns how
/// many steps reached a live watch.
pub async fn replay_route(
    source: SimulatedPositionSource,
    route: Vec<RouteStep>,
    interval: Duration,
) -> usize {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut delivered = 0;
    for (index, step) in route.iter().enumerate() {
        ticker.tick().await;
        let receivers = match step.to_update(now_epoch_millis()) {
            Ok(sample) => source.push_sample(sample),
            Err(err) => source.push_error(err),
        };
        if receivers == 0 {
            tracing::debug!(step = index, "route step had no listener");
        } else {
            delivered += 1;
        }
    }
    delivered
}
