mod replay;
mod scenario;

use nudge_config::{ReplayConfig, ServiceConfig, TrackerConfig};
use nudge_core::Reminder;
use nudge_observability::{ObservabilityConfig, init, log_startup};
use nudge_tracker::{GeofenceTracker, SimulatedPositionSource};
use replay::{replay_route, watch_options};
use scenario::Scenario;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinError;

enum Wake {
    Interrupted,
    ReplayFinished(Result<usize, JoinError>),
    Update(bool),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env("nudge-worker");
    let obs_config = ObservabilityConfig {
        service_name: config.service_name.clone(),
        environment: config.environment.to_string(),
        log_level: config.log_level.clone(),
        metrics_addr: config.metrics_addr.clone(),
    };
    let handle = init(&obs_config);
    log_startup(&handle, &obs_config.environment);

    let tracker_config = TrackerConfig::from_env();
    let replay_config = ReplayConfig::from_env();
    let scenario = Scenario::load(&replay_config.scenario_path)?;
    tracing::info!(
        path = %replay_config.scenario_path,
        reminders = scenario.reminders.len(),
        steps = scenario.route.len(),
        "scenario loaded"
    );

    let source = SimulatedPositionSource::new();
    let mut tracker = GeofenceTracker::new(source.clone())
        .with_options(watch_options(&tracker_config))
        .with_default_radius(tracker_config.default_radius_m);

    let triggered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&triggered);
    tracker.start(&scenario.reminders, move |reminder: &Reminder| {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            reminder_id = %reminder.id,
            title = %reminder.title,
            "reminder triggered"
        );
    });
    if !tracker.is_subscribed() {
        tracing::warn!(status = ?tracker.status(), "nothing to track");
        return Ok(());
    }

    let mut replay = tokio::spawn(replay_route(
        source.clone(),
        scenario.route,
        Duration::from_millis(replay_config.interval_ms),
    ));

    loop {
        let wake = tokio::select! {
            _ = tokio::signal::ctrl_c() => Wake::Interrupted,
            finished = &mut replay => Wake::ReplayFinished(finished),
            more = tracker.process_next() => Wake::Update(more),
        };
        match wake {
            Wake::Interrupted => {
                tracing::info!("interrupted, stopping replay");
                replay.abort();
                break;
            }
            Wake::ReplayFinished(Ok(delivered)) => {
                tracker.pump();
                tracing::info!(delivered, "route replay finished");
                break;
            }
            Wake::ReplayFinished(Err(err)) => {
                tracing::error!(error = %err, "route replay task failed");
                break;
            }
            Wake::Update(true) => {}
            Wake::Update(false) => {
                tracing::warn!("position watch closed");
                replay.abort();
                break;
            }
        }
    }

    tracker.stop();
    let status = tracker.status();
    tracing::info!(
        triggered = triggered.load(Ordering::Relaxed),
        last_position = ?status.last_position,
        last_error = ?status.last_error,
        errors = status.error_count,
        "nudge worker finished"
    );
    Ok(())
}
