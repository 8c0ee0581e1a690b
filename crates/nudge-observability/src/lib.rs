use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

pub const POSITION_FIXES_TOTAL: &str = "nudge_position_fixes_total";
pub const POSITION_ERRORS_TOTAL: &str = "nudge_position_errors_total";
pub const GEOFENCE_TRANSITIONS_TOTAL: &str = "nudge_geofence_transitions_total";
pub const ACTIVE_GEOFENCES: &str = "nudge_active_geofences";

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub metrics_addr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObservabilityHandle {
    pub service_name: String,
    pub metrics_enabled: bool,
}

pub fn init(config: &ObservabilityConfig) -> ObservabilityHandle {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);

    let metrics_enabled = init_metrics(config);
    if metrics_enabled {
        describe_metrics();
    }

    ObservabilityHandle {
        service_name: config.service_name.clone(),
        metrics_enabled,
    }
}

pub fn log_startup(handle: &ObservabilityHandle, environment: &str) {
    tracing::info!(
        service = %handle.service_name,
        environment = %environment,
        metrics_enabled = handle.metrics_enabled,
        "nudge service starting"
    );
}

fn describe_metrics() {
    describe_counter!(POSITION_FIXES_TOTAL, "Position fixes evaluated against geofences");
    describe_counter!(POSITION_ERRORS_TOTAL, "Position source errors by kind");
    describe_counter!(
        GEOFENCE_TRANSITIONS_TOTAL,
        "Arrive/leave transitions delivered to the reminder layer"
    );
    describe_gauge!(ACTIVE_GEOFENCES, "Geofences currently watched");
}

fn init_metrics(config: &ObservabilityConfig) -> bool {
    let Some(addr) = config.metrics_addr.as_ref() else {
        return false;
    };
    let addr: SocketAddr = match addr.parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Invalid NUDGE_METRICS_ADDR value"
            );
            return false;
        }
    };

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", config.service_name.clone())
        .add_global_label("environment", config.environment.clone());

    match builder.install() {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                service = %config.service_name,
                error = %err,
                "Failed to initialize Prometheus exporter"
            );
            false
        }
    }
}
