use serde::{Deserialize, Serialize};
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub metrics_addr: Option<String>,
    pub log_level: String,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self {
            service_name: env_var("NUDGE_SERVICE_NAME", default_service_name.to_string()),
            environment: Environment::from_env(&env_var("NUDGE_ENV", "local".to_string())),
            metrics_addr: env::var("NUDGE_METRICS_ADDR").ok(),
            log_level: env_var("NUDGE_LOG_LEVEL", "info".to_string()),
        }
    }
}

/// Position sampling and geofence defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub high_accuracy: bool,
    /// Per-update wait for continuous watches.
    pub watch_timeout_ms: u64,
    /// Oldest cached fix a source may hand back; zero disables reuse.
    pub maximum_age_ms: u64,
    pub default_radius_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            watch_timeout_ms: 5_000,
            maximum_age_ms: 0,
            default_radius_m: 100.0,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_radius_m = env_var_f64("NUDGE_DEFAULT_RADIUS_M", defaults.default_radius_m);
        Self {
            high_accuracy: env_var_bool("NUDGE_HIGH_ACCURACY", defaults.high_accuracy),
            watch_timeout_ms: env_var_u64("NUDGE_WATCH_TIMEOUT_MS", defaults.watch_timeout_ms),
            maximum_age_ms: env_var_u64("NUDGE_MAX_POSITION_AGE_MS", defaults.maximum_age_ms),
            default_radius_m: if default_radius_m.is_finite() && default_radius_m > 0.0 {
                default_radius_m
            } else {
                defaults.default_radius_m
            },
        }
    }
}

/// Route replay settings for the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub scenario_path: String,
    pub interval_ms: u64,
}

impl ReplayConfig {
    pub fn from_env() -> Self {
        Self {
            scenario_path: env_var(
                "NUDGE_SCENARIO_PATH",
                "scenarios/seoul-walk.json".to_string(),
            ),
            interval_ms: env_var_u64("NUDGE_REPLAY_INTERVAL_MS", 1_000),
        }
    }
}

fn env_var(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_var_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| parse_bool(&value, default))
        .unwrap_or(default)
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
