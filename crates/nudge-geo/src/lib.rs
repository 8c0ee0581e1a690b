//! Great-circle distance and circular geofence containment.
//!
//! Everything here is a pure function of its inputs. Coordinates are not
//! range-checked; callers that accept user input validate it upstream.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Radius applied when a saved location carries no usable radius.
pub const DEFAULT_RADIUS_M: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rounds both components to `decimals` places. Six decimals is roughly
    /// 0.1 m at the equator.
    pub fn rounded(self, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            latitude: (self.latitude * scale).round() / scale,
            longitude: (self.longitude * scale).round() / scale,
        }
    }
}

/// Haversine distance in meters.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let phi_a = a.latitude.to_radians();
    let phi_b = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FenceCenter {
    Configured(Coordinate),
    /// At least one coordinate is missing.
    Unconfigured,
}

impl FenceCenter {
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                Self::Configured(Coordinate::new(latitude, longitude))
            }
            _ => Self::Unconfigured,
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Configured(coordinate) => Some(*coordinate),
            Self::Unconfigured => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub center: FenceCenter,
    pub radius_m: f64,
}

impl GeoFence {
    /// Builds a circular fence, substituting [`DEFAULT_RADIUS_M`] for a
    /// missing, non-positive or non-finite radius.
    pub fn circle(center: FenceCenter, radius_m: Option<f64>) -> Self {
        Self::circle_with_default(center, radius_m, DEFAULT_RADIUS_M)
    }

    pub fn circle_with_default(center: FenceCenter, radius_m: Option<f64>, default_m: f64) -> Self {
        let radius_m = radius_m
            .filter(|radius| radius.is_finite() && *radius > 0.0)
            .unwrap_or(default_m);
        Self { center, radius_m }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.center, FenceCenter::Configured(_))
    }
}

/// Inclusive containment test. An unconfigured fence contains nothing.
pub fn is_within_radius(current: Coordinate, fence: &GeoFence) -> bool {
    let Some(center) = fence.center.coordinate() else {
        return false;
    };
    distance_m(current, center) <= fence.radius_m
}
