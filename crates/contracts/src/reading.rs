//! Reading - one timestamped position sample

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// WGS84 coordinate (degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether latitude/longitude are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// Coordinate `meters` further north, used by simulators.
    pub fn offset_north(&self, meters: f64) -> Coordinate {
        let d_lat = (meters / EARTH_RADIUS_M).to_degrees();
        Coordinate::new((self.latitude + d_lat).clamp(-90.0, 90.0), self.longitude)
    }
}

/// Where a reading came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    #[default]
    Sensor,
    Ip,
}

/// Position sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub coordinate: Coordinate,

    /// Altitude above sea level (meters), if known
    #[serde(default)]
    pub altitude: Option<f64>,

    /// Horizontal error radius (meters); negative means invalid
    pub horizontal_accuracy: f64,

    /// When the sample was taken
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub source: ReadingSource,
}

impl Reading {
    /// Sensor reading taken at `timestamp`.
    pub fn new(coordinate: Coordinate, horizontal_accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            altitude: None,
            horizontal_accuracy,
            timestamp,
            source: ReadingSource::Sensor,
        }
    }

    /// Sensor reading taken now.
    pub fn now(coordinate: Coordinate, horizontal_accuracy: f64) -> Self {
        Self::new(coordinate, horizontal_accuracy, Utc::now())
    }

    pub fn with_source(mut self, source: ReadingSource) -> Self {
        self.source = source;
        self
    }

    /// Age relative to `now`, zero for readings from the future.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}
