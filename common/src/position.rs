use crate::serde::{nan_as_null, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude, longitude and altitude.
///
/// Latitude and longitude are stored in decimal degrees, the altitude in meters
/// above the WGS84 ellipsoid. Latitude values range from -90.0 to 90.0, and
/// longitude values range from -180.0 to 180.0.
///
/// The default coordinate is invalid (all components are `NaN`) and stands for
/// "no fix available yet". `NaN` components are serialized as `null`.
///
/// # Example
///
/// ```rust
/// use common::position::Coordinate;
///
/// let coordinate = Coordinate::new(52.5200, 13.4050, 34.0);
/// assert!(coordinate.is_valid());
/// assert!(!Coordinate::default().is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(with = "nan_as_null")]
    pub latitude: f64,
    #[serde(with = "nan_as_null")]
    pub longitude: f64,
    #[serde(with = "nan_as_null")]
    pub altitude: f64,
}

impl Coordinate {
    /// Creates a new [`Coordinate`].
    ///
    /// # Arguments
    ///
    /// * `latitude` - The latitude in decimal degrees (positive for north, negative for south).
    /// * `longitude` - The longitude in decimal degrees (positive for east, negative for west).
    /// * `altitude` - The altitude in meters.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Returns `true` if latitude and longitude are inside their ranges and all
    /// components are finite numbers.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.altitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Coordinate {
            latitude: f64::NAN,
            longitude: f64::NAN,
            altitude: f64::NAN,
        }
    }
}

/// A single position fix: a [`Coordinate`] and the UTC time it was taken.
///
/// A reading is never modified after construction. A position source replaces
/// its reading as a whole when a new fix arrives.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    coordinate: Coordinate,
    #[serde(with = "timestamp")]
    timestamp: DateTime<Utc>,
}

impl PositionReading {
    /// Creates a new [`PositionReading`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use common::position::{Coordinate, PositionReading};
    ///
    /// let reading = PositionReading::new(Coordinate::new(52.0, 13.0, 40.0), chrono::Utc::now());
    /// assert!(reading.is_valid());
    /// ```
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        PositionReading {
            coordinate,
            timestamp,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    /// Returns the time of the fix in UTC.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// A reading is valid when its coordinate is valid. The empty default
    /// reading is not.
    pub fn is_valid(&self) -> bool {
        self.coordinate.is_valid()
    }
}

impl Default for PositionReading {
    fn default() -> Self {
        PositionReading {
            coordinate: Coordinate::default(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
