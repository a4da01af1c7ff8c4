//! Geographic coordinates as received from map clicks.

use crate::error::MeteoMapError;
use std::fmt;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are represented as `f64`. Use [`LatLon::new`] for values coming
/// from outside the process; it rejects out-of-range and non-finite input.
///
/// # Examples
///
/// ```
/// use meteomap::LatLon;
///
/// let los_angeles = LatLon::new(34.05, -118.25).unwrap();
/// assert_eq!(los_angeles.0, 34.05); // Latitude
/// assert_eq!(los_angeles.1, -118.25); // Longitude
///
/// assert!(LatLon::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Validates and builds a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`MeteoMapError::InvalidCoordinate`] when latitude is outside
    /// `[-90, 90]`, longitude is outside `[-180, 180]`, or either is NaN/infinite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, MeteoMapError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(MeteoMapError::InvalidCoordinate(format!(
                "Latitude must be between -90 and 90, got {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(MeteoMapError::InvalidCoordinate(format!(
                "Longitude must be between -180 and 180, got {longitude}"
            )));
        }
        Ok(Self(latitude, longitude))
    }

    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}
