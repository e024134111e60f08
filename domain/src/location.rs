use crate::error::Error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Latest position reported by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Latitude in decimal degrees
    #[schema(example = 37.7749)]
    pub lat: f64,
    /// Longitude in decimal degrees
    #[schema(example = -122.4194)]
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checks that both coordinates are finite and within WGS84 bounds.
    pub fn validate(&self) -> Result<(), Error> {
        validate_coordinates(self.lat, self.lng)
    }
}

pub(crate) fn validate_coordinates(lat: f64, lng: f64) -> Result<(), Error> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::validation(format!(
            "lat must be between -90 and 90, got {lat}"
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(Error::validation(format!(
            "lng must be between -180 and 180, got {lng}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_coordinates_in_range() {
        assert!(Location::new(37.7749, -122.4194).validate().is_ok());
        assert!(Location::new(-90.0, 180.0).validate().is_ok());
        assert!(Location::new(0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_or_non_finite_coordinates() {
        assert!(Location::new(90.5, 0.0).validate().is_err());
        assert!(Location::new(0.0, -180.1).validate().is_err());
        assert!(Location::new(f64::NAN, 0.0).validate().is_err());
        assert!(Location::new(0.0, f64::INFINITY).validate().is_err());
    }
}
