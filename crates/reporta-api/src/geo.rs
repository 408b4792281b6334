use crate::error::ApiError;

/// Mean Earth radius (IUGG), used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ApiError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ApiError::invalid("latitude must be between -90 and 90"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ApiError::invalid("longitude must be between -180 and 180"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Haversine distance in kilometres.
    pub fn distance_km(self, other: Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // clamp guards asin against rounding just above 1.0 for antipodal points
        2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn distance_is_zero_for_same_point() {
        let p = Coordinates::new(-12.0464, -77.0428).unwrap();
        assert!(p.distance_km(p).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinates::new(0.0, 0.0).unwrap();
        let b = Coordinates::new(1.0, 0.0).unwrap();
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((a.distance_km(b) - expected).abs() < 1e-6);
    }

    #[test]
    fn crosses_the_antimeridian() {
        let a = Coordinates::new(0.0, 179.5).unwrap();
        let b = Coordinates::new(0.0, -179.5).unwrap();
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((a.distance_km(b) - expected).abs() < 1e-6);
    }
}
