use serde::{Deserialize, Serialize};

use crate::domain::GeoPoint;

/// Anisotropic squared-exponential covariance over (latitude, longitude).
///
/// Unit amplitude: the process variance is carried by the target scale
/// of the Gaussian Process, not by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquaredExponential {
    /// Correlation length along latitude (degrees)
    pub length_scale_lat: f64,
    /// Correlation length along longitude (degrees)
    pub length_scale_lon: f64,
}

impl Default for SquaredExponential {
    fn default() -> Self {
        Self {
            length_scale_lat: 1.5,
            length_scale_lon: 1.5,
        }
    }
}

impl SquaredExponential {
    pub fn new(length_scale_lat: f64, length_scale_lon: f64) -> Self {
        Self {
            length_scale_lat,
            length_scale_lon,
        }
    }

    pub fn covariance(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let dlat = (a.latitude - b.latitude) / self.length_scale_lat;
        let dlon = (a.longitude - b.longitude) / self.length_scale_lon;
        (-0.5 * (dlat * dlat + dlon * dlon)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covariance_is_one_at_zero_distance() {
        let k = SquaredExponential::new(1.0, 2.0);
        let p = GeoPoint::new(35.0, -97.0);
        assert_eq!(k.covariance(p, p), 1.0);
    }

    #[test]
    fn test_covariance_decays_and_is_anisotropic() {
        let k = SquaredExponential::new(1.0, 2.0);
        let origin = GeoPoint::new(35.0, -97.0);
        let north = GeoPoint::new(36.0, -97.0);
        let east = GeoPoint::new(35.0, -96.0);
        let far = GeoPoint::new(40.0, -97.0);

        assert!(k.covariance(origin, north) < 1.0);
        assert!(k.covariance(origin, far) < k.covariance(origin, north));
        // one degree east is half a length scale, one degree north is a full one
        assert!(k.covariance(origin, east) > k.covariance(origin, north));
        assert_eq!(k.covariance(origin, north), k.covariance(north, origin));
    }
}
