use serde::{Deserialize, Serialize};

/// Geographic location in decimal degrees (positive = North / East).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Solar farm / measurement station whose daily production is forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    pub location: GeoPoint,
    pub elevation_m: f64,
}

impl Site {
    pub fn new(site_id: impl Into<String>, latitude: f64, longitude: f64, elevation_m: f64) -> Self {
        Self {
            site_id: site_id.into(),
            location: GeoPoint::new(latitude, longitude),
            elevation_m,
        }
    }
}
