use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Observed daily energy production of one site (ground truth).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub site_id: String,
    pub day: NaiveDate,
    pub energy: f64,
}

/// Predicted daily energy production of one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePrediction {
    pub site_id: String,
    pub day: NaiveDate,
    pub energy: f64,
}
