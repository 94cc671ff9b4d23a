use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::GeoPoint;

/// Forecast valid hour (UTC) of an NWP field, e.g. 12, 15, 18, 21, 24.
pub type Period = u8;

/// GEFS surface variables carried by the ensemble grids.
///
/// Declaration order is the canonical column order inside a period.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Variable {
    /// 3-hour accumulated precipitation (kg m-2)
    ApcpSfc,
    /// Downward long-wave radiative flux (W m-2)
    DlwrfSfc,
    /// Downward short-wave radiative flux (W m-2)
    DswrfSfc,
    /// Air pressure at mean sea level (Pa)
    PresMsl,
    /// Precipitable water over the entire depth of the atmosphere (kg m-2)
    PwatEatm,
    /// Specific humidity 2 m above ground (kg kg-1)
    #[serde(rename = "spfh_2m")]
    #[strum(serialize = "spfh_2m")]
    Spfh2m,
    /// Total cloud cover over the entire depth of the atmosphere (%)
    TcdcEatm,
    /// Total column-integrated condensate (kg m-2)
    TcolcEatm,
    /// Maximum temperature over the past 3 hours 2 m above ground (K)
    #[serde(rename = "tmax_2m")]
    #[strum(serialize = "tmax_2m")]
    Tmax2m,
    /// Minimum temperature over the past 3 hours 2 m above ground (K)
    #[serde(rename = "tmin_2m")]
    #[strum(serialize = "tmin_2m")]
    Tmin2m,
    /// Current temperature 2 m above ground (K)
    #[serde(rename = "tmp_2m")]
    #[strum(serialize = "tmp_2m")]
    Tmp2m,
    /// Temperature of the surface (K)
    TmpSfc,
    /// Upward long-wave radiation at the surface (W m-2)
    UlwrfSfc,
    /// Upward long-wave radiation at the top of the atmosphere (W m-2)
    UlwrfTatm,
    /// Upward short-wave radiation at the surface (W m-2)
    UswrfSfc,
}

/// Identifies one interpolation problem: a single field on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasurementKey {
    pub day: NaiveDate,
    pub period: Period,
    pub variable: Variable,
}

impl MeasurementKey {
    pub fn new(day: NaiveDate, period: Period, variable: Variable) -> Self {
        Self {
            day,
            period,
            variable,
        }
    }
}

impl std::fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}h/{}", self.day, self.period, self.variable)
    }
}

/// One raw value of one ensemble member at one grid node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub location_id: String,
    pub day: NaiveDate,
    pub period: Period,
    pub variable: Variable,
    pub member: u16,
    pub value: f64,
}

impl MeasurementSample {
    pub fn key(&self) -> MeasurementKey {
        MeasurementKey::new(self.day, self.period, self.variable)
    }
}

/// NWP grid node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPoint {
    pub location_id: String,
    pub location: GeoPoint,
    pub elevation_m: f64,
}

/// Ensemble mean of one field at one grid node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationValue {
    pub location: GeoPoint,
    pub value: f64,
}
