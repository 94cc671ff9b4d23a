//! Feature engineering
//!
//! Turns the interpolated fields of one site on one day into a single
//! fixed-length vector. The column order is fixed once by a
//! [`FeatureLayout`] and shared by every (site, day), which is what gives
//! each regressor input a stable meaning.

pub mod builder;
pub mod layout;
pub mod solar;

pub use builder::*;
pub use layout::*;
pub use solar::SunTimes;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::domain::{Period, Variable};

/// Feature errors
#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    #[error("Site {site_id} on {day} has no estimate for {variable} at {period}h")]
    MissingCombination {
        site_id: String,
        day: NaiveDate,
        period: Period,
        variable: Variable,
    },

    #[error("Combination operand {variable} (period {period:?}) is not in the measurement set")]
    UnknownOperand {
        variable: Variable,
        period: Option<Period>,
    },

    #[error("Feature layout has no measurement columns")]
    EmptyLayout,
}

/// How per-period estimates are folded into one daily value per variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DailyAggregate {
    Mean,
    Sum,
    None,
}

impl DailyAggregate {
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return Option::None;
        }
        match self {
            DailyAggregate::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            DailyAggregate::Sum => Some(values.iter().sum()),
            DailyAggregate::None => Option::None,
        }
    }
}

/// Binary operator of a derived non-linear feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CombinationOp {
    Product,
    Ratio,
    Difference,
    Sum,
}

/// Denominators smaller than this make a ratio evaluate to 0.
pub const RATIO_EPSILON: f64 = 1e-9;

impl CombinationOp {
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            CombinationOp::Product => lhs * rhs,
            CombinationOp::Ratio => {
                if rhs.abs() < RATIO_EPSILON {
                    0.0
                } else {
                    lhs / rhs
                }
            }
            CombinationOp::Difference => lhs - rhs,
            CombinationOp::Sum => lhs + rhs,
        }
    }
}

/// One side of a combination: a single period's estimate, or the daily
/// aggregate of the variable when `period` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub variable: Variable,
    #[serde(default)]
    pub period: Option<Period>,
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.period {
            Some(p) => write!(f, "{}_h{}", self.variable, p),
            None => write!(f, "{}_daily", self.variable),
        }
    }
}

/// Configured non-linear feature, e.g. net short-wave flux as
/// `dswrf_sfc - uswrf_sfc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    #[serde(default)]
    pub name: Option<String>,
    pub op: CombinationOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Combination {
    pub fn column_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}_{}_{}", self.lhs, self.op, self.rhs))
    }
}

/// Groups of derived (non-NWP) features
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedFeatures {
    /// Day of year and month
    pub calendar: bool,
    /// Latitude, longitude and elevation of the site
    pub site: bool,
    /// Daylight length, solar noon and sun distance
    pub solar: bool,
}

impl Default for DerivedFeatures {
    fn default() -> Self {
        Self {
            calendar: true,
            site: true,
            solar: true,
        }
    }
}

/// Feature engineering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Add the interpolation variance of every estimate as a column
    pub include_variances: bool,
    pub daily_aggregate: DailyAggregate,
    pub combinations: Vec<Combination>,
    pub derived: DerivedFeatures,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            include_variances: true,
            daily_aggregate: DailyAggregate::Mean,
            combinations: Vec::new(),
            derived: DerivedFeatures::default(),
        }
    }
}

/// Feature vector of one site on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFeatures {
    pub site_id: String,
    pub day: NaiveDate,
    pub values: Vec<f64>,
}
