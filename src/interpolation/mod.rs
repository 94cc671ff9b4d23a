//! Spatial interpolation of ensemble-mean NWP fields
//!
//! One Gaussian Process is fitted per (day, period, variable) triple and
//! evaluated at every site. Triples share no parameters and are fitted in
//! parallel.

pub mod gaussian_process;
pub mod kernel;
pub mod stage;

pub use gaussian_process::GaussianProcess;
pub use kernel::SquaredExponential;
pub use stage::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MeasurementKey;

/// Interpolation errors
#[derive(Debug, Clone, Error)]
pub enum InterpolationError {
    #[error("No training points for {key}")]
    DataMissing { key: MeasurementKey },

    #[error("GP fit failed for {key} (nugget {nugget:e}): {reason}")]
    FitFailure {
        key: MeasurementKey,
        nugget: f64,
        reason: String,
    },
}

/// Point estimate and uncertainty of a field at a query location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub mean: f64,
    pub variance: f64,
}

/// Interpolation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub kernel: SquaredExponential,
    /// Noise added to the covariance diagonal, relative to the field variance
    pub nugget: f64,
    /// How many times a failed fit is retried with a wider nugget
    pub nugget_retries: u32,
    /// Nugget multiplier applied on each retry
    pub nugget_growth: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            kernel: SquaredExponential::default(),
            nugget: 0.05,
            nugget_retries: 3,
            nugget_growth: 10.0,
        }
    }
}

impl InterpolationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.kernel.length_scale_lat > 0.0 && self.kernel.length_scale_lon > 0.0) {
            return Err("interpolation length scales must be positive".to_string());
        }
        if !(self.nugget >= 0.0 && self.nugget.is_finite()) {
            return Err("interpolation nugget must be a non-negative number".to_string());
        }
        if self.nugget_retries > 0 && self.nugget_growth <= 1.0 {
            return Err("nugget_growth must exceed 1 when retries are enabled".to_string());
        }
        Ok(())
    }
}
