//! Boosting loss functions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Loss minimised by gradient boosting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Loss {
    /// L1 loss. Trees fit the sign of the residual and leaves take the
    /// median residual, which keeps outlier days from dominating.
    #[default]
    LeastAbsoluteDeviation,
    /// L2 loss. Trees fit the residual and leaves take its mean.
    LeastSquares,
}

impl Loss {
    /// Constant prediction before the first tree.
    pub fn initial(&self, targets: &[f64]) -> f64 {
        let mut values = targets.to_vec();
        self.leaf_value(&mut values)
    }

    /// Negative gradient of the loss at the current prediction.
    pub fn negative_gradient(&self, target: f64, prediction: f64) -> f64 {
        let residual = target - prediction;
        match self {
            Loss::LeastAbsoluteDeviation => {
                if residual > 0.0 {
                    1.0
                } else if residual < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Loss::LeastSquares => residual,
        }
    }

    /// Optimal constant step for the residuals that fell into one leaf.
    ///
    /// Reorders `residuals`. Returns 0 for an empty slice.
    pub fn leaf_value(&self, residuals: &mut [f64]) -> f64 {
        if residuals.is_empty() {
            return 0.0;
        }
        match self {
            Loss::LeastAbsoluteDeviation => median(residuals),
            Loss::LeastSquares => residuals.iter().sum::<f64>() / residuals.len() as f64,
        }
    }
}

/// Median of a non-empty slice; even lengths average the middle pair.
pub fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
