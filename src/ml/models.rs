//! Regressor seam shared by boosted models, ensembles and test doubles.

use super::RegressionError;

/// Trait for regression models
#[cfg_attr(test, mockall::automock)]
pub trait Regressor {
    /// Predict a target from one feature vector
    fn predict(&self, features: &[f64]) -> Result<f64, RegressionError>;
}

/// Reject feature vectors of the wrong length.
pub fn check_feature_count(expected: usize, features: &[f64]) -> Result<(), RegressionError> {
    if features.len() != expected {
        return Err(RegressionError::FeatureCountMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
