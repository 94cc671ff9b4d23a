//! Forecast error metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::EvaluationError;

/// Average of `|predicted - observed|` over all pairs.
pub fn mean_absolute_error(predicted: &[f64], observed: &[f64]) -> Result<f64, EvaluationError> {
    check_pairs(predicted, observed)?;
    let total: f64 = predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| (p - o).abs())
        .sum();
    Ok(total / predicted.len() as f64)
}

fn check_pairs(predicted: &[f64], observed: &[f64]) -> Result<(), EvaluationError> {
    if predicted.len() != observed.len() {
        return Err(EvaluationError::LengthMismatch {
            predicted: predicted.len(),
            observed: observed.len(),
        });
    }
    if predicted.is_empty() {
        return Err(EvaluationError::EmptyData);
    }
    Ok(())
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Square Error
    pub rmse: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
    pub sample_count: usize,
    /// Largest absolute error
    pub max_error: f64,
    /// Smallest absolute error
    pub min_error: f64,
    /// Standard deviation of the signed errors
    pub std_dev: f64,
}

impl ForecastMetrics {
    pub fn calculate(predicted: &[f64], observed: &[f64]) -> Result<Self, EvaluationError> {
        check_pairs(predicted, observed)?;

        let n = observed.len();
        let errors: Vec<f64> = observed.iter().zip(predicted).map(|(o, p)| o - p).collect();

        let mae = mean_absolute_error(predicted, observed)?;
        let sse: f64 = errors.iter().map(|e| e * e).sum();
        let rmse = (sse / n as f64).sqrt();

        let mean_observed = observed.iter().sum::<f64>() / n as f64;
        let total_variance: f64 = observed.iter().map(|o| (o - mean_observed).powi(2)).sum();
        let r2 = if total_variance > 1e-10 {
            1.0 - sse / total_variance
        } else {
            0.0
        };

        let max_error = errors.iter().map(|e| e.abs()).fold(0.0f64, f64::max);
        let min_error = errors.iter().map(|e| e.abs()).fold(f64::INFINITY, f64::min);

        let mean_error = errors.iter().sum::<f64>() / n as f64;
        let variance = errors.iter().map(|e| (e - mean_error).powi(2)).sum::<f64>() / n as f64;

        Ok(Self {
            mae,
            rmse,
            r2,
            sample_count: n,
            max_error,
            min_error,
            std_dev: variance.sqrt(),
        })
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metrics: MAE={:.3}, RMSE={:.3}, R²={:.3}, n={}",
            self.mae, self.rmse, self.r2, self.sample_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mae_of_identical_sequences_is_zero() {
        let values = [1.0, 2.5, -3.0, 400.0];
        assert_eq!(mean_absolute_error(&values, &values).unwrap(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            mean_absolute_error(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]),
            Err(EvaluationError::LengthMismatch {
                predicted: 3,
                observed: 4
            })
        );
    }

    #[test]
    fn test_empty_data() {
        assert_eq!(mean_absolute_error(&[], &[]), Err(EvaluationError::EmptyData));
    }

    #[test]
    fn test_forecast_metrics() {
        let observed = [10.0, 20.0, 30.0, 40.0];
        let predicted = [12.0, 18.0, 30.0, 44.0];
        let m = ForecastMetrics::calculate(&predicted, &observed).unwrap();
        assert_eq!(m.mae, 2.0);
        assert_eq!(m.rmse, 6.0f64.sqrt());
        assert_eq!(m.max_error, 4.0);
        assert_eq!(m.min_error, 0.0);
        assert_eq!(m.sample_count, 4);
        assert!((m.r2 - (1.0 - 24.0 / 500.0)).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_constant_offset_gives_offset_mae(
            observed in prop::collection::vec(-1e4f64..1e4, 1..50),
            offset in 0.0f64..100.0,
        ) {
            let predicted: Vec<f64> = observed.iter().map(|o| o + offset).collect();
            let mae = mean_absolute_error(&predicted, &observed).unwrap();
            prop_assert!((mae - offset).abs() < 1e-9);
        }
    }
}
