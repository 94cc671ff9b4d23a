//! Gaussian Process regression with a nugget term
//!
//! Targets are standardised before fitting, so the nugget is expressed as
//! a fraction of the field's own variance and a single configuration works
//! for fluxes in W m-2 and pressures in Pa alike.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use super::{Estimate, InterpolationError, SquaredExponential};
use crate::domain::{GeoPoint, MeasurementKey, StationValue};

/// Values whose spread is below this are treated as constant.
const MIN_STD: f64 = 1e-12;

/// A fitted GP for one (day, period, variable) field.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: SquaredExponential,
    points: Vec<GeoPoint>,
    chol: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    mean: f64,
    std: f64,
}

impl GaussianProcess {
    /// Fit on station values of a single field.
    ///
    /// # Errors
    /// - `DataMissing` when `values` is empty
    /// - `FitFailure` on non-finite input or a covariance matrix that is
    ///   not positive definite at this nugget
    pub fn fit(
        key: MeasurementKey,
        values: &[StationValue],
        kernel: SquaredExponential,
        nugget: f64,
    ) -> Result<Self, InterpolationError> {
        if values.is_empty() {
            return Err(InterpolationError::DataMissing { key });
        }

        if values.iter().any(|v| {
            !v.value.is_finite() || !v.location.latitude.is_finite() || !v.location.longitude.is_finite()
        }) {
            return Err(InterpolationError::FitFailure {
                key,
                nugget,
                reason: "non-finite training value or coordinate".to_string(),
            });
        }

        let n = values.len();
        let mean = values.iter().map(|v| v.value).sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v.value - mean).powi(2)).sum::<f64>() / n as f64;
        let std = if variance.sqrt() < MIN_STD {
            1.0
        } else {
            variance.sqrt()
        };

        let points: Vec<GeoPoint> = values.iter().map(|v| v.location).collect();
        let y = DVector::from_iterator(n, values.iter().map(|v| (v.value - mean) / std));

        let k = DMatrix::from_fn(n, n, |i, j| {
            let c = kernel.covariance(points[i], points[j]);
            if i == j {
                c + nugget
            } else {
                c
            }
        });

        let chol = k.cholesky().ok_or_else(|| InterpolationError::FitFailure {
            key,
            nugget,
            reason: "covariance matrix is not positive definite".to_string(),
        })?;
        let alpha = chol.solve(&y);

        if alpha.iter().any(|a| !a.is_finite()) {
            return Err(InterpolationError::FitFailure {
                key,
                nugget,
                reason: "covariance solve produced non-finite weights".to_string(),
            });
        }

        Ok(Self {
            kernel,
            points,
            chol,
            alpha,
            mean,
            std,
        })
    }

    /// Posterior mean and latent variance at `point`.
    ///
    /// The variance excludes the nugget, never goes below zero and grows
    /// towards the field variance away from the training stations.
    pub fn predict(&self, point: GeoPoint) -> Estimate {
        let k_star = DVector::from_iterator(
            self.points.len(),
            self.points.iter().map(|p| self.kernel.covariance(point, *p)),
        );

        let mean = self.mean + self.std * k_star.dot(&self.alpha);
        let explained = k_star.dot(&self.chol.solve(&k_star));
        let variance = self.std * self.std * (1.0 - explained).max(0.0);

        Estimate { mean, variance }
    }

    pub fn training_points(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Variable;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn key() -> MeasurementKey {
        MeasurementKey::new(NaiveDate::from_ymd_opt(2008, 7, 1).unwrap(), 21, Variable::DswrfSfc)
    }

    fn station(lat: f64, lon: f64, value: f64) -> StationValue {
        StationValue {
            location: GeoPoint::new(lat, lon),
            value,
        }
    }

    #[test]
    fn test_empty_field_is_data_missing() {
        let err = GaussianProcess::fit(key(), &[], SquaredExponential::default(), 1e-3).unwrap_err();
        assert!(matches!(err, InterpolationError::DataMissing { .. }));
    }

    #[test]
    fn test_non_finite_value_is_fit_failure() {
        let values = vec![station(34.0, -98.0, 1.0), station(35.0, -98.0, f64::NAN)];
        let err =
            GaussianProcess::fit(key(), &values, SquaredExponential::default(), 1e-3).unwrap_err();
        assert!(matches!(err, InterpolationError::FitFailure { .. }));
    }

    #[test]
    fn test_duplicate_stations_without_nugget_fail_then_succeed_with_nugget() {
        let values = vec![station(34.0, -98.0, 1.0), station(34.0, -98.0, 2.0)];
        let kernel = SquaredExponential::default();
        assert!(matches!(
            GaussianProcess::fit(key(), &values, kernel, 0.0),
            Err(InterpolationError::FitFailure { .. })
        ));
        let gp = GaussianProcess::fit(key(), &values, kernel, 0.1).unwrap();
        let estimate = gp.predict(GeoPoint::new(34.0, -98.0));
        assert!((estimate.mean - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_small_nugget_nearly_reproduces_training_values() {
        let values = vec![
            station(34.0, -99.0, 200.0),
            station(34.0, -97.0, 260.0),
            station(36.0, -99.0, 180.0),
            station(36.0, -97.0, 240.0),
        ];
        let gp = GaussianProcess::fit(key(), &values, SquaredExponential::new(1.5, 1.5), 1e-6)
            .unwrap();
        for v in &values {
            let e = gp.predict(v.location);
            assert!((e.mean - v.value).abs() < 0.5, "{} vs {}", e.mean, v.value);
            assert!(e.variance < 1.0);
        }
    }

    #[test]
    fn test_large_nugget_smooths_towards_mean() {
        let values = vec![station(34.0, -98.0, 0.0), station(34.5, -98.0, 10.0)];
        let gp = GaussianProcess::fit(key(), &values, SquaredExponential::new(1.0, 1.0), 100.0)
            .unwrap();
        let e = gp.predict(GeoPoint::new(34.0, -98.0));
        assert!((e.mean - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_far_from_data_reverts_to_mean_with_full_variance() {
        let values = vec![station(34.0, -98.0, 10.0), station(35.0, -98.0, 20.0)];
        let gp = GaussianProcess::fit(key(), &values, SquaredExponential::new(1.0, 1.0), 1e-4)
            .unwrap();
        let e = gp.predict(GeoPoint::new(60.0, 10.0));
        assert!((e.mean - 15.0).abs() < 1e-6);
        // population variance of {10, 20}
        assert!((e.variance - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_variance_grows_with_distance_from_single_station() {
        let values = vec![station(35.0, -97.0, 42.0)];
        let gp = GaussianProcess::fit(key(), &values, SquaredExponential::new(1.0, 1.0), 1e-3)
            .unwrap();
        let mut last = -1.0;
        for step in 0..8 {
            let e = gp.predict(GeoPoint::new(35.0 + step as f64 * 0.5, -97.0));
            assert_eq!(e.mean, 42.0);
            assert!(e.variance >= last, "variance must not shrink with distance");
            last = e.variance;
        }
        assert_eq!(gp.training_points(), 1);
    }

    proptest! {
        #[test]
        fn prop_variance_is_non_negative(
            raw in prop::collection::vec((30.0f64..40.0, -105.0f64..-90.0, -500.0f64..500.0), 1..12),
            q_lat in 20.0f64..50.0,
            q_lon in -120.0f64..-80.0,
        ) {
            let values: Vec<StationValue> = raw.iter().map(|(la, lo, v)| station(*la, *lo, *v)).collect();
            let gp = GaussianProcess::fit(key(), &values, SquaredExponential::new(1.0, 1.0), 1e-2).unwrap();
            let e = gp.predict(GeoPoint::new(q_lat, q_lon));
            prop_assert!(e.mean.is_finite());
            prop_assert!(e.variance >= 0.0);
        }
    }
}
