//! Seed ensembles of boosted tree models.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    select_hyperparameters, BoostingParams, GradientBoostedTrees,
    LearningSet, Loss, RegressionError, Regressor, TuningGrid,
};

/// Ensemble training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Members trained with seeds `base_seed..base_seed + n_models`,
    /// wrapping at `u64::MAX`
    pub n_models: usize,
    pub base_seed: u64,
    /// Trailing share of the learning set used for hyperparameter selection
    pub validation_fraction: f64,
    pub max_depths: Vec<usize>,
    pub learning_rates: Vec<f64>,
    pub max_trees: usize,
    pub tune_n_trees: bool,
    pub min_samples_leaf: usize,
    pub subsample: f64,
    pub max_features: Option<usize>,
    pub loss: Loss,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_models: 10,
            base_seed: 42,
            validation_fraction: 0.2,
            max_depths: vec![3, 5, 7],
            learning_rates: vec![0.02, 0.05, 0.1],
            max_trees: 500,
            tune_n_trees: true,
            min_samples_leaf: 5,
            subsample: 0.7,
            max_features: None,
            loss: Loss::LeastAbsoluteDeviation,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.n_models == 0 {
            return Err("n_models must be at least 1".to_string());
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            ));
        }
        if self.max_depths.is_empty() || self.learning_rates.is_empty() {
            return Err("max_depths and learning_rates must not be empty".to_string());
        }
        if self.learning_rates.iter().any(|r| !(*r > 0.0 && r.is_finite())) {
            return Err("learning_rates must be positive".to_string());
        }
        if self.max_trees == 0 {
            return Err("max_trees must be at least 1".to_string());
        }
        if self.min_samples_leaf == 0 {
            return Err("min_samples_leaf must be at least 1".to_string());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if self.max_features == Some(0) {
            return Err("max_features must be at least 1 when set".to_string());
        }
        Ok(())
    }

    pub fn grid(&self) -> TuningGrid {
        TuningGrid {
            max_depths: self.max_depths.clone(),
            learning_rates: self.learning_rates.clone(),
            max_trees: self.max_trees,
            tune_n_trees: self.tune_n_trees,
        }
    }

    /// Parameters shared by every grid candidate.
    pub fn base_params(&self) -> BoostingParams {
        BoostingParams {
            n_trees: self.max_trees,
            min_samples_leaf: self.min_samples_leaf,
            subsample: self.subsample,
            max_features: self.max_features,
            loss: self.loss,
            ..BoostingParams::default()
        }
    }
}

/// Models whose prediction is the arithmetic mean of all members.
#[derive(Debug, Clone)]
pub struct SeedEnsemble<M> {
    members: Vec<M>,
}

impl<M: Regressor> SeedEnsemble<M> {
    pub fn from_members(members: Vec<M>) -> Result<Self, RegressionError> {
        if members.is_empty() {
            return Err(RegressionError::InvalidParameters(
                "an ensemble needs at least one member".into(),
            ));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<M: Regressor> Regressor for SeedEnsemble<M> {
    fn predict(&self, features: &[f64]) -> Result<f64, RegressionError> {
        let mut sum = 0.0;
        for member in &self.members {
            sum += member.predict(features)?;
        }
        Ok(sum / self.members.len() as f64)
    }
}

/// Ensemble trained on a learning set together with its selection result
#[derive(Debug, Clone)]
pub struct TrainedEnsemble {
    pub ensemble: SeedEnsemble<GradientBoostedTrees>,
    pub params: BoostingParams,
    pub validation_mae: f64,
}

impl TrainedEnsemble {
    /// Predictions of the first member alone.
    pub fn predict_single(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, RegressionError> {
        let first = &self.ensemble.members()[0];
        rows.par_iter().map(|row| first.predict(row)).collect()
    }

    /// Ensemble-mean predictions for many rows.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, RegressionError> {
        rows.par_iter().map(|row| self.ensemble.predict(row)).collect()
    }
}

/// Select hyperparameters, then train `n_models` members on the whole
/// learning set in parallel.
pub fn train_ensemble(
    set: &LearningSet,
    config: &EnsembleConfig,
) -> Result<TrainedEnsemble, RegressionError> {
    config.validate().map_err(RegressionError::InvalidParameters)?;
    if set.is_empty() {
        return Err(RegressionError::EmptyTrainingSet);
    }

    let outcome = select_hyperparameters(
        set,
        &config.base_params(),
        &config.grid(),
        config.validation_fraction,
        config.base_seed,
    )?;

    let members = (0..config.n_models)
        .into_par_iter()
        .map(|i| {
            GradientBoostedTrees::fit(set, &outcome.params, config.base_seed.wrapping_add(i as u64))
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        n_models = members.len(),
        rows = set.len(),
        features = set.n_features(),
        "trained seed ensemble"
    );

    Ok(TrainedEnsemble {
        ensemble: SeedEnsemble::from_members(members)?,
        params: outcome.params,
        validation_mae: outcome.validation_mae,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MockRegressor;

    fn constant(value: f64) -> MockRegressor {
        let mut mock = MockRegressor::new();
        mock.expect_predict().returning(move |_| Ok(value));
        mock
    }

    #[test]
    fn test_prediction_is_mean_of_members() {
        let ensemble =
            SeedEnsemble::from_members(vec![constant(10.0), constant(20.0), constant(30.0)])
                .unwrap();
        assert_eq!(ensemble.predict(&[1.0, 2.0]).unwrap(), 20.0);
    }

    #[test]
    fn test_every_member_is_consulted() {
        let members = (0..4)
            .map(|i| {
                let mut mock = MockRegressor::new();
                mock.expect_predict().times(1).returning(move |_| Ok(i as f64));
                mock
            })
            .collect();
        let ensemble = SeedEnsemble::from_members(members).unwrap();
        assert_eq!(ensemble.predict(&[0.0]).unwrap(), 1.5);
    }

    #[test]
    fn test_member_error_propagates() {
        let mut failing = MockRegressor::new();
        failing.expect_predict().returning(|_| {
            Err(RegressionError::FeatureCountMismatch {
                expected: 3,
                actual: 1,
            })
        });
        let ensemble = SeedEnsemble::from_members(vec![constant(1.0), failing]).unwrap();
        assert!(ensemble.predict(&[1.0]).is_err());
    }

    #[test]
    fn test_empty_ensemble_is_rejected() {
        assert!(SeedEnsemble::<MockRegressor>::from_members(vec![]).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(EnsembleConfig::default().validate().is_ok());
        let bad = EnsembleConfig {
            n_models: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = EnsembleConfig {
            learning_rates: vec![0.1, -1.0],
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_train_ensemble_uses_consecutive_seeds() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let targets = rows.iter().map(|r| r[0] * 0.5).collect();
        let set = LearningSet::new(rows, targets).unwrap();
        let config = EnsembleConfig {
            n_models: 3,
            base_seed: 100,
            max_depths: vec![2],
            learning_rates: vec![0.3],
            max_trees: 30,
            min_samples_leaf: 1,
            ..Default::default()
        };
        let trained = train_ensemble(&set, &config).unwrap();
        let seeds: Vec<u64> = trained
            .ensemble
            .members()
            .iter()
            .map(|m| m.metadata().seed)
            .collect();
        assert_eq!(seeds, vec![100, 101, 102]);

        let batch = trained.predict_batch(set.rows()).unwrap();
        for (row, p) in set.rows().iter().zip(&batch) {
            assert_eq!(*p, trained.ensemble.predict(row).unwrap());
        }
        assert!(trained.predict_batch(&[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_member_seeds_wrap_at_u64_max() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let targets = rows.iter().map(|r| r[0]).collect();
        let set = LearningSet::new(rows, targets).unwrap();
        let config = EnsembleConfig {
            n_models: 3,
            base_seed: u64::MAX - 1,
            max_depths: vec![2],
            learning_rates: vec![0.3],
            max_trees: 10,
            tune_n_trees: false,
            min_samples_leaf: 1,
            ..Default::default()
        };
        let trained = train_ensemble(&set, &config).unwrap();
        let seeds: Vec<u64> = trained
            .ensemble
            .members()
            .iter()
            .map(|m| m.metadata().seed)
            .collect();
        assert_eq!(seeds, vec![u64::MAX - 1, u64::MAX, 0]);
    }
}
