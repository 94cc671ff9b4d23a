//! Stochastic gradient boosting of regression trees.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{
    check_feature_count, LearningSet, Loss, ModelMetadata, ModelType, RegressionError,
    RegressionTree, Regressor, TreeParams,
};

/// Hyperparameters of one boosted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_trees: usize,
    /// Shrinkage applied to every tree's output
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn without replacement for each tree
    pub subsample: f64,
    pub max_features: Option<usize>,
    pub loss: Loss,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            max_features: None,
            loss: Loss::LeastAbsoluteDeviation,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<(), RegressionError> {
        if self.n_trees == 0 {
            return Err(RegressionError::InvalidParameters(
                "n_trees must be at least 1".into(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(RegressionError::InvalidParameters(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(RegressionError::InvalidParameters(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(RegressionError::InvalidParameters(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Boosted tree model: `init + learning_rate * sum(tree outputs)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    metadata: ModelMetadata,
}

impl GradientBoostedTrees {
    /// Fit on the whole learning set. Identical inputs and seed give an
    /// identical model.
    pub fn fit(
        set: &LearningSet,
        params: &BoostingParams,
        seed: u64,
    ) -> Result<Self, RegressionError> {
        Self::boost(set, params, seed, None).map(|(model, _)| model)
    }

    /// Fit on `train` and record the validation MAE after every stage.
    ///
    /// Entry `i` of the returned curve is the MAE of the first `i + 1`
    /// trees.
    pub fn fit_staged(
        train: &LearningSet,
        params: &BoostingParams,
        seed: u64,
        validation: &LearningSet,
    ) -> Result<(Self, Vec<f64>), RegressionError> {
        if validation.n_features() != train.n_features() {
            return Err(RegressionError::FeatureCountMismatch {
                expected: train.n_features(),
                actual: validation.n_features(),
            });
        }
        Self::boost(train, params, seed, Some(validation))
    }

    fn boost(
        set: &LearningSet,
        params: &BoostingParams,
        seed: u64,
        validation: Option<&LearningSet>,
    ) -> Result<(Self, Vec<f64>), RegressionError> {
        params.validate()?;
        if set.is_empty() {
            return Err(RegressionError::EmptyTrainingSet);
        }

        let n = set.len();
        let targets = set.targets();
        let columns = set.columns();
        let tree_params = params.tree_params();
        let loss = params.loss;
        let mut rng = StdRng::seed_from_u64(seed);

        let init = loss.initial(targets);
        let mut current = vec![init; n];
        let n_sub = ((n as f64 * params.subsample).round() as usize).clamp(1, n);

        let mut val_current = validation.map(|v| vec![init; v.len()]);
        let mut curve = Vec::new();
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let residuals: Vec<f64> = targets.iter().zip(&current).map(|(y, f)| y - f).collect();
            let gradients: Vec<f64> = targets
                .iter()
                .zip(&current)
                .map(|(&y, &f)| loss.negative_gradient(y, f))
                .collect();
            let indices = if n_sub == n {
                (0..n).collect()
            } else {
                rand::seq::index::sample(&mut rng, n, n_sub).into_vec()
            };

            let tree = RegressionTree::fit(
                &columns,
                &gradients,
                indices,
                &tree_params,
                &mut rng,
                |leaf: &[usize]| {
                    let mut values: Vec<f64> = leaf.iter().map(|&i| residuals[i]).collect();
                    loss.leaf_value(&mut values)
                },
            );

            for (f, row) in current.iter_mut().zip(set.rows()) {
                *f += params.learning_rate * tree.predict(row);
            }
            if let (Some(val), Some(val_pred)) = (validation, val_current.as_mut()) {
                for (f, row) in val_pred.iter_mut().zip(val.rows()) {
                    *f += params.learning_rate * tree.predict(row);
                }
                curve.push(mean_abs_diff(val.targets(), val_pred));
            }
            trees.push(tree);
        }

        let training_mae = mean_abs_diff(targets, &current);
        debug!(
            seed,
            n_trees = trees.len(),
            rows = n,
            training_mae,
            "fitted gradient boosted trees"
        );

        let model = Self {
            init,
            learning_rate: params.learning_rate,
            trees,
            n_features: set.n_features(),
            metadata: ModelMetadata {
                model_id: format!("gbrt_{}", Uuid::new_v4()),
                model_type: ModelType::GradientBoosting,
                seed,
                trained_at: Utc::now(),
                training_samples: n,
                feature_count: set.n_features(),
                training_mae,
            },
        };
        Ok((model, curve))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn init(&self) -> f64 {
        self.init
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

impl Regressor for GradientBoostedTrees {
    fn predict(&self, features: &[f64]) -> Result<f64, RegressionError> {
        check_feature_count(self.n_features, features)?;
        let boost: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        Ok(self.init + self.learning_rate * boost)
    }
}

fn mean_abs_diff(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len().max(1) as f64
}
