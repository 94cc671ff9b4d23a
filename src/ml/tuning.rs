//! Hyperparameter selection on a chronological validation split.

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BoostingParams, GradientBoostedTrees, LearningSet, RegressionError};

/// Candidate hyperparameters searched by [`select_hyperparameters`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningGrid {
    pub max_depths: Vec<usize>,
    pub learning_rates: Vec<f64>,
    /// Boosting stages fitted per candidate
    pub max_trees: usize,
    /// Pick the stage count with the lowest validation MAE instead of
    /// always keeping `max_trees`
    pub tune_n_trees: bool,
}

impl TuningGrid {
    /// Every (depth, rate) pair in grid order, depth-major.
    pub fn candidates(&self, base: &BoostingParams) -> Vec<BoostingParams> {
        self.max_depths
            .iter()
            .cartesian_product(self.learning_rates.iter())
            .map(|(&max_depth, &learning_rate)| BoostingParams {
                n_trees: self.max_trees,
                learning_rate,
                max_depth,
                ..base.clone()
            })
            .collect()
    }
}

/// Winning hyperparameters and their validation score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub params: BoostingParams,
    pub validation_mae: f64,
    pub candidates_evaluated: usize,
}

/// Search `grid` on an internal split of `set`.
///
/// Every candidate is fitted once with `seed` on the leading rows and
/// scored after each boosting stage on the trailing `validation_fraction`
/// of the rows. Ties go to the earlier candidate and the smaller stage
/// count.
pub fn select_hyperparameters(
    set: &LearningSet,
    base: &BoostingParams,
    grid: &TuningGrid,
    validation_fraction: f64,
    seed: u64,
) -> Result<TuningOutcome, RegressionError> {
    let candidates = grid.candidates(base);
    if candidates.is_empty() {
        return Err(RegressionError::InvalidParameters(
            "hyperparameter grid is empty".into(),
        ));
    }
    let (train, validation) = set.split(validation_fraction)?;

    let scored = candidates
        .into_par_iter()
        .map(|params| -> Result<(BoostingParams, f64), RegressionError> {
            let (_, curve) =
                GradientBoostedTrees::fit_staged(&train, &params, seed, &validation)?;
            let (n_trees, mae) = if grid.tune_n_trees {
                best_stage(&curve)
            } else {
                (curve.len(), curve.last().copied().unwrap_or(f64::INFINITY))
            };
            debug!(
                max_depth = params.max_depth,
                learning_rate = params.learning_rate,
                n_trees,
                validation_mae = mae,
                "scored hyperparameter candidate"
            );
            Ok((BoostingParams { n_trees, ..params }, mae))
        })
        .collect::<Result<Vec<_>, RegressionError>>()?;

    let candidates_evaluated = scored.len();
    let (params, validation_mae) = scored
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| RegressionError::InvalidParameters("no candidate was scored".into()))?;

    info!(
        max_depth = params.max_depth,
        learning_rate = params.learning_rate,
        n_trees = params.n_trees,
        validation_mae,
        candidates_evaluated,
        "selected boosting hyperparameters"
    );
    Ok(TuningOutcome {
        params,
        validation_mae,
        candidates_evaluated,
    })
}

/// 1-based stage count with the lowest MAE, first one on ties.
fn best_stage(curve: &[f64]) -> (usize, f64) {
    curve
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, mae)| (i + 1, mae))
        .unwrap_or((1, f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> LearningSet {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 10) as f64, (i % 3) as f64])
            .collect();
        let targets = rows.iter().map(|r| 3.0 * r[0] - 2.0 * r[1]).collect();
        LearningSet::new(rows, targets).unwrap()
    }

    fn grid() -> TuningGrid {
        TuningGrid {
            max_depths: vec![1, 3],
            learning_rates: vec![0.1, 0.5],
            max_trees: 40,
            tune_n_trees: true,
        }
    }

    #[test]
    fn test_candidates_are_depth_major() {
        let c = grid().candidates(&BoostingParams::default());
        let pairs: Vec<(usize, f64)> = c.iter().map(|p| (p.max_depth, p.learning_rate)).collect();
        assert_eq!(pairs, vec![(1, 0.1), (1, 0.5), (3, 0.1), (3, 0.5)]);
        assert!(c.iter().all(|p| p.n_trees == 40));
    }

    #[test]
    fn test_best_stage_prefers_first_minimum() {
        assert_eq!(best_stage(&[5.0, 2.0, 3.0, 2.0]), (2, 2.0));
    }

    #[test]
    fn test_selection_is_deterministic_and_in_grid() {
        let base = BoostingParams::default();
        let a = select_hyperparameters(&set(), &base, &grid(), 0.2, 3).unwrap();
        let b = select_hyperparameters(&set(), &base, &grid(), 0.2, 3).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.candidates_evaluated, 4);
        assert!([1, 3].contains(&a.params.max_depth));
        assert!((1..=40).contains(&a.params.n_trees));
    }

    #[test]
    fn test_fixed_tree_count() {
        let g = TuningGrid {
            tune_n_trees: false,
            ..grid()
        };
        let outcome =
            select_hyperparameters(&set(), &BoostingParams::default(), &g, 0.2, 3).unwrap();
        assert_eq!(outcome.params.n_trees, 40);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let g = TuningGrid {
            max_depths: vec![],
            ..grid()
        };
        assert!(matches!(
            select_hyperparameters(&set(), &BoostingParams::default(), &g, 0.2, 3),
            Err(RegressionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_unsplittable_set_is_rejected() {
        let tiny = LearningSet::new(vec![vec![1.0]], vec![1.0]).unwrap();
        assert!(matches!(
            select_hyperparameters(&tiny, &BoostingParams::default(), &grid(), 0.2, 3),
            Err(RegressionError::InvalidSplit(_))
        ));
    }
}
