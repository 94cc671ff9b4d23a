//! Learning sets and chronological validation splits.

use serde::{Deserialize, Serialize};

use super::RegressionError;

/// Feature rows with their targets, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSet {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    n_features: usize,
}

impl LearningSet {
    pub fn new(rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self, RegressionError> {
        if rows.len() != targets.len() {
            return Err(RegressionError::TargetCountMismatch {
                rows: rows.len(),
                targets: targets.len(),
            });
        }
        let n_features = match rows.first() {
            Some(row) => row.len(),
            None => return Err(RegressionError::EmptyTrainingSet),
        };
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(RegressionError::FeatureCountMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        Ok(Self {
            rows,
            targets,
            n_features,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Feature-major copy of the rows, one vector per column.
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.n_features)
            .map(|j| self.rows.iter().map(|row| row[j]).collect())
            .collect()
    }

    /// Split into training and validation sets.
    ///
    /// The last `validation_fraction` of the rows becomes the validation
    /// set, so later days never leak into training.
    pub fn split(
        &self,
        validation_fraction: f64,
    ) -> Result<(LearningSet, LearningSet), RegressionError> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(RegressionError::InvalidSplit(format!(
                "validation fraction must be in (0, 1), got {validation_fraction}"
            )));
        }

        let split_idx = (self.len() as f64 * (1.0 - validation_fraction)).floor() as usize;
        if split_idx == 0 || split_idx >= self.len() {
            return Err(RegressionError::InvalidSplit(format!(
                "{} rows cannot be split with validation fraction {validation_fraction}",
                self.len()
            )));
        }

        let train = LearningSet {
            rows: self.rows[..split_idx].to_vec(),
            targets: self.targets[..split_idx].to_vec(),
            n_features: self.n_features,
        };
        let val = LearningSet {
            rows: self.rows[split_idx..].to_vec(),
            targets: self.targets[split_idx..].to_vec(),
            n_features: self.n_features,
        };
        Ok((train, val))
    }
}
