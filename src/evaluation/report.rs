use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::{mean_absolute_error, EvaluationError};

/// Held-out score of one forecasting method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodScore {
    pub method: String,
    pub mae: f64,
}

/// Comparison table of method name to held-out MAE, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub train_days: usize,
    pub holdout_days: usize,
    pub holdout_samples: usize,
    pub rows: Vec<MethodScore>,
}

impl EvaluationReport {
    pub fn new(train_days: usize, holdout_days: usize, holdout_samples: usize) -> Self {
        Self {
            train_days,
            holdout_days,
            holdout_samples,
            rows: Vec::new(),
        }
    }

    /// Score `predicted` against `observed` and append the result.
    pub fn score(
        &mut self,
        method: impl Into<String>,
        predicted: &[f64],
        observed: &[f64],
    ) -> Result<f64, EvaluationError> {
        let mae = mean_absolute_error(predicted, observed)?;
        self.rows.push(MethodScore {
            method: method.into(),
            mae,
        });
        Ok(mae)
    }

    pub fn best(&self) -> Option<&MethodScore> {
        self.rows.iter().min_by(|a, b| a.mae.total_cmp(&b.mae))
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| Method | Held-out MAE |")?;
        writeln!(f, "|---|---|")?;
        for row in &self.rows {
            writeln!(f, "| {} | {:.4} |", row.method, row.mae)?;
        }
        Ok(())
    }
}
