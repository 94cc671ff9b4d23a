//! Machine Learning Module
//!
//! Gradient-boosted regression trees for daily production forecasting:
//! - Regression trees grown on loss gradients
//! - Boosting with a least-absolute-deviation (robust) or squared loss
//! - Hyperparameter selection on an internal validation split
//! - Seed ensembles whose prediction is the mean of all members

pub mod ensemble;
pub mod gbrt;
pub mod loss;
pub mod models;
pub mod training;
pub mod tree;
pub mod tuning;

pub use ensemble::*;
pub use gbrt::*;
pub use loss::*;
pub use models::*;
pub use training::*;
pub use tree::*;
pub use tuning::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Regression errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    #[error("Cannot train on an empty learning set")]
    EmptyTrainingSet,

    #[error("Invalid validation split: {0}")]
    InvalidSplit(String),

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Row and target count mismatch: {rows} rows, {targets} targets")]
    TargetCountMismatch { rows: usize, targets: usize },

    #[error("Invalid hyperparameters: {0}")]
    InvalidParameters(String),
}

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    GradientBoosting,
    SeedEnsemble,
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub seed: u64,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub feature_count: usize,
    /// In-sample MAE after the last boosting stage
    pub training_mae: f64,
}
