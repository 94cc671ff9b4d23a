//! Held-out evaluation
//!
//! Scores predictions against observed production and collects the
//! per-method results into a report.

pub mod metrics;
pub mod report;

pub use metrics::*;
pub use report::*;

use thiserror::Error;

/// Evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Length mismatch: predicted={predicted}, observed={observed}")]
    LengthMismatch { predicted: usize, observed: usize },

    #[error("Empty data provided")]
    EmptyData,
}
