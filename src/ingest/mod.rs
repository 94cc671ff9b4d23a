//! Data ingest
//!
//! Loads the four CSV inputs (grid nodes, ensemble measurements, sites,
//! production) and collapses ensemble members into per-node means.

pub mod aggregate;
pub mod csv;

pub use aggregate::*;
pub use self::csv::*;

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Ingest errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Measurement references unknown grid location '{0}'")]
    UnknownLocation(String),

    #[error("Production record references unknown site '{0}'")]
    UnknownSite(String),

    #[error("Duplicate identifier '{0}'")]
    Duplicate(String),

    #[error("Duplicate production record for site '{site_id}' on {day}")]
    DuplicateProduction { site_id: String, day: NaiveDate },

    #[error("Production energy for site '{site_id}' on {day} is not finite")]
    NonFinite { site_id: String, day: NaiveDate },

    #[error("No {0} found in input")]
    Empty(&'static str),
}
