//! Daily solar energy forecasting from ensemble NWP grids.
//!
//! Ensemble weather fields are interpolated to each site with a Gaussian
//! process, turned into fixed-layout feature vectors, and fed to a seed
//! ensemble of gradient-boosted regression trees that is scored by mean
//! absolute error on held-out days.

pub mod config;
pub mod domain;
pub mod evaluation;
pub mod features;
pub mod ingest;
pub mod interpolation;
pub mod ml;
pub mod pipeline;
pub mod simulation;
pub mod telemetry;
