//! # Synthetic Weather and Production
//!
//! Generates datasets with the same shape as real ensemble grids and
//! production records:
//!
//! - **Clear sky**: solar position and clear-sky irradiance for any location
//! - **Clouds**: a daily regime plus a spatially smooth cloud field
//! - **Synthetic**: grid nodes, ensemble members with Gaussian spread, sites
//!   inside the grid and their daily energy, with occasional failed sensors

pub mod clear_sky;
pub mod synthetic;

pub use clear_sky::*;
pub use synthetic::*;
