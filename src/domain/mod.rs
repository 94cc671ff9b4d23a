pub mod measurement;
pub mod production;
pub mod site;

pub use measurement::*;
pub use production::*;
pub use site::*;

use serde::{Deserialize, Serialize};

/// Everything the pipeline consumes, as loaded from disk or generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub grid: Vec<GridPoint>,
    pub samples: Vec<MeasurementSample>,
    pub sites: Vec<Site>,
    pub production: Vec<ProductionRecord>,
}
