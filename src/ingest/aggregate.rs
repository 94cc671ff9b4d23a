use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use super::IngestError;
use crate::domain::{GridPoint, MeasurementKey, MeasurementSample, Period, StationValue, Variable};

/// Ensemble means grouped by interpolation problem.
///
/// Station values inside a key are ordered by location id, so fitting is
/// reproducible regardless of input row order.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSet {
    fields: BTreeMap<MeasurementKey, Vec<StationValue>>,
}

impl MeasurementSet {
    pub fn get(&self, key: &MeasurementKey) -> Option<&[StationValue]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct days, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.fields
            .keys()
            .map(|k| k.day)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every (period, variable) combination present anywhere in the set.
    pub fn pairs(&self) -> BTreeSet<(Period, Variable)> {
        self.fields
            .keys()
            .map(|k| (k.period, k.variable))
            .collect()
    }

    pub fn insert(&mut self, key: MeasurementKey, values: Vec<StationValue>) {
        self.fields.insert(key, values);
    }
}

/// Collapse ensemble members into one mean per (key, grid node).
///
/// Non-finite member values are skipped. A (key, node) whose members are
/// all non-finite contributes no station value; a key left with no
/// station values at all is not inserted, which the interpolation stage
/// reports as missing data.
pub fn aggregate_members(
    grid: &[GridPoint],
    samples: &[MeasurementSample],
) -> Result<MeasurementSet, IngestError> {
    let nodes: HashMap<&str, &GridPoint> = grid
        .iter()
        .map(|g| (g.location_id.as_str(), g))
        .collect();

    let mut sums: BTreeMap<(MeasurementKey, &str), (f64, usize)> = BTreeMap::new();
    let mut skipped = 0usize;

    for sample in samples {
        if !nodes.contains_key(sample.location_id.as_str()) {
            return Err(IngestError::UnknownLocation(sample.location_id.clone()));
        }
        if !sample.value.is_finite() {
            skipped += 1;
            continue;
        }
        let entry = sums
            .entry((sample.key(), sample.location_id.as_str()))
            .or_insert((0.0, 0));
        entry.0 += sample.value;
        entry.1 += 1;
    }

    if skipped > 0 {
        debug!(skipped, "dropped non-finite ensemble member values");
    }

    let mut fields: BTreeMap<MeasurementKey, Vec<StationValue>> = BTreeMap::new();
    for ((key, location_id), (sum, count)) in sums {
        // Presence checked above.
        let node = nodes[location_id];
        fields.entry(key).or_default().push(StationValue {
            location: node.location,
            value: sum / count as f64,
        });
    }

    Ok(MeasurementSet { fields })
}
