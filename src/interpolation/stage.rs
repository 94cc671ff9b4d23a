use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{Estimate, GaussianProcess, InterpolationConfig, InterpolationError};
use crate::domain::{MeasurementKey, Period, Site, StationValue, Variable};
use crate::ingest::MeasurementSet;

/// Interpolated fields of one site on one day, keyed by (period, variable).
pub type FieldEstimates = BTreeMap<(Period, Variable), Estimate>;

/// Interpolated fields for every (site, day).
#[derive(Debug, Clone, Default)]
pub struct SiteEstimates {
    entries: BTreeMap<(String, NaiveDate), FieldEstimates>,
}

impl SiteEstimates {
    pub fn get(&self, site_id: &str, day: NaiveDate) -> Option<&FieldEstimates> {
        self.entries.get(&(site_id.to_string(), day))
    }

    pub fn insert(
        &mut self,
        site_id: &str,
        day: NaiveDate,
        period: Period,
        variable: Variable,
        estimate: Estimate,
    ) {
        self.entries
            .entry((site_id.to_string(), day))
            .or_default()
            .insert((period, variable), estimate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, NaiveDate), &FieldEstimates)> {
        self.entries.iter()
    }
}

/// Fit one field, widening the nugget on numerical failure.
pub fn fit_with_retry(
    key: MeasurementKey,
    values: &[StationValue],
    config: &InterpolationConfig,
) -> Result<GaussianProcess, InterpolationError> {
    let mut nugget = config.nugget;
    let mut attempt = 0;
    loop {
        match GaussianProcess::fit(key, values, config.kernel, nugget) {
            Ok(gp) => return Ok(gp),
            Err(err @ InterpolationError::FitFailure { .. }) if attempt < config.nugget_retries => {
                warn!(%key, attempt, error = %err, "GP fit failed, retrying with a wider nugget");
                // A zero nugget cannot be widened multiplicatively.
                nugget = if nugget > 0.0 {
                    nugget * config.nugget_growth
                } else {
                    1e-6
                };
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Interpolate every field of every day at every site.
///
/// The expected fields are every day in `measurements` crossed with every
/// (period, variable) combination seen anywhere in it; a field absent on
/// some day is `DataMissing`. The first failure aborts the stage.
pub fn interpolate_sites(
    measurements: &MeasurementSet,
    sites: &[Site],
    config: &InterpolationConfig,
) -> Result<SiteEstimates, InterpolationError> {
    let pairs = measurements.pairs();
    let keys: Vec<MeasurementKey> = measurements
        .days()
        .into_iter()
        .flat_map(|day| {
            pairs
                .iter()
                .map(move |(period, variable)| MeasurementKey::new(day, *period, *variable))
        })
        .collect();

    info!(fields = keys.len(), sites = sites.len(), "interpolating NWP fields");

    let fitted = keys
        .par_iter()
        .map(|key| {
            let values = measurements
                .get(key)
                .ok_or(InterpolationError::DataMissing { key: *key })?;
            let gp = fit_with_retry(*key, values, config)?;
            let at_sites: Vec<Estimate> = sites.iter().map(|s| gp.predict(s.location)).collect();
            Ok((*key, at_sites))
        })
        .collect::<Result<Vec<_>, InterpolationError>>()?;

    let mut out = SiteEstimates::default();
    for (key, at_sites) in fitted {
        for (site, estimate) in sites.iter().zip(at_sites) {
            out.insert(&site.site_id, key.day, key.period, key.variable, estimate);
        }
    }
    Ok(out)
}
