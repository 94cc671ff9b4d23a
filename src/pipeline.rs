//! End-to-end run: grids to held-out scores.
//!
//! aggregate members -> interpolate at sites -> build features -> split
//! days -> train -> predict -> score against baselines.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

use crate::config::{Config, DataConfig};
use crate::domain::{Dataset, SitePrediction};
use crate::evaluation::{EvaluationReport, ForecastMetrics};
use crate::features::{FeatureBuilder, FeatureLayout, SiteFeatures};
use crate::ingest::{aggregate_members, check_references, load_dataset};
use crate::interpolation::interpolate_sites;
use crate::ml::{train_ensemble, BoostingParams, LearningSet};
use crate::simulation;

pub const CLIMATOLOGY: &str = "Climatology (per-site mean)";
pub const SINGLE_GBRT: &str = "GBRT (single seed)";
pub const ENSEMBLE_GBRT: &str = "GBRT seed ensemble";

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub report: EvaluationReport,
    pub ensemble_metrics: ForecastMetrics,
    pub params: BoostingParams,
    pub feature_names: Vec<String>,
    pub predictions: Vec<SitePrediction>,
}

/// One feature vector joined with its observed production
struct Labelled<'a> {
    features: &'a SiteFeatures,
    energy: f64,
}

/// Load the configured data source.
pub fn load_data(config: &Config) -> Result<Dataset> {
    match &config.data {
        DataConfig::Csv(paths) => load_dataset(paths).context("loading CSV dataset"),
        DataConfig::Synthetic(synthetic) => {
            let dataset = simulation::generate(synthetic);
            check_references(&dataset).context("checking synthetic dataset")?;
            Ok(dataset)
        }
    }
}

/// Run every stage on `dataset` and score the held-out days.
pub fn run(dataset: &Dataset, config: &Config) -> Result<PipelineOutcome> {
    check_references(dataset).context("checking dataset")?;
    let measurements = aggregate_members(&dataset.grid, &dataset.samples)
        .context("aggregating ensemble members")?;
    info!(
        fields = measurements.len(),
        days = measurements.days().len(),
        "aggregated ensemble members"
    );

    let estimates = interpolate_sites(&measurements, &dataset.sites, &config.interpolation)
        .context("interpolating fields at sites")?;

    let layout = FeatureLayout::from_pairs(measurements.pairs(), &config.features)
        .context("building feature layout")?;
    let builder = FeatureBuilder::new(layout);
    let features = builder
        .build_all(&dataset.sites, &estimates)
        .context("building feature vectors")?;

    let labelled = join_production(dataset, &features);
    let (train, holdout, train_days, holdout_days) =
        split_days(&labelled, config.evaluation.holdout_fraction)?;
    info!(
        train_rows = train.len(),
        holdout_rows = holdout.len(),
        train_days,
        holdout_days,
        "split labelled days"
    );

    let learning_set = LearningSet::new(
        train.iter().map(|l| l.features.values.clone()).collect(),
        train.iter().map(|l| l.energy).collect(),
    )
    .context("assembling learning set")?;
    let trained = train_ensemble(&learning_set, &config.ensemble).context("training ensemble")?;

    let holdout_rows: Vec<Vec<f64>> = holdout.iter().map(|l| l.features.values.clone()).collect();
    let observed: Vec<f64> = holdout.iter().map(|l| l.energy).collect();

    let climatology = climatology(&train, &holdout);
    let single = trained
        .predict_single(&holdout_rows)
        .context("predicting with a single model")?;
    let ensemble = trained
        .predict_batch(&holdout_rows)
        .context("predicting with the ensemble")?;

    let mut report = EvaluationReport::new(train_days, holdout_days, holdout.len());
    report.score(CLIMATOLOGY, &climatology, &observed)?;
    report.score(SINGLE_GBRT, &single, &observed)?;
    report.score(
        format!("{ENSEMBLE_GBRT} ({} models)", trained.ensemble.len()),
        &ensemble,
        &observed,
    )?;
    let ensemble_metrics = ForecastMetrics::calculate(&ensemble, &observed)?;
    info!(%ensemble_metrics, "scored held-out days");

    let predictions = holdout
        .iter()
        .zip(&ensemble)
        .map(|(l, &energy)| SitePrediction {
            site_id: l.features.site_id.clone(),
            day: l.features.day,
            energy,
        })
        .collect();

    Ok(PipelineOutcome {
        report,
        ensemble_metrics,
        params: trained.params,
        feature_names: builder.layout().names().to_vec(),
        predictions,
    })
}

/// Pair feature vectors with production, keeping feature order.
fn join_production<'a>(dataset: &Dataset, features: &'a [SiteFeatures]) -> Vec<Labelled<'a>> {
    let energy: HashMap<(&str, NaiveDate), f64> = dataset
        .production
        .iter()
        .map(|r| ((r.site_id.as_str(), r.day), r.energy))
        .collect();

    let labelled: Vec<Labelled<'a>> = features
        .iter()
        .filter_map(|f| {
            energy
                .get(&(f.site_id.as_str(), f.day))
                .map(|&energy| Labelled { features: f, energy })
        })
        .collect();

    let unlabelled = features.len() - labelled.len();
    if unlabelled > 0 {
        warn!(unlabelled, "feature vectors without observed production were skipped");
    }
    let unmatched = dataset.production.len().saturating_sub(labelled.len());
    if unmatched > 0 {
        warn!(unmatched, "production records without NWP coverage were skipped");
    }
    labelled
}

/// Split on whole days: the trailing `holdout_fraction` of the labelled
/// days is held out.
fn split_days<'a, 'b>(
    labelled: &'b [Labelled<'a>],
    holdout_fraction: f64,
) -> Result<(Vec<&'b Labelled<'a>>, Vec<&'b Labelled<'a>>, usize, usize)> {
    let days: Vec<NaiveDate> = labelled
        .iter()
        .map(|l| l.features.day)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if days.len() < 2 {
        bail!(
            "need at least two days with both NWP data and production, found {}",
            days.len()
        );
    }

    let holdout_days =
        ((days.len() as f64 * holdout_fraction).round() as usize).clamp(1, days.len() - 1);
    let first_holdout = days[days.len() - holdout_days];

    let (train, holdout): (Vec<_>, Vec<_>) =
        labelled.iter().partition(|l| l.features.day < first_holdout);
    Ok((train, holdout, days.len() - holdout_days, holdout_days))
}

/// Mean training production of each site; sites never seen in training
/// fall back to the overall mean.
fn climatology(train: &[&Labelled<'_>], holdout: &[&Labelled<'_>]) -> Vec<f64> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for l in train {
        let entry = sums.entry(l.features.site_id.as_str()).or_insert((0.0, 0));
        entry.0 += l.energy;
        entry.1 += 1;
    }
    let overall = train.iter().map(|l| l.energy).sum::<f64>() / train.len().max(1) as f64;

    holdout
        .iter()
        .map(|l| match sums.get(l.features.site_id.as_str()) {
            Some(&(sum, count)) => sum / count as f64,
            None => overall,
        })
        .collect()
}
