use anyhow::{anyhow, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::features::FeatureConfig;
use crate::interpolation::InterpolationConfig;
use crate::ml::EnsembleConfig;
use crate::simulation::SyntheticConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the grids and production records come from
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    Csv(CsvPaths),
    Synthetic(SyntheticConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvPaths {
    pub grid: PathBuf,
    pub measurements: PathBuf,
    pub sites: PathBuf,
    pub production: PathBuf,
}

impl CsvPaths {
    /// Standard file names inside one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            grid: dir.join("grid.csv"),
            measurements: dir.join("measurements.csv"),
            sites: dir.join("sites.csv"),
            production: dir.join("production.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Trailing share of the days held out for scoring
    pub holdout_fraction: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for interpolation and training; all cores when unset
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub report_json: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("SOLARIS__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let DataConfig::Synthetic(synthetic) = &self.data {
            synthetic.validate().map_err(|e| anyhow!("data: {e}"))?;
        }
        self.interpolation
            .validate()
            .map_err(|e| anyhow!("interpolation: {e}"))?;
        self.ensemble
            .validate()
            .map_err(|e| anyhow!("ensemble: {e}"))?;
        let holdout = self.evaluation.holdout_fraction;
        if !(holdout > 0.0 && holdout < 1.0) {
            return Err(anyhow!(
                "evaluation: holdout_fraction must be in (0, 1), got {holdout}"
            ));
        }
        if self.runtime.threads == Some(0) {
            return Err(anyhow!("runtime: threads must be at least 1 when set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::DailyAggregate;
    use crate::ml::Loss;

    fn parse(toml: &str) -> Result<Config> {
        Config::from_figment(Figment::from(Toml::string(toml)))
    }

    #[test]
    fn test_minimal_synthetic_config_uses_defaults() {
        let config = parse(
            r#"
            [data]
            source = "synthetic"
            days = 30
            "#,
        )
        .unwrap();
        match config.data {
            DataConfig::Synthetic(s) => {
                assert_eq!(s.days, 30);
                assert_eq!(s.members, SyntheticConfig::default().members);
            }
            DataConfig::Csv(_) => panic!("expected synthetic data"),
        }
        assert_eq!(config.ensemble.loss, Loss::LeastAbsoluteDeviation);
        assert_eq!(config.evaluation.holdout_fraction, 0.2);
        assert!(config.output.report_json.is_none());
    }

    #[test]
    fn test_csv_config_with_sections() {
        let config = parse(
            r#"
            [data]
            source = "csv"
            grid = "data/grid.csv"
            measurements = "data/measurements.csv"
            sites = "data/sites.csv"
            production = "data/production.csv"

            [features]
            include_variances = false
            daily_aggregate = "sum"

            [[features.combinations]]
            name = "net_shortwave"
            op = "difference"
            lhs = { variable = "dswrf_sfc" }
            rhs = { variable = "uswrf_sfc" }

            [ensemble]
            n_models = 4
            loss = "least_squares"
            "#,
        )
        .unwrap();
        match &config.data {
            DataConfig::Csv(paths) => {
                assert_eq!(paths.grid, PathBuf::from("data/grid.csv"));
            }
            DataConfig::Synthetic(_) => panic!("expected csv data"),
        }
        assert!(!config.features.include_variances);
        assert_eq!(config.features.daily_aggregate, DailyAggregate::Sum);
        assert_eq!(config.features.combinations.len(), 1);
        assert_eq!(config.ensemble.n_models, 4);
        assert_eq!(config.ensemble.loss, Loss::LeastSquares);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let err = parse(
            r#"
            [data]
            source = "synthetic"
            [evaluation]
            holdout_fraction = 1.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("holdout_fraction"));

        assert!(parse(
            r#"
            [data]
            source = "synthetic"
            [ensemble]
            subsample = 0.0
            "#
        )
        .is_err());
    }

    #[test]
    fn test_csv_paths_in_dir() {
        let paths = CsvPaths::in_dir("/tmp/solar");
        assert_eq!(paths.sites, PathBuf::from("/tmp/solar/sites.csv"));
    }
}
