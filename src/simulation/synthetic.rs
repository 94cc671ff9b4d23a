//! Seeded synthetic datasets: an NWP grid with ensemble members, sites
//! inside the grid and their daily production.

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::info;

use super::{cloud_transmission, ClearSkyModel, CloudCover};
use crate::domain::{
    Dataset, GeoPoint, GridPoint, MeasurementSample, Period, ProductionRecord, Site, Variable,
};

/// Synthetic data generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start_date: NaiveDate,
    pub days: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub n_sites: usize,
    /// Ensemble members per grid node
    pub members: u16,
    pub periods: Vec<Period>,
    pub variables: Vec<Variable>,
    /// Member spread relative to the true field value
    pub member_noise: f64,
    /// Production noise relative to the true daily energy
    pub production_noise: f64,
    /// Probability that a site reports zero (failed sensor) on a day
    pub sensor_failure_rate: f64,
    /// Installed capacity per site in kW
    pub capacity_kw: f64,
    /// System losses (inverter, wiring, etc., typical 0.85)
    pub system_efficiency: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            start_date: NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or_default(),
            days: 120,
            grid_rows: 4,
            grid_cols: 5,
            lat_min: 34.0,
            lat_max: 37.0,
            lon_min: -100.0,
            lon_max: -95.0,
            n_sites: 8,
            members: 3,
            periods: vec![12, 15, 18, 21, 24],
            variables: vec![
                Variable::DswrfSfc,
                Variable::TcdcEatm,
                Variable::Tmp2m,
                Variable::ApcpSfc,
            ],
            member_noise: 0.05,
            production_noise: 0.02,
            sensor_failure_rate: 0.01,
            capacity_kw: 1000.0,
            system_efficiency: 0.85,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.days == 0 || self.n_sites == 0 || self.members == 0 {
            return Err("days, n_sites and members must be at least 1".to_string());
        }
        if self.grid_rows < 2 || self.grid_cols < 2 {
            return Err("grid needs at least 2 rows and 2 columns".to_string());
        }
        if !(self.lat_min < self.lat_max && self.lon_min < self.lon_max) {
            return Err("grid bounds are empty".to_string());
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err("latitudes must be within [-90, 90]".to_string());
        }
        if self.periods.is_empty() || self.variables.is_empty() {
            return Err("periods and variables must not be empty".to_string());
        }
        if self.member_noise < 0.0 || self.production_noise < 0.0 {
            return Err("noise levels must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.sensor_failure_rate) {
            return Err("sensor_failure_rate must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Spatially smooth cloud fraction over the region for one day.
#[derive(Debug, Clone, Copy)]
struct CloudField {
    base: f64,
    amplitude: f64,
    lat_phase: f64,
    lon_phase: f64,
}

impl CloudField {
    fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            base: CloudCover::random(rng).fraction(),
            amplitude: rng.gen_range(0.05..0.25),
            lat_phase: rng.gen_range(0.0..2.0 * PI),
            lon_phase: rng.gen_range(0.0..2.0 * PI),
        }
    }

    fn at(&self, location: GeoPoint) -> f64 {
        let wave = (location.latitude * 0.9 + self.lat_phase).sin()
            * (location.longitude * 0.7 + self.lon_phase).cos();
        (self.base + self.amplitude * wave).clamp(0.0, 1.0)
    }
}

/// Generate a complete dataset. Identical configurations give identical
/// datasets.
pub fn generate(config: &SyntheticConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let grid = grid_points(config, &mut rng);
    let sites = sites(config, &mut rng);

    let mut samples = Vec::with_capacity(
        config.days
            * grid.len()
            * config.periods.len()
            * config.variables.len()
            * config.members as usize,
    );
    let mut production = Vec::with_capacity(config.days * sites.len());

    for offset in 0..config.days {
        let day = config.start_date + Duration::days(offset as i64);
        let clouds = CloudField::random(&mut rng);

        for node in &grid {
            let cloud = clouds.at(node.location);
            let model = ClearSkyModel::new(node.location);
            for &period in &config.periods {
                let time = day.and_time(chrono::NaiveTime::MIN) + Duration::hours(period as i64);
                let irradiance = model.clear_sky_irradiance(time) * cloud_transmission(cloud);
                for &variable in &config.variables {
                    let truth = field_value(variable, day, irradiance, cloud);
                    let scale = truth.abs().max(1.0) * config.member_noise;
                    for member in 0..config.members {
                        let z: f64 = rng.sample(StandardNormal);
                        samples.push(MeasurementSample {
                            location_id: node.location_id.clone(),
                            day,
                            period,
                            variable,
                            member,
                            value: truth + scale * z,
                        });
                    }
                }
            }
        }

        for site in &sites {
            let insolation = ClearSkyModel::new(site.location).daily_insolation(day)
                * cloud_transmission(clouds.at(site.location));
            let z: f64 = rng.sample(StandardNormal);
            let energy = if rng.gen_bool(config.sensor_failure_rate) {
                0.0
            } else {
                let expected = insolation * config.capacity_kw * config.system_efficiency;
                (expected * (1.0 + config.production_noise * z)).max(0.0)
            };
            production.push(ProductionRecord {
                site_id: site.site_id.clone(),
                day,
                energy,
            });
        }
    }

    info!(
        seed = config.seed,
        days = config.days,
        grid_points = grid.len(),
        sites = sites.len(),
        samples = samples.len(),
        "generated synthetic dataset"
    );

    Dataset {
        grid,
        samples,
        sites,
        production,
    }
}

fn grid_points(config: &SyntheticConfig, rng: &mut StdRng) -> Vec<GridPoint> {
    let lat_step = (config.lat_max - config.lat_min) / (config.grid_rows - 1) as f64;
    let lon_step = (config.lon_max - config.lon_min) / (config.grid_cols - 1) as f64;
    let mut grid = Vec::with_capacity(config.grid_rows * config.grid_cols);
    for r in 0..config.grid_rows {
        for c in 0..config.grid_cols {
            grid.push(GridPoint {
                location_id: format!("g{r}_{c}"),
                location: GeoPoint::new(
                    config.lat_min + r as f64 * lat_step,
                    config.lon_min + c as f64 * lon_step,
                ),
                elevation_m: rng.gen_range(200.0..600.0),
            });
        }
    }
    grid
}

fn sites(config: &SyntheticConfig, rng: &mut StdRng) -> Vec<Site> {
    (0..config.n_sites)
        .map(|i| {
            Site::new(
                format!("S{:02}", i + 1),
                rng.gen_range(config.lat_min..config.lat_max),
                rng.gen_range(config.lon_min..config.lon_max),
                rng.gen_range(200.0..600.0),
            )
        })
        .collect()
}

/// True value of a field given the cloud-attenuated irradiance.
fn field_value(variable: Variable, day: NaiveDate, irradiance: f64, cloud: f64) -> f64 {
    let season = (2.0 * PI * (day.ordinal() as f64 - 105.0) / 365.0).sin();
    let tmp_2m = 288.0 + 12.0 * season + 0.01 * irradiance - 3.0 * cloud;
    match variable {
        Variable::ApcpSfc => ((cloud - 0.7) * 10.0).max(0.0),
        Variable::DlwrfSfc => 280.0 + 90.0 * cloud + 2.0 * (tmp_2m - 288.0),
        Variable::DswrfSfc => irradiance,
        Variable::PresMsl => 101_325.0 - 1_500.0 * cloud,
        Variable::PwatEatm => 10.0 + 35.0 * cloud,
        Variable::Spfh2m => 0.004 + 0.008 * cloud + 0.0002 * (tmp_2m - 288.0),
        Variable::TcdcEatm => 100.0 * cloud,
        Variable::TcolcEatm => 0.5 * cloud * cloud,
        Variable::Tmax2m => tmp_2m + 2.0,
        Variable::Tmin2m => tmp_2m - 2.0,
        Variable::Tmp2m => tmp_2m,
        Variable::TmpSfc => tmp_2m + 0.005 * irradiance,
        Variable::UlwrfSfc => 5.67e-8 * tmp_2m.powi(4),
        Variable::UlwrfTatm => 240.0 - 60.0 * cloud,
        Variable::UswrfSfc => 0.2 * irradiance,
    }
}
