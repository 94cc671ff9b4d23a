use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use super::{Column, DerivedFeature, FeatureError, FeatureLayout, SiteFeatures, SunTimes};
use crate::domain::{Period, Site, Variable};
use crate::interpolation::{Estimate, FieldEstimates, SiteEstimates};

/// Stateless transform from interpolated fields to feature vectors.
pub struct FeatureBuilder {
    layout: FeatureLayout,
}

impl FeatureBuilder {
    pub fn new(layout: FeatureLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Build the feature vector of one site on one day.
    ///
    /// Every (period, variable) combination of the layout must be present
    /// in `fields`, whether or not its column is emitted.
    pub fn build(
        &self,
        site: &Site,
        day: NaiveDate,
        fields: &FieldEstimates,
    ) -> Result<SiteFeatures, FeatureError> {
        let mut estimates: HashMap<(Period, Variable), Estimate> =
            HashMap::with_capacity(self.layout.pairs().len());
        for &(period, variable) in self.layout.pairs() {
            let estimate = fields.get(&(period, variable)).ok_or_else(|| {
                FeatureError::MissingCombination {
                    site_id: site.site_id.clone(),
                    day,
                    period,
                    variable,
                }
            })?;
            estimates.insert((period, variable), *estimate);
        }

        let aggregate = self.layout.operand_aggregate();
        let daily = |variable: Variable| -> f64 {
            let values: Vec<f64> = self
                .layout
                .pairs()
                .iter()
                .filter(|(_, v)| *v == variable)
                .map(|key| estimates[key].mean)
                .collect();
            aggregate.apply(&values).unwrap_or(0.0)
        };
        let operand = |variable: Variable, period: Option<Period>| -> f64 {
            match period {
                Some(p) => estimates[&(p, variable)].mean,
                None => daily(variable),
            }
        };

        let needs_sun = self.layout.columns().iter().any(|c| {
            matches!(
                c,
                Column::Derived(
                    DerivedFeature::DaylightMinutes
                        | DerivedFeature::SolarNoonMinutes
                        | DerivedFeature::SunDistanceAu
                )
            )
        });
        let sun = needs_sun.then(|| SunTimes::compute(day, site.location));

        let values = self
            .layout
            .columns()
            .iter()
            .map(|column| match *column {
                Column::Estimate(p, v) => estimates[&(p, v)].mean,
                Column::Variance(p, v) => estimates[&(p, v)].variance,
                Column::Daily(v) => daily(v),
                Column::Combination(i) => {
                    let combo = &self.layout.combinations()[i];
                    combo.op.apply(
                        operand(combo.lhs.variable, combo.lhs.period),
                        operand(combo.rhs.variable, combo.rhs.period),
                    )
                }
                Column::Derived(d) => derived_value(d, site, day, sun.as_ref()),
            })
            .collect();

        Ok(SiteFeatures {
            site_id: site.site_id.clone(),
            day,
            values,
        })
    }

    /// Build vectors for every site on every interpolated day.
    ///
    /// Output is ordered by day, then by the order of `sites`.
    pub fn build_all(
        &self,
        sites: &[Site],
        estimates: &SiteEstimates,
    ) -> Result<Vec<SiteFeatures>, FeatureError> {
        let days: BTreeSet<NaiveDate> = estimates.iter().map(|((_, day), _)| *day).collect();
        let empty = FieldEstimates::new();

        let mut out = Vec::with_capacity(days.len() * sites.len());
        for day in days {
            for site in sites {
                let fields = estimates.get(&site.site_id, day).unwrap_or(&empty);
                out.push(self.build(site, day, fields)?);
            }
        }

        info!(
            vectors = out.len(),
            columns = self.layout.len(),
            "built site feature vectors"
        );
        Ok(out)
    }
}

fn derived_value(feature: DerivedFeature, site: &Site, day: NaiveDate, sun: Option<&SunTimes>) -> f64 {
    let sun_value = |f: fn(&SunTimes) -> f64| sun.map(f).unwrap_or(0.0);
    match feature {
        DerivedFeature::DayOfYear => day.ordinal() as f64,
        DerivedFeature::Month => day.month() as f64,
        DerivedFeature::Latitude => site.location.latitude,
        DerivedFeature::Longitude => site.location.longitude,
        DerivedFeature::ElevationM => site.elevation_m,
        DerivedFeature::DaylightMinutes => sun_value(SunTimes::daylight_minutes),
        DerivedFeature::SolarNoonMinutes => sun_value(|s| s.solar_noon_utc_minutes),
        DerivedFeature::SunDistanceAu => sun_value(|s| s.sun_distance_au),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{
        Combination, CombinationOp, DailyAggregate, DerivedFeatures, FeatureConfig, Operand,
    };
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 6, 21).unwrap()
    }

    fn site() -> Site {
        Site::new("ACME", 34.8, -98.0, 397.0)
    }

    fn fields() -> FieldEstimates {
        let mut f = FieldEstimates::new();
        f.insert((12, Variable::DswrfSfc), Estimate { mean: 100.0, variance: 1.0 });
        f.insert((15, Variable::DswrfSfc), Estimate { mean: 300.0, variance: 2.0 });
        f.insert((12, Variable::UswrfSfc), Estimate { mean: 20.0, variance: 0.5 });
        f.insert((15, Variable::UswrfSfc), Estimate { mean: 60.0, variance: 0.25 });
        f
    }

    fn config() -> FeatureConfig {
        FeatureConfig {
            include_variances: true,
            daily_aggregate: DailyAggregate::Mean,
            combinations: vec![
                Combination {
                    name: Some("net_shortwave".into()),
                    op: CombinationOp::Difference,
                    lhs: Operand { variable: Variable::DswrfSfc, period: None },
                    rhs: Operand { variable: Variable::UswrfSfc, period: None },
                },
                Combination {
                    name: None,
                    op: CombinationOp::Ratio,
                    lhs: Operand { variable: Variable::UswrfSfc, period: Some(15) },
                    rhs: Operand { variable: Variable::DswrfSfc, period: Some(15) },
                },
            ],
            derived: DerivedFeatures::default(),
        }
    }

    fn builder() -> FeatureBuilder {
        let layout = FeatureLayout::from_pairs(fields().keys().copied(), &config()).unwrap();
        FeatureBuilder::new(layout)
    }

    #[test]
    fn test_build_values_follow_layout() {
        let b = builder();
        let features = b.build(&site(), day(), &fields()).unwrap();
        assert_eq!(features.values.len(), b.layout().len());

        let value = |name: &str| {
            let idx = b.layout().names().iter().position(|n| n == name).unwrap();
            features.values[idx]
        };
        assert_eq!(value("dswrf_sfc_h12"), 100.0);
        assert_eq!(value("uswrf_sfc_h15_var"), 0.25);
        assert_eq!(value("dswrf_sfc_daily_mean"), 200.0);
        assert_eq!(value("uswrf_sfc_daily_mean"), 40.0);
        assert_eq!(value("net_shortwave"), 160.0);
        assert_eq!(value("uswrf_sfc_h15_ratio_dswrf_sfc_h15"), 0.2);
        assert_eq!(value("day_of_year"), 173.0);
        assert_eq!(value("month"), 6.0);
        assert_eq!(value("elevation_m"), 397.0);
        assert!(value("daylight_minutes") > 800.0);
    }

    #[test]
    fn test_missing_combination_is_an_error() {
        let mut partial = fields();
        partial.remove(&(15, Variable::UswrfSfc));
        let err = builder().build(&site(), day(), &partial).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::MissingCombination { period: 15, variable: Variable::UswrfSfc, .. }
        ));
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = builder();
        assert_eq!(
            b.build(&site(), day(), &fields()).unwrap(),
            b.build(&site(), day(), &fields()).unwrap()
        );
    }

    #[test]
    fn test_build_all_orders_by_day_then_site() {
        let sites = vec![Site::new("B", 35.0, -97.0, 300.0), Site::new("A", 36.0, -99.0, 500.0)];
        let mut estimates = SiteEstimates::default();
        for d in [day().succ_opt().unwrap(), day()] {
            for s in &sites {
                for ((p, v), e) in fields() {
                    estimates.insert(&s.site_id, d, p, v, e);
                }
            }
        }
        let all = builder().build_all(&sites, &estimates).unwrap();
        let order: Vec<(String, NaiveDate)> =
            all.iter().map(|f| (f.site_id.clone(), f.day)).collect();
        assert_eq!(
            order,
            vec![
                ("B".to_string(), day()),
                ("A".to_string(), day()),
                ("B".to_string(), day().succ_opt().unwrap()),
                ("A".to_string(), day().succ_opt().unwrap()),
            ]
        );
    }

    #[test]
    fn test_build_all_reports_site_without_estimates() {
        let sites = vec![site(), Site::new("GHOST", 35.0, -97.0, 300.0)];
        let mut estimates = SiteEstimates::default();
        for ((p, v), e) in fields() {
            estimates.insert("ACME", day(), p, v, e);
        }
        assert!(matches!(
            builder().build_all(&sites, &estimates),
            Err(FeatureError::MissingCombination { site_id, .. }) if site_id == "GHOST"
        ));
    }

    proptest! {
        #[test]
        fn prop_feature_length_is_constant(
            lat in -60.0f64..60.0,
            lon in -180.0f64..180.0,
            elevation in 0.0f64..3000.0,
            ordinal in 1u32..366,
            means in prop::collection::vec(-1000.0f64..1000.0, 4),
        ) {
            let b = builder();
            let d = NaiveDate::from_yo_opt(2008, ordinal).unwrap();
            let mut f = fields();
            for (estimate, mean) in f.values_mut().zip(means) {
                estimate.mean = mean;
            }
            let features = b.build(&Site::new("S", lat, lon, elevation), d, &f).unwrap();
            prop_assert_eq!(features.values.len(), b.layout().len());
            prop_assert!(features.values.iter().all(|v| v.is_finite()));
        }
    }
}
