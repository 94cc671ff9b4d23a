use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumIter};

use super::{Combination, DailyAggregate, FeatureConfig, FeatureError};
use crate::domain::{Period, Variable};

/// Non-NWP features appended after the measurement columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum DerivedFeature {
    DayOfYear,
    Month,
    Latitude,
    Longitude,
    ElevationM,
    DaylightMinutes,
    SolarNoonMinutes,
    SunDistanceAu,
}

/// Meaning of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Estimate(Period, Variable),
    Variance(Period, Variable),
    Daily(Variable),
    /// Index into the layout's combinations
    Combination(usize),
    Derived(DerivedFeature),
}

/// Column order shared by every feature vector of a run.
#[derive(Debug, Clone)]
pub struct FeatureLayout {
    columns: Vec<Column>,
    names: Vec<String>,
    pairs: Vec<(Period, Variable)>,
    aggregate: DailyAggregate,
    combinations: Vec<Combination>,
}

impl FeatureLayout {
    /// Fix the column order for the (period, variable) combinations of a
    /// measurement set.
    ///
    /// Order: estimates (period ascending, then variable), variances in
    /// the same order, daily aggregates per variable, combinations in
    /// configuration order, then derived features.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Period, Variable)>,
        config: &FeatureConfig,
    ) -> Result<Self, FeatureError> {
        let pairs: Vec<(Period, Variable)> = pairs
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if pairs.is_empty() {
            return Err(FeatureError::EmptyLayout);
        }
        let variables: BTreeSet<Variable> = pairs.iter().map(|(_, v)| *v).collect();

        for combo in &config.combinations {
            for operand in [combo.lhs, combo.rhs] {
                let known = match operand.period {
                    Some(p) => pairs.contains(&(p, operand.variable)),
                    None => variables.contains(&operand.variable),
                };
                if !known {
                    return Err(FeatureError::UnknownOperand {
                        variable: operand.variable,
                        period: operand.period,
                    });
                }
            }
        }

        let mut columns: Vec<Column> = pairs.iter().map(|(p, v)| Column::Estimate(*p, *v)).collect();
        if config.include_variances {
            columns.extend(pairs.iter().map(|(p, v)| Column::Variance(*p, *v)));
        }
        if config.daily_aggregate != DailyAggregate::None {
            columns.extend(variables.iter().map(|v| Column::Daily(*v)));
        }
        columns.extend((0..config.combinations.len()).map(Column::Combination));

        let derived = &config.derived;
        if derived.calendar {
            columns.push(Column::Derived(DerivedFeature::DayOfYear));
            columns.push(Column::Derived(DerivedFeature::Month));
        }
        if derived.site {
            columns.push(Column::Derived(DerivedFeature::Latitude));
            columns.push(Column::Derived(DerivedFeature::Longitude));
            columns.push(Column::Derived(DerivedFeature::ElevationM));
        }
        if derived.solar {
            columns.push(Column::Derived(DerivedFeature::DaylightMinutes));
            columns.push(Column::Derived(DerivedFeature::SolarNoonMinutes));
            columns.push(Column::Derived(DerivedFeature::SunDistanceAu));
        }

        let names = columns
            .iter()
            .map(|c| match c {
                Column::Estimate(p, v) => format!("{v}_h{p}"),
                Column::Variance(p, v) => format!("{v}_h{p}_var"),
                Column::Daily(v) => format!("{v}_daily_{}", config.daily_aggregate),
                Column::Combination(i) => config.combinations[*i].column_name(),
                Column::Derived(d) => d.to_string(),
            })
            .collect();

        Ok(Self {
            columns,
            names,
            pairs,
            aggregate: config.daily_aggregate,
            combinations: config.combinations.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Measurement combinations every site-day must provide, in column order.
    pub fn pairs(&self) -> &[(Period, Variable)] {
        &self.pairs
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    /// Aggregate used for daily columns and for period-less operands;
    /// operands fall back to the mean when daily columns are disabled.
    pub fn operand_aggregate(&self) -> DailyAggregate {
        match self.aggregate {
            DailyAggregate::None => DailyAggregate::Mean,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{CombinationOp, DerivedFeatures, Operand};

    fn pairs() -> Vec<(Period, Variable)> {
        vec![
            (15, Variable::TcdcEatm),
            (12, Variable::DswrfSfc),
            (15, Variable::DswrfSfc),
            (12, Variable::TcdcEatm),
            (12, Variable::DswrfSfc),
        ]
    }

    #[test]
    fn test_column_order_is_period_then_variable() {
        let layout = FeatureLayout::from_pairs(pairs(), &FeatureConfig::default()).unwrap();
        assert_eq!(
            &layout.names()[..4],
            &["dswrf_sfc_h12", "tcdc_eatm_h12", "dswrf_sfc_h15", "tcdc_eatm_h15"]
        );
        assert_eq!(
            &layout.names()[4..8],
            &["dswrf_sfc_h12_var", "tcdc_eatm_h12_var", "dswrf_sfc_h15_var", "tcdc_eatm_h15_var"]
        );
        assert_eq!(&layout.names()[8..10], &["dswrf_sfc_daily_mean", "tcdc_eatm_daily_mean"]);
        assert_eq!(layout.names().last().unwrap(), "sun_distance_au");
        // 4 estimates + 4 variances + 2 daily + 8 derived
        assert_eq!(layout.len(), 18);
    }

    #[test]
    fn test_toggles_shrink_layout() {
        let config = FeatureConfig {
            include_variances: false,
            daily_aggregate: DailyAggregate::None,
            combinations: vec![],
            derived: DerivedFeatures {
                calendar: false,
                site: true,
                solar: false,
            },
        };
        let layout = FeatureLayout::from_pairs(pairs(), &config).unwrap();
        assert_eq!(
            layout.names(),
            &[
                "dswrf_sfc_h12",
                "tcdc_eatm_h12",
                "dswrf_sfc_h15",
                "tcdc_eatm_h15",
                "latitude",
                "longitude",
                "elevation_m"
            ]
        );
        assert_eq!(layout.operand_aggregate(), DailyAggregate::Mean);
    }

    #[test]
    fn test_unknown_operand_is_rejected() {
        let config = FeatureConfig {
            combinations: vec![Combination {
                name: None,
                op: CombinationOp::Ratio,
                lhs: Operand {
                    variable: Variable::DswrfSfc,
                    period: Some(21),
                },
                rhs: Operand {
                    variable: Variable::TcdcEatm,
                    period: None,
                },
            }],
            ..Default::default()
        };
        assert!(matches!(
            FeatureLayout::from_pairs(pairs(), &config),
            Err(FeatureError::UnknownOperand { variable: Variable::DswrfSfc, period: Some(21) })
        ));
    }

    #[test]
    fn test_empty_pairs() {
        assert!(matches!(
            FeatureLayout::from_pairs(Vec::new(), &FeatureConfig::default()),
            Err(FeatureError::EmptyLayout)
        ));
    }
}
