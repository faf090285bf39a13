use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use tracing::debug;

use crate::{frame::columns, Error, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Group {
    Control,
    Treatment,
}

impl Group {
    pub fn from_indicator(treated: bool) -> Self {
        if treated {
            Self::Treatment
        } else {
            Self::Control
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Treatment => "Treatment",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i64,
    pub group: Group,
    pub weighted_mean: f64,
    pub weight_sum: f64,
    pub n: usize,
}

/// Weighted mean log-income per `(year, group)`, ordered by year and then
/// group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    points: Vec<TrendPoint>,
}

#[derive(Default)]
struct Acc {
    weighted: f64,
    weight: f64,
    n: usize,
}

impl Trends {
    /// `sum(log_income * weight) / sum(weight)` for every year and group. Rows
    /// with a missing income, weight, year or group are left out of both sums.
    #[tracing::instrument(skip(frame))]
    pub fn from_frame(frame: &Frame) -> Result<Self, Error> {
        let years = frame.numeric(columns::YEAR)?;
        let treat = frame.indicator(columns::TREAT)?;
        let income = frame.numeric(columns::LOG_INCOME)?;
        let weight = frame.numeric(columns::WEIGHT)?;

        let mut acc: BTreeMap<(i64, Group), Acc> = BTreeMap::new();
        let mut skipped = 0;
        for i in 0..frame.nrows() {
            let (year, y, w) = (years[i], income[i], weight[i]);
            let Some(treated) = treat[i] else {
                skipped += 1;
                continue;
            };
            // a missing income also keeps the row's weight out of the denominator
            if year.is_nan() || y.is_nan() || w.is_nan() {
                skipped += 1;
                continue;
            }
            if year.fract() != 0.0 {
                return Err(Error::InvalidValue {
                    column: columns::YEAR.to_string(),
                    row: i + 1,
                    value: year.to_string(),
                });
            }
            let a = acc
                .entry((year as i64, Group::from_indicator(treated)))
                .or_default();
            a.weighted += y * w;
            a.weight += w;
            a.n += 1;
        }
        debug!(groups = acc.len(), skipped, "Aggregated trends");
        Ok(Self {
            points: acc
                .into_iter()
                .map(|((year, group), a)| TrendPoint {
                    year,
                    group,
                    weighted_mean: a.weighted / a.weight,
                    weight_sum: a.weight,
                    n: a.n,
                })
                .collect(),
        })
    }

    pub fn points(&self) -> &[TrendPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points of a single group, in year order.
    pub fn series(&self, group: Group) -> impl Iterator<Item = &TrendPoint> {
        self.points.iter().filter(move |p| p.group == group)
    }

    pub fn years(&self) -> Vec<i64> {
        let mut years = self.points.iter().map(|p| p.year).collect::<Vec<_>>();
        years.dedup();
        years
    }

    pub fn get(&self, year: i64, group: Group) -> Option<&TrendPoint> {
        self.points
            .iter()
            .find(|p| p.year == year && p.group == group)
    }
}
