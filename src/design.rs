use std::{cmp::Ordering, collections::BTreeMap};

use faer::{Mat, MatRef};
use tracing::debug;

use crate::{frame::columns, Error, Frame};

pub const FORMULA: &str = "log_renda ~ treat * post + idade + C(sexo) + C(cor_raca)";
pub const INTERCEPT: &str = "Intercept";
/// The Difference-in-Differences term.
pub const INTERACTION: &str = "treat:post";

/// Distinct labels of a categorical column. Sorted numerically when every
/// label is a number, lexically otherwise. The first level is the reference.
fn levels<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut levels = values.collect::<Vec<_>>();
    levels.sort_unstable();
    levels.dedup();
    let numeric = levels
        .iter()
        .map(|l| l.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>();
    if let Some(numeric) = numeric {
        let mut pairs = numeric.into_iter().zip(levels).collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        pairs.into_iter().map(|(_, l)| l).collect()
    } else {
        levels
    }
}

/// Treatment-coded indicator columns for every non-reference level.
fn dummies(name: &str, values: &[&str]) -> Vec<(String, Vec<f64>)> {
    let levels = levels(values.iter().copied());
    levels
        .iter()
        .skip(1)
        .map(|level| {
            (
                format!("C({})[T.{}]", name, level),
                values
                    .iter()
                    .map(|v| if v == level { 1.0 } else { 0.0 })
                    .collect(),
            )
        })
        .collect()
}

/// Model inputs for `log_renda ~ treat * post + idade + C(sexo) + C(cor_raca)`
/// weighted by `peso_amostral` and clustered by `UF`.
#[derive(Debug, Clone)]
pub struct Design {
    x: Mat<f64>,
    y: Vec<f64>,
    weights: Vec<f64>,
    clusters: Vec<usize>,
    cluster_labels: Vec<String>,
    colnames: Vec<String>,
    dropped: usize,
}

impl Design {
    /// Build the design from the observation table. Rows with a missing value
    /// in any column the model uses are dropped.
    #[tracing::instrument(skip(frame))]
    pub fn did(frame: &Frame) -> Result<Self, Error> {
        let income = frame.numeric(columns::LOG_INCOME)?;
        let treat = frame.indicator(columns::TREAT)?;
        let post = frame.indicator(columns::POST)?;
        let age = frame.numeric(columns::AGE)?;
        let sex = frame.categorical(columns::SEX)?;
        let race = frame.categorical(columns::RACE)?;
        let weight = frame.numeric(columns::WEIGHT)?;
        let region = frame.categorical(columns::REGION)?;

        let mut rows = Vec::with_capacity(frame.nrows());
        for i in 0..frame.nrows() {
            let (Some(t), Some(p), Some(s), Some(r), Some(g)) =
                (treat[i], post[i], sex[i], race[i], region[i])
            else {
                continue;
            };
            if income[i].is_nan() || age[i].is_nan() || weight[i].is_nan() {
                continue;
            }
            if weight[i] <= 0.0 {
                return Err(Error::InvalidValue {
                    column: columns::WEIGHT.to_string(),
                    row: i + 1,
                    value: weight[i].to_string(),
                });
            }
            rows.push((i, t, p, s, r, g));
        }
        let n = rows.len();
        let dropped = frame.nrows() - n;
        if n == 0 {
            return Err(Error::NoObservations);
        }

        let sex_values = rows.iter().map(|r| r.3).collect::<Vec<_>>();
        let race_values = rows.iter().map(|r| r.4).collect::<Vec<_>>();
        let as_f64 = |b: bool| if b { 1.0 } else { 0.0 };

        let mut cols: Vec<(String, Vec<f64>)> = vec![(INTERCEPT.to_string(), vec![1.0; n])];
        cols.extend(dummies(columns::SEX, &sex_values));
        cols.extend(dummies(columns::RACE, &race_values));
        cols.push((
            columns::TREAT.to_string(),
            rows.iter().map(|r| as_f64(r.1)).collect(),
        ));
        cols.push((
            columns::POST.to_string(),
            rows.iter().map(|r| as_f64(r.2)).collect(),
        ));
        cols.push((
            INTERACTION.to_string(),
            rows.iter().map(|r| as_f64(r.1 && r.2)).collect(),
        ));
        cols.push((
            columns::AGE.to_string(),
            rows.iter().map(|r| age[r.0]).collect(),
        ));

        let mut cluster_ids = BTreeMap::new();
        for r in &rows {
            cluster_ids.entry(r.5).or_insert(0usize);
        }
        for (i, id) in cluster_ids.values_mut().enumerate() {
            *id = i;
        }
        let clusters = rows.iter().map(|r| cluster_ids[r.5]).collect();
        let cluster_labels = cluster_ids.keys().map(|k| k.to_string()).collect();

        let x = Mat::from_fn(n, cols.len(), |i, j| cols[j].1[i]);
        debug!(n, k = cols.len(), dropped, "Built design matrix");
        Ok(Self {
            x,
            y: rows.iter().map(|r| income[r.0]).collect(),
            weights: rows.iter().map(|r| weight[r.0]).collect(),
            clusters,
            cluster_labels,
            colnames: cols.into_iter().map(|(name, _)| name).collect(),
            dropped,
        })
    }

    pub fn x(&self) -> MatRef<'_, f64> {
        self.x.as_ref()
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    pub fn cluster_labels(&self) -> &[String] {
        &self.cluster_labels
    }

    pub fn colnames(&self) -> &[String] {
        &self.colnames
    }

    /// Number of rows left out because of missing values.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_levels_numeric_order() {
        assert_eq!(levels(["10", "2", "1", "2"].into_iter()), vec!["1", "2", "10"]);
        assert_eq!(levels(["b", "a", "c"].into_iter()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_design_columns() {
        let frame = Frame::from_path(std::path::Path::new("tests/data/did_small.csv")).unwrap();
        let d = Design::did(&frame).unwrap();
        assert_eq!(
            d.colnames(),
            &[
                "Intercept",
                "C(sexo)[T.2]",
                "C(cor_raca)[T.2]",
                "treat",
                "post",
                "treat:post",
                "idade"
            ]
        );
        assert_eq!(d.x().nrows(), 8);
        assert_eq!(d.cluster_labels(), &["11", "35"]);
        assert_eq!(d.clusters(), &[0, 1, 0, 1, 0, 1, 0, 1]);
        // last row: treated, post period, age 28, sexo 1, cor_raca 1
        let last = (0..7).map(|j| d.x()[(7, j)]).collect::<Vec<_>>();
        assert_eq!(last, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 28.0]);
        assert_eq!(d.weights()[3], 3.0);
        assert_eq!(d.dropped(), 0);
    }

    #[test]
    fn test_rows_with_missing_values_are_dropped() {
        let frame = Frame::from_reader(
            "ano,treat,post,log_renda,peso_amostral,UF,idade,sexo,cor_raca
2019,0,0,7.0,1,11,30,1,1
2019,1,0,NA,1,11,30,1,1
2020,1,1,7.5,1,,30,2,1
2020,0,1,7.2,1,12,31,2,2
"
            .as_bytes(),
        )
        .unwrap();
        let d = Design::did(&frame).unwrap();
        assert_eq!(d.y(), &[7.0, 7.2]);
        assert_eq!(d.dropped(), 2);
    }

    #[test]
    fn test_missing_column() {
        let frame = Frame::from_reader("ano,treat,post,log_renda\n2019,0,0,1\n".as_bytes()).unwrap();
        assert!(matches!(
            Design::did(&frame),
            Err(Error::ColumnNameNotFound(c)) if c == "idade"
        ));
    }

    #[test]
    fn test_non_positive_weight() {
        let frame = Frame::from_reader(
            "ano,treat,post,log_renda,peso_amostral,UF,idade,sexo,cor_raca
2019,0,0,7.0,0,11,30,1,1
"
            .as_bytes(),
        )
        .unwrap();
        assert!(matches!(
            Design::did(&frame),
            Err(Error::InvalidValue { .. })
        ));
    }
}
