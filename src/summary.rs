use std::fmt;

use crate::{estimator::DidModel, wls::CONFIDENCE};

const WIDTH: usize = 78;

/// Plain-text regression table in the familiar statistics-package layout.
pub struct Summary<'a> {
    model: &'a DidModel,
}

impl<'a> Summary<'a> {
    pub fn new(model: &'a DidModel) -> Self {
        Self { model }
    }
}

fn row(
    f: &mut fmt::Formatter<'_>,
    left: (&str, String),
    right: (&str, String),
) -> fmt::Result {
    writeln!(
        f,
        "{:<20}{:>18}   {:<20}{:>17}",
        left.0, left.1, right.0, right.1
    )
}

fn num(v: f64) -> String {
    if v.abs() >= 1e4 || (v != 0.0 && v.abs() < 1e-3) {
        format!("{:.3e}", v)
    } else {
        format!("{:.4}", v)
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wls = self.model.wls();
        let heavy = "=".repeat(WIDTH);
        let light = "-".repeat(WIDTH);
        writeln!(f, "{:^width$}", "WLS Regression Results", width = WIDTH)?;
        writeln!(f, "{}", heavy)?;
        row(
            f,
            ("Dep. Variable:", self.model.dependent().to_string()),
            ("R-squared:", format!("{:.3}", wls.r2())),
        )?;
        row(
            f,
            ("Model:", "WLS".to_string()),
            ("Adj. R-squared:", format!("{:.3}", wls.adj_r2())),
        )?;
        row(
            f,
            ("Method:", "Least Squares".to_string()),
            ("No. Observations:", wls.nobs().to_string()),
        )?;
        row(
            f,
            ("Covariance Type:", "cluster".to_string()),
            ("Df Residuals:", wls.df_resid().to_string()),
        )?;
        row(
            f,
            ("Cluster Variable:", self.model.cluster_column().to_string()),
            ("Df Model:", wls.df_model().to_string()),
        )?;
        row(
            f,
            ("No. Clusters:", wls.n_clusters().to_string()),
            ("Dropped (missing):", self.model.dropped().to_string()),
        )?;
        writeln!(f, "{}", heavy)?;

        let lo = (1.0 - CONFIDENCE) / 2.0;
        let label_width = wls
            .coefs()
            .iter()
            .map(|c| c.label().len())
            .max()
            .unwrap_or(0)
            .max(10);
        writeln!(
            f,
            "{:<label_width$}{:>11}{:>11}{:>10}{:>9}{:>11}{:>11}",
            "",
            "coef",
            "std err",
            "z",
            "P>|z|",
            format!("[{:.3}", lo),
            format!("{:.3}]", 1.0 - lo),
        )?;
        writeln!(f, "{}", light)?;
        for c in wls.coefs() {
            let (ci_lo, ci_hi) = c.conf_int();
            writeln!(
                f,
                "{:<label_width$}{:>11}{:>11}{:>10.3}{:>9.3}{:>11}{:>11}",
                c.label(),
                num(c.coef()),
                num(c.std_err()),
                c.z(),
                c.p(),
                num(ci_lo),
                num(ci_hi),
            )?;
        }
        writeln!(f, "{}", heavy)?;
        writeln!(f, "Formula: {}", self.model.formula())?;
        writeln!(f, "Notes:")?;
        write!(
            f,
            "[1] Standard errors are robust to cluster correlation (clustered by {}).",
            self.model.cluster_column()
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::Frame;

    #[test]
    fn test_summary_lists_every_term() {
        let frame = Frame::from_path(std::path::Path::new("tests/data/did_small.csv")).unwrap();
        let model = DidModel::fit(&frame).unwrap();
        let text = Summary::new(&model).to_string();
        assert!(text.starts_with(&format!("{:^78}", "WLS Regression Results")));
        for c in model.wls().coefs() {
            assert!(
                text.lines().any(|l| l.starts_with(c.label())),
                "missing {}",
                c.label()
            );
        }
        assert!(text.contains("No. Observations:"));
        assert!(text.contains("[0.025"));
        assert!(text.contains("0.975]"));
        assert!(text.contains("clustered by UF"));
    }

    #[test]
    fn test_num() {
        assert_eq!(num(0.15), "0.1500");
        assert_eq!(num(0.0), "0.0000");
        assert_eq!(num(12340.0), "1.234e4");
        assert_eq!(num(0.0001), "1.000e-4");
    }
}
