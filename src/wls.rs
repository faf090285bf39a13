use faer::{linalg::solvers::Solve, Col, Mat, MatRef, Side};
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

use crate::{coef::Coef, Error};

/// Two-sided coverage of the reported confidence intervals.
pub const CONFIDENCE: f64 = 0.95;

pub(crate) fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("unit normal parameters are valid")
}

/// Weighted least squares fit with a cluster-robust covariance matrix.
///
/// The design is expected to contain an intercept column. Inference uses the
/// large-sample normal approximation: `z = coef / std_err`, two-sided
/// p-values from the standard normal, and `coef ± z_{0.975} * std_err`
/// intervals.
#[derive(Debug, Clone)]
pub struct Wls {
    coefs: Vec<Coef>,
    cov: Mat<f64>,
    nobs: usize,
    n_clusters: usize,
    r2: f64,
    adj_r2: f64,
}

impl Wls {
    /// Fit `ys ~ xs` with observation weights `ws`. `clusters[i]` is the
    /// cluster index (`0..n_clusters`) of row `i`.
    #[tracing::instrument(skip(xs, ys, ws, clusters, colnames))]
    pub fn fit(
        xs: MatRef<'_, f64>,
        ys: &[f64],
        ws: &[f64],
        clusters: &[usize],
        colnames: &[String],
    ) -> Result<Self, Error> {
        let n = xs.nrows();
        let k = xs.ncols();
        debug_assert_eq!(ys.len(), n);
        debug_assert_eq!(ws.len(), n);
        debug_assert_eq!(clusters.len(), n);
        debug_assert_eq!(colnames.len(), k);
        if n == 0 {
            return Err(Error::NoObservations);
        }
        if n <= k {
            return Err(Error::InsufficientObservations { n, k });
        }
        let n_clusters = clusters.iter().copied().max().map_or(0, |m| m + 1);
        if n_clusters < 2 {
            return Err(Error::TooFewClusters(n_clusters));
        }

        // whiten by sqrt(w) so the problem becomes ordinary least squares
        let sw = ws.iter().map(|w| w.sqrt()).collect::<Vec<_>>();
        let xw = Mat::from_fn(n, k, |i, j| xs[(i, j)] * sw[i]);
        let yw = Col::from_fn(n, |i| ys[i] * sw[i]);
        let xtwx = xw.transpose() * xw.as_ref();
        let xtwy = xw.transpose() * yw.as_ref();

        let llt = xtwx.llt(Side::Lower).map_err(|_| Error::SingularDesign)?;
        let betas = llt.solve(&xtwy);
        let bread = llt.solve(Mat::<f64>::identity(k, k));
        // a rank deficient design can still factor with tiny pivots
        let check = bread.as_ref() * xtwx.as_ref();
        let err = (0..k)
            .flat_map(|i| (0..k).map(move |j| (i, j)))
            .map(|(i, j)| (check[(i, j)] - if i == j { 1.0 } else { 0.0 }).abs())
            .fold(0.0_f64, f64::max);
        if !err.is_finite() || err > 1e-6 {
            warn!(err, "Normal equations are numerically singular");
            return Err(Error::SingularDesign);
        }
        debug!("Solved normal equations");

        let fitted = xs * betas.as_ref();
        let resid = (0..n).map(|i| ys[i] - fitted[i]).collect::<Vec<_>>();

        let mut members = vec![Vec::new(); n_clusters];
        for (i, g) in clusters.iter().enumerate() {
            members[*g].push(i);
        }
        let scores = members
            .par_iter()
            .map(|rows| {
                let mut s = vec![0.0; k];
                for &i in rows {
                    let we = ws[i] * resid[i];
                    for (j, s) in s.iter_mut().enumerate() {
                        *s += xs[(i, j)] * we;
                    }
                }
                s
            })
            .collect::<Vec<_>>();
        let scores = Mat::from_fn(n_clusters, k, |g, j| scores[g][j]);
        let meat = scores.transpose() * scores.as_ref();

        let g = n_clusters as f64;
        let correction = g / (g - 1.0) * ((n - 1) as f64 / (n - k) as f64);
        let sandwich = bread.as_ref() * meat.as_ref() * bread.as_ref();
        let cov = Mat::from_fn(k, k, |i, j| correction * sandwich[(i, j)]);

        let normal = standard_normal();
        let q = normal.inverse_cdf(0.5 + CONFIDENCE / 2.0);
        let coefs = (0..k)
            .map(|j| {
                let coef = betas[j];
                let std_err = cov[(j, j)].max(0.0).sqrt();
                let z = coef / std_err;
                let p = 2.0 * normal.sf(z.abs());
                Coef::new(
                    &colnames[j],
                    coef,
                    std_err,
                    z,
                    p,
                    (coef - q * std_err, coef + q * std_err),
                )
            })
            .collect::<Vec<_>>();

        let w_sum = ws.iter().sum::<f64>();
        let y_mean = ys.iter().zip(ws).map(|(y, w)| y * w).sum::<f64>() / w_sum;
        let ssr = resid.iter().zip(ws).map(|(e, w)| w * e * e).sum::<f64>();
        let tss = ys
            .iter()
            .zip(ws)
            .map(|(y, w)| w * (y - y_mean).powi(2))
            .sum::<f64>();
        let r2 = 1.0 - ssr / tss;
        let adj_r2 = 1.0 - (1.0 - r2) * (n - 1) as f64 / (n - k) as f64;

        Ok(Self {
            coefs,
            cov,
            nobs: n,
            n_clusters,
            r2,
            adj_r2,
        })
    }

    pub fn coefs(&self) -> &[Coef] {
        &self.coefs
    }

    pub fn coef(&self, label: &str) -> Option<&Coef> {
        self.coefs.iter().find(|c| c.label() == label)
    }

    /// Cluster-robust covariance of the coefficients, in `coefs()` order.
    pub fn cov(&self) -> MatRef<'_, f64> {
        self.cov.as_ref()
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn df_model(&self) -> usize {
        self.coefs.len() - 1
    }

    pub fn df_resid(&self) -> usize {
        self.nobs - self.coefs.len()
    }

    pub fn r2(&self) -> f64 {
        self.r2
    }

    pub fn adj_r2(&self) -> f64 {
        self.adj_r2
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    macro_rules! assert_float_eq {
        ($a:expr, $b:expr, $tol:expr) => {
            assert!(($a - $b).abs() < $tol, "{:.22} != {:.22}", $a, $b);
        };
    }

    macro_rules! float_eq {
        ($a:expr, $b:expr) => {
            assert_float_eq!($a, $b, 1e-10);
        };
    }

    fn names(k: usize) -> Vec<String> {
        (0..k).map(|i| format!("x[{}]", i)).collect()
    }

    #[test]
    fn test_intercept_only_is_mean_with_cluster_se() {
        let ones = [1.0; 5];
        let xs = MatRef::from_column_major_slice(ones.as_slice(), 5, 1);
        let ys = [1.0, 2.0, 3.0, 4.0, 5.0];
        let m = Wls::fit(xs, &ys, &[1.0; 5], &[0, 1, 2, 3, 4], &names(1)).unwrap();
        let c = &m.coefs()[0];
        float_eq!(c.coef(), 3.0);
        // one row per cluster reduces to the standard error of the mean
        float_eq!(c.std_err(), 0.5_f64.sqrt());
        float_eq!(c.z(), 3.0 / 0.5_f64.sqrt());
        let (lo, hi) = c.conf_int();
        float_eq!(hi - c.coef(), c.coef() - lo);
        assert_float_eq!(hi - c.coef(), 1.959963984540054 * 0.5_f64.sqrt(), 1e-9);
        assert_eq!(m.df_model(), 0);
        assert_eq!(m.df_resid(), 4);
    }

    #[test]
    fn test_intercept_only_weighted_mean() {
        let ones = [1.0; 4];
        let xs = MatRef::from_column_major_slice(ones.as_slice(), 4, 1);
        let ys = [1.0, 4.0, 2.0, 5.0];
        let ws = [1.0, 3.0, 2.0, 0.5];
        let m = Wls::fit(xs, &ys, &ws, &[0, 0, 1, 1], &names(1)).unwrap();
        float_eq!(m.coefs()[0].coef(), (1.0 + 12.0 + 4.0 + 2.5) / 6.5);
    }

    #[test]
    fn test_exact_fit_recovers_coefficients() {
        let nrows = 12;
        let x1 = (0..nrows).map(|i| i as f64).collect::<Vec<_>>();
        let x2 = (0..nrows)
            .map(|i| ((i * 7) % 5) as f64)
            .collect::<Vec<_>>();
        let data = std::iter::repeat(1.0)
            .take(nrows)
            .chain(x1.iter().copied())
            .chain(x2.iter().copied())
            .collect::<Vec<_>>();
        let xs = MatRef::from_column_major_slice(data.as_slice(), nrows, 3);
        let ys = (0..nrows)
            .map(|i| 0.5 + 2.0 * x1[i] - 0.25 * x2[i])
            .collect::<Vec<_>>();
        let ws = (0..nrows).map(|i| 1.0 + (i % 3) as f64).collect::<Vec<_>>();
        let clusters = (0..nrows).map(|i| i % 3).collect::<Vec<_>>();
        let m = Wls::fit(xs, &ys, &ws, &clusters, &names(3)).unwrap();
        assert_float_eq!(m.coefs()[0].coef(), 0.5, 1e-9);
        assert_float_eq!(m.coefs()[1].coef(), 2.0, 1e-9);
        assert_float_eq!(m.coefs()[2].coef(), -0.25, 1e-9);
        assert_float_eq!(m.r2(), 1.0, 1e-9);
        assert_eq!(m.n_clusters(), 3);
        assert_eq!(m.coef("x[1]").unwrap().label(), "x[1]");
        assert!(m.coef("x[9]").is_none());
    }

    #[test]
    fn test_singular_design() {
        let data = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0];
        let xs = MatRef::from_column_major_slice(data.as_slice(), 5, 2);
        let ys = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(matches!(
            Wls::fit(xs, &ys, &[1.0; 5], &[0, 0, 1, 1, 1], &names(2)),
            Err(Error::SingularDesign)
        ));
    }

    #[test]
    fn test_too_few_clusters() {
        let ones = [1.0; 3];
        let xs = MatRef::from_column_major_slice(ones.as_slice(), 3, 1);
        assert!(matches!(
            Wls::fit(xs, &[1.0, 2.0, 3.0], &[1.0; 3], &[0, 0, 0], &names(1)),
            Err(Error::TooFewClusters(1))
        ));
    }

    #[test]
    fn test_insufficient_observations() {
        let data = [1.0, 1.0, 0.0, 1.0];
        let xs = MatRef::from_column_major_slice(data.as_slice(), 2, 2);
        assert!(matches!(
            Wls::fit(xs, &[1.0, 2.0], &[1.0; 2], &[0, 1], &names(2)),
            Err(Error::InsufficientObservations { n: 2, k: 2 })
        ));
    }

    #[test]
    fn test_weighted_cluster_sandwich() {
        let nrows = 10;
        let data = std::iter::repeat(1.0)
            .take(nrows)
            .chain((0..nrows).map(|i| i as f64))
            .collect::<Vec<_>>();
        let xs = MatRef::from_column_major_slice(data.as_slice(), nrows, 2);
        let ys = [1.0, 2.3, 2.9, 4.4, 4.8, 6.5, 6.9, 8.4, 9.1, 9.7];
        let ws = [1.0, 2.0, 1.0, 3.0, 1.0, 2.0, 1.0, 0.5, 2.0, 1.0];
        let clusters = [0, 0, 0, 1, 1, 1, 2, 2, 2, 2];
        let m = Wls::fit(xs, &ys, &ws, &clusters, &names(2)).unwrap();
        float_eq!(m.coefs()[0].coef(), 1.278923766816142);
        float_eq!(m.coefs()[1].coef(), 0.9748878923766822);
        // G/(G-1) * (N-1)/(N-K) = 3/2 * 9/8
        float_eq!(m.coefs()[0].std_err(), 0.16121200593708365);
        float_eq!(m.coefs()[1].std_err(), 0.02672981232099707);
        let cov = m.cov();
        float_eq!(cov[(0, 1)], -0.0034114776798126922);
        float_eq!(cov[(0, 1)], cov[(1, 0)]);
        for (j, c) in m.coefs().iter().enumerate() {
            float_eq!(cov[(j, j)].sqrt(), c.std_err());
        }
        assert_eq!(m.n_clusters(), 3);
        assert_eq!(m.df_resid(), 8);
    }
}
