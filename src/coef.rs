use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coef {
    label: String,
    coef: f64,
    std_err: f64,
    z: f64,
    p: f64,
    ci_lower: f64,
    ci_upper: f64,
}

impl Coef {
    pub fn new(
        label: impl ToString,
        coef: f64,
        std_err: f64,
        z: f64,
        p: f64,
        (ci_lower, ci_upper): (f64, f64),
    ) -> Self {
        Coef {
            label: label.to_string(),
            coef,
            std_err,
            z,
            p,
            ci_lower,
            ci_upper,
        }
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn coef(&self) -> f64 {
        self.coef
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn std_err(&self) -> f64 {
        self.std_err
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn z(&self) -> f64 {
        self.z
    }

    #[inline(always)]
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Bounds of the 95% confidence interval.
    pub fn conf_int(&self) -> (f64, f64) {
        (self.ci_lower, self.ci_upper)
    }
}
