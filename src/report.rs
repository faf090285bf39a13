use serde::Serialize;

use crate::coef::Coef;

/// `0.1234` -> `12.34%`.
pub fn percent(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

pub fn p_value(p: f64) -> String {
    format!("{:.3}", p)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Significant,
    NotSignificant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub verdict: Verdict,
    pub headline: String,
    pub paragraphs: Vec<String>,
}

/// Headline numbers and interpretation of the DiD estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub coef: f64,
    pub p: f64,
    pub conf_int: (f64, f64),
    pub significance_level: f64,
}

impl Report {
    pub fn new(estimate: &Coef, significance_level: f64) -> Self {
        Self {
            coef: estimate.coef(),
            p: estimate.p(),
            conf_int: estimate.conf_int(),
            significance_level,
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.p < self.significance_level {
            Verdict::Significant
        } else {
            Verdict::NotSignificant
        }
    }

    /// Effect, confidence interval and p-value, in display order.
    pub fn metrics(&self) -> [Metric; 3] {
        let (lo, hi) = self.conf_int;
        [
            Metric {
                label: "Causal Increase in Income (DiD Effect)",
                value: percent(self.coef),
            },
            Metric {
                label: "Confidence Interval (95%)",
                value: format!("[{}, {}]", percent(lo), percent(hi)),
            },
            Metric {
                label: "P-Value",
                value: p_value(self.p),
            },
        ]
    }

    pub fn narrative(&self) -> Narrative {
        let (lo, hi) = self.conf_int;
        let (coef, lo, hi) = (percent(self.coef), percent(lo), percent(hi));
        match self.verdict() {
            Verdict::Significant => Narrative {
                verdict: Verdict::Significant,
                headline: "The results are statistically significant.".to_string(),
                paragraphs: vec![
                    format!(
                        "Our analysis suggests that the expansion of full-time schools caused an \
                         average increase of {} in the income of young adults in the treatment \
                         group, compared with what would have happened without the policy.",
                        coef
                    ),
                    format!(
                        "The confidence interval tells us we are 95% confident that the true \
                         effect lies between {} and {}. Because this interval does not contain \
                         zero, we can reject the hypothesis that the policy had no effect.",
                        lo, hi
                    ),
                ],
            },
            Verdict::NotSignificant => Narrative {
                verdict: Verdict::NotSignificant,
                headline: "The results are not statistically significant.".to_string(),
                paragraphs: vec![
                    format!(
                        "Although the estimated effect is {}, the high p-value ({}) and the \
                         confidence interval ([{}, {}]), which includes zero, mean we cannot \
                         rule out that this result is due to chance.",
                        coef,
                        p_value(self.p),
                        lo,
                        hi
                    ),
                    "We found no robust statistical evidence that the policy had an impact on \
                     income."
                        .to_string(),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn fit(coef: f64, p: f64, ci: (f64, f64)) -> Coef {
        Coef::new("treat:post", coef, 0.0, 0.0, p, ci)
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.1234), "12.34%");
        assert_eq!(percent(-0.0051), "-0.51%");
        assert_eq!(percent(0.0), "0.00%");
        assert_eq!(p_value(0.01234), "0.012");
    }

    #[test]
    fn test_significant_branch() {
        let report = Report::new(&fit(0.0832, 0.01, (0.0213, 0.1451)), 0.05);
        assert_eq!(report.verdict(), Verdict::Significant);
        let n = report.narrative();
        assert_eq!(n.verdict, Verdict::Significant);
        assert_eq!(n.headline, "The results are statistically significant.");
        assert!(n.paragraphs[0].contains("8.32%"));
        assert!(n.paragraphs[1].contains("between 2.13% and 14.51%"));
        assert!(n.paragraphs[1].contains("does not contain zero"));
    }

    #[test]
    fn test_not_significant_branch() {
        let report = Report::new(&fit(0.0321, 0.20, (-0.0172, 0.0814)), 0.05);
        assert_eq!(report.verdict(), Verdict::NotSignificant);
        let n = report.narrative();
        assert_eq!(n.headline, "The results are not statistically significant.");
        assert!(n.paragraphs[0].contains("3.21%"));
        assert!(n.paragraphs[0].contains("(0.200)"));
        assert!(n.paragraphs[0].contains("[-1.72%, 8.14%]"));
        assert!(n.paragraphs[0].contains("includes zero"));
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = Report::new(&fit(0.1, 0.05, (0.0, 0.2)), 0.05);
        assert_eq!(at.verdict(), Verdict::NotSignificant);
        let below = Report::new(&fit(0.1, 0.0499, (0.0, 0.2)), 0.05);
        assert_eq!(below.verdict(), Verdict::Significant);
        let nan = Report::new(&fit(0.1, f64::NAN, (0.0, 0.2)), 0.05);
        assert_eq!(nan.verdict(), Verdict::NotSignificant);
    }

    #[test]
    fn test_metrics() {
        let report = Report::new(&fit(0.0832, 0.0123, (0.0213, 0.1451)), 0.05);
        let [effect, ci, p] = report.metrics();
        assert_eq!(effect.value, "8.32%");
        assert_eq!(ci.value, "[2.13%, 14.51%]");
        assert_eq!(p.value, "0.012");
        assert_eq!(p.label, "P-Value");
    }
}
