use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "pnad_did_para_dashboard.csv";
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Boundary between the last pre-policy year (2019) and the first treated year (2020).
pub const DEFAULT_POLICY_BOUNDARY: f64 = 2019.5;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub significance_level: f64,
    pub policy_boundary: f64,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            policy_boundary: DEFAULT_POLICY_BOUNDARY,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `DID_DATA_PATH`, `DID_SIGNIFICANCE_LEVEL`,
    /// `DID_POLICY_BOUNDARY` and `DID_BIND_ADDR`. Unparsable values fall back to
    /// the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        Self {
            data_path: lookup("DID_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.data_path),
            significance_level: parse_or(
                &lookup,
                "DID_SIGNIFICANCE_LEVEL",
                default.significance_level,
            )
            .clamp(0.0, 1.0),
            policy_boundary: parse_or(&lookup, "DID_POLICY_BOUNDARY", default.policy_boundary),
            bind_addr: lookup("DID_BIND_ADDR").unwrap_or(default.bind_addr),
        }
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|x| x.trim().parse::<f64>().ok())
        .filter(|x| x.is_finite())
        .unwrap_or(default)
}
