#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("column name {0} not found")]
    ColumnNameNotFound(String),
    #[error("invalid value {value:?} in column {column} on row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("column {column} must be 0 or 1, found {value} on row {row}")]
    InvalidIndicator {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("no usable observations")]
    NoObservations,
    #[error("design matrix is singular")]
    SingularDesign,
    #[error("cluster-robust covariance needs at least two clusters, found {0}")]
    TooFewClusters(usize),
    #[error("{n} observations are not enough to estimate {k} parameters")]
    InsufficientObservations { n: usize, k: usize },
    #[error("term {0} not found in model")]
    TermNotFound(String),
    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
