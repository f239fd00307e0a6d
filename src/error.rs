use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data error: {0}")]
    Data(String),

    /// Variance filter removed every column
    #[error("variance filter removed every column (threshold {threshold})")]
    DegenerateFilter { threshold: f64 },

    /// Too few columns left for the requested projection
    #[error("insufficient features: {found} selected, {required} required")]
    InsufficientFeatures { found: usize, required: usize },

    #[error("clustering failed: {0}")]
    ClusteringFailure(String),

    /// Every seed in the run selector was skipped
    #[error("no viable run: all {attempted} seeds failed")]
    NoViableRun { attempted: usize },

    #[error("ML error: {0}")]
    Ml(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScError>;
