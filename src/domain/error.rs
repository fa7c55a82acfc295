//! Domain error types.

/// Signals raised by the indicator routines.
///
/// None of these abort an enrichment pass: the engine turns them into
/// undefined values for the affected metric and logs the condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicatorError {
    #[error("insufficient data: need {required} observations, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("series length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("window must be positive")]
    ZeroWindow,
}

/// Top-level error type for featurebars.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("fetch of page {page} failed: {reason}")]
    Fetch { page: usize, reason: String },

    #[error("forecast failed: {reason}")]
    Forecast { reason: String },

    #[error("upload to {bucket}/{key} failed: {reason}")]
    Upload {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need more than {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FeatureError {
    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            FeatureError::Io(_) => 1,
            FeatureError::ConfigParse { .. }
            | FeatureError::ConfigMissing { .. }
            | FeatureError::ConfigInvalid { .. } => 2,
            FeatureError::Storage { .. }
            | FeatureError::Database { .. }
            | FeatureError::Csv { .. } => 3,
            FeatureError::Fetch { .. }
            | FeatureError::Forecast { .. }
            | FeatureError::Upload { .. } => 4,
            FeatureError::NoData { .. } | FeatureError::InsufficientData { .. } => 5,
        }
    }
}

impl From<&FeatureError> for std::process::ExitCode {
    fn from(err: &FeatureError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
