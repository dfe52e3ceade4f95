//! Domain error types.

/// Top-level error type for emacross.
#[derive(Debug, thiserror::Error)]
pub enum EmacrossError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("empty series: at least one bar is required")]
    EmptySeries,

    #[error("misaligned input: expected {expected} values, got {actual}")]
    MisalignedInput { expected: usize, actual: usize },

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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EmacrossError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        EmacrossError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            EmacrossError::Io(_) => 1,
            EmacrossError::ConfigParse { .. }
            | EmacrossError::ConfigMissing { .. }
            | EmacrossError::ConfigInvalid { .. } => 2,
            EmacrossError::Data { .. } => 3,
            EmacrossError::InvalidParameter { .. }
            | EmacrossError::EmptySeries
            | EmacrossError::MisalignedInput { .. } => 4,
        }
    }
}

impl From<&EmacrossError> for std::process::ExitCode {
    fn from(err: &EmacrossError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
