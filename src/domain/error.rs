//! Domain error types.

/// Top-level error type for swingsim.
///
/// Bad input data (thin series, degenerate config values) is deliberately
/// not represented here: the engine converts those into warning strings on
/// partial results. These variants cover failures that stop a run outright.
#[derive(Debug, thiserror::Error)]
pub enum SwingsimError {
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

    #[error("positions store error: {reason}")]
    Positions { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SwingsimError> for std::process::ExitCode {
    fn from(err: &SwingsimError) -> Self {
        let code: u8 = match err {
            SwingsimError::Io(_) => 1,
            SwingsimError::ConfigParse { .. }
            | SwingsimError::ConfigMissing { .. }
            | SwingsimError::ConfigInvalid { .. } => 2,
            SwingsimError::Data { .. } => 3,
            SwingsimError::Positions { .. } => 4,
            SwingsimError::Report { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
