//! Domain error types.

/// Top-level error type for qubotrader.
#[derive(Debug, thiserror::Error)]
pub enum QubotraderError {
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

    #[error("no asset has a positive score")]
    EmptyCandidateSet,

    #[error("infeasible constraint: need {min_assets}..={max_assets} assets, have {candidates} candidates")]
    InfeasibleConstraint {
        min_assets: usize,
        max_assets: usize,
        candidates: usize,
    },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QubotraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        QubotraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&QubotraderError> for std::process::ExitCode {
    fn from(err: &QubotraderError) -> Self {
        let code: u8 = match err {
            QubotraderError::Io(_) => 1,
            QubotraderError::ConfigParse { .. }
            | QubotraderError::ConfigMissing { .. }
            | QubotraderError::ConfigInvalid { .. } => 2,
            QubotraderError::EmptyCandidateSet
            | QubotraderError::InfeasibleConstraint { .. } => 3,
            QubotraderError::PriceData { .. } => 4,
            QubotraderError::Json(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
