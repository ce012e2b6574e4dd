use std::path::PathBuf;

use thiserror::Error;
use verdict_core::{ConfigError, EngineError};

pub type Result<T> = std::result::Result<T, DoctorError>;

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },
}

impl DoctorError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Config(_) => 3,
            Self::Engine(_) => 4,
            _ => 1,
        }
    }

    /// Stable machine-readable name for the failure class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Config(ConfigError::Validation(_)) => "config_validation",
            Self::Config(_) => "config",
            Self::Engine(EngineError::MissingColumn { .. } | EngineError::NonNumeric { .. }) => {
                "bad_column"
            }
            Self::Engine(_) => "engine",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::MissingPath { .. } => "missing_path",
        }
    }

    /// Individual config problems, one per entry; empty for other errors.
    #[must_use]
    pub fn problems(&self) -> &[String] {
        match self {
            Self::Config(ConfigError::Validation(problems)) => problems.as_slice(),
            _ => &[],
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
