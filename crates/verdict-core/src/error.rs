use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Shape violations raised by the engine.
///
/// Routine data gaps (empty score maps, missing grid cells, unknown policy
/// names) are represented as data and never reach this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("row {row} is missing required column `{column}`")]
    MissingColumn { row: usize, column: String },

    #[error("row {row} column `{column}` is not numeric")]
    NonNumeric { row: usize, column: String },

    #[error("row {row} has an empty policy name")]
    EmptyPolicy { row: usize },

    #[error("policy `{policy}` has {count} rows in cell {cell}")]
    DuplicateCell {
        policy: String,
        cell: String,
        count: usize,
    },

    #[error("no metrics given to {operation}")]
    NoMetrics { operation: &'static str },
}

impl EngineError {
    #[must_use]
    pub fn missing(row: usize, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            row,
            column: column.into(),
        }
    }

    #[must_use]
    pub fn non_numeric(row: usize, column: impl Into<String>) -> Self {
        Self::NonNumeric {
            row,
            column: column.into(),
        }
    }
}

/// Errors that can occur when loading a [`crate::VerdictConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineError};

    #[test]
    fn missing_column_names_row_and_column() {
        let error = EngineError::missing(3, "cacheSize");
        assert_eq!(
            error.to_string(),
            "row 3 is missing required column `cacheSize`"
        );
    }

    #[test]
    fn validation_error_joins_messages() {
        let error = ConfigError::Validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(error.to_string(), "validation errors: a; b");
    }
}
