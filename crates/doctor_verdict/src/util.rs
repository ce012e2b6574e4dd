use std::fs;
use std::path::Path;

use chrono::Utc;
use fastapi_output::RichOutput;
use serde::Serialize;
use sqlmodel_console::OutputMode as SqlModelOutputMode;
use tracing_subscriber::EnvFilter;
use verdict_core::{ResultRow, VerdictConfig};

use crate::error::{DoctorError, Result};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "VERDICT_LOG";

#[must_use]
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Install a stderr subscriber filtered by [`LOG_ENV`], `warn` when unset.
///
/// A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputIntegration {
    pub fastapi_mode: String,
    pub fastapi_agent: bool,
    pub fastapi_ci: bool,
    pub fastapi_tty: bool,
    pub sqlmodel_mode: String,
    pub sqlmodel_agent: bool,
}

impl OutputIntegration {
    #[must_use]
    pub fn detect() -> Self {
        let fastapi_detection = fastapi_output::detect_environment();
        let fastapi_mode = fastapi_output::OutputMode::auto();
        let sqlmodel_mode = SqlModelOutputMode::detect();
        Self {
            fastapi_mode: fastapi_mode.as_str().to_string(),
            fastapi_agent: fastapi_detection.is_agent,
            fastapi_ci: fastapi_detection.is_ci,
            fastapi_tty: fastapi_detection.is_tty,
            sqlmodel_mode: sqlmodel_mode.as_str().to_string(),
            sqlmodel_agent: SqlModelOutputMode::is_agent_environment(),
        }
    }

    #[must_use]
    pub fn should_emit_json(&self) -> bool {
        self.sqlmodel_mode == "json"
    }
}

/// Human-facing status lines, silenced when the environment wants JSON.
#[derive(Debug, Clone)]
pub struct CliOutput {
    inner: RichOutput,
    enabled: bool,
}

impl CliOutput {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: RichOutput::auto(),
            enabled,
        }
    }

    pub fn rule(&self, title: Option<&str>) {
        if self.enabled {
            self.inner.rule(title);
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled {
            self.inner.info(message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.enabled {
            self.inner.success(message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.enabled {
            self.inner.warning(message);
        }
    }
}

#[must_use]
pub fn output_for(integration: &OutputIntegration) -> CliOutput {
    CliOutput::new(!integration.should_emit_json())
}

pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DoctorError::MissingPath {
            path: path.to_path_buf(),
        })
    }
}

pub fn write_string(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Read a JSON array of result rows.
pub fn load_rows(path: &Path) -> Result<Vec<ResultRow>> {
    ensure_exists(path)?;
    let raw = fs::read_to_string(path)?;
    let rows: Vec<ResultRow> = serde_json::from_str(&raw)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "result rows loaded");
    Ok(rows)
}

/// Config from `path` (or defaults) with an optional tolerance override.
pub fn load_config(path: Option<&Path>, tolerance: Option<f64>) -> Result<VerdictConfig> {
    let mut config = match path {
        Some(path) => {
            ensure_exists(path)?;
            VerdictConfig::from_path(path)?
        }
        None => VerdictConfig::default(),
    };
    if let Some(tolerance) = tolerance {
        config.tolerance = tolerance;
    }
    Ok(config.validated()?)
}

/// Split a comma-separated list, dropping blanks.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{OutputIntegration, load_config, load_rows, output_for, split_list};
    use crate::error::DoctorError;

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(" cacheHitRate, ,deliveryRate,"),
            vec!["cacheHitRate", "deliveryRate"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn tolerance_override_is_validated() {
        let config = load_config(None, Some(0.01)).expect("config");
        assert_eq!(config.tolerance, 0.01);

        let err = load_config(None, Some(-1.0)).expect_err("negative tolerance");
        assert!(matches!(err, DoctorError::Config(_)));
    }

    #[test]
    fn missing_input_is_reported_by_path() {
        let err = load_rows(Path::new("/tmp/doctor_verdict/does-not-exist.json"))
            .expect_err("missing rows");
        match err {
            DoctorError::MissingPath { path } => {
                assert!(path.ends_with("does-not-exist.json"));
            }
            other => panic!("expected MissingPath, got {other}"),
        }
    }

    #[test]
    fn output_for_disables_human_output_when_json_mode_requested() {
        let json_integration = OutputIntegration {
            fastapi_mode: "plain".to_string(),
            fastapi_agent: true,
            fastapi_ci: false,
            fastapi_tty: false,
            sqlmodel_mode: "json".to_string(),
            sqlmodel_agent: true,
        };
        let human_integration = OutputIntegration {
            sqlmodel_mode: "plain".to_string(),
            ..json_integration.clone()
        };

        assert!(!output_for(&json_integration).enabled);
        assert!(output_for(&human_integration).enabled);
    }
}
