use std::path::{Path, PathBuf};

use serde::Serialize;
use verdict_core::VerdictConfig;

use crate::cli::GlobalArgs;
use crate::error::Result;
use crate::util::{CliOutput, OutputIntegration, load_config, now_utc_iso, output_for, write_string};

/// JSON document written by every report-producing command.
#[derive(Debug, Clone, Serialize)]
pub struct Report<T> {
    pub command: &'static str,
    pub generated_at: String,
    pub input: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Report<T> {
    pub fn new(command: &'static str, input: Option<&Path>, body: T) -> Self {
        Self {
            command,
            generated_at: now_utc_iso(),
            input: input.map(|path| path.display().to_string()),
            body,
        }
    }

    /// Pretty JSON to `output`, or to stdout when no path is given.
    pub fn emit(&self, output: Option<&Path>, ui: &CliOutput) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        match output {
            Some(path) => {
                write_string(path, &json)?;
                ui.success(&format!("{} report written to {}", self.command, path.display()));
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// Body of `show-config`; the envelope's `input` names the config file.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigBody<'a> {
    pub config: &'a VerdictConfig,
}

/// Effective configuration plus output handles for one command invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: VerdictConfig,
    pub config_source: Option<PathBuf>,
    pub ui: CliOutput,
}

impl Session {
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let integration = OutputIntegration::detect();
        let config = load_config(globals.config.as_deref(), globals.tolerance)?;
        tracing::debug!(
            config = ?globals.config,
            tolerance = config.tolerance,
            policies = config.order.len(),
            "configuration loaded"
        );
        Ok(Self {
            config,
            config_source: globals.config.clone(),
            ui: output_for(&integration),
        })
    }

    #[must_use]
    pub fn config_report(&self) -> Report<ConfigBody<'_>> {
        let body = ConfigBody {
            config: &self.config,
        };
        Report::new("show-config", self.config_source.as_deref(), body)
    }

    /// Catalogue direction for `metric` unless `lower_is_better` forces it.
    #[must_use]
    pub fn higher_is_better(&self, metric: &str, lower_is_better: bool) -> bool {
        !lower_is_better && self.config.higher_is_better(metric)
    }
}
