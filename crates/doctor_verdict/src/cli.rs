use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::aggregate::{AggregateArgs, run_aggregate};
use crate::conditions::{
    LevelsArgs, RangeArgs, RegionsArgs, ResilienceArgs, ScenariosArgs, SweepCheckArgs, run_levels,
    run_range, run_regions, run_resilience, run_scenarios, run_sweep_check,
};
use crate::error::Result;
use crate::grid::{GridArgs, MetricGridArgs, run_grid, run_metric_grid};
use crate::report::Session;
use crate::util::init_tracing;
use crate::winner::{WinnerArgs, run_winner};

#[derive(Debug, Parser)]
#[command(
    name = "doctor_verdict",
    about = "Winner grids, trial summaries, and condition reports for cache policy experiments",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Verdict config (`.toml`, or `.json` by extension).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Absolute tie tolerance, overriding the config.
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub tolerance: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve one policy→score map to its winner label.
    Winner(WinnerArgs),

    /// Winner grid over two condition axes for one metric.
    Grid(GridArgs),

    /// Winner grid with one row per heatmap metric over one axis.
    #[command(name = "metric-grid")]
    MetricGrid(MetricGridArgs),

    /// Mean and sample std per policy over randomized trials.
    Aggregate(AggregateArgs),

    /// Metric retention between the weakest and strongest condition.
    Resilience(ResilienceArgs),

    /// Winners at the four corners of a two-axis sweep.
    Scenarios(ScenariosArgs),

    /// Recommended policy per median-split region of a two-axis sweep.
    Regions(RegionsArgs),

    /// Per-metric winners at the good, poor and disaster condition levels.
    Levels(LevelsArgs),

    /// Min, max and spread of one metric per policy across all conditions.
    Range(RangeArgs),

    /// Check required columns and count distinct axis values.
    #[command(name = "sweep-check")]
    SweepCheck(SweepCheckArgs),

    /// Print the effective configuration as JSON.
    #[command(name = "show-config")]
    ShowConfig,
}

pub fn run_from_env() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let session = Session::open(&cli.globals)?;
    match cli.command {
        Commands::Winner(args) => run_winner(args, &session),
        Commands::Grid(args) => run_grid(args, &session),
        Commands::MetricGrid(args) => run_metric_grid(args, &session),
        Commands::Aggregate(args) => run_aggregate(args, &session),
        Commands::Resilience(args) => run_resilience(args, &session),
        Commands::Scenarios(args) => run_scenarios(args, &session),
        Commands::Regions(args) => run_regions(args, &session),
        Commands::Levels(args) => run_levels(args, &session),
        Commands::Range(args) => run_range(args, &session),
        Commands::SweepCheck(args) => run_sweep_check(args, &session),
        Commands::ShowConfig => session.config_report().emit(None, &session.ui),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::error::DoctorError;
    use crate::grid::GridArgs;

    use super::{Cli, Commands, GlobalArgs, run};

    #[test]
    fn show_config_dispatches_successfully() {
        let result = run(Cli {
            globals: GlobalArgs::default(),
            command: Commands::ShowConfig,
        });
        assert!(result.is_ok());
    }

    #[test]
    fn grid_command_dispatches_missing_path_error() {
        let result = run(Cli {
            globals: GlobalArgs::default(),
            command: Commands::Grid(GridArgs {
                input: PathBuf::from("/tmp/doctor_verdict/does-not-exist.json"),
                axis1: "reliability".to_string(),
                axis2: "cacheSize".to_string(),
                metric: "cacheHitRate".to_string(),
                lower_is_better: false,
                output: None,
            }),
        });

        match result.expect_err("missing input should fail") {
            DoctorError::MissingPath { path } => {
                assert_eq!(path, PathBuf::from("/tmp/doctor_verdict/does-not-exist.json"));
            }
            other => panic!("expected MissingPath, got {other}"),
        }
    }

    #[test]
    fn missing_config_file_fails_before_dispatch() {
        let result = run(Cli {
            globals: GlobalArgs {
                config: Some(PathBuf::from("/tmp/doctor_verdict/missing.toml")),
                tolerance: None,
            },
            command: Commands::ShowConfig,
        });
        assert!(matches!(result, Err(DoctorError::MissingPath { .. })));
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "doctor_verdict",
            "winner",
            "--scores",
            r#"{"LRU":1}"#,
            "--tolerance",
            "0.05",
        ])
        .expect("parse");
        assert_eq!(cli.globals.tolerance, Some(0.05));
        assert!(matches!(cli.command, Commands::Winner(_)));
    }

    #[test]
    fn condition_commands_parse_with_defaults() {
        let cli = Cli::try_parse_from(["doctor_verdict", "levels", "--input", "sweep.json"])
            .expect("parse levels");
        match cli.command {
            Commands::Levels(args) => {
                assert_eq!(args.axis, "reliability");
                assert!(args.metrics.is_none());
            }
            other => panic!("expected levels, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["doctor_verdict", "range", "--input", "sweep.json"])
            .expect("parse range");
        assert!(matches!(cli.command, Commands::Range(args) if args.metric == "deliveryRate"));
    }
}
