use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use verdict_core::{ColorScale, GridBuilder, WinnerGrid};

use crate::error::{DoctorError, Result};
use crate::report::{Report, Session};
use crate::util::{CliOutput, load_rows, split_list};

#[derive(Debug, Clone, Args)]
pub struct GridArgs {
    /// JSON array of result rows.
    #[arg(long)]
    pub input: PathBuf,

    /// Condition column for grid rows.
    #[arg(long)]
    pub axis1: String,

    /// Condition column for grid columns.
    #[arg(long)]
    pub axis2: String,

    #[arg(long)]
    pub metric: String,

    /// Treat smaller values as better regardless of the metric catalogue.
    #[arg(long = "lower-is-better")]
    pub lower_is_better: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct MetricGridArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub axis: String,

    /// Comma-separated metric keys; defaults to the configured heatmap metrics.
    #[arg(long)]
    pub metrics: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridReport {
    pub metric: String,
    pub higher_is_better: Option<bool>,
    pub labels: Vec<Vec<String>>,
    pub index: Vec<Vec<Option<i32>>>,
    pub tie_cells: Vec<(usize, usize)>,
    pub color_scale: ColorScale,
    pub grid: WinnerGrid,
}

impl GridReport {
    fn new(
        metric: String,
        higher_is_better: Option<bool>,
        grid: WinnerGrid,
        session: &Session,
    ) -> Self {
        Self {
            metric,
            higher_is_better,
            labels: grid.label_grid(),
            index: grid.index_grid(),
            tie_cells: grid.tie_cells(),
            color_scale: grid.color_scale(&session.config),
            grid,
        }
    }
}

pub fn build_grid_report(args: &GridArgs, session: &Session) -> Result<GridReport> {
    if args.axis1 == args.axis2 {
        return Err(DoctorError::invalid("--axis1 and --axis2 must name different columns"));
    }
    let rows = load_rows(&args.input)?;
    let higher_is_better = session.higher_is_better(&args.metric, args.lower_is_better);
    let resolver = session.config.resolver();
    let grid = GridBuilder::new(&resolver)
        .strict(session.config.strict_multiplicity)
        .build(&rows, &args.axis1, &args.axis2, &args.metric, higher_is_better)?;
    Ok(GridReport::new(args.metric.clone(), Some(higher_is_better), grid, session))
}

pub fn build_metric_grid_report(args: &MetricGridArgs, session: &Session) -> Result<GridReport> {
    let keys = args
        .metrics
        .as_deref()
        .map_or_else(|| session.config.heatmap_metrics.clone(), split_list);
    let specs = session.config.metric_specs(&keys);
    let unknown: Vec<&str> = keys
        .iter()
        .filter(|key| session.config.metric(key).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(DoctorError::invalid(format!(
            "metrics not in the catalogue: {}",
            unknown.join(", ")
        )));
    }

    let rows = load_rows(&args.input)?;
    let resolver = session.config.resolver();
    let grid = GridBuilder::new(&resolver)
        .strict(session.config.strict_multiplicity)
        .build_metric_grid(&rows, &args.axis, &specs)?;
    Ok(GridReport::new(keys.join(","), None, grid, session))
}

fn describe(report: &GridReport, ui: &CliOutput) {
    ui.rule(Some(&format!("winner grid: {}", report.metric)));
    ui.info(&format!(
        "{} x {} cells over {} policies",
        report.grid.rows.ticks.len(),
        report.grid.columns.ticks.len(),
        report.grid.policies.len()
    ));
    if report.grid.duplicate_rows > 0 {
        ui.warning(&format!(
            "{} duplicate rows ignored (first row per policy and cell used)",
            report.grid.duplicate_rows
        ));
    }
}

pub fn run_grid(args: GridArgs, session: &Session) -> Result<()> {
    let report = build_grid_report(&args, session)?;
    describe(&report, &session.ui);
    Report::new("grid", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}

pub fn run_metric_grid(args: MetricGridArgs, session: &Session) -> Result<()> {
    let grid = build_metric_grid_report(&args, session)?;
    describe(&grid, &session.ui);
    Report::new("metric-grid", Some(&args.input), grid).emit(args.output.as_deref(), &session.ui)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use tempfile::tempdir;

    use super::{GridArgs, MetricGridArgs, build_grid_report, build_metric_grid_report};
    use crate::cli::GlobalArgs;
    use crate::error::DoctorError;
    use crate::report::Session;

    fn write_rows(dir: &Path) -> PathBuf {
        let rows = json!([
            {"policy": "LRU", "cacheSize": 50, "reliability": 0.5, "cacheHitRate": 0.6, "staleAccessRate": 0.3},
            {"policy": "TTLOnly", "cacheSize": 50, "reliability": 0.5, "cacheHitRate": 0.4, "staleAccessRate": 0.1},
            {"policy": "LRU", "cacheSize": 100, "reliability": 0.5, "cacheHitRate": 0.5, "staleAccessRate": 0.2},
            {"policy": "TTLOnly", "cacheSize": 100, "reliability": 0.5, "cacheHitRate": 0.5, "staleAccessRate": 0.2},
        ]);
        let path = dir.join("rows.json");
        std::fs::write(&path, rows.to_string()).expect("write rows");
        path
    }

    fn session() -> Session {
        Session::open(&GlobalArgs::default()).expect("session")
    }

    #[test]
    fn grid_report_carries_labels_and_scale() {
        let dir = tempdir().expect("tempdir");
        let args = GridArgs {
            input: write_rows(dir.path()),
            axis1: "reliability".to_string(),
            axis2: "cacheSize".to_string(),
            metric: "cacheHitRate".to_string(),
            lower_is_better: false,
            output: None,
        };
        let report = build_grid_report(&args, &session()).expect("grid report");
        assert_eq!(report.labels, vec![vec!["LRU", "ANY"]]);
        assert_eq!(report.index, vec![vec![Some(0), Some(-1)]]);
        assert_eq!(report.tie_cells, vec![(0, 1)]);
        assert!(report.color_scale.tie_in_use);
    }

    #[test]
    fn identical_axes_are_rejected() {
        let args = GridArgs {
            input: PathBuf::from("unused.json"),
            axis1: "cacheSize".to_string(),
            axis2: "cacheSize".to_string(),
            metric: "cacheHitRate".to_string(),
            lower_is_better: false,
            output: None,
        };
        let err = build_grid_report(&args, &session()).expect_err("same axis");
        assert!(matches!(err, DoctorError::InvalidArgument { .. }));
    }

    #[test]
    fn metric_grid_defaults_to_configured_heatmap_metrics() {
        let dir = tempdir().expect("tempdir");
        let args = MetricGridArgs {
            input: write_rows(dir.path()),
            axis: "cacheSize".to_string(),
            metrics: Some("cacheHitRate,staleAccessRate".to_string()),
            output: None,
        };
        let report = build_metric_grid_report(&args, &session()).expect("metric grid");
        assert_eq!(report.labels, vec![vec!["LRU", "ANY"], vec!["TTL", "ANY"]]);
        assert_eq!(report.higher_is_better, None);

        let defaults = MetricGridArgs {
            metrics: None,
            ..args
        };
        let report = build_metric_grid_report(&defaults, &session()).expect("metric grid");
        // Only cacheHitRate of the default heatmap metrics is present.
        assert_eq!(report.labels.len(), 1);
    }

    #[test]
    fn unknown_metric_key_is_rejected() {
        let args = MetricGridArgs {
            input: PathBuf::from("unused.json"),
            axis: "cacheSize".to_string(),
            metrics: Some("cacheHitRate,bogus".to_string()),
            output: None,
        };
        let err = build_metric_grid_report(&args, &session()).expect_err("unknown metric");
        assert!(err.to_string().contains("bogus"));
    }
}
