use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use verdict_core::conditions::{
    LevelComparison, PerformanceRange, RegionSplit, SweepShape, condition_comparison,
    extreme_scenarios, performance_range, recommendation_regions,
};
use verdict_core::{GridBuilder, Retention, Scenario, network_label, resilience, validate_sweep};

use crate::error::{DoctorError, Result};
use crate::report::{Report, Session};
use crate::util::{load_rows, split_list};

/// Axis whose values are named after the configured network conditions.
pub const RELIABILITY_AXIS: &str = "reliability";

#[derive(Debug, Clone, Args)]
pub struct ResilienceArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = RELIABILITY_AXIS)]
    pub axis: String,

    #[arg(long, default_value = "deliveryRate")]
    pub metric: String,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ScenariosArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub axis1: String,

    #[arg(long)]
    pub axis2: String,

    #[arg(long)]
    pub metric: String,

    #[arg(long = "lower-is-better")]
    pub lower_is_better: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SweepCheckArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Comma-separated condition columns.
    #[arg(long)]
    pub axes: String,

    /// Comma-separated metric columns every row must carry.
    #[arg(long, default_value = "")]
    pub required: String,
}

#[derive(Debug, Clone, Args)]
pub struct RegionsArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub axis1: String,

    #[arg(long)]
    pub axis2: String,

    /// Comma-separated metrics averaged into the composite score; defaults to
    /// the configured composite metrics.
    #[arg(long)]
    pub metrics: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct LevelsArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = RELIABILITY_AXIS)]
    pub axis: String,

    /// Comma-separated metric keys; defaults to the configured condition metrics.
    #[arg(long)]
    pub metrics: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "deliveryRate")]
    pub metric: String,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetentionEntry {
    #[serde(flatten)]
    pub retention: Retention,
    pub weakest_label: Option<String>,
    pub strongest_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResilienceReport {
    pub axis: String,
    pub metric: String,
    pub policies: Vec<RetentionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenariosReport {
    pub metric: String,
    pub higher_is_better: bool,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelEntry {
    #[serde(flatten)]
    pub comparison: LevelComparison,
    pub condition_label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelsReport {
    pub axis: String,
    /// Empty when the axis has fewer than three distinct values.
    pub levels: Vec<LevelEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeEntry {
    #[serde(flatten)]
    pub range: PerformanceRange,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    pub metric: String,
    pub policies: Vec<RangeEntry>,
}

/// Name for `value` on `axis` when the axis is the reliability column.
fn condition_label(session: &Session, axis: &str, value: f64) -> Option<String> {
    let config = &session.config;
    let window = config.network_match_window;
    (axis == RELIABILITY_AXIS).then(|| network_label(value, &config.network_conditions, window))
}

fn metric_keys(list: Option<&str>, defaults: &[String]) -> Vec<String> {
    list.map_or_else(|| defaults.to_vec(), split_list)
}

pub fn build_resilience_report(
    args: &ResilienceArgs,
    session: &Session,
) -> Result<ResilienceReport> {
    let rows = load_rows(&args.input)?;
    let label = |value: f64| condition_label(session, &args.axis, value);

    let policies = resilience(&rows, &args.axis, &args.metric, &session.config.order)?
        .into_iter()
        .map(|retention| RetentionEntry {
            weakest_label: label(retention.weakest_axis_value),
            strongest_label: label(retention.strongest_axis_value),
            retention,
        })
        .collect();

    Ok(ResilienceReport {
        axis: args.axis.clone(),
        metric: args.metric.clone(),
        policies,
    })
}

pub fn build_scenarios_report(args: &ScenariosArgs, session: &Session) -> Result<ScenariosReport> {
    if args.axis1 == args.axis2 {
        return Err(DoctorError::invalid("--axis1 and --axis2 must name different columns"));
    }
    let rows = load_rows(&args.input)?;
    let higher_is_better = session.higher_is_better(&args.metric, args.lower_is_better);
    let resolver = session.config.resolver();
    let builder = GridBuilder::new(&resolver).strict(session.config.strict_multiplicity);
    let scenarios = extreme_scenarios(
        &rows,
        &args.axis1,
        &args.axis2,
        &args.metric,
        higher_is_better,
        &builder,
    )?;
    Ok(ScenariosReport {
        metric: args.metric.clone(),
        higher_is_better,
        scenarios,
    })
}

pub fn build_regions_report(args: &RegionsArgs, session: &Session) -> Result<RegionSplit> {
    if args.axis1 == args.axis2 {
        return Err(DoctorError::invalid("--axis1 and --axis2 must name different columns"));
    }
    let keys = metric_keys(args.metrics.as_deref(), &session.config.composite_metrics);
    if keys.is_empty() {
        return Err(DoctorError::invalid("--metrics must name at least one column"));
    }
    let rows = load_rows(&args.input)?;
    let metrics: Vec<&str> = keys.iter().map(String::as_str).collect();
    let resolver = session.config.resolver();
    recommendation_regions(&rows, &args.axis1, &args.axis2, &metrics, &resolver)?
        .ok_or_else(|| DoctorError::invalid("input holds no rows to split into regions"))
}

pub fn build_levels_report(args: &LevelsArgs, session: &Session) -> Result<LevelsReport> {
    let keys = metric_keys(args.metrics.as_deref(), &session.config.condition_metrics);
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
    let specs = session.config.metric_specs(&keys);
    let resolver = session.config.resolver();
    let levels = condition_comparison(&rows, &args.axis, &specs, &resolver)?
        .into_iter()
        .map(|comparison| LevelEntry {
            condition_label: condition_label(session, &args.axis, comparison.axis_value),
            comparison,
        })
        .collect();
    Ok(LevelsReport {
        axis: args.axis.clone(),
        levels,
    })
}

pub fn build_range_report(args: &RangeArgs, session: &Session) -> Result<RangeReport> {
    let rows = load_rows(&args.input)?;
    let percent = session
        .config
        .metric(&args.metric)
        .is_some_and(|metric| metric.percent);
    let policies = performance_range(&rows, &args.metric, &session.config.order)?
        .into_iter()
        .map(|range| RangeEntry {
            display: range_display(&range, percent),
            range,
        })
        .collect();
    Ok(RangeReport {
        metric: args.metric.clone(),
        policies,
    })
}

/// `40.0%-90.0% (spread 50.0)` for percentage metrics, plain decimals otherwise.
fn range_display(range: &PerformanceRange, percent: bool) -> String {
    if percent {
        format!(
            "{:.1}%-{:.1}% (spread {:.1})",
            range.min * 100.0,
            range.max * 100.0,
            range.spread * 100.0
        )
    } else {
        format!(
            "{:.3}-{:.3} (spread {:.3})",
            range.min, range.max, range.spread
        )
    }
}

pub fn check_sweep(args: &SweepCheckArgs) -> Result<SweepShape> {
    let axes = split_list(&args.axes);
    if axes.is_empty() {
        return Err(DoctorError::invalid("--axes must name at least one column"));
    }
    let required = split_list(&args.required);
    let rows = load_rows(&args.input)?;

    let axes: Vec<&str> = axes.iter().map(String::as_str).collect();
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    Ok(validate_sweep(&rows, &required, &axes)?)
}

pub fn run_resilience(args: ResilienceArgs, session: &Session) -> Result<()> {
    let report = build_resilience_report(&args, session)?;
    session
        .ui
        .rule(Some(&format!("{} resilience over {}", report.metric, report.axis)));
    for entry in &report.policies {
        session.ui.info(&format!(
            "{}: {:.1}% retained",
            entry.retention.policy, entry.retention.retention_pct
        ));
    }
    Report::new("resilience", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}

pub fn run_scenarios(args: ScenariosArgs, session: &Session) -> Result<()> {
    let report = build_scenarios_report(&args, session)?;
    for scenario in &report.scenarios {
        session
            .ui
            .info(&format!("{}: {}", scenario.title, scenario.cell.label));
    }
    Report::new("scenarios", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}

pub fn run_regions(args: RegionsArgs, session: &Session) -> Result<()> {
    let split = build_regions_report(&args, session)?;
    session.ui.rule(Some(&format!(
        "recommendations split at {}={} and {}={}",
        split.axis1, split.axis1_split, split.axis2, split.axis2_split
    )));
    for region in &split.regions {
        let score = region
            .best_score
            .map_or_else(|| "-".to_string(), |score| format!("{score:.3}"));
        session
            .ui
            .info(&format!("{}: {} ({score})", region.title, region.label));
    }
    Report::new("regions", Some(&args.input), split).emit(args.output.as_deref(), &session.ui)
}

pub fn run_levels(args: LevelsArgs, session: &Session) -> Result<()> {
    let report = build_levels_report(&args, session)?;
    if report.levels.is_empty() {
        session.ui.warning(&format!(
            "{} has fewer than three distinct values; nothing to compare",
            report.axis
        ));
    }
    for entry in &report.levels {
        let name = entry
            .condition_label
            .clone()
            .unwrap_or_else(|| entry.comparison.axis_value.to_string());
        let winners: Vec<String> = entry
            .comparison
            .metrics
            .iter()
            .map(|metric| format!("{}={}", metric.metric, metric.label))
            .collect();
        session.ui.info(&format!("{name}: {}", winners.join(", ")));
    }
    Report::new("levels", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}

pub fn run_range(args: RangeArgs, session: &Session) -> Result<()> {
    let report = build_range_report(&args, session)?;
    session.ui.rule(Some(&format!("{} range", report.metric)));
    for entry in &report.policies {
        session
            .ui
            .info(&format!("{}: {}", entry.range.policy, entry.display));
    }
    Report::new("range", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}

pub fn run_sweep_check(args: SweepCheckArgs, session: &Session) -> Result<()> {
    let shape = check_sweep(&args)?;
    for (axis, count) in &shape.axes {
        if *count < 2 {
            session
                .ui
                .warning(&format!("axis {axis} has {count} distinct value(s)"));
        }
    }
    Report::new("sweep-check", Some(&args.input), shape).emit(None, &session.ui)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use tempfile::tempdir;
    use verdict_core::EngineError;
    use verdict_core::conditions::{ConditionLevel, Corner};

    use super::{
        LevelsArgs, RangeArgs, RegionsArgs, ResilienceArgs, ScenariosArgs, SweepCheckArgs,
        build_levels_report, build_range_report, build_regions_report, build_resilience_report,
        build_scenarios_report, check_sweep,
    };
    use crate::cli::GlobalArgs;
    use crate::error::DoctorError;
    use crate::report::Session;

    fn write_sweep(dir: &Path) -> PathBuf {
        let rows = json!([
            {"policy": "LRU", "cacheSize": 50, "reliability": 0.3, "deliveryRate": 0.45},
            {"policy": "TTLOnly", "cacheSize": 50, "reliability": 0.3, "deliveryRate": 0.2},
            {"policy": "LRU", "cacheSize": 50, "reliability": 1.0, "deliveryRate": 0.9},
            {"policy": "TTLOnly", "cacheSize": 50, "reliability": 1.0, "deliveryRate": 0.8},
            {"policy": "LRU", "cacheSize": 200, "reliability": 0.3, "deliveryRate": 0.5},
            {"policy": "TTLOnly", "cacheSize": 200, "reliability": 0.3, "deliveryRate": 0.5},
            {"policy": "LRU", "cacheSize": 200, "reliability": 1.0, "deliveryRate": 0.95},
            {"policy": "TTLOnly", "cacheSize": 200, "reliability": 1.0, "deliveryRate": 0.97},
        ]);
        let path = dir.join("sweep.json");
        std::fs::write(&path, rows.to_string()).expect("write sweep");
        path
    }

    fn session() -> Session {
        Session::open(&GlobalArgs::default()).expect("session")
    }

    #[test]
    fn resilience_names_reliability_levels() {
        let dir = tempdir().expect("tempdir");
        let rows = json!([
            {"policy": "LRU", "reliability": 0.3, "deliveryRate": 0.45},
            {"policy": "LRU", "reliability": 1.0, "deliveryRate": 0.9},
        ]);
        let input = dir.path().join("resilience.json");
        std::fs::write(&input, rows.to_string()).expect("write rows");

        let report = build_resilience_report(
            &ResilienceArgs {
                input,
                axis: "reliability".to_string(),
                metric: "deliveryRate".to_string(),
                output: None,
            },
            &session(),
        )
        .expect("resilience");

        let lru = &report.policies[0];
        assert!((lru.retention.retention_pct - 50.0).abs() < 1e-9);
        assert_eq!(lru.weakest_label.as_deref(), Some("Disaster (30%)"));
        assert_eq!(lru.strongest_label.as_deref(), Some("Perfect (100%)"));
    }

    #[test]
    fn scenarios_report_four_corners() {
        let dir = tempdir().expect("tempdir");
        let report = build_scenarios_report(
            &ScenariosArgs {
                input: write_sweep(dir.path()),
                axis1: "cacheSize".to_string(),
                axis2: "reliability".to_string(),
                metric: "deliveryRate".to_string(),
                lower_is_better: false,
                output: None,
            },
            &session(),
        )
        .expect("scenarios");

        let corners: Vec<(Corner, &str)> = report
            .scenarios
            .iter()
            .map(|s| (s.corner, s.cell.label.as_str()))
            .collect();
        assert_eq!(
            corners,
            vec![
                (Corner::BestCase, "TTL"),
                (Corner::HighLow, "ANY"),
                (Corner::LowHigh, "LRU"),
                (Corner::WorstCase, "LRU"),
            ]
        );
    }

    #[test]
    fn sweep_check_requires_metric_columns() {
        let dir = tempdir().expect("tempdir");
        let input = write_sweep(dir.path());
        let shape = check_sweep(&SweepCheckArgs {
            input: input.clone(),
            axes: "cacheSize,reliability".to_string(),
            required: "deliveryRate".to_string(),
        })
        .expect("shape");
        assert_eq!(shape.rows, 8);
        assert_eq!(shape.policies, 2);

        let err = check_sweep(&SweepCheckArgs {
            input,
            axes: "cacheSize".to_string(),
            required: "cacheHitRate".to_string(),
        })
        .expect_err("missing metric");
        assert!(matches!(
            err,
            DoctorError::Engine(EngineError::MissingColumn { row: 0, .. })
        ));
    }

    fn regions_args(input: PathBuf, metrics: Option<&str>) -> RegionsArgs {
        RegionsArgs {
            input,
            axis1: "cacheSize".to_string(),
            axis2: "reliability".to_string(),
            metrics: metrics.map(str::to_string),
            output: None,
        }
    }

    #[test]
    fn regions_report_resolves_each_half_plane() {
        let dir = tempdir().expect("tempdir");
        let args = regions_args(write_sweep(dir.path()), Some("deliveryRate"));
        let split = build_regions_report(&args, &session()).expect("regions");

        assert_eq!(split.axis1_split, 200.0);
        assert_eq!(split.axis2_split, 1.0);
        let labels: Vec<&str> = split.regions.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["TTL", "ANY", "LRU", "LRU"]);
        assert_eq!(split.regions[0].title, "High cacheSize / High reliability");
        assert_eq!(split.regions[0].best_score, Some(0.97));
    }

    #[test]
    fn regions_default_to_the_composite_metrics() {
        let dir = tempdir().expect("tempdir");
        let args = regions_args(write_sweep(dir.path()), None);
        let err = build_regions_report(&args, &session()).expect_err("no actionability column");
        assert!(err.to_string().contains("actionabilityFirstRatio"), "{err}");

        let args = regions_args(PathBuf::from("unused.json"), Some(" , "));
        let err = build_regions_report(&args, &session()).expect_err("empty metric list");
        assert!(matches!(err, DoctorError::InvalidArgument { .. }));
    }

    #[test]
    fn levels_report_names_good_poor_and_disaster() {
        let dir = tempdir().expect("tempdir");
        let rows = json!([
            {"policy": "LRU", "reliability": 1.0, "deliveryRate": 0.9, "staleAccessRate": 0.1},
            {"policy": "TTLOnly", "reliability": 1.0, "deliveryRate": 0.95, "staleAccessRate": 0.1},
            {"policy": "LRU", "reliability": 0.7, "deliveryRate": 0.7, "staleAccessRate": 0.2},
            {"policy": "TTLOnly", "reliability": 0.7, "deliveryRate": 0.6, "staleAccessRate": 0.3},
            {"policy": "LRU", "reliability": 0.5, "deliveryRate": 0.5, "staleAccessRate": 0.3},
            {"policy": "TTLOnly", "reliability": 0.5, "deliveryRate": 0.5, "staleAccessRate": 0.3},
            {"policy": "LRU", "reliability": 0.3, "deliveryRate": 0.3, "staleAccessRate": 0.5},
            {"policy": "TTLOnly", "reliability": 0.3, "deliveryRate": 0.4, "staleAccessRate": 0.4},
        ]);
        let input = dir.path().join("levels.json");
        std::fs::write(&input, rows.to_string()).expect("write rows");
        let args = LevelsArgs {
            input,
            axis: "reliability".to_string(),
            metrics: Some("deliveryRate,staleAccessRate".to_string()),
            output: None,
        };

        let report = build_levels_report(&args, &session()).expect("levels");
        let summary: Vec<(ConditionLevel, Vec<&str>)> = report
            .levels
            .iter()
            .map(|entry| {
                let labels = entry.comparison.metrics.iter().map(|m| m.label.as_str());
                (entry.comparison.level, labels.collect())
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (ConditionLevel::Good, vec!["TTL", "ANY"]),
                (ConditionLevel::Poor, vec!["LRU", "LRU"]),
                (ConditionLevel::Disaster, vec!["TTL", "TTL"]),
            ]
        );
        let names: Vec<&str> = report
            .levels
            .iter()
            .filter_map(|entry| entry.condition_label.as_deref())
            .collect();
        assert_eq!(names, ["Perfect (100%)", "Poor (70%)", "Disaster (30%)"]);
    }

    #[test]
    fn levels_reject_metrics_outside_the_catalogue() {
        let args = LevelsArgs {
            input: PathBuf::from("unused.json"),
            axis: "reliability".to_string(),
            metrics: Some("deliveryRate,bogus".to_string()),
            output: None,
        };
        let err = build_levels_report(&args, &session()).expect_err("unknown metric");
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn range_report_formats_percentage_spread() {
        let dir = tempdir().expect("tempdir");
        let args = RangeArgs {
            input: write_sweep(dir.path()),
            metric: "deliveryRate".to_string(),
            output: None,
        };
        let report = build_range_report(&args, &session()).expect("range");

        let lru = &report.policies[0];
        assert_eq!(lru.range.policy, "LRU");
        assert_eq!(lru.range.runs, 4);
        assert_eq!(lru.display, "45.0%-95.0% (spread 50.0)");
        assert_eq!(report.policies[1].display, "20.0%-97.0% (spread 77.0)");
    }
}
