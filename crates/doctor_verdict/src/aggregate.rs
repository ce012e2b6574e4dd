use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use verdict_core::{MetricSummary, aggregate};

use crate::error::Result;
use crate::report::{Report, Session};
use crate::util::{load_rows, split_list};

#[derive(Debug, Clone, Args)]
pub struct AggregateArgs {
    /// JSON array of randomized-trial rows, one per policy and run.
    #[arg(long)]
    pub input: PathBuf,

    /// Comma-separated metric keys; defaults to the configured aggregate metrics.
    #[arg(long)]
    pub metrics: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// One table row: summaries plus their display cells.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub policy: String,
    pub code: String,
    pub color: String,
    pub runs: usize,
    pub summaries: Vec<MetricSummary>,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Aggregated metric keys, in column order.
    pub metrics: Vec<String>,
    /// Display header per metric column.
    pub headers: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

pub fn build_aggregate_report(args: &AggregateArgs, session: &Session) -> Result<AggregateReport> {
    let config = &session.config;
    let keys = args
        .metrics
        .as_deref()
        .map_or_else(|| config.aggregate_metrics.clone(), split_list);
    let rows = load_rows(&args.input)?;
    let summaries = aggregate(&rows, &keys, &config.order)?;

    let metrics: Vec<String> = keys
        .into_iter()
        .filter(|key| summaries.iter().any(|row| row.get(key).is_some()))
        .collect();
    let headers = metrics
        .iter()
        .map(|key| match config.metric(key) {
            Some(spec) => spec.label.clone(),
            None => key.clone(),
        })
        .collect();

    let codec = config.codec();
    let rows = summaries
        .into_iter()
        .map(|row| {
            let cells = row
                .metrics
                .iter()
                .map(|summary| {
                    let spec = config.metric(&summary.metric);
                    summary.display(spec.is_some_and(|spec| spec.percent))
                })
                .collect();
            SummaryRow {
                code: codec.encode(&row.policy),
                color: config.color_for(&row.policy).to_string(),
                policy: row.policy,
                runs: row.runs,
                summaries: row.metrics,
                cells,
            }
        })
        .collect();

    Ok(AggregateReport {
        metrics,
        headers,
        rows,
    })
}

pub fn run_aggregate(args: AggregateArgs, session: &Session) -> Result<()> {
    let report = build_aggregate_report(&args, session)?;
    session.ui.rule(Some("randomized trials"));
    for row in &report.rows {
        session
            .ui
            .info(&format!("{} ({} runs): {}", row.policy, row.runs, row.cells.join("  ")));
    }
    Report::new("aggregate", Some(&args.input), report).emit(args.output.as_deref(), &session.ui)
}
