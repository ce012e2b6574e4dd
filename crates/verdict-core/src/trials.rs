//! Per-policy summaries of repeated randomized trials.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order::CanonicalOrder;
use crate::table::{ResultRow, column_present};

/// Mean and sample standard deviation of one metric for one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub mean: f64,
    /// Sample standard deviation (`n - 1` divisor); `0` for a single run.
    pub std: f64,
}

impl MetricSummary {
    fn from_values(metric: &str, values: &[f64]) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
            (squares / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        Self {
            metric: metric.to_string(),
            mean,
            std,
        }
    }

    /// `41.0±2.3%` for percentage metrics with a fractional mean, `0.512±0.010` otherwise.
    #[must_use]
    pub fn display(&self, percent: bool) -> String {
        if percent && self.mean <= 1.1 {
            format!("{:.1}±{:.1}%", self.mean * 100.0, self.std * 100.0)
        } else {
            format!("{:.3}±{:.3}", self.mean, self.std)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub policy: String,
    pub runs: usize,
    /// One entry per aggregated metric, in the requested metric order.
    pub metrics: Vec<MetricSummary>,
}

impl AggregateRow {
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|summary| summary.metric == metric)
    }

    /// Table cell text for `metric`; `None` when the metric was not aggregated.
    #[must_use]
    pub fn summary_cell(&self, metric: &str, percent: bool) -> Option<String> {
        self.get(metric).map(|summary| summary.display(percent))
    }
}

/// Group `rows` by policy and summarize every metric of `metric_keys` present
/// in the data.
///
/// Rows come back in canonical order with unknown policies after the known
/// ones, in first-encounter order.
pub fn aggregate(
    rows: &[ResultRow],
    metric_keys: &[String],
    order: &CanonicalOrder,
) -> Result<Vec<AggregateRow>> {
    let metrics: Vec<&str> = metric_keys
        .iter()
        .map(String::as_str)
        .filter(|key| column_present(rows, key))
        .collect();

    let mut groups: Vec<(&str, Vec<(usize, &ResultRow)>)> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match groups.iter_mut().find(|(policy, _)| *policy == row.policy) {
            Some((_, members)) => members.push((index, row)),
            None => groups.push((row.policy.as_str(), vec![(index, row)])),
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (policy, members) in &groups {
        let mut summaries = Vec::with_capacity(metrics.len());
        for metric in &metrics {
            let values = members
                .iter()
                .map(|(index, row)| row.number(*index, metric))
                .collect::<Result<Vec<_>>>()?;
            summaries.push(MetricSummary::from_values(metric, &values));
        }
        out.push(AggregateRow {
            policy: (*policy).to_string(),
            runs: members.len(),
            metrics: summaries,
        });
    }

    // Stable: unknown policies share one rank and keep encounter order.
    out.sort_by_key(|row| order.rank(&row.policy));

    tracing::debug!(
        rows = rows.len(),
        policies = out.len(),
        metrics = metrics.len(),
        "randomized trials aggregated"
    );
    Ok(out)
}
