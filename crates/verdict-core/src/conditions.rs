//! Condition-level analysis over a sweep: reliability naming, metric
//! retention between the weakest and strongest condition, the winners at the
//! four corners of a two-axis sweep, median-split recommendation regions,
//! good/poor/disaster level comparisons and per-policy performance ranges.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{MetricSpec, NetworkCondition};
use crate::error::{EngineError, Result};
use crate::grid::{GridBuilder, GridCell};
use crate::order::CanonicalOrder;
use crate::resolver::{PolicyScores, Resolver, Verdict};
use crate::table::{ResultRow, column_present, distinct_values, policies_in, require_columns};

/// Human-readable name for `reliability`.
///
/// The nearest configured condition wins when it lies strictly within
/// `window`; otherwise the value prints as a whole percentage.
#[must_use]
pub fn network_label(reliability: f64, conditions: &[NetworkCondition], window: f64) -> String {
    let nearest = conditions.iter().min_by(|a, b| {
        (a.reliability - reliability)
            .abs()
            .total_cmp(&(b.reliability - reliability).abs())
    });
    match nearest {
        Some(condition) if (condition.reliability - reliability).abs() < window => {
            condition.label.clone()
        }
        _ => format!("{:.0}%", reliability * 100.0),
    }
}

/// How much of a metric a policy keeps at the weakest condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retention {
    pub policy: String,
    pub weakest_axis_value: f64,
    pub strongest_axis_value: f64,
    pub weakest_value: f64,
    pub strongest_value: f64,
    /// `weakest / strongest × 100`; `0` when the strongest value is not positive.
    pub retention_pct: f64,
}

/// Per-policy retention of `metric` between the smallest and largest `axis`
/// value, in canonical order with unknown policies last.
pub fn resilience(
    rows: &[ResultRow],
    axis: &str,
    metric: &str,
    order: &CanonicalOrder,
) -> Result<Vec<Retention>> {
    require_columns(rows, &[axis, metric])?;

    let mut policies = policies_in(rows);
    policies.sort_by_key(|policy| order.rank(policy));

    let mut out = Vec::with_capacity(policies.len());
    for policy in policies {
        let mut points = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if row.policy == policy {
                points.push((row.number(index, axis)?, row.number(index, metric)?));
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (Some(&(weak_axis, weak_value)), Some(&(strong_axis, strong_value))) =
            (points.first(), points.last())
        else {
            continue;
        };
        let retention_pct = if strong_value > 0.0 {
            weak_value / strong_value * 100.0
        } else {
            0.0
        };
        out.push(Retention {
            policy: policy.to_string(),
            weakest_axis_value: weak_axis,
            strongest_axis_value: strong_axis,
            weakest_value: weak_value,
            strongest_value: strong_value,
            retention_pct,
        });
    }
    Ok(out)
}

/// Corner of a two-axis sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    /// Largest value on both axes.
    BestCase,
    /// Largest first-axis value, smallest second-axis value.
    HighLow,
    /// Smallest first-axis value, largest second-axis value.
    LowHigh,
    /// Smallest value on both axes.
    WorstCase,
}

impl Corner {
    pub const ALL: [Self; 4] = [Self::BestCase, Self::HighLow, Self::LowHigh, Self::WorstCase];

    #[must_use]
    pub fn title(self, axis1: &str, axis2: &str) -> String {
        match self {
            Self::BestCase => "Best Case".to_string(),
            Self::HighLow => format!("High {axis1} / Low {axis2}"),
            Self::LowHigh => format!("Low {axis1} / High {axis2}"),
            Self::WorstCase => "Worst Case".to_string(),
        }
    }

    /// Whether this corner sits on the high side of the first and second axis.
    #[must_use]
    pub fn is_high(self) -> (bool, bool) {
        match self {
            Self::BestCase => (true, true),
            Self::HighLow => (true, false),
            Self::LowHigh => (false, true),
            Self::WorstCase => (false, false),
        }
    }

    /// Title of the half-plane region around this corner.
    #[must_use]
    pub fn region_title(self, axis1: &str, axis2: &str) -> String {
        let side = |high: bool| if high { "High" } else { "Low" };
        let (high1, high2) = self.is_high();
        format!("{} {axis1} / {} {axis2}", side(high1), side(high2))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub corner: Corner,
    pub title: String,
    pub axis1_value: f64,
    pub axis2_value: f64,
    pub cell: GridCell,
}

/// Winners at the four corners of the `axis1` × `axis2` sweep.
///
/// Empty when either axis has no values.
pub fn extreme_scenarios(
    rows: &[ResultRow],
    axis1: &str,
    axis2: &str,
    metric: &str,
    higher_is_better: bool,
    builder: &GridBuilder<'_>,
) -> Result<Vec<Scenario>> {
    let first = distinct_values(rows, axis1)?;
    let second = distinct_values(rows, axis2)?;
    let (Some(&lo1), Some(&hi1), Some(&lo2), Some(&hi2)) =
        (first.first(), first.last(), second.first(), second.last())
    else {
        return Ok(Vec::new());
    };

    let grid = builder.build(rows, axis1, axis2, metric, higher_is_better)?;
    let (last1, last2) = (first.len() - 1, second.len() - 1);

    let mut out = Vec::with_capacity(Corner::ALL.len());
    for corner in Corner::ALL {
        let (i, j, v1, v2) = match corner {
            Corner::BestCase => (last1, last2, hi1, hi2),
            Corner::HighLow => (last1, 0, hi1, lo2),
            Corner::LowHigh => (0, last2, lo1, hi2),
            Corner::WorstCase => (0, 0, lo1, lo2),
        };
        if let Some(cell) = grid.cell(i, j) {
            out.push(Scenario {
                corner,
                title: corner.title(axis1, axis2),
                axis1_value: v1,
                axis2_value: v2,
                cell: cell.clone(),
            });
        }
    }
    Ok(out)
}

/// Shape of a condition sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepShape {
    pub rows: usize,
    pub policies: usize,
    pub axes: Vec<(String, usize)>,
}

/// Check `required` columns (hard failure) and count distinct values per axis.
///
/// An axis with fewer than two values cannot be compared across; it is
/// logged, not rejected.
pub fn validate_sweep(rows: &[ResultRow], required: &[&str], axes: &[&str]) -> Result<SweepShape> {
    let mut all: Vec<&str> = required.to_vec();
    all.extend(axes.iter().filter(|axis| !required.contains(axis)));
    require_columns(rows, &all)?;

    let mut counts = Vec::with_capacity(axes.len());
    for axis in axes {
        let distinct = distinct_values(rows, axis)?;
        if distinct.len() < 2 {
            tracing::warn!(
                axis = %axis,
                values = ?distinct,
                "sweep has fewer than two values on this axis"
            );
        }
        counts.push(((*axis).to_string(), distinct.len()));
    }

    Ok(SweepShape {
        rows: rows.len(),
        policies: policies_in(rows).len(),
        axes: counts,
    })
}

/// Convenience for [`extreme_scenarios`] with a default builder.
pub fn extreme_scenarios_with(
    rows: &[ResultRow],
    axis1: &str,
    axis2: &str,
    metric: &str,
    higher_is_better: bool,
    resolver: &Resolver,
) -> Result<Vec<Scenario>> {
    extreme_scenarios(
        rows,
        axis1,
        axis2,
        metric,
        higher_is_better,
        &GridBuilder::new(resolver),
    )
}

// ---------------------------------------------------------------------------
// Recommendation regions
// ---------------------------------------------------------------------------

/// One quadrant of a median split and the policy recommended for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub corner: Corner,
    pub title: String,
    /// Sweep cells with at least one row in this quadrant.
    pub cells: usize,
    /// Mean composite score per policy over those cells.
    pub scores: PolicyScores,
    pub verdict: Verdict,
    pub label: String,
    pub best_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSplit {
    pub axis1: String,
    pub axis2: String,
    /// Values at or above these belong to the high side.
    pub axis1_split: f64,
    pub axis2_split: f64,
    pub regions: Vec<Region>,
}

/// Split the `axis1` × `axis2` sweep at the median value of each axis and
/// recommend a policy per quadrant.
///
/// The split value is the distinct value at index `len / 2`. A policy's
/// composite score in a cell is the mean of `score_metrics` on its first row
/// there; the region score averages that over the cells where the policy was
/// measured, and the highest region score wins. Returns `None` for an empty
/// sweep.
pub fn recommendation_regions(
    rows: &[ResultRow],
    axis1: &str,
    axis2: &str,
    score_metrics: &[&str],
    resolver: &Resolver,
) -> Result<Option<RegionSplit>> {
    if score_metrics.is_empty() {
        return Err(EngineError::NoMetrics {
            operation: "recommendation regions",
        });
    }
    let mut columns = vec![axis1, axis2];
    columns.extend_from_slice(score_metrics);
    require_columns(rows, &columns)?;

    let first = distinct_values(rows, axis1)?;
    let second = distinct_values(rows, axis2)?;
    let median1 = first.get(first.len() / 2).copied();
    let median2 = second.get(second.len() / 2).copied();
    let (Some(split1), Some(split2)) = (median1, median2) else {
        return Ok(None);
    };

    let mut per_corner: Vec<(usize, BTreeMap<&str, Vec<f64>>)> =
        vec![(0, BTreeMap::new()); Corner::ALL.len()];
    for &v1 in &first {
        for &v2 in &second {
            let slot = Corner::ALL
                .iter()
                .position(|corner| corner.is_high() == (v1 >= split1, v2 >= split2))
                .unwrap_or_default();
            let (cells, scores) = &mut per_corner[slot];

            let mut seen: Vec<&str> = Vec::new();
            for (index, row) in rows.iter().enumerate() {
                if row.number(index, axis1)? != v1
                    || row.number(index, axis2)? != v2
                    || seen.contains(&row.policy.as_str())
                {
                    continue;
                }
                seen.push(&row.policy);
                let composite = composite_score(row, index, score_metrics)?;
                scores.entry(row.policy.as_str()).or_default().push(composite);
            }
            if !seen.is_empty() {
                *cells += 1;
            }
        }
    }

    let regions: Vec<Region> = Corner::ALL
        .into_iter()
        .zip(per_corner)
        .map(|(corner, (cells, samples))| {
            let scores: PolicyScores = samples
                .into_iter()
                .map(|(policy, values)| (policy, mean(&values)))
                .collect();
            let verdict = resolver.verdict(&scores);
            Region {
                corner,
                title: corner.region_title(axis1, axis2),
                cells,
                label: resolver.label(&verdict),
                best_score: scores.max(),
                scores,
                verdict,
            }
        })
        .collect();

    tracing::debug!(
        axis1 = %axis1,
        axis2 = %axis2,
        axis1_split = split1,
        axis2_split = split2,
        labels = ?regions.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
        "recommendation regions resolved"
    );
    Ok(Some(RegionSplit {
        axis1: axis1.to_string(),
        axis2: axis2.to_string(),
        axis1_split: split1,
        axis2_split: split2,
        regions,
    }))
}

#[allow(clippy::cast_precision_loss)]
fn composite_score(row: &ResultRow, index: usize, metrics: &[&str]) -> Result<f64> {
    let mut total = 0.0;
    for metric in metrics {
        total += row.number(index, metric)?;
    }
    Ok(total / metrics.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// Good / poor / disaster comparison
// ---------------------------------------------------------------------------

/// Fewest distinct axis values for which a level comparison is produced.
pub const MIN_CONDITION_LEVELS: usize = 3;

/// Representative position on a sorted condition axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLevel {
    /// Value at the 75th percentile index.
    Good,
    /// Value at the median index.
    Poor,
    /// Smallest value.
    Disaster,
}

impl ConditionLevel {
    pub const ALL: [Self; 3] = [Self::Good, Self::Poor, Self::Disaster];

    /// Index into `count` ascending distinct values.
    #[must_use]
    pub fn index(self, count: usize) -> usize {
        match self {
            Self::Good => (count * 3 / 4).min(count.saturating_sub(1)),
            Self::Poor => count / 2,
            Self::Disaster => 0,
        }
    }
}

/// Winner of one metric at one condition level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelMetric {
    pub metric: String,
    pub higher_is_better: bool,
    pub scores: PolicyScores,
    pub verdict: Verdict,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelComparison {
    pub level: ConditionLevel,
    pub axis_value: f64,
    pub metrics: Vec<LevelMetric>,
}

/// Compare policies at the good, poor and disaster values of `axis`.
///
/// Metrics absent from every row are skipped. Each policy contributes its
/// first row at the level that carries the metric. Empty when `axis` has
/// fewer than [`MIN_CONDITION_LEVELS`] distinct values.
pub fn condition_comparison(
    rows: &[ResultRow],
    axis: &str,
    metrics: &[MetricSpec],
    resolver: &Resolver,
) -> Result<Vec<LevelComparison>> {
    require_columns(rows, &[axis])?;
    let values = distinct_values(rows, axis)?;
    if values.len() < MIN_CONDITION_LEVELS {
        tracing::info!(
            axis = %axis,
            distinct = values.len(),
            "too few condition levels for a good/poor/disaster comparison"
        );
        return Ok(Vec::new());
    }
    let present: Vec<&MetricSpec> = metrics
        .iter()
        .filter(|metric| column_present(rows, &metric.key))
        .collect();

    let mut out = Vec::with_capacity(ConditionLevel::ALL.len());
    for level in ConditionLevel::ALL {
        let axis_value = values[level.index(values.len())];
        let mut at_level = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if row.number(index, axis)? == axis_value {
                at_level.push((index, row));
            }
        }

        let mut level_metrics = Vec::with_capacity(present.len());
        for metric in &present {
            let mut scores = PolicyScores::new();
            for &(index, row) in &at_level {
                if row.has(&metric.key) && scores.get(&row.policy).is_none() {
                    scores.insert(row.policy.clone(), row.number(index, &metric.key)?);
                }
            }
            let verdict = if metric.higher_is_better {
                resolver.verdict(&scores)
            } else {
                resolver.verdict(&scores.negated())
            };
            level_metrics.push(LevelMetric {
                metric: metric.key.clone(),
                higher_is_better: metric.higher_is_better,
                label: resolver.label(&verdict),
                scores,
                verdict,
            });
        }
        out.push(LevelComparison {
            level,
            axis_value,
            metrics: level_metrics,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Performance range
// ---------------------------------------------------------------------------

/// Spread of one metric for one policy across every condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRange {
    pub policy: String,
    pub runs: usize,
    pub min: f64,
    pub max: f64,
    /// `max - min`.
    pub spread: f64,
}

/// Minimum, maximum and spread of `metric` per policy over all rows, in
/// canonical order with unknown policies last.
pub fn performance_range(
    rows: &[ResultRow],
    metric: &str,
    order: &CanonicalOrder,
) -> Result<Vec<PerformanceRange>> {
    require_columns(rows, &[metric])?;

    let mut policies = policies_in(rows);
    policies.sort_by_key(|policy| order.rank(policy));

    let mut out = Vec::with_capacity(policies.len());
    for policy in policies {
        let mut runs = 0;
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for (index, row) in rows.iter().enumerate() {
            if row.policy == policy {
                let value = row.number(index, metric)?;
                min = min.min(value);
                max = max.max(value);
                runs += 1;
            }
        }
        out.push(PerformanceRange {
            policy: policy.to_string(),
            runs,
            min,
            max,
            spread: max - min,
        });
    }
    Ok(out)
}
