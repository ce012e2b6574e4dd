//! Winner grids over two independent variables.
//!
//! Each cell resolves the scores of the canonical policies measured at that
//! cell. The grid carries a display label and a colour index per cell; both
//! derive from the cell's [`Verdict`].
//!
//! Index domain is `[-1, policies.len() - 1]`: `-1` is the full-tie sentinel,
//! `i >= 0` points into [`WinnerGrid::policies`]. Cells that cannot name a
//! winner carry [`WinnerIndex::Missing`], serialized as `null`.

use std::ops::RangeInclusive;

use serde::{Serialize, Serializer};

use crate::config::{MetricSpec, VerdictConfig};
use crate::error::{EngineError, Result};
use crate::resolver::{PolicyScores, Resolver, Verdict};
use crate::table::{ResultRow, column_present, distinct_values};

/// Label shown in a colour legend for the tie sentinel.
pub const TIE_LEGEND_LABEL: &str = "TIE (ALL)";

/// Colour index of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinnerIndex {
    /// Every measured policy tied.
    Tie,
    /// Position of the leading winner in the grid's policy list.
    Policy(usize),
    /// No data, or no winner that the policy list can name.
    Missing,
}

impl WinnerIndex {
    pub const TIE_SENTINEL: i32 = -1;

    /// Integer form for categorical colouring; `None` for [`Self::Missing`].
    #[must_use]
    pub fn as_i32(self) -> Option<i32> {
        match self {
            Self::Tie => Some(Self::TIE_SENTINEL),
            Self::Policy(index) => i32::try_from(index).ok(),
            Self::Missing => None,
        }
    }
}

impl Serialize for WinnerIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_i32().serialize(serializer)
    }
}

/// Position along a grid axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisTick {
    Value(f64),
    Metric(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub name: String,
    pub ticks: Vec<AxisTick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub label: String,
    pub index: WinnerIndex,
    pub verdict: Verdict,
}

/// Winner matrix with `rows.ticks.len()` rows and `columns.ticks.len()` columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerGrid {
    pub rows: Axis,
    pub columns: Axis,
    /// Canonical policies present in the data; index `i` names `policies[i]`.
    pub policies: Vec<String>,
    pub cells: Vec<Vec<GridCell>>,
    /// Extra rows ignored because a policy had more than one row in a cell.
    pub duplicate_rows: usize,
}

impl WinnerGrid {
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&GridCell> {
        self.cells.get(row).and_then(|cells| cells.get(column))
    }

    #[must_use]
    pub fn label_grid(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.label.clone()).collect())
            .collect()
    }

    #[must_use]
    pub fn index_grid(&self) -> Vec<Vec<Option<i32>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.index.as_i32()).collect())
            .collect()
    }

    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn index_domain(&self) -> RangeInclusive<i32> {
        WinnerIndex::TIE_SENTINEL..=(self.policies.len() as i32 - 1)
    }

    /// Coordinates of every tied cell, full ties and tied subsets alike.
    #[must_use]
    pub fn tie_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, cell)| cell.verdict.is_tie())
                    .map(move |(j, _)| (i, j))
            })
            .collect()
    }

    /// True when some cell uses the `-1` sentinel.
    #[must_use]
    pub fn has_full_tie(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|cell| cell.index == WinnerIndex::Tie)
    }

    /// Discrete colour scale covering [`Self::index_domain`].
    #[must_use]
    pub fn color_scale(&self, config: &VerdictConfig) -> ColorScale {
        let mut entries = Vec::with_capacity(self.policies.len() + 1);
        entries.push(ColorEntry {
            index: WinnerIndex::TIE_SENTINEL,
            name: TIE_LEGEND_LABEL.to_string(),
            color: config.tie_color.clone(),
        });
        for (position, policy) in self.policies.iter().enumerate() {
            entries.push(ColorEntry {
                index: i32::try_from(position).unwrap_or(i32::MAX),
                name: policy.clone(),
                color: config.color_for(policy).to_string(),
            });
        }
        ColorScale {
            entries,
            tie_in_use: self.has_full_tie(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorEntry {
    pub index: i32,
    pub name: String,
    pub color: String,
}

/// Colour scale handed to a renderer. Entry 0 is always the tie sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorScale {
    pub entries: Vec<ColorEntry>,
    /// Whether the tie entry needs a legend slot.
    pub tie_in_use: bool,
}

/// How to treat several rows for one policy in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// Use the first row in input order and count the rest.
    #[default]
    FirstRow,
    /// Fail with [`EngineError::DuplicateCell`].
    Reject,
}

/// Builds winner grids with a shared resolver.
#[derive(Debug, Clone, Copy)]
pub struct GridBuilder<'a> {
    resolver: &'a Resolver,
    multiplicity: Multiplicity,
}

impl<'a> GridBuilder<'a> {
    #[must_use]
    pub fn new(resolver: &'a Resolver) -> Self {
        Self {
            resolver,
            multiplicity: Multiplicity::FirstRow,
        }
    }

    #[must_use]
    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    #[must_use]
    pub fn strict(self, strict: bool) -> Self {
        self.multiplicity(if strict {
            Multiplicity::Reject
        } else {
            Multiplicity::FirstRow
        })
    }

    /// Winner grid over `axis1` (rows) × `axis2` (columns) for one metric.
    pub fn build(
        &self,
        rows: &[ResultRow],
        axis1: &str,
        axis2: &str,
        metric: &str,
        higher_is_better: bool,
    ) -> Result<WinnerGrid> {
        let row_values = distinct_values(rows, axis1)?;
        let column_values = distinct_values(rows, axis2)?;
        let policies = self.policy_list(rows);

        let mut duplicate_rows = 0;
        let mut cells = Vec::with_capacity(row_values.len());
        for &v1 in &row_values {
            let mut row_cells = Vec::with_capacity(column_values.len());
            for &v2 in &column_values {
                let matching = matching_rows(rows, |index, row| {
                    Ok(row.number(index, axis1)? == v1 && row.number(index, axis2)? == v2)
                })?;
                let cell_name = format!("{axis1}={v1}, {axis2}={v2}");
                let (cell, duplicates) = self.resolve_cell(
                    &matching,
                    &policies,
                    metric,
                    higher_is_better,
                    &cell_name,
                )?;
                duplicate_rows += duplicates;
                row_cells.push(cell);
            }
            cells.push(row_cells);
        }

        let grid = WinnerGrid {
            rows: Axis {
                name: axis1.to_string(),
                ticks: row_values.into_iter().map(AxisTick::Value).collect(),
            },
            columns: Axis {
                name: axis2.to_string(),
                ticks: column_values.into_iter().map(AxisTick::Value).collect(),
            },
            policies,
            cells,
            duplicate_rows,
        };
        log_grid(&grid, metric);
        Ok(grid)
    }

    /// Winner grid with one row per metric present in the data and one column
    /// per distinct `axis` value. Each metric applies its own direction.
    pub fn build_metric_grid(
        &self,
        rows: &[ResultRow],
        axis: &str,
        metrics: &[MetricSpec],
    ) -> Result<WinnerGrid> {
        let present: Vec<&MetricSpec> = metrics
            .iter()
            .filter(|metric| column_present(rows, &metric.key))
            .collect();
        let column_values = distinct_values(rows, axis)?;
        let policies = self.policy_list(rows);

        let mut duplicate_rows = 0;
        let mut cells = Vec::with_capacity(present.len());
        for metric in &present {
            let mut row_cells = Vec::with_capacity(column_values.len());
            for &value in &column_values {
                let matching =
                    matching_rows(rows, |index, row| Ok(row.number(index, axis)? == value))?;
                let cell_name = format!("{}, {axis}={value}", metric.key);
                let (cell, duplicates) = self.resolve_cell(
                    &matching,
                    &policies,
                    &metric.key,
                    metric.higher_is_better,
                    &cell_name,
                )?;
                duplicate_rows += duplicates;
                row_cells.push(cell);
            }
            cells.push(row_cells);
        }

        let grid = WinnerGrid {
            rows: Axis {
                name: "metric".to_string(),
                ticks: present
                    .iter()
                    .map(|metric| AxisTick::Metric(metric.key.clone()))
                    .collect(),
            },
            columns: Axis {
                name: axis.to_string(),
                ticks: column_values.into_iter().map(AxisTick::Value).collect(),
            },
            policies,
            cells,
            duplicate_rows,
        };
        log_grid(&grid, "*");
        Ok(grid)
    }

    fn policy_list(&self, rows: &[ResultRow]) -> Vec<String> {
        self.resolver
            .order()
            .filter_present(|name| rows.iter().any(|row| row.policy == name))
    }

    fn resolve_cell(
        &self,
        matching: &[(usize, &ResultRow)],
        policies: &[String],
        metric: &str,
        higher_is_better: bool,
        cell_name: &str,
    ) -> Result<(GridCell, usize)> {
        let mut scores = PolicyScores::new();
        let mut duplicates = 0;

        for policy in policies {
            let mut hits = matching.iter().filter(|(_, row)| &row.policy == policy);
            let Some(&(index, first)) = hits.next() else {
                continue;
            };
            let extra = hits.count();
            if extra > 0 {
                if self.multiplicity == Multiplicity::Reject {
                    return Err(EngineError::DuplicateCell {
                        policy: policy.clone(),
                        cell: cell_name.to_string(),
                        count: extra + 1,
                    });
                }
                tracing::warn!(
                    policy = %policy,
                    cell = %cell_name,
                    count = extra + 1,
                    "several rows for one policy in a grid cell, using the first"
                );
                duplicates += extra;
            }
            scores.insert(policy.clone(), first.number(index, metric)?);
        }

        if !higher_is_better {
            scores = scores.negated();
        }

        let verdict = self.resolver.verdict(&scores);
        let index = match &verdict {
            Verdict::AllTied => WinnerIndex::Tie,
            Verdict::NoData => WinnerIndex::Missing,
            Verdict::Winners(_) => verdict
                .lead()
                .and_then(|lead| policies.iter().position(|policy| policy == lead))
                .map_or(WinnerIndex::Missing, WinnerIndex::Policy),
        };
        let label = self.resolver.label(&verdict);

        Ok((
            GridCell {
                label,
                index,
                verdict,
            },
            duplicates,
        ))
    }
}

fn matching_rows<F>(rows: &[ResultRow], mut keep: F) -> Result<Vec<(usize, &ResultRow)>>
where
    F: FnMut(usize, &ResultRow) -> Result<bool>,
{
    let mut matching = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if keep(index, row)? {
            matching.push((index, row));
        }
    }
    Ok(matching)
}

fn log_grid(grid: &WinnerGrid, metric: &str) {
    let missing = grid
        .cells
        .iter()
        .flatten()
        .filter(|cell| cell.index == WinnerIndex::Missing)
        .count();
    tracing::debug!(
        rows_axis = %grid.rows.name,
        columns_axis = %grid.columns.name,
        metric = %metric,
        rows = grid.rows.ticks.len(),
        columns = grid.columns.ticks.len(),
        policies = grid.policies.len(),
        ties = grid.tie_cells().len(),
        missing,
        duplicate_rows = grid.duplicate_rows,
        "winner grid built"
    );
}

/// Winner grid over `axis1` × `axis2` for `metric`, first row per policy and cell.
pub fn build_grid(
    rows: &[ResultRow],
    axis1: &str,
    axis2: &str,
    metric: &str,
    higher_is_better: bool,
    resolver: &Resolver,
) -> Result<WinnerGrid> {
    GridBuilder::new(resolver).build(rows, axis1, axis2, metric, higher_is_better)
}

/// Metric × `axis` winner grid, first row per policy and cell.
pub fn build_metric_grid(
    rows: &[ResultRow],
    axis: &str,
    metrics: &[MetricSpec],
    resolver: &Resolver,
) -> Result<WinnerGrid> {
    GridBuilder::new(resolver).build_metric_grid(rows, axis, metrics)
}
