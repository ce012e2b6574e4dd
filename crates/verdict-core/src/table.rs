//! Row shape handed to the engine by loaders.
//!
//! A row is a policy name plus named columns. The engine is agnostic to where
//! rows came from; it only needs `policy` and the columns it is asked about.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Cell {
    /// Numeric value. Text cells holding a number parse; everything else is `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Bool(_) | Self::Null => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One result row: a policy measured under one condition or trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub policy: String,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Cell>,
}

impl ResultRow {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder-style column setter.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns.get(column)
    }

    #[must_use]
    pub fn has(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Numeric value of `column`; `index` only labels the error.
    pub fn number(&self, index: usize, column: &str) -> Result<f64> {
        let cell = self
            .get(column)
            .ok_or_else(|| EngineError::missing(index, column))?;
        cell.as_f64()
            .ok_or_else(|| EngineError::non_numeric(index, column))
    }
}

/// Fail on the first row lacking one of `columns` or carrying an empty policy.
pub fn require_columns(rows: &[ResultRow], columns: &[&str]) -> Result<()> {
    for (index, row) in rows.iter().enumerate() {
        if row.policy.is_empty() {
            return Err(EngineError::EmptyPolicy { row: index });
        }
        if let Some(missing) = columns.iter().find(|column| !row.has(column)) {
            return Err(EngineError::missing(index, *missing));
        }
    }
    Ok(())
}

/// True when any row carries `column`.
#[must_use]
pub fn column_present(rows: &[ResultRow], column: &str) -> bool {
    rows.iter().any(|row| row.has(column))
}

/// Sorted distinct numeric values of `column`.
pub fn distinct_values(rows: &[ResultRow], column: &str) -> Result<Vec<f64>> {
    let mut values = rows
        .iter()
        .enumerate()
        .map(|(index, row)| row.number(index, column))
        .collect::<Result<Vec<_>>>()?;
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| a == b);
    Ok(values)
}

/// Distinct policy names in first-encounter order.
#[must_use]
pub fn policies_in(rows: &[ResultRow]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for row in rows {
        if !seen.contains(&row.policy.as_str()) {
            seen.push(&row.policy);
        }
    }
    seen
}
