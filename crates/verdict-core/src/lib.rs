#![forbid(unsafe_code)]

//! Winner resolution and grid aggregation for cache policy experiments.
//!
//! # Role
//! `verdict-core` turns experiment result rows (one row per policy and
//! condition, or per policy and randomized trial) into the data a chart layer
//! consumes: tie-aware winner labels, winner index grids with a reserved tie
//! sentinel, and per-policy mean/std summaries in canonical order.
//!
//! # Primary responsibilities
//! - **LabelCodec**: policy name to three-letter code and back.
//! - **resolve**: a policy→score map reduced to a [`Verdict`] and its label.
//! - **build_grid / build_metric_grid**: one verdict per grid cell.
//! - **aggregate**: repeated randomized trials reduced to mean and sample std.
//! - **conditions**: network labels, resilience, extreme scenario corners.
//!
//! Every entry point is a pure function over borrowed input. Lookup tables
//! live in [`VerdictConfig`] and are injected, never global.

pub mod codec;
pub mod conditions;
pub mod config;
pub mod error;
pub mod grid;
pub mod order;
pub mod resolver;
pub mod table;
pub mod trials;

pub use codec::LabelCodec;
pub use conditions::{Retention, Scenario, network_label, resilience, validate_sweep};
pub use config::{MetricSpec, NetworkCondition, PolicyStyle, VerdictConfig};
pub use error::{ConfigError, EngineError, Result};
pub use grid::{
    AxisTick, ColorScale, GridBuilder, GridCell, Multiplicity, WinnerGrid, WinnerIndex, build_grid,
    build_metric_grid,
};
pub use order::CanonicalOrder;
pub use resolver::{PolicyScores, Resolver, Verdict, resolve};
pub use table::{Cell, ResultRow};
pub use trials::{AggregateRow, MetricSummary, aggregate};

/// Label used when a policy score map is empty.
pub const NO_DATA_LABEL: &str = "N/A";

/// Label used when every measured policy ties for the maximum.
pub const ALL_TIED_LABEL: &str = "ANY";

/// Default absolute tie tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;
