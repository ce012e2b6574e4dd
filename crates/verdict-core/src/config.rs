//! Verdict configuration as data.
//!
//! Gathers every lookup table the engine needs (canonical order, code and
//! style table, metric catalogue, network condition labels) plus the tie
//! tolerance into one [`VerdictConfig`] that can be loaded from TOML or JSON.
//!
//! ```toml
//! tolerance = 1e-9
//! order = ["LRU", "TTLOnly", "PriorityFresh", "PAFTinyLFU", "CustomPolicyX"]
//!
//! [[policies]]
//! name = "CustomPolicyX"
//! code = "CPX"
//! color = "#ef4444"
//! ```
//!
//! # Defaults
//!
//! `VerdictConfig::default()` reproduces the tables the experiment tooling
//! has always used, so callers only override what differs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DEFAULT_TOLERANCE;
use crate::codec::LabelCodec;
use crate::error::ConfigError;
use crate::order::CanonicalOrder;
use crate::resolver::Resolver;

/// Neutral grey used for the full-tie sentinel and unstyled policies.
pub const NEUTRAL_COLOR: &str = "#6b7280";

// ---------------------------------------------------------------------------
// Top-level VerdictConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Absolute score difference regarded as a tie.
    pub tolerance: f64,

    /// Canonical policy order for tie display and aggregate sorting.
    pub order: CanonicalOrder,

    /// Code and style table for known policies.
    pub policies: Vec<PolicyStyle>,

    /// Colour reserved for the `-1` full-tie index.
    pub tie_color: String,

    /// Colour for policies without a style entry.
    pub fallback_color: String,

    /// Metric catalogue: direction, display label, unit.
    pub metrics: Vec<MetricSpec>,

    /// Metrics shown as rows of the metric × axis winner heatmap.
    pub heatmap_metrics: Vec<String>,

    /// Metrics summarized by the randomized-trial aggregator.
    pub aggregate_metrics: Vec<String>,

    /// Metrics averaged into the composite score of recommendation regions.
    pub composite_metrics: Vec<String>,

    /// Metrics compared at the good, poor and disaster condition levels.
    pub condition_metrics: Vec<String>,

    /// Named reliability levels.
    pub network_conditions: Vec<NetworkCondition>,

    /// Maximum distance for a reliability value to take a condition's name.
    pub network_match_window: f64,

    /// A score map with exactly one entry resolves to `ANY` when set.
    pub singleton_resolves_to_any: bool,

    /// Reject grid cells where a policy has more than one row.
    pub strict_multiplicity: bool,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            order: CanonicalOrder::default(),
            policies: PolicyStyle::defaults(),
            tie_color: NEUTRAL_COLOR.to_string(),
            fallback_color: NEUTRAL_COLOR.to_string(),
            metrics: MetricSpec::defaults(),
            heatmap_metrics: [
                "cacheHitRate",
                "actionabilityFirstRatio",
                "timelinessConsistency",
                "avgFreshness",
                "deliveryRate",
            ]
            .map(String::from)
            .to_vec(),
            aggregate_metrics: [
                "cacheHitRate",
                "deliveryRate",
                "actionabilityFirstRatio",
                "timelinessConsistency",
                "avgFreshness",
                "staleAccessRate",
                "pushesSent",
                "pushSuppressRate",
                "pushDuplicateRate",
                "pushTimelyFirstRatio",
            ]
            .map(String::from)
            .to_vec(),
            composite_metrics: ["deliveryRate", "actionabilityFirstRatio"]
                .map(String::from)
                .to_vec(),
            condition_metrics: [
                "deliveryRate",
                "actionabilityFirstRatio",
                "timelinessConsistency",
                "cacheHitRate",
            ]
            .map(String::from)
            .to_vec(),
            network_conditions: NetworkCondition::defaults(),
            network_match_window: 0.01,
            singleton_resolves_to_any: true,
            strict_multiplicity: false,
        }
    }
}

impl VerdictConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read_config(path.as_ref())?)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_config(path.as_ref())?)
    }

    /// Load by extension: `.json` as JSON, anything else as TOML. The result
    /// is validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_file(path)?
        } else {
            Self::from_toml_file(path)?
        };
        config.validated()
    }

    /// Validate all parameters.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            errors.push(format!("tolerance must be finite and >= 0, got {}", self.tolerance));
        }

        if self.order.is_empty() {
            errors.push("order must name at least one policy".into());
        }
        for (idx, name) in self.order.iter().enumerate() {
            if name.is_empty() {
                errors.push(format!("order[{idx}] is empty"));
            }
            if self.order.position(name) != Some(idx) {
                errors.push(format!("order lists `{name}` more than once"));
            }
        }

        for (idx, style) in self.policies.iter().enumerate() {
            if self.policies[..idx].iter().any(|s| s.name == style.name) {
                errors.push(format!("policies lists `{}` more than once", style.name));
            }
            if style.code.is_empty() {
                errors.push(format!("policies.{}.code is empty", style.name));
            }
            if !is_hex_color(&style.color) {
                errors.push(format!(
                    "policies.{}.color must be #rrggbb, got {}",
                    style.name, style.color
                ));
            }
        }
        for collision in self.codec().collisions(self.order.iter()) {
            errors.push(format!(
                "code `{}` is assigned to more than one policy ({})",
                collision.code,
                collision.names.join(", ")
            ));
        }

        for (field, color) in [
            ("tie_color", &self.tie_color),
            ("fallback_color", &self.fallback_color),
        ] {
            if !is_hex_color(color) {
                errors.push(format!("{field} must be #rrggbb, got {color}"));
            }
        }

        for (idx, metric) in self.metrics.iter().enumerate() {
            if self.metrics[..idx].iter().any(|m| m.key == metric.key) {
                errors.push(format!("metrics lists `{}` more than once", metric.key));
            }
        }
        for (field, keys) in [
            ("heatmap_metrics", &self.heatmap_metrics),
            ("condition_metrics", &self.condition_metrics),
        ] {
            for key in keys {
                if self.metric(key).is_none() {
                    errors.push(format!("{field} names unknown metric `{key}`"));
                }
            }
        }
        if self.composite_metrics.is_empty() {
            errors.push("composite_metrics must name at least one metric".into());
        }
        for key in &self.composite_metrics {
            if !self.higher_is_better(key) {
                errors.push(format!("composite_metrics names lower-is-better metric `{key}`"));
            }
        }

        for condition in &self.network_conditions {
            if !(0.0..=1.0).contains(&condition.reliability) {
                errors.push(format!(
                    "network condition `{}` reliability must be in [0, 1], got {}",
                    condition.label, condition.reliability
                ));
            }
        }
        if !self.network_match_window.is_finite() || self.network_match_window < 0.0 {
            errors.push(format!(
                "network_match_window must be finite and >= 0, got {}",
                self.network_match_window
            ));
        }

        errors
    }

    /// `self` when [`validate`](Self::validate) reports nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn codec(&self) -> LabelCodec {
        LabelCodec::from_styles(&self.policies)
    }

    /// Build a [`Resolver`] from this config.
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.codec(), self.order.clone(), self.tolerance)
            .with_singleton_as_tie(self.singleton_resolves_to_any)
    }

    #[must_use]
    pub fn style(&self, policy: &str) -> Option<&PolicyStyle> {
        self.policies.iter().find(|style| style.name == policy)
    }

    /// Display colour for `policy`, falling back to [`Self::fallback_color`].
    #[must_use]
    pub fn color_for(&self, policy: &str) -> &str {
        self.style(policy)
            .map_or(self.fallback_color.as_str(), |style| style.color.as_str())
    }

    #[must_use]
    pub fn metric(&self, key: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|metric| metric.key == key)
    }

    /// Direction for `key`; metrics outside the catalogue count as higher-is-better.
    #[must_use]
    pub fn higher_is_better(&self, key: &str) -> bool {
        self.metric(key).is_none_or(|metric| metric.higher_is_better)
    }

    /// Catalogue entries for `keys`, in the given order, skipping unknown keys.
    #[must_use]
    pub fn metric_specs(&self, keys: &[String]) -> Vec<MetricSpec> {
        keys.iter()
            .filter_map(|key| self.metric(key).cloned())
            .collect()
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Table entries
// ---------------------------------------------------------------------------

/// Code and chart style for one known policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStyle {
    pub name: String,
    pub code: String,
    #[serde(default = "neutral_color")]
    pub color: String,
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_linestyle")]
    pub linestyle: String,
}

fn neutral_color() -> String {
    NEUTRAL_COLOR.to_string()
}

fn default_marker() -> String {
    "o".to_string()
}

fn default_linestyle() -> String {
    "-".to_string()
}

impl PolicyStyle {
    fn new(name: &str, code: &str, color: &str, marker: &str, linestyle: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            color: color.to_string(),
            marker: marker.to_string(),
            linestyle: linestyle.to_string(),
        }
    }

    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("LRU", "LRU", "#3b82f6", "o", "-"),
            Self::new("TTLOnly", "TTL", "#f59e0b", "s", "--"),
            Self::new("PriorityFresh", "PRI", "#10b981", "^", "-."),
            Self::new("PAFTinyLFU", "PAF", "#8b5cf6", "D", ":"),
        ]
    }
}

/// One metric column and how to compare and display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub key: String,
    pub label: String,
    #[serde(default = "default_true")]
    pub higher_is_better: bool,
    /// Values are fractions in [0, 1] displayed as percentages.
    #[serde(default)]
    pub percent: bool,
    #[serde(default)]
    pub group: String,
}

fn default_true() -> bool {
    true
}

impl MetricSpec {
    fn new(key: &str, label: &str, higher_is_better: bool, percent: bool, group: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            higher_is_better,
            percent,
            group: group.to_string(),
        }
    }

    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("cacheHitRate", "Cache Hit Rate", true, true, "Cache Performance"),
            Self::new("avgFreshness", "Avg Freshness", true, false, "Cache Performance"),
            Self::new("staleAccessRate", "Stale Access Rate", false, true, "Cache Performance"),
            Self::new("deliveryRate", "Delivery Rate", true, true, "Delivery Quality"),
            Self::new("redundancyIndex", "Redundancy Index", false, true, "Delivery Quality"),
            Self::new(
                "actionabilityFirstRatio",
                "Actionability-First",
                true,
                true,
                "User Experience",
            ),
            Self::new(
                "timelinessConsistency",
                "Timeliness Consistency",
                true,
                true,
                "User Experience",
            ),
            Self::new("pushesSent", "Pushes Sent", true, false, "Push Metrics"),
            Self::new("pushSuppressRate", "Push Suppress Rate", false, true, "Push Metrics"),
            Self::new("pushDuplicateRate", "Push Duplicate Rate", false, true, "Push Metrics"),
            Self::new("pushTimelyFirstRatio", "Push Timely First", true, true, "Push Metrics"),
        ]
    }
}

/// A named network reliability level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkCondition {
    pub reliability: f64,
    pub label: String,
}

impl NetworkCondition {
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        [
            (1.0, "Perfect (100%)"),
            (0.95, "Excellent (95%)"),
            (0.9, "Good (90%)"),
            (0.85, "Fair (85%)"),
            (0.8, "Moderate (80%)"),
            (0.7, "Poor (70%)"),
            (0.6, "Very Poor (60%)"),
            (0.5, "Degraded (50%)"),
            (0.3, "Disaster (30%)"),
            (0.1, "Critical (10%)"),
        ]
        .into_iter()
        .map(|(reliability, label)| Self {
            reliability,
            label: label.to_string(),
        })
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
