//! Tie-aware winner resolution.
//!
//! A [`PolicyScores`] map for one condition and one metric reduces to a
//! [`Verdict`]. Labels and grid indices are both derived from the verdict, so
//! the displayed string and the colour index can never disagree.
//!
//! The resolver always treats higher scores as better. Callers negate
//! lower-is-better metrics before resolving (see [`PolicyScores::negated`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::LabelCodec;
use crate::order::CanonicalOrder;
use crate::{ALL_TIED_LABEL, NO_DATA_LABEL};

/// Scores of several policies for one fixed condition and metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyScores(BTreeMap<String, f64>);

impl PolicyScores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score, returning the previous score for `policy` if any.
    pub fn insert(&mut self, policy: impl Into<String>, score: f64) -> Option<f64> {
        self.0.insert(policy.into(), score)
    }

    #[must_use]
    pub fn get(&self, policy: &str) -> Option<f64> {
        self.0.get(policy).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// Copy with every score negated, for lower-is-better metrics.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(name, score)| (name.clone(), -score))
                .collect(),
        )
    }

    /// Largest score, ignoring NaN. `None` when empty.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().copied().fold(f64::NEG_INFINITY, f64::max))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PolicyScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, score)| (name.into(), score))
                .collect(),
        )
    }
}

/// Outcome of comparing one [`PolicyScores`] map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "policies", rename_all = "snake_case")]
pub enum Verdict {
    /// Nothing was measured.
    NoData,
    /// Every measured policy is within tolerance of the maximum.
    AllTied,
    /// The policies tied for the maximum, in canonical order. Empty when no
    /// winner appears in the canonical order.
    Winners(Vec<String>),
}

impl Verdict {
    /// First winner in canonical order.
    #[must_use]
    pub fn lead(&self) -> Option<&str> {
        match self {
            Self::Winners(winners) => winners.first().map(String::as_str),
            Self::NoData | Self::AllTied => None,
        }
    }

    #[must_use]
    pub fn winners(&self) -> &[String] {
        match self {
            Self::Winners(winners) => winners,
            Self::NoData | Self::AllTied => &[],
        }
    }

    /// True for a full tie or a tied subset.
    #[must_use]
    pub fn is_tie(&self) -> bool {
        match self {
            Self::AllTied => true,
            Self::Winners(winners) => winners.len() > 1,
            Self::NoData => false,
        }
    }
}

/// Resolves score maps against an injected codec, order and tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolver {
    codec: LabelCodec,
    order: CanonicalOrder,
    tolerance: f64,
    singleton_as_tie: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(
            LabelCodec::default(),
            CanonicalOrder::default(),
            crate::DEFAULT_TOLERANCE,
        )
    }
}

impl Resolver {
    #[must_use]
    pub fn new(codec: LabelCodec, order: CanonicalOrder, tolerance: f64) -> Self {
        Self {
            codec,
            order,
            tolerance,
            singleton_as_tie: true,
        }
    }

    /// Whether a map with a single entry collapses to [`Verdict::AllTied`].
    #[must_use]
    pub fn with_singleton_as_tie(mut self, enabled: bool) -> Self {
        self.singleton_as_tie = enabled;
        self
    }

    #[must_use]
    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }

    #[must_use]
    pub fn order(&self) -> &CanonicalOrder {
        &self.order
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn verdict(&self, scores: &PolicyScores) -> Verdict {
        let Some(max) = scores.max() else {
            return Verdict::NoData;
        };

        // Distance is measured against the maximum, not pairwise.
        let winners: Vec<&str> = scores
            .iter()
            .filter(|(_, score)| *score == max || (score - max).abs() <= self.tolerance)
            .map(|(name, _)| name)
            .collect();

        if winners.len() == scores.len() && (scores.len() > 1 || self.singleton_as_tie) {
            return Verdict::AllTied;
        }

        let ordered = self.order.filter_present(|name| winners.contains(&name));
        if ordered.is_empty() {
            tracing::warn!(
                winners = ?winners,
                "no winning policy appears in the canonical order"
            );
        } else if ordered.len() < winners.len() {
            tracing::debug!(
                kept = ordered.len(),
                dropped = winners.len() - ordered.len(),
                "winners outside the canonical order dropped"
            );
        }
        Verdict::Winners(ordered)
    }

    /// Display label for `verdict`: `N/A`, `ANY`, `LRU` or `LRU/PAF`.
    #[must_use]
    pub fn label(&self, verdict: &Verdict) -> String {
        match verdict {
            Verdict::NoData => NO_DATA_LABEL.to_string(),
            Verdict::AllTied => ALL_TIED_LABEL.to_string(),
            Verdict::Winners(winners) => winners
                .iter()
                .map(|name| self.codec.encode(name))
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    #[must_use]
    pub fn resolve(&self, scores: &PolicyScores) -> String {
        self.label(&self.verdict(scores))
    }
}

/// Winner label for `scores` under `order` and `tolerance`, using the
/// default code table.
#[must_use]
pub fn resolve(scores: &PolicyScores, order: &CanonicalOrder, tolerance: f64) -> String {
    Resolver::new(LabelCodec::default(), order.clone(), tolerance).resolve(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_TOLERANCE;

    fn order() -> CanonicalOrder {
        CanonicalOrder::default()
    }

    fn scores(pairs: &[(&str, f64)]) -> PolicyScores {
        pairs.iter().map(|(name, score)| (*name, *score)).collect()
    }

    #[test]
    fn empty_scores_resolve_to_no_data() {
        assert_eq!(resolve(&PolicyScores::new(), &order(), DEFAULT_TOLERANCE), "N/A");
    }

    #[test]
    fn all_tied_collapses_to_any() {
        let s = scores(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "ANY");
    }

    #[test]
    fn singleton_collapses_to_any() {
        let s = scores(&[("A", 0.5)]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "ANY");
    }

    #[test]
    fn singleton_can_resolve_to_its_code() {
        let resolver = Resolver::default().with_singleton_as_tie(false);
        let s = scores(&[("TTLOnly", 0.5)]);
        assert_eq!(resolver.verdict(&s), Verdict::Winners(vec!["TTLOnly".into()]));
        assert_eq!(resolver.resolve(&s), "TTL");
    }

    #[test]
    fn strict_winner() {
        let s = scores(&[
            ("LRU", 0.9),
            ("TTLOnly", 0.5),
            ("PriorityFresh", 0.3),
            ("PAFTinyLFU", 0.1),
        ]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "LRU");
    }

    #[test]
    fn two_way_tie_follows_canonical_order() {
        let s = scores(&[("PAFTinyLFU", 0.8), ("LRU", 0.8), ("TTLOnly", 0.2)]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "LRU/PAF");
    }

    #[test]
    fn tolerance_is_relative_to_maximum() {
        // 0.85 is within 0.1 of 0.9 and 0.75 is within 0.1 of 0.85, but only
        // distance to the maximum counts.
        let s = scores(&[("LRU", 0.9), ("TTLOnly", 0.85), ("PriorityFresh", 0.75)]);
        assert_eq!(resolve(&s, &order(), 0.1), "LRU/TTL");
    }

    #[test]
    fn lower_is_better_by_negation() {
        let s = scores(&[("LRU", 0.2), ("TTLOnly", 0.1), ("PAFTinyLFU", 0.3)]);
        assert_eq!(resolve(&s.negated(), &order(), DEFAULT_TOLERANCE), "TTL");
    }

    #[test]
    fn winners_outside_order_are_dropped() {
        let s = scores(&[("LRU", 1.0), ("Mystery", 1.0), ("TTLOnly", 0.0)]);
        let resolver = Resolver::default();
        assert_eq!(resolver.verdict(&s), Verdict::Winners(vec!["LRU".into()]));
        assert_eq!(resolver.resolve(&s), "LRU");
    }

    #[test]
    fn winner_absent_from_order_yields_empty_label() {
        let s = scores(&[("Mystery", 1.0), ("LRU", 0.0)]);
        let resolver = Resolver::default();
        assert_eq!(resolver.verdict(&s), Verdict::Winners(Vec::new()));
        assert_eq!(resolver.resolve(&s), "");
    }

    #[test]
    fn infinite_maximum_still_wins() {
        let s = scores(&[("LRU", f64::INFINITY), ("TTLOnly", 1.0)]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "LRU");
    }

    #[test]
    fn nan_scores_never_win() {
        let s = scores(&[("LRU", f64::NAN), ("TTLOnly", 0.4), ("PAFTinyLFU", 0.1)]);
        assert_eq!(resolve(&s, &order(), DEFAULT_TOLERANCE), "TTL");
    }

    #[test]
    fn verdict_helpers() {
        let tie = Verdict::Winners(vec!["LRU".into(), "PAFTinyLFU".into()]);
        assert!(tie.is_tie());
        assert_eq!(tie.lead(), Some("LRU"));
        assert!(Verdict::AllTied.is_tie());
        assert!(!Verdict::NoData.is_tie());
        assert_eq!(Verdict::AllTied.lead(), None);
    }

    #[test]
    fn verdict_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Verdict::Winners(vec!["LRU".into()])).expect("json");
        assert_eq!(json, r#"{"kind":"winners","policies":["LRU"]}"#);
        let json = serde_json::to_string(&Verdict::AllTied).expect("json");
        assert_eq!(json, r#"{"kind":"all_tied"}"#);
    }
}
