//! Canonical policy order used for tie display and aggregate sorting.

use serde::{Deserialize, Serialize};

/// Fixed, configuration-level sequence of known policy names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalOrder(Vec<String>);

impl Default for CanonicalOrder {
    fn default() -> Self {
        Self::new(["LRU", "TTLOnly", "PriorityFresh", "PAFTinyLFU"])
    }
}

impl CanonicalOrder {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn position(&self, policy: &str) -> Option<usize> {
        self.0.iter().position(|name| name == policy)
    }

    #[must_use]
    pub fn contains(&self, policy: &str) -> bool {
        self.position(policy).is_some()
    }

    /// Sort key placing known policies by position and unknown ones after them.
    #[must_use]
    pub fn rank(&self, policy: &str) -> usize {
        self.position(policy).unwrap_or(self.0.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Subsequence of this order whose members satisfy `present`.
    #[must_use]
    pub fn filter_present(&self, mut present: impl FnMut(&str) -> bool) -> Vec<String> {
        self.0
            .iter()
            .filter(|name| present(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalOrder;

    #[test]
    fn unknown_policies_rank_after_known() {
        let order = CanonicalOrder::default();
        assert_eq!(order.rank("LRU"), 0);
        assert_eq!(order.rank("PAFTinyLFU"), 3);
        assert_eq!(order.rank("Mystery"), 4);
    }

    #[test]
    fn filter_present_keeps_canonical_sequence() {
        let order = CanonicalOrder::default();
        let seen = ["PAFTinyLFU", "LRU"];
        assert_eq!(
            order.filter_present(|p| seen.contains(&p)),
            vec!["LRU".to_string(), "PAFTinyLFU".to_string()]
        );
    }
}
