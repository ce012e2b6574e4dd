//! Policy name ↔ three-letter code mapping.
//!
//! Known policies map through an explicit table. Unknown names encode to
//! their first three characters, uppercased, and decode by re-encoding the
//! policies actually present, with a case-insensitive prefix scan last.

use serde::Serialize;

use crate::config::PolicyStyle;

/// Width of the codes produced for unknown policy names.
pub const CODE_WIDTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CodeEntry {
    name: String,
    code: String,
}

/// Bidirectional mapping between canonical policy names and short codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCodec {
    entries: Vec<CodeEntry>,
}

impl Default for LabelCodec {
    fn default() -> Self {
        Self::from_pairs([
            ("LRU", "LRU"),
            ("TTLOnly", "TTL"),
            ("PriorityFresh", "PRI"),
            ("PAFTinyLFU", "PAF"),
        ])
    }
}

impl LabelCodec {
    /// Build from `(name, code)` pairs. Codes are stored uppercased.
    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: AsRef<str>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, code)| CodeEntry {
                    name: name.into(),
                    code: code.as_ref().to_uppercase(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn from_styles(styles: &[PolicyStyle]) -> Self {
        Self::from_pairs(
            styles
                .iter()
                .map(|style| (style.name.clone(), style.code.as_str())),
        )
    }

    /// Short code for `policy`.
    ///
    /// Names shorter than [`CODE_WIDTH`] come back uppercased in full. The
    /// width counts characters after uppercasing, so `ß` takes two of them.
    #[must_use]
    pub fn encode(&self, policy: &str) -> String {
        if let Some(entry) = self.entries.iter().find(|entry| entry.name == policy) {
            return entry.code.clone();
        }
        policy
            .chars()
            .flat_map(char::to_uppercase)
            .take(CODE_WIDTH)
            .collect()
    }

    /// Full policy name for `code`, restricted to `available`.
    ///
    /// Tries the table, then an available name that encodes to `code`, then a
    /// case-insensitive prefix scan. Returns `None` when all three miss. An
    /// empty code never matches.
    #[must_use]
    pub fn decode<'a, S: AsRef<str>>(&self, code: &str, available: &'a [S]) -> Option<&'a str> {
        if code.is_empty() {
            return None;
        }

        let wanted = code.to_uppercase();
        if let Some(entry) = self.entries.iter().find(|entry| entry.code == wanted)
            && let Some(hit) = available
                .iter()
                .map(AsRef::as_ref)
                .find(|name| *name == entry.name)
        {
            return Some(hit);
        }

        let mut names = available.iter().map(AsRef::as_ref);
        if let Some(hit) = names.clone().find(|name| self.encode(name) == wanted) {
            return Some(hit);
        }
        let prefix = code.to_lowercase();
        names.find(|name| name.to_lowercase().starts_with(&prefix))
    }

    /// Names with an explicit table entry, in table order.
    pub fn known_policies(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Codes that `encode` gives to more than one distinct name.
    ///
    /// Covers every table entry plus `extra` (typically the canonical order),
    /// so a fallback prefix that lands on a table code or on another fallback
    /// is reported too. Each collision lists its names in first-seen order.
    #[must_use]
    pub fn collisions<'a>(
        &'a self,
        extra: impl IntoIterator<Item = &'a str>,
    ) -> Vec<CodeCollision> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.known_policies().chain(extra) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let mut collisions: Vec<CodeCollision> = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            let code = self.encode(name);
            if collisions.iter().any(|seen| seen.code == code) {
                continue;
            }
            let sharing: Vec<String> = names[idx..]
                .iter()
                .filter(|other| self.encode(other) == code)
                .map(|other| (*other).to_string())
                .collect();
            if sharing.len() > 1 {
                collisions.push(CodeCollision {
                    code,
                    names: sharing,
                });
            }
        }
        collisions
    }
}

/// One code claimed by several policy names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeCollision {
    pub code: String,
    pub names: Vec<String>,
}
