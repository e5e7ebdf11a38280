//! Synchronizer configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SyncConfig::label`].
pub const LABEL_ENV: &str = "SUBCHAPTERS_SUBTOTAL_LABEL";

/// Environment variable overriding [`SyncConfig::relabel_existing`].
pub const RELABEL_ENV: &str = "SUBCHAPTERS_RELABEL_EXISTING";

/// How generated aggregate lines are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Prefix of generated descriptions: `"<label> <heading description>"`.
    pub label: String,
    /// Also rewrite the description of existing subtotal/subsubtotal lines
    /// that close a heading. Off by default, which keeps synchronization
    /// insert-only.
    pub relabel_existing: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            label: "Subtotal".to_string(),
            relabel_existing: false,
        }
    }
}

impl SyncConfig {
    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let label = match lookup(LABEL_ENV) {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => {
                tracing::warn!("{LABEL_ENV} is blank; using '{}'", defaults.label);
                defaults.label
            }
            None => defaults.label,
        };

        let relabel_existing = match lookup(RELABEL_ENV).as_deref().map(str::trim) {
            None => defaults.relabel_existing,
            Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => {
                tracing::warn!("{RELABEL_ENV}='{other}' is not a boolean; ignoring");
                defaults.relabel_existing
            }
        };

        Self {
            label,
            relabel_existing,
        }
    }

    /// Description given to an aggregate line closing `heading`.
    pub fn describe(&self, heading: &str) -> String {
        format!("{} {}", self.label, heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(SyncConfig::from_lookup(lookup(&[])), SyncConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = SyncConfig::from_lookup(lookup(&[
            (LABEL_ENV, " Total "),
            (RELABEL_ENV, "true"),
        ]));
        assert_eq!(config.label, "Total");
        assert!(config.relabel_existing);
        assert_eq!(config.describe("Chapter 1"), "Total Chapter 1");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[(LABEL_ENV, "  "), (RELABEL_ENV, "maybe")]));
        assert_eq!(config, SyncConfig::default());
    }
}
