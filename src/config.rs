//! Run configuration: threshold, extraction rules, manual overrides, policy.
//!
//! Everything has a default, so the config file is optional and may set only
//! the keys it cares about. CLI flags are applied on top in `main`.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractionRules;
use crate::normalize::normalize_name;
use crate::scoring::DEFAULT_THRESHOLD;

/// What to do with a reference that scores below threshold and has no
/// confident replacement. Either way the audit log records the decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    Keep,
    Clear,
}

/// Hand-curated correction, consulted before automatic matching.
///
/// Every predicate that is set must hold. Name predicates compare normalized
/// names. A rule with no predicate never matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_id: Option<String>,
    pub forced_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OverrideRule {
    pub fn matches(&self, normalized_name: &str, current_id: Option<&str>) -> bool {
        if self.name_equals.is_none() && self.name_contains.is_none() && self.current_id.is_none() {
            return false;
        }
        let equals_ok = self
            .name_equals
            .as_deref()
            .map_or(true, |expected| normalize_name(expected) == normalized_name);
        let contains_ok = self
            .name_contains
            .as_deref()
            .map_or(true, |needle| normalized_name.contains(&normalize_name(needle)));
        let id_ok = self
            .current_id
            .as_deref()
            .map_or(true, |expected| current_id == Some(expected));
        equals_ok && contains_ok && id_ok
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Acceptance threshold for the current reference and strict floor for
    /// replacements.
    pub threshold: f64,
    pub extraction: ExtractionRules,
    pub overrides: Vec<OverrideRule>,
    pub unmatched_policy: UnmatchedPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            extraction: ExtractionRules::default(),
            overrides: Vec::new(),
            unmatched_policy: UnmatchedPolicy::Keep,
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            bail!("threshold must be in (0, 1], got {}", self.threshold);
        }
        for (i, rule) in self.overrides.iter().enumerate() {
            if rule.forced_id.is_empty() || !rule.forced_id.chars().all(|c| c.is_ascii_digit()) {
                bail!("override #{} has a non-numeric forced_id '{}'", i, rule.forced_id);
            }
        }
        Ok(())
    }

    /// First override rule matching a record, in declaration order.
    pub fn find_override(&self, normalized_name: &str, current_id: Option<&str>) -> Option<&OverrideRule> {
        self.overrides
            .iter()
            .find(|rule| rule.matches(normalized_name, current_id))
    }
}

/// Load and validate a JSON config file.
pub fn load_config(path: &Path) -> Result<ReconcileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ReconcileConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
