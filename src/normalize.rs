//! Name normalization for catalog/corpus matching.
//! Used by the reference index (corpus side) and the reconciler (catalog side).
//!
//! CRITICAL: Any change here shifts every similarity score. Run tests after changes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Everything from a sponsor attribution to the end: "Fun Run powered by Acme".
pub static SPONSOR_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\b(?:powered|sponsored)\s+by\b.*$").unwrap());

/// Series markers: "edition 5", "season 12"
pub static SERIES_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:edition|season)\s*\d+\b").unwrap());

/// Trailing distance suffixes: "Night Run 5k", "Trail Challenge 21km 10km"
pub static DISTANCE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s+\d+\s?km?)+$").unwrap());

/// Digit runs; four-digit runs are treated as years.
pub static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Regex to collapse whitespace runs into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Every year collapses to this value so "Color Run 2025" == "Color Run 2026".
pub const YEAR_SENTINEL: &str = "0000";

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Collapse whitespace runs and trim.
pub fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

/// Replace every run of exactly four digits with [`YEAR_SENTINEL`].
pub fn replace_years(s: &str) -> String {
    DIGIT_RUN
        .replace_all(s, |caps: &Captures| {
            let run = &caps[0];
            if run.len() == 4 {
                YEAR_SENTINEL.to_string()
            } else {
                run.to_string()
            }
        })
        .into_owned()
}

fn normalize_pass(name: &str) -> String {
    let lowered: String = name.nfc().collect::<String>().to_lowercase();
    let mut result = collapse_whitespace(&lowered.replace('|', " "));

    result = SPONSOR_TAIL.replace(&result, "").to_string();
    result = SERIES_TOKEN.replace_all(&result, " ").to_string();
    result = collapse_whitespace(&result);

    // Only after series tokens are gone can a distance token become trailing
    result = DISTANCE_SUFFIX.replace(&result, "").to_string();
    result = replace_years(&result);

    result.trim().to_string()
}

/// Normalize an event name for comparison.
///
/// Lower-cases, drops pipes, collapses whitespace, strips sponsor tails,
/// series tokens and trailing distances, and folds years to a sentinel.
/// Passes repeat until the output stops changing, so the function is
/// idempotent even when one removal exposes another.
pub fn normalize_name(name: &str) -> String {
    let mut current = normalize_pass(name);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// ============================================================================
// TESTS
// ============================================================================
