//! Similarity scoring between normalized event names.
//!
//! Scores are edit-distance ratios in [0, 1]. Inputs are expected to be
//! normalized already; nothing here folds case or whitespace.

// ============================================================================
// Score Thresholds
// ============================================================================

/// Default acceptance threshold and search floor.
///
/// An existing reference is kept when it scores `>=` this value; a
/// replacement must score strictly above it.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

// ============================================================================
// Edit-Distance Similarity
// ============================================================================

/// Levenshtein similarity ratio (0.0 to 1.0).
///
/// `(max_len - distance) / max_len`, with lengths counted in chars.
/// Two empty strings are identical (1.0); one empty string scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64
}

/// Whether an existing reference is good enough to keep.
pub fn is_acceptable(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Whether a search candidate clears the floor for replacing a reference.
pub fn clears_floor(score: f64, threshold: f64) -> bool {
    score > threshold
}
