//! Core data models for event reconciliation.
//!
//! This module contains the catalog record, raw corpus entries, extraction
//! results and the findings produced by the checker and the reconciler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Catalog Models
// ============================================================================

/// One event in the structured catalog.
///
/// Identity is positional (index in the catalog array). Fields other than
/// `name`, `fbLink` and `date` are carried through untouched in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "fbLink", alias = "link", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogRecord {
    pub fn new(name: &str, link: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            link: link.map(str::to_string),
            ..Default::default()
        }
    }

    /// Reference id parsed from the link (`.../events/<digits>`).
    pub fn reference_id(&self) -> Option<String> {
        self.link
            .as_deref()
            .and_then(crate::catalog::reference_id_from_link)
    }
}

// ============================================================================
// Raw Corpus Models
// ============================================================================

/// Raw text snapshot of one scraped event page.
#[derive(Clone, Debug)]
pub struct RawEntry {
    pub id: String,
    pub blob: String,
}

/// Name (and optional date) pulled out of a raw entry.
/// `normalized_name` is cached so the reconciler never renormalizes corpus names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractedFact {
    pub id: String,
    pub name: String,
    pub date: Option<String>,
    pub normalized_name: String,
}

/// Result of running a text extractor over one blob.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionOutcome {
    Extracted { name: String, date: Option<String> },
    /// Login wall or access-denied page; never a match candidate.
    AccessDenied { marker: String },
    /// Readable page, but no line qualified as a title.
    NoName,
}

// ============================================================================
// Findings
// ============================================================================

/// Why a catalog reference could not be resolved to an extracted fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCause {
    NotInCorpus,
    AccessDenied,
    NoName,
    Unreadable,
}

/// A confident replacement for a broken reference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Correction {
    pub record_index: usize,
    pub record_name: String,
    pub old_id: String,
    pub new_id: String,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub similarity: f64,
    pub reason: CorrectionReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionReason {
    AutoMatch,
    Override,
}

impl CorrectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrectionReason::AutoMatch => "auto-match",
            CorrectionReason::Override => "override",
        }
    }
}

/// Classified outcome of comparing catalog state to raw corpus state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Catalog points at an id with no usable extracted fact.
    MissingReference {
        record_index: usize,
        record_name: String,
        reference_id: String,
        cause: MissingCause,
    },
    /// Raw entry that no catalog record references.
    Orphan { reference_id: String },
    /// Id referenced by more than one catalog record.
    Duplicate {
        reference_id: String,
        count: usize,
        record_indices: Vec<usize>,
    },
    /// Current reference scores below threshold and nothing better exists.
    Mismatch {
        record_index: usize,
        record_name: String,
        reference_id: String,
        extracted_name: String,
        similarity: f64,
        best_candidate: Option<Candidate>,
    },
    Corrected(Correction),
}

impl Finding {
    pub fn kind(&self) -> &'static str {
        match self {
            Finding::MissingReference { .. } => "missing_reference",
            Finding::Orphan { .. } => "orphan",
            Finding::Duplicate { .. } => "duplicate",
            Finding::Mismatch { .. } => "mismatch",
            Finding::Corrected(_) => "corrected",
        }
    }
}

/// Best-scoring corpus entry for a record name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub similarity: f64,
}

// ============================================================================
// Audit Log
// ============================================================================

/// One line of the correction audit log. Field names follow the JSON contract
/// consumed by downstream tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub event_index: usize,
    pub event_name: String,
    pub old_event_id: Option<String>,
    pub new_event_id: Option<String>,
    pub old_event_name: Option<String>,
    pub new_event_name: Option<String>,
    pub similarity: f64,
    pub old_link: Option<String>,
    pub new_link: Option<String>,
    pub reason: String,
    /// Run timestamp, shared by every entry one `--apply` run wrote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<String>,
    /// Catalog snapshot taken by that run, when the catalog was rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for one reconciliation run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ReconcileStats {
    pub total_records: usize,
    pub unreferenced_records: usize,
    pub accepted: usize,
    pub accepted_by_override: usize,
    pub corrected: usize,
    pub corrected_by_override: usize,
    pub mismatched: usize,
    pub missing_reference: usize,

    // Index build
    pub corpus_entries: usize,
    pub extracted: usize,
    pub access_denied: usize,
    pub no_name: usize,
    pub unreadable: usize,

    pub elapsed_seconds: f64,
}

impl ReconcileStats {
    /// Share of referenced records whose current reference was accepted.
    pub fn acceptance_rate(&self) -> f64 {
        let referenced = self.total_records - self.unreferenced_records;
        if referenced == 0 {
            0.0
        } else {
            100.0 * self.accepted as f64 / referenced as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }
}
