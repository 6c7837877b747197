//! Reference reconciliation: keep, replace or flag each catalog reference.
//!
//! Per record, in order:
//! 1. Manual overrides (first matching rule decides).
//! 2. Current reference unresolvable → `MissingReference`.
//! 3. Current reference scores `>= threshold` → accepted.
//! 4. Best corpus entry scoring `> threshold` → `Corrected`, else `Mismatch`.
//!
//! The index is only read, so records are processed in parallel; results come
//! back in catalog order and candidate search walks ids in ascending order,
//! making the output identical across runs.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::ReconcileConfig;
use crate::index::ReferenceIndex;
use crate::models::{
    Candidate, CatalogRecord, Correction, CorrectionReason, Finding, MissingCause, ReconcileStats,
};
use crate::normalize::normalize_name;
use crate::scoring::{clears_floor, is_acceptable, similarity};

/// What the reconciler decided for one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// No link, or a link without an event id.
    Unreferenced,
    Accepted { similarity: f64, by_override: bool },
    Flagged { finding: Finding },
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub outcomes: Vec<RecordOutcome>,
    pub stats: ReconcileStats,
}

impl ReconcileReport {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RecordOutcome::Flagged { finding } => Some(finding),
            _ => None,
        })
    }

    pub fn corrections(&self) -> impl Iterator<Item = &Correction> {
        self.findings().filter_map(|finding| match finding {
            Finding::Corrected(correction) => Some(correction),
            _ => None,
        })
    }

    pub fn has_findings(&self) -> bool {
        self.findings().next().is_some()
    }
}

pub struct Reconciler<'a> {
    index: &'a ReferenceIndex,
    config: &'a ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a ReferenceIndex, config: &'a ReconcileConfig) -> Self {
        Self { index, config }
    }

    /// Highest-scoring fact for a normalized name, ties going to the lowest id.
    /// No floor is applied here.
    pub fn best_match(&self, normalized_name: &str) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for fact in self.index.facts() {
            let score = similarity(normalized_name, &fact.normalized_name);
            if best.as_ref().map_or(true, |b| score > b.similarity) {
                best = Some(Candidate {
                    id: fact.id.clone(),
                    name: fact.name.clone(),
                    similarity: score,
                });
            }
        }
        best
    }

    fn score_against(&self, normalized_name: &str, id: &str) -> Option<f64> {
        self.index
            .get(id)
            .map(|fact| similarity(normalized_name, &fact.normalized_name))
    }

    fn fact_name(&self, id: &str) -> Option<String> {
        self.index.get(id).map(|fact| fact.name.clone())
    }

    pub fn reconcile_record(&self, record_index: usize, record: &CatalogRecord) -> RecordOutcome {
        let Some(current_id) = record.reference_id() else {
            return RecordOutcome::Unreferenced;
        };
        let normalized = normalize_name(&record.name);

        if let Some(rule) = self.config.find_override(&normalized, Some(&current_id)) {
            let score = self.score_against(&normalized, &rule.forced_id).unwrap_or(0.0);
            if rule.forced_id == current_id {
                return RecordOutcome::Accepted {
                    similarity: score,
                    by_override: true,
                };
            }
            return RecordOutcome::Flagged {
                finding: Finding::Corrected(Correction {
                    record_index,
                    record_name: record.name.clone(),
                    old_id: current_id.clone(),
                    new_id: rule.forced_id.clone(),
                    old_name: self.fact_name(&current_id),
                    new_name: self.fact_name(&rule.forced_id),
                    similarity: score,
                    reason: CorrectionReason::Override,
                }),
            };
        }

        let Some(fact) = self.index.get(&current_id) else {
            let cause = self
                .index
                .missing_cause(&current_id)
                .unwrap_or(MissingCause::NotInCorpus);
            return RecordOutcome::Flagged {
                finding: Finding::MissingReference {
                    record_index,
                    record_name: record.name.clone(),
                    reference_id: current_id,
                    cause,
                },
            };
        };

        let current_score = similarity(&normalized, &fact.normalized_name);
        if is_acceptable(current_score, self.config.threshold) {
            return RecordOutcome::Accepted {
                similarity: current_score,
                by_override: false,
            };
        }

        let best = self.best_match(&normalized);
        match best {
            Some(candidate)
                if clears_floor(candidate.similarity, self.config.threshold)
                    && candidate.id != current_id =>
            {
                RecordOutcome::Flagged {
                    finding: Finding::Corrected(Correction {
                        record_index,
                        record_name: record.name.clone(),
                        old_id: current_id,
                        new_id: candidate.id,
                        old_name: Some(fact.name.clone()),
                        new_name: Some(candidate.name),
                        similarity: candidate.similarity,
                        reason: CorrectionReason::AutoMatch,
                    }),
                }
            }
            best => RecordOutcome::Flagged {
                finding: Finding::Mismatch {
                    record_index,
                    record_name: record.name.clone(),
                    reference_id: current_id,
                    extracted_name: fact.name.clone(),
                    similarity: current_score,
                    best_candidate: best,
                },
            },
        }
    }

    /// Reconcile the whole catalog. Outcomes line up with `records`.
    pub fn reconcile(&self, records: &[CatalogRecord]) -> ReconcileReport {
        let outcomes: Vec<RecordOutcome> = records
            .par_iter()
            .enumerate()
            .map(|(i, record)| self.reconcile_record(i, record))
            .collect();

        let mut stats = ReconcileStats {
            total_records: records.len(),
            corpus_entries: self.index.corpus_len(),
            extracted: self.index.extracted_count(),
            access_denied: self.index.access_denied().len(),
            no_name: self.index.no_name().len(),
            unreadable: self.index.unreadable().len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome {
                RecordOutcome::Unreferenced => stats.unreferenced_records += 1,
                RecordOutcome::Accepted { by_override, .. } => {
                    stats.accepted += 1;
                    if *by_override {
                        stats.accepted_by_override += 1;
                    }
                }
                RecordOutcome::Flagged { finding } => match finding {
                    Finding::Corrected(correction) => {
                        stats.corrected += 1;
                        if correction.reason == CorrectionReason::Override {
                            stats.corrected_by_override += 1;
                        }
                    }
                    Finding::Mismatch { .. } => stats.mismatched += 1,
                    Finding::MissingReference { .. } => stats.missing_reference += 1,
                    Finding::Orphan { .. } | Finding::Duplicate { .. } => {}
                },
            }
        }

        ReconcileReport { outcomes, stats }
    }
}
