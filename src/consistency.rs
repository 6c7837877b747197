//! Catalog ↔ corpus consistency: set differences and duplicate references.
//!
//! All output lists are sorted so repeated runs diff cleanly.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::index::ReferenceIndex;
use crate::models::{CatalogRecord, Finding};

/// An id shared by several catalog records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateReference {
    pub reference_id: String,
    pub count: usize,
    pub record_indices: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub catalog_records: usize,
    pub corpus_entries: usize,
    /// Raw entries no catalog record points at.
    pub missing_in_catalog: Vec<String>,
    /// Catalog references with no raw entry behind them.
    pub missing_raw_source: Vec<String>,
    pub duplicates: Vec<DuplicateReference>,
    /// Records whose link is absent or carries no event id.
    pub unreferenced_records: Vec<usize>,
    pub consistent: bool,
}

/// Compare catalog references (by record position) with corpus ids.
pub fn check_ids(references: &[Option<String>], corpus_ids: &BTreeSet<String>) -> ConsistencyReport {
    let mut by_id: FxHashMap<&str, Vec<usize>> = FxHashMap::default();
    let mut unreferenced_records = Vec::new();

    for (index, reference) in references.iter().enumerate() {
        match reference {
            Some(id) => by_id.entry(id.as_str()).or_default().push(index),
            None => unreferenced_records.push(index),
        }
    }

    let catalog_ids: BTreeSet<&str> = by_id.keys().copied().collect();

    let missing_in_catalog: Vec<String> = corpus_ids
        .iter()
        .filter(|id| !catalog_ids.contains(id.as_str()))
        .cloned()
        .collect();

    let missing_raw_source: Vec<String> = catalog_ids
        .iter()
        .filter(|id| !corpus_ids.contains(**id))
        .map(|id| id.to_string())
        .collect();

    let mut duplicates: Vec<DuplicateReference> = by_id
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(id, indices)| DuplicateReference {
            reference_id: id.to_string(),
            count: indices.len(),
            record_indices: indices,
        })
        .collect();
    duplicates.sort_by(|a, b| a.reference_id.cmp(&b.reference_id));

    let consistent =
        missing_in_catalog.is_empty() && missing_raw_source.is_empty() && duplicates.is_empty();

    ConsistencyReport {
        catalog_records: references.len(),
        corpus_entries: corpus_ids.len(),
        missing_in_catalog,
        missing_raw_source,
        duplicates,
        unreferenced_records,
        consistent,
    }
}

pub fn check_catalog(records: &[CatalogRecord], index: &ReferenceIndex) -> ConsistencyReport {
    let references: Vec<Option<String>> = records.iter().map(CatalogRecord::reference_id).collect();
    check_ids(&references, &index.corpus_ids())
}

impl ConsistencyReport {
    /// Orphan and duplicate findings. Unresolvable references are reported
    /// per record by the reconciler, with their cause.
    pub fn findings(&self) -> Vec<Finding> {
        let orphans = self.missing_in_catalog.iter().map(|id| Finding::Orphan {
            reference_id: id.clone(),
        });
        let duplicates = self.duplicates.iter().map(|dup| Finding::Duplicate {
            reference_id: dup.reference_id.clone(),
            count: dup.count,
            record_indices: dup.record_indices.clone(),
        });
        orphans.chain(duplicates).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn refs(items: &[Option<&str>]) -> Vec<Option<String>> {
        items.iter().map(|r| r.map(str::to_string)).collect()
    }

    #[test]
    fn test_set_differences_both_directions() {
        let report = check_ids(
            &refs(&[Some("1"), Some("2"), Some("3")]),
            &ids(&["2", "3", "4"]),
        );
        assert_eq!(report.missing_in_catalog, vec!["4"]);
        assert_eq!(report.missing_raw_source, vec!["1"]);
        assert!(report.duplicates.is_empty());
        assert!(!report.consistent);
    }

    #[test]
    fn test_duplicate_reference_counted_once() {
        let report = check_ids(&refs(&[Some("555"), Some("7"), Some("555")]), &ids(&["555", "7"]));
        assert_eq!(
            report.duplicates,
            vec![DuplicateReference {
                reference_id: "555".to_string(),
                count: 2,
                record_indices: vec![0, 2],
            }]
        );
        let findings = report.findings();
        let dup_count = findings
            .iter()
            .filter(|f| matches!(f, Finding::Duplicate { count: 2, .. }))
            .count();
        assert_eq!(dup_count, 1);
        assert!(!report.consistent);
    }

    #[test]
    fn test_consistent_when_all_sets_empty() {
        let report = check_ids(&refs(&[Some("1"), None, Some("2")]), &ids(&["1", "2"]));
        assert!(report.consistent);
        assert_eq!(report.unreferenced_records, vec![1]);
        assert!(report.findings().is_empty());
    }

    #[test]
    fn test_output_is_sorted() {
        let report = check_ids(
            &refs(&[Some("9"), Some("30"), Some("9"), Some("30"), Some("100")]),
            &ids(&["8", "10", "7"]),
        );
        assert_eq!(report.missing_in_catalog, vec!["10", "7", "8"]);
        assert_eq!(report.missing_raw_source, vec!["100", "30", "9"]);
        let dup_ids: Vec<&str> = report.duplicates.iter().map(|d| d.reference_id.as_str()).collect();
        assert_eq!(dup_ids, vec!["30", "9"]);
    }

    #[test]
    fn test_orphan_findings() {
        let report = check_ids(&refs(&[Some("1")]), &ids(&["1", "2"]));
        assert_eq!(
            report.findings(),
            vec![Finding::Orphan {
                reference_id: "2".to_string()
            }]
        );
    }
}
