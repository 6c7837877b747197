use std::fs;
use std::path::Path;

use event_reconcile::apply::{ApplyOptions, CorrectionApplier};
use event_reconcile::catalog::load_catalog;
use event_reconcile::config::{ReconcileConfig, UnmatchedPolicy};
use event_reconcile::consistency::check_catalog;
use event_reconcile::corpus::DirectoryCorpus;
use event_reconcile::extract::HeuristicExtractor;
use event_reconcile::index::ReferenceIndex;
use event_reconcile::models::{AuditEntry, Finding, MissingCause};
use event_reconcile::reconcile::{ReconcileReport, Reconciler};
use event_reconcile::report::RunReport;
use tempfile::tempdir;

fn page(title: &str, location: &str) -> String {
    format!("Notifications\nHome\nEvents\n{title}\n{location}\nDetails\nPrivacy · Terms\n")
}

fn write_corpus(raw: &Path) {
    fs::create_dir_all(raw).unwrap();
    fs::write(raw.join("100.txt"), page("Penang Bridge Night Run 2025", "Penang Bridge, George Town")).unwrap();
    fs::write(raw.join("200.txt"), page("Kuala Lumpur Marathon 2025", "Kuala Lumpur, Malaysia")).unwrap();
    fs::write(raw.join("300.txt"), page("Sunrise Trail Ultra Challenge", "Hulu Langat, Selangor")).unwrap();
    fs::write(raw.join("400.txt"), "This content isn't available right now\n").unwrap();
    fs::write(raw.join("notes.md"), "not part of the corpus").unwrap();
}

const CATALOG: &str = "\u{feff}[
  {\"name\": \"Penang Bridge Night Run 2026\", \"fbLink\": \"https://www.facebook.com/events/100/\", \"category\": \"run\"},
  {\"name\": \"Sunrise Trail Ultra Challenge\", \"fbLink\": \"https://www.facebook.com/events/200/?ref=share\"},
  {\"name\": \"Cameron Highlands Relay\", \"fbLink\": \"https://www.facebook.com/events/400/\"},
  {\"name\": \"Community Fun Walk\"},
]
";

fn reconcile_once(catalog: &Path, raw: &Path, config: &ReconcileConfig) -> (ReconcileReport, RunReport) {
    let records = load_catalog(catalog).unwrap();
    let index = ReferenceIndex::build(&DirectoryCorpus::new(raw), &HeuristicExtractor::default()).unwrap();
    let reconciled = Reconciler::new(&index, config).reconcile(&records);
    let report = RunReport::new(check_catalog(&records, &index), &reconciled, config.threshold);
    (reconciled, report)
}

#[test]
fn test_reconcile_apply_then_rerun_is_clean() {
    let temp = tempdir().unwrap();
    let raw = temp.path().join("raw");
    write_corpus(&raw);
    let catalog = temp.path().join("events.json");
    fs::write(&catalog, CATALOG).unwrap();
    let config = ReconcileConfig::default();

    // First pass: one correction, one access-denied reference
    let (reconciled, report) = reconcile_once(&catalog, &raw, &config);
    let corrections: Vec<_> = reconciled.corrections().collect();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].record_index, 1);
    assert_eq!(corrections[0].old_id, "200");
    assert_eq!(corrections[0].new_id, "300");
    assert!(report.findings.iter().any(|f| matches!(
        f,
        Finding::MissingReference {
            cause: MissingCause::AccessDenied,
            ..
        }
    )));
    assert_eq!(reconciled.stats.accepted, 1);
    assert_eq!(reconciled.stats.unreferenced_records, 1);
    assert!(report.has_discrepancies());

    let options = ApplyOptions {
        catalog_path: catalog.clone(),
        backup_dir: temp.path().join("backups"),
        audit_path: temp.path().join("audit.json"),
        policy: UnmatchedPolicy::Keep,
    };
    let mut records = load_catalog(&catalog).unwrap();
    let applied = CorrectionApplier::new(options.clone())
        .commit(&mut records, &report.findings)
        .unwrap();
    assert_eq!(applied.changed_records, 1);

    // Backup is the original bytes, BOM and trailing commas included
    assert_eq!(fs::read_to_string(applied.backup.unwrap()).unwrap(), CATALOG);

    let rewritten = load_catalog(&catalog).unwrap();
    assert_eq!(
        rewritten[1].link.as_deref(),
        Some("https://www.facebook.com/events/300/?ref=share")
    );
    assert_eq!(
        rewritten[0].extra.get("category").and_then(|v| v.as_str()),
        Some("run")
    );

    let audit: Vec<AuditEntry> =
        serde_json::from_str(&fs::read_to_string(&options.audit_path).unwrap()).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].new_event_id.as_deref(), Some("300"));

    // Second pass over the written catalog finds nothing left to correct
    let (reconciled, _) = reconcile_once(&catalog, &raw, &config);
    assert_eq!(reconciled.corrections().count(), 0);
    assert_eq!(reconciled.stats.accepted, 2);

    let before = fs::read_to_string(&catalog).unwrap();
    let mut records = load_catalog(&catalog).unwrap();
    let findings: Vec<Finding> = reconciled.findings().cloned().collect();
    let applied = CorrectionApplier::new(options.clone()).commit(&mut records, &findings).unwrap();
    assert_eq!(applied.changed_records, 0);
    assert!(applied.backup.is_none());
    assert_eq!(fs::read_to_string(&catalog).unwrap(), before);

    // The first run's audit record survives the no-op rerun
    let audit: Vec<AuditEntry> =
        serde_json::from_str(&fs::read_to_string(&options.audit_path).unwrap()).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].new_event_id.as_deref(), Some("300"));
}

#[test]
fn test_consistency_over_directory_corpus() {
    let temp = tempdir().unwrap();
    let raw = temp.path().join("raw");
    write_corpus(&raw);
    let catalog = temp.path().join("events.json");
    fs::write(&catalog, CATALOG).unwrap();

    let (_, report) = reconcile_once(&catalog, &raw, &ReconcileConfig::default());
    let consistency = &report.consistency;
    assert_eq!(consistency.corpus_entries, 4);
    assert_eq!(consistency.missing_in_catalog, vec!["300"]);
    assert!(consistency.missing_raw_source.is_empty());
    assert_eq!(consistency.unreferenced_records, vec![3]);
    assert!(!consistency.consistent);
}

#[test]
fn test_reports_are_identical_across_runs() {
    let temp = tempdir().unwrap();
    let raw = temp.path().join("raw");
    write_corpus(&raw);
    let catalog = temp.path().join("events.json");
    fs::write(&catalog, CATALOG).unwrap();
    let config = ReconcileConfig::default();

    let (first, _) = reconcile_once(&catalog, &raw, &config);
    let (second, _) = reconcile_once(&catalog, &raw, &config);
    assert_eq!(
        serde_json::to_string(&first.outcomes).unwrap(),
        serde_json::to_string(&second.outcomes).unwrap()
    );
}
