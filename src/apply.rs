//! Writing reconciliation results back to the catalog.
//!
//! `apply_corrections` is the pure part: it edits records in memory and
//! produces audit entries. `CorrectionApplier` owns the file side: backup,
//! atomic catalog replace, audit log.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::catalog::{rewrite_link, save_catalog, write_atomic};
use crate::config::UnmatchedPolicy;
use crate::models::{AuditEntry, CatalogRecord, Finding};
use crate::progress::log_phase;
use crate::safety::validate_output_path;

pub const REASON_UNMATCHED_KEPT: &str = "unmatched-kept";
pub const REASON_UNMATCHED_CLEARED: &str = "unmatched-cleared";

/// In-memory result of applying findings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedChanges {
    pub audit: Vec<AuditEntry>,
    /// Records whose link actually changed.
    pub changed_records: usize,
}

/// Apply `Corrected` findings and, per `policy`, `Mismatch` findings to
/// `records`. Other findings are ignored.
pub fn apply_corrections<'a, I>(
    records: &mut [CatalogRecord],
    findings: I,
    policy: UnmatchedPolicy,
) -> AppliedChanges
where
    I: IntoIterator<Item = &'a Finding>,
{
    let mut changes = AppliedChanges::default();

    for finding in findings {
        match finding {
            Finding::Corrected(correction) => {
                let Some(record) = records.get_mut(correction.record_index) else {
                    continue;
                };
                let old_link = record.link.clone();
                let new_link = old_link
                    .as_deref()
                    .and_then(|link| rewrite_link(link, &correction.new_id));
                if new_link.is_some() && new_link != old_link {
                    record.link = new_link.clone();
                    changes.changed_records += 1;
                }
                changes.audit.push(AuditEntry {
                    event_index: correction.record_index,
                    event_name: record.name.clone(),
                    old_event_id: Some(correction.old_id.clone()),
                    new_event_id: Some(correction.new_id.clone()),
                    old_event_name: correction.old_name.clone(),
                    new_event_name: correction.new_name.clone(),
                    similarity: correction.similarity,
                    old_link,
                    new_link: record.link.clone(),
                    reason: correction.reason.as_str().to_string(),
                    applied_at: None,
                    backup: None,
                });
            }
            Finding::Mismatch {
                record_index,
                reference_id,
                extracted_name,
                similarity,
                ..
            } => {
                let Some(record) = records.get_mut(*record_index) else {
                    continue;
                };
                let old_link = record.link.clone();
                let (new_event_id, reason) = match policy {
                    UnmatchedPolicy::Keep => (Some(reference_id.clone()), REASON_UNMATCHED_KEPT),
                    UnmatchedPolicy::Clear => {
                        if record.link.take().is_some() {
                            changes.changed_records += 1;
                        }
                        (None, REASON_UNMATCHED_CLEARED)
                    }
                };
                changes.audit.push(AuditEntry {
                    event_index: *record_index,
                    event_name: record.name.clone(),
                    old_event_id: Some(reference_id.clone()),
                    new_event_id,
                    old_event_name: Some(extracted_name.clone()),
                    new_event_name: None,
                    similarity: *similarity,
                    old_link,
                    new_link: record.link.clone(),
                    reason: reason.to_string(),
                    applied_at: None,
                    backup: None,
                });
            }
            Finding::MissingReference { .. } | Finding::Orphan { .. } | Finding::Duplicate { .. } => {}
        }
    }

    changes
}

// ============================================================================
// File Side
// ============================================================================

#[derive(Clone, Debug)]
pub struct ApplyOptions {
    pub catalog_path: PathBuf,
    pub backup_dir: PathBuf,
    pub audit_path: PathBuf,
    pub policy: UnmatchedPolicy,
}

/// What `CorrectionApplier::commit` did on disk.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ApplyReport {
    /// Snapshot of the catalog as it was before this run, if it was rewritten.
    pub backup: Option<PathBuf>,
    pub changed_records: usize,
    pub audit_entries: usize,
    pub audit_path: PathBuf,
}

pub struct CorrectionApplier {
    options: ApplyOptions,
}

impl CorrectionApplier {
    pub fn new(options: ApplyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Apply findings to `records` and persist.
    ///
    /// The catalog is backed up and replaced only when a record changed. Audit
    /// entries are appended to the log, tagged with the run time and backup;
    /// a run with nothing to audit leaves the log untouched.
    pub fn commit<'a, I>(&self, records: &mut [CatalogRecord], findings: I) -> Result<ApplyReport>
    where
        I: IntoIterator<Item = &'a Finding>,
    {
        let opts = &self.options;
        validate_output_path(&opts.audit_path, &[&opts.catalog_path])?;
        // Read before touching the catalog so a damaged log aborts the run early
        let mut audit_log = read_audit_log(&opts.audit_path)?;

        let mut changes = apply_corrections(records, findings, opts.policy);
        let applied_at = Local::now().to_rfc3339();

        let backup = if changes.changed_records > 0 {
            let backup = backup_catalog(&opts.catalog_path, &opts.backup_dir)?;
            log_phase("apply", &format!("Backed up catalog to {}", backup.display()));
            save_catalog(&opts.catalog_path, records).with_context(|| {
                format!("Failed to rewrite catalog {}", opts.catalog_path.display())
            })?;
            log_phase(
                "apply",
                &format!(
                    "Rewrote {} record(s) in {}",
                    changes.changed_records,
                    opts.catalog_path.display()
                ),
            );
            Some(backup)
        } else {
            log_phase("apply", "No record changed, catalog left untouched");
            None
        };

        for entry in &mut changes.audit {
            entry.applied_at = Some(applied_at.clone());
            entry.backup = backup.as_ref().map(|p| p.display().to_string());
        }
        if changes.audit.is_empty() {
            log_phase("apply", "Nothing to audit, audit log left untouched");
        } else {
            audit_log.extend(changes.audit.iter().cloned());
            write_audit_log(&opts.audit_path, &audit_log)?;
        }

        Ok(ApplyReport {
            backup,
            changed_records: changes.changed_records,
            audit_entries: changes.audit.len(),
            audit_path: opts.audit_path.clone(),
        })
    }
}

/// Byte-identical timestamped copy of `catalog` inside `backup_dir`:
/// `<stem>.<YYYYmmdd-HHMMSS>.<ext>`, with a numeric suffix on collision.
pub fn backup_catalog(catalog: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup directory {}", backup_dir.display()))?;

    let stem = catalog
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    let ext = catalog
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();

    let mut target = backup_dir.join(format!("{stem}.{stamp}.{ext}"));
    let mut attempt = 1;
    while target.exists() {
        target = backup_dir.join(format!("{stem}.{stamp}-{attempt}.{ext}"));
        attempt += 1;
    }

    fs::copy(catalog, &target).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            catalog.display(),
            target.display()
        )
    })?;
    Ok(target)
}

/// Put a backup snapshot back in place of the catalog.
pub fn restore_backup(backup: &Path, catalog: &Path) -> Result<()> {
    let bytes =
        fs::read(backup).with_context(|| format!("Failed to read backup {}", backup.display()))?;
    write_atomic(catalog, &bytes)?;
    Ok(())
}

/// Entries already in the audit log; a missing file is an empty log.
pub fn read_audit_log(path: &Path) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read audit log {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text)
        .with_context(|| format!("Audit log {} is not a JSON array of entries", path.display()))
}

pub fn write_audit_log(path: &Path, entries: &[AuditEntry]) -> Result<()> {
    let mut json = serde_json::to_string_pretty(entries).context("Failed to serialize audit log")?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    Ok(())
}
