//! Run report: human-readable summary and JSON form.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::apply::ApplyReport;
use crate::catalog::write_atomic;
use crate::consistency::ConsistencyReport;
use crate::models::{Finding, MissingCause, ReconcileStats};
use crate::reconcile::ReconcileReport;

/// Findings listed per section in the text summary; the JSON has all of them.
pub const MAX_LISTED: usize = 25;

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub threshold: f64,
    pub consistency: ConsistencyReport,
    pub findings: Vec<Finding>,
    pub stats: ReconcileStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply: Option<ApplyReport>,
}

impl RunReport {
    /// Per-record findings in catalog order, then orphans and duplicates.
    pub fn new(consistency: ConsistencyReport, reconciled: &ReconcileReport, threshold: f64) -> Self {
        let mut findings: Vec<Finding> = reconciled.findings().cloned().collect();
        findings.extend(consistency.findings());
        Self {
            generated_at: Local::now().to_rfc3339(),
            threshold,
            consistency,
            findings,
            stats: reconciled.stats.clone(),
            apply: None,
        }
    }

    pub fn with_apply(mut self, apply: ApplyReport) -> Self {
        self.apply = Some(apply);
        self
    }

    /// Anything an operator should look at.
    pub fn has_discrepancies(&self) -> bool {
        !self.consistency.consistent || !self.findings.is_empty()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.findings.iter().filter(|f| f.kind() == kind).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

fn cause_label(cause: MissingCause) -> &'static str {
    match cause {
        MissingCause::NotInCorpus => "not in corpus",
        MissingCause::AccessDenied => "access denied",
        MissingCause::NoName => "no name extracted",
        MissingCause::Unreadable => "unreadable",
    }
}

fn describe(finding: &Finding) -> String {
    match finding {
        Finding::MissingReference {
            record_index,
            record_name,
            reference_id,
            cause,
        } => format!(
            "#{record_index} \"{record_name}\" -> {reference_id} ({})",
            cause_label(*cause)
        ),
        Finding::Orphan { reference_id } => reference_id.clone(),
        Finding::Duplicate {
            reference_id,
            count,
            record_indices,
        } => format!("{reference_id} x{count} (records {record_indices:?})"),
        Finding::Mismatch {
            record_index,
            record_name,
            reference_id,
            extracted_name,
            similarity,
            best_candidate,
        } => {
            let best = best_candidate
                .as_ref()
                .map(|c| format!(", best {} \"{}\" {:.3}", c.id, c.name, c.similarity))
                .unwrap_or_default();
            format!(
                "#{record_index} \"{record_name}\" vs {reference_id} \"{extracted_name}\" {similarity:.3}{best}"
            )
        }
        Finding::Corrected(c) => format!(
            "#{} \"{}\" {} -> {} \"{}\" {:.3} [{}]",
            c.record_index,
            c.record_name,
            c.old_id,
            c.new_id,
            c.new_name.as_deref().unwrap_or("?"),
            c.similarity,
            c.reason.as_str()
        ),
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        let c = &self.consistency;

        writeln!(f, "\n{:=<60}", "")?;
        writeln!(f, "Reconciliation summary")?;
        writeln!(f, "{:=<60}", "")?;
        writeln!(f, "  Catalog records:     {}", s.total_records)?;
        writeln!(f, "  Unreferenced:        {}", s.unreferenced_records)?;
        writeln!(f, "  Corpus entries:      {}", s.corpus_entries)?;
        writeln!(
            f,
            "    extracted {} / access denied {} / no name {} / unreadable {}",
            s.extracted, s.access_denied, s.no_name, s.unreadable
        )?;
        writeln!(
            f,
            "  Accepted:            {} ({:.1}%, {} by override)",
            s.accepted,
            s.acceptance_rate(),
            s.accepted_by_override
        )?;
        writeln!(
            f,
            "  Corrected:           {} ({} by override)",
            s.corrected, s.corrected_by_override
        )?;
        writeln!(f, "  Mismatched:          {}", s.mismatched)?;
        writeln!(f, "  Missing reference:   {}", s.missing_reference)?;
        writeln!(f, "  Orphans:             {}", c.missing_in_catalog.len())?;
        writeln!(f, "  Duplicates:          {}", c.duplicates.len())?;
        writeln!(f, "  Threshold:           {}", self.threshold)?;

        for (kind, title) in [
            ("corrected", "Corrections"),
            ("mismatch", "Mismatches"),
            ("missing_reference", "Missing references"),
            ("duplicate", "Duplicate references"),
            ("orphan", "Orphan raw entries"),
        ] {
            let total = self.count(kind);
            if total == 0 {
                continue;
            }
            writeln!(f, "\n{title} ({total}):")?;
            for finding in self.findings.iter().filter(|x| x.kind() == kind).take(MAX_LISTED) {
                writeln!(f, "  {}", describe(finding))?;
            }
            if total > MAX_LISTED {
                writeln!(f, "  ... and {} more", total - MAX_LISTED)?;
            }
        }

        if let Some(apply) = &self.apply {
            writeln!(f, "\nApplied:")?;
            writeln!(f, "  Records changed:     {}", apply.changed_records)?;
            match &apply.backup {
                Some(path) => writeln!(f, "  Backup:              {}", path.display())?,
                None => writeln!(f, "  Backup:              (catalog unchanged)")?,
            }
            writeln!(
                f,
                "  Audit log:           {} ({} entries)",
                apply.audit_path.display(),
                apply.audit_entries
            )?;
        }

        writeln!(f, "\n  Elapsed: {:.2}s", s.elapsed_seconds)?;
        write!(f, "{:=<60}", "")
    }
}
