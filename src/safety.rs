//! Safety checks run before the binary writes anything.
//!
//! The catalog is the only copy of hand-curated data, so every output path
//! (JSON report, backup directory, audit log) is validated against the inputs
//! before the first byte is written.

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Best-effort absolute form of `path`, also for paths that do not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path) {
        return real;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        (_, Some(name)) => std::env::current_dir()
            .map(|cwd| cwd.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Validates that an output path is safe to overwrite.
///
/// The output must not be one of the `protected` paths and must not live
/// inside a protected directory.
pub fn validate_output_path(output: &Path, protected: &[&Path]) -> Result<()> {
    let output_real = resolve(output);

    if output_real.is_dir() {
        bail!(
            "Safety check failed: output '{}' is a directory",
            output.display()
        );
    }

    for source in protected {
        let source_real = resolve(source);
        if output_real == source_real {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                source.display()
            );
        }
        if source_real.is_dir() && output_real.starts_with(&source_real) {
            bail!(
                "Safety check failed: output '{}' would be written inside input directory '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// Check every path `--apply` touches.
///
/// Backups must not land in the raw corpus or replace the catalog, and the
/// audit log must not clobber the catalog or sit inside the corpus.
pub fn validate_apply_paths(
    catalog: &Path,
    raw_dir: &Path,
    backup_dir: &Path,
    audit_log: &Path,
) -> Result<()> {
    let catalog_real = resolve(catalog);
    let backup_real = resolve(backup_dir);
    let raw_real = resolve(raw_dir);

    if backup_real == catalog_real {
        bail!(
            "Safety check failed: backup directory '{}' is the catalog file",
            backup_dir.display()
        );
    }
    if backup_real.starts_with(&raw_real) {
        bail!(
            "Safety check failed: backup directory '{}' is inside the raw corpus '{}'",
            backup_dir.display(),
            raw_dir.display()
        );
    }

    validate_output_path(audit_log, &[catalog, raw_dir])?;

    if resolve(audit_log).starts_with(&backup_real) {
        bail!(
            "Safety check failed: audit log '{}' would be written inside backup directory '{}'",
            audit_log.display(),
            backup_dir.display()
        );
    }

    Ok(())
}

/// Check the `--json` report path. It is written with or without `--apply`,
/// so it must never land on the catalog, in the raw corpus or on the audit log.
pub fn validate_report_path(
    report: &Path,
    catalog: &Path,
    raw_dir: &Path,
    audit_log: Option<&Path>,
) -> Result<()> {
    match audit_log {
        Some(audit) => validate_output_path(report, &[catalog, raw_dir, audit]),
        None => validate_output_path(report, &[catalog, raw_dir]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_output() {
        let temp = tempdir().unwrap();
        let catalog = temp.path().join("events.json");
        fs::write(&catalog, "[]").unwrap();
        let audit = temp.path().join("audit.json");
        assert!(validate_output_path(&audit, &[&catalog]).is_ok());
    }

    #[test]
    fn test_output_equals_input() {
        let temp = tempdir().unwrap();
        let catalog = temp.path().join("events.json");
        fs::write(&catalog, "[]").unwrap();
        // Same file reached through a different spelling
        let sneaky = temp.path().join(".").join("events.json");
        let result = validate_output_path(&sneaky, &[&catalog]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as input"));
    }

    #[test]
    fn test_output_inside_input_directory() {
        let temp = tempdir().unwrap();
        let raw = temp.path().join("raw");
        fs::create_dir(&raw).unwrap();
        let result = validate_output_path(&raw.join("audit.json"), &[&raw]);
        assert!(result.unwrap_err().to_string().contains("inside input directory"));
    }

    #[test]
    fn test_output_is_directory() {
        let temp = tempdir().unwrap();
        assert!(validate_output_path(temp.path(), &[]).is_err());
    }

    #[test]
    fn test_apply_paths() {
        let temp = tempdir().unwrap();
        let catalog = temp.path().join("events.json");
        fs::write(&catalog, "[]").unwrap();
        let raw = temp.path().join("raw");
        fs::create_dir(&raw).unwrap();
        let backups = temp.path().join("backups");
        let audit = temp.path().join("audit.json");

        assert!(validate_apply_paths(&catalog, &raw, &backups, &audit).is_ok());
        assert!(validate_apply_paths(&catalog, &raw, &raw.join("bak"), &audit).is_err());
        assert!(validate_apply_paths(&catalog, &raw, &catalog, &audit).is_err());
        assert!(validate_apply_paths(&catalog, &raw, &backups, &catalog).is_err());
        assert!(validate_apply_paths(&catalog, &raw, &backups, &raw.join("a.json")).is_err());
    }

    #[test]
    fn test_report_path() {
        let temp = tempdir().unwrap();
        let catalog = temp.path().join("events.json");
        fs::write(&catalog, "[]").unwrap();
        let raw = temp.path().join("raw");
        fs::create_dir(&raw).unwrap();
        let audit = temp.path().join("events.audit.json");

        let report = temp.path().join("report.json");
        assert!(validate_report_path(&report, &catalog, &raw, Some(&audit)).is_ok());

        let err = validate_report_path(&catalog, &catalog, &raw, None).unwrap_err();
        assert!(err.to_string().contains("cannot be the same as input"));
        assert!(validate_report_path(&raw.join("r.json"), &catalog, &raw, None).is_err());
        assert!(validate_report_path(&audit, &catalog, &raw, Some(&audit)).is_err());
        assert_eq!(fs::read_to_string(&catalog).unwrap(), "[]");
    }
}
