use anyhow::{bail, Context, Result};
use clap::Parser;
use event_reconcile::apply::{ApplyOptions, CorrectionApplier};
use event_reconcile::catalog::load_catalog;
use event_reconcile::config::{load_config, ReconcileConfig, UnmatchedPolicy};
use event_reconcile::consistency::check_catalog;
use event_reconcile::corpus::DirectoryCorpus;
use event_reconcile::extract::HeuristicExtractor;
use event_reconcile::index::ReferenceIndex;
use event_reconcile::progress::{format_duration, is_log_only, log_phase, set_log_only, Phase};
use event_reconcile::reconcile::Reconciler;
use event_reconcile::report::RunReport;
use event_reconcile::safety::{validate_apply_paths, validate_report_path};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "event-reconcile")]
#[command(about = "Check an event catalog against scraped event pages and repair broken references")]
struct Args {
    /// Catalog JSON file (array of event records)
    catalog: PathBuf,

    /// Directory of raw `<id>.txt` page snapshots
    raw_dir: PathBuf,

    /// Write corrections back to the catalog (default: report only)
    #[arg(long)]
    apply: bool,

    /// Similarity threshold, overrides the config file
    #[arg(long)]
    threshold: Option<f64>,

    /// JSON config file (threshold, extraction rules, overrides, policy)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Where catalog snapshots go before a rewrite [default: <catalog dir>/backups]
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Audit log path [default: <catalog dir>/<catalog stem>.audit.json]
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Remove links that score below threshold with no replacement
    #[arg(long)]
    clear_unmatched: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Disable progress bars, emit plain log lines (for piping/tailing)
    #[arg(long)]
    log_only: bool,
}

fn catalog_dir(catalog: &Path) -> PathBuf {
    catalog
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_audit_log(catalog: &Path) -> PathBuf {
    let stem = catalog
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    catalog_dir(catalog).join(format!("{stem}.audit.json"))
}

fn build_config(args: &Args) -> Result<ReconcileConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ReconcileConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.clear_unmatched {
        config.unmatched_policy = UnmatchedPolicy::Clear;
    }
    config.validate()?;
    Ok(config)
}

/// Returns whether anything needs an operator's attention.
fn run(args: Args) -> Result<bool> {
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();
    let config = build_config(&args)?;

    if !args.raw_dir.is_dir() {
        bail!("Raw corpus directory {} does not exist", args.raw_dir.display());
    }

    let backup_dir = args
        .backup_dir
        .clone()
        .unwrap_or_else(|| catalog_dir(&args.catalog).join("backups"));
    let audit_log = args
        .audit_log
        .clone()
        .unwrap_or_else(|| default_audit_log(&args.catalog));
    if args.apply {
        validate_apply_paths(&args.catalog, &args.raw_dir, &backup_dir, &audit_log)?;
    }
    if let Some(json) = &args.json {
        let audit = args.apply.then_some(audit_log.as_path());
        validate_report_path(json, &args.catalog, &args.raw_dir, audit)?;
    }

    let mut records = load_catalog(&args.catalog)?;
    log_phase(
        "catalog",
        &format!("Loaded {} records from {}", records.len(), args.catalog.display()),
    );

    let corpus = DirectoryCorpus::new(&args.raw_dir);
    let extractor = HeuristicExtractor::new(config.extraction.clone());
    let index = ReferenceIndex::build(&corpus, &extractor)
        .with_context(|| format!("Failed to list raw corpus {}", args.raw_dir.display()))?;

    let phase = Phase::open("reconcile", "Reconciling references");
    let consistency = check_catalog(&records, &index);
    let reconciled = Reconciler::new(&index, &config).reconcile(&records);
    phase.finish(&format!(
        "{} records: {} accepted, {} corrected",
        records.len(),
        reconciled.stats.accepted,
        reconciled.corrections().count()
    ));

    let mut report = RunReport::new(consistency, &reconciled, config.threshold);

    if args.apply {
        let applier = CorrectionApplier::new(ApplyOptions {
            catalog_path: args.catalog.clone(),
            backup_dir,
            audit_path: audit_log,
            policy: config.unmatched_policy,
        });
        let applied = applier.commit(&mut records, &report.findings)?;
        report = report.with_apply(applied);
    }

    let elapsed = start.elapsed();
    report.stats.elapsed_seconds = elapsed.as_secs_f64();
    if is_log_only() {
        report.stats.log_phase("final");
    }

    println!("{report}");

    if let Some(path) = &args.json {
        report.write_json(path)?;
        log_phase("report", &format!("Wrote JSON report to {}", path.display()));
    }

    log_phase("done", &format!("Finished in {}", format_duration(elapsed)));
    Ok(report.has_discrepancies())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
