//! Inspect extraction results over a raw corpus directory.
//!
//! Usage: inspect-corpus <raw-dir> [--config PATH] [--id ID] [--name "Event Name" [--current ID]] [--top N] [--failures]

use anyhow::{Context, Result};
use event_reconcile::config::{load_config, ReconcileConfig};
use event_reconcile::corpus::{DirectoryCorpus, RawCorpus};
use event_reconcile::extract::{HeuristicExtractor, TextExtractor};
use event_reconcile::index::{EntryStatus, ReferenceIndex};
use event_reconcile::models::ExtractionOutcome;
use event_reconcile::normalize::normalize_name;
use event_reconcile::progress::format_duration;
use event_reconcile::scoring::similarity;
use std::path::PathBuf;
use std::time::Instant;

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: inspect-corpus <raw-dir> [--config PATH] [--id ID] [--name \"Event Name\" [--current ID]] [--top N] [--failures]"
        );
        std::process::exit(1);
    }

    let raw_dir = PathBuf::from(&args[1]);
    let config = match flag_value(&args, "--config") {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => ReconcileConfig::default(),
    };
    let top: usize = flag_value(&args, "--top")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let corpus = DirectoryCorpus::new(&raw_dir);
    let extractor = HeuristicExtractor::new(config.extraction.clone());

    // Single entry: show the raw outcome without building the whole index
    if let Some(id) = flag_value(&args, "--id") {
        let blob = corpus
            .read(id)
            .with_context(|| format!("Failed to read {} from {}", id, raw_dir.display()))?;
        println!("Id: {}", id);
        println!("Lines: {}", blob.lines().count());
        match extractor.extract(&blob) {
            ExtractionOutcome::Extracted { name, date } => {
                println!("Name: {}", name);
                println!("Normalized: {}", normalize_name(&name));
                println!("Date: {}", date.as_deref().unwrap_or("(none)"));
            }
            ExtractionOutcome::AccessDenied { marker } => {
                println!("Access denied (marker: \"{}\")", marker);
            }
            ExtractionOutcome::NoName => println!("No name extracted"),
        }
        return Ok(());
    }

    let start = Instant::now();
    println!("Indexing {}...", raw_dir.display());
    let index = ReferenceIndex::build(&corpus, &extractor)
        .with_context(|| format!("Failed to list raw corpus {}", raw_dir.display()))?;

    println!("\n{:=<60}", "");
    println!("Corpus: {}", raw_dir.display());
    println!("  Entries:       {}", index.corpus_len());
    println!("  Extracted:     {}", index.extracted_count());
    println!("  Access denied: {}", index.access_denied().len());
    println!("  No name:       {}", index.no_name().len());
    println!("  Unreadable:    {}", index.unreadable().len());
    println!("  Elapsed:       {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    if args.iter().any(|a| a == "--failures") {
        println!("\nAccess denied:");
        for (id, marker) in index.access_denied() {
            println!("  {}  ({})", id, marker);
        }
        println!("\nNo name:");
        for id in index.no_name() {
            println!("  {}", id);
        }
        println!("\nUnreadable:");
        for (id, reason) in index.unreadable() {
            println!("  {}  ({})", id, reason);
        }
    }

    if let Some(name) = flag_value(&args, "--name") {
        let normalized = normalize_name(name);
        let mut ranked: Vec<(f64, &str, &str)> = index
            .facts()
            .map(|fact| {
                (
                    similarity(&normalized, &fact.normalized_name),
                    fact.id.as_str(),
                    fact.name.as_str(),
                )
            })
            .collect();
        // Highest score first; ids ascending among equals
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        println!("\nTop {} candidates for \"{}\" (normalized: \"{}\"):", top, name, normalized);
        for (score, id, fact_name) in ranked.into_iter().take(top) {
            let marker = if score > config.threshold { "*" } else { " " };
            println!("  {} {:.3}  {}  {}", marker, score, id, fact_name);
        }

        if let Some(id) = flag_value(&args, "--current") {
            match index.status(id) {
                EntryStatus::Extracted(fact) => println!(
                    "Current {} \"{}\" scores {:.3}",
                    id,
                    fact.name,
                    similarity(&normalized, &fact.normalized_name)
                ),
                status => println!("Current {} has no extracted name ({:?})", id, status),
            }
        }
    }

    Ok(())
}
