//! Reference index: id → extracted fact over the whole raw corpus.
//!
//! Built once, read-only afterwards. Entries that yield no fact are kept in
//! three separate buckets (unreadable, access denied, no name) so reports can
//! say exactly why a reference does not resolve.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use rayon::prelude::*;

use crate::corpus::RawCorpus;
use crate::extract::TextExtractor;
use crate::models::{ExtractedFact, ExtractionOutcome, MissingCause, RawEntry};
use crate::normalize::normalize_name;
use crate::progress::Phase;

/// Lookup state of one id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntryStatus<'a> {
    Extracted(&'a ExtractedFact),
    AccessDenied,
    NoName,
    Unreadable,
    NotInCorpus,
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    facts: BTreeMap<String, ExtractedFact>,
    access_denied: BTreeMap<String, String>,
    no_name: BTreeSet<String>,
    unreadable: BTreeMap<String, String>,
}

impl ReferenceIndex {
    /// Read and extract every entry of `corpus`. Only listing the corpus can
    /// fail; per-entry read errors land in the unreadable bucket.
    pub fn build<C, E>(corpus: &C, extractor: &E) -> io::Result<Self>
    where
        C: RawCorpus + ?Sized,
        E: TextExtractor + ?Sized,
    {
        let ids = corpus.ids()?;
        let total = ids.len() as u64;
        let phase = Phase::counted("index", total, "Extracting raw entries");

        let results: Vec<(String, io::Result<ExtractionOutcome>)> = ids
            .into_par_iter()
            .map(|id| {
                let outcome = corpus.read(&id).map(|blob| extractor.extract(&blob));
                phase.tick();
                (id, outcome)
            })
            .collect();

        let mut index = Self::default();
        for (id, outcome) in results {
            match outcome {
                Ok(outcome) => index.insert(id, outcome),
                Err(err) => {
                    index.unreadable.insert(id, err.to_string());
                }
            }
        }
        phase.finish(&format!(
            "{} entries: {} extracted, {} access denied, {} no name, {} unreadable",
            index.corpus_len(),
            index.extracted_count(),
            index.access_denied().len(),
            index.no_name().len(),
            index.unreadable().len()
        ));
        Ok(index)
    }

    /// Build from entries already in memory.
    pub fn from_entries<E>(entries: &[RawEntry], extractor: &E) -> Self
    where
        E: TextExtractor + ?Sized,
    {
        let outcomes: Vec<(String, ExtractionOutcome)> = entries
            .par_iter()
            .map(|entry| (entry.id.clone(), extractor.extract(&entry.blob)))
            .collect();

        let mut index = Self::default();
        for (id, outcome) in outcomes {
            index.insert(id, outcome);
        }
        index
    }

    fn insert(&mut self, id: String, outcome: ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Extracted { name, date } => {
                let fact = ExtractedFact {
                    id: id.clone(),
                    normalized_name: normalize_name(&name),
                    name,
                    date,
                };
                self.facts.insert(id, fact);
            }
            ExtractionOutcome::AccessDenied { marker } => {
                self.access_denied.insert(id, marker);
            }
            ExtractionOutcome::NoName => {
                self.no_name.insert(id);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExtractedFact> {
        self.facts.get(id)
    }

    /// Match candidates in ascending id order.
    pub fn facts(&self) -> impl Iterator<Item = &ExtractedFact> {
        self.facts.values()
    }

    pub fn status(&self, id: &str) -> EntryStatus<'_> {
        if let Some(fact) = self.facts.get(id) {
            EntryStatus::Extracted(fact)
        } else if self.access_denied.contains_key(id) {
            EntryStatus::AccessDenied
        } else if self.no_name.contains(id) {
            EntryStatus::NoName
        } else if self.unreadable.contains_key(id) {
            EntryStatus::Unreadable
        } else {
            EntryStatus::NotInCorpus
        }
    }

    /// Why `id` has no fact, or `None` if it has one.
    pub fn missing_cause(&self, id: &str) -> Option<MissingCause> {
        match self.status(id) {
            EntryStatus::Extracted(_) => None,
            EntryStatus::AccessDenied => Some(MissingCause::AccessDenied),
            EntryStatus::NoName => Some(MissingCause::NoName),
            EntryStatus::Unreadable => Some(MissingCause::Unreadable),
            EntryStatus::NotInCorpus => Some(MissingCause::NotInCorpus),
        }
    }

    /// Every id the corpus presented, whether or not extraction succeeded.
    pub fn corpus_ids(&self) -> BTreeSet<String> {
        self.facts
            .keys()
            .chain(self.access_denied.keys())
            .chain(self.no_name.iter())
            .chain(self.unreadable.keys())
            .cloned()
            .collect()
    }

    pub fn access_denied(&self) -> &BTreeMap<String, String> {
        &self.access_denied
    }

    pub fn no_name(&self) -> &BTreeSet<String> {
        &self.no_name
    }

    pub fn unreadable(&self) -> &BTreeMap<String, String> {
        &self.unreadable
    }

    pub fn extracted_count(&self) -> usize {
        self.facts.len()
    }

    pub fn corpus_len(&self) -> usize {
        self.facts.len() + self.access_denied.len() + self.no_name.len() + self.unreadable.len()
    }
}
