//! Raw corpus access: id → scraped text.
//!
//! The harvester writes one `<id>.txt` file per event page. Anything that can
//! list ids and hand back text for an id works as a corpus.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::RawEntry;

/// Source of raw text blobs keyed by external id.
pub trait RawCorpus: Sync {
    /// Every id in the corpus, ascending.
    fn ids(&self) -> io::Result<Vec<String>>;

    /// Raw text for one id.
    fn read(&self, id: &str) -> io::Result<String>;

    /// Convenience: read one id into a [`RawEntry`].
    fn entry(&self, id: &str) -> io::Result<RawEntry> {
        Ok(RawEntry {
            id: id.to_string(),
            blob: self.read(id)?,
        })
    }
}

// ============================================================================
// Directory Corpus
// ============================================================================

/// Directory of `<id>.txt` snapshots.
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.txt"))
    }
}

impl RawCorpus for DirectoryCorpus {
    fn ids(&self) -> io::Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Scrapes are not always valid UTF-8; bad bytes are replaced, not fatal.
    fn read(&self, id: &str) -> io::Result<String> {
        let bytes = fs::read(self.path_for(id))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ============================================================================
// In-Memory Corpus
// ============================================================================

/// Corpus held in memory, mainly for tests and embedding callers.
#[derive(Clone, Debug, Default)]
pub struct MemoryCorpus {
    blobs: BTreeMap<String, String>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, blob: &str) {
        self.blobs.insert(id.to_string(), blob.to_string());
    }

    pub fn with(mut self, id: &str, blob: &str) -> Self {
        self.insert(id, blob);
        self
    }
}

impl FromIterator<(String, String)> for MemoryCorpus {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            blobs: iter.into_iter().collect(),
        }
    }
}

impl RawCorpus for MemoryCorpus {
    fn ids(&self) -> io::Result<Vec<String>> {
        Ok(self.blobs.keys().cloned().collect())
    }

    fn read(&self, id: &str) -> io::Result<String> {
        self.blobs.get(id).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no raw entry for id {id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_corpus_lists_txt_stems_sorted() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("300.txt"), "c").unwrap();
        fs::write(temp.path().join("100.txt"), "a").unwrap();
        fs::write(temp.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(temp.path().join("200.txt")).unwrap();

        let corpus = DirectoryCorpus::new(temp.path());
        assert_eq!(corpus.ids().unwrap(), vec!["100", "300"]);
        assert_eq!(corpus.read("100").unwrap(), "a");
    }

    #[test]
    fn test_directory_corpus_lossy_utf8() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("7.txt"), b"Run \xff Fest").unwrap();
        let corpus = DirectoryCorpus::new(temp.path());
        assert_eq!(corpus.read("7").unwrap(), "Run \u{fffd} Fest");
    }

    #[test]
    fn test_directory_corpus_missing_file_is_error() {
        let temp = tempdir().unwrap();
        let corpus = DirectoryCorpus::new(temp.path());
        assert!(corpus.read("404").is_err());
    }

    #[test]
    fn test_memory_corpus_entry() {
        let corpus = MemoryCorpus::new().with("2", "two").with("1", "one");
        assert_eq!(corpus.ids().unwrap(), vec!["1", "2"]);
        let entry = corpus.entry("2").unwrap();
        assert_eq!(entry.id, "2");
        assert_eq!(entry.blob, "two");
        assert_eq!(
            corpus.read("3").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
