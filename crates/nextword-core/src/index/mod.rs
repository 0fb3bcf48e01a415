//! Static language index: global word frequencies and n-gram successor tables.
//!
//! The index is read-only for the lifetime of a locale. `MemoryIndex` is the
//! in-memory implementation; `IndexBuilder` produces one from counts, raw
//! text, or the JSON word lists used by the dictionary tooling, and merges
//! several such lists into one.

mod builder;
mod json;
mod memory;
mod merge;

pub use builder::IndexBuilder;
pub use json::{BIGRAMS_FILE, TRIGRAMS_FILE, UNIGRAMS_FILE};
pub use memory::MemoryIndex;
pub use merge::MergeStrategy;

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

/// Successor counts for one context, sorted by count (desc) then word (asc).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramTable {
    entries: Vec<(String, u64)>,
    /// Positions into `entries`, ordered by word, for `count` lookups.
    by_word: Vec<u32>,
    total: u64,
}

impl NgramTable {
    /// Build a table from raw counts. Zero counts are dropped.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut entries: Vec<(String, u64)> = counts.into_iter().filter(|(_, c)| *c > 0).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total = entries.iter().map(|(_, c)| *c).fold(0u64, u64::saturating_add);
        let mut by_word: Vec<u32> = (0..entries.len() as u32).collect();
        by_word.sort_unstable_by(|&a, &b| entries[a as usize].0.cmp(&entries[b as usize].0));
        Self {
            entries,
            by_word,
            total,
        }
    }

    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Sum of all counts in the table.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of `word` in this table (0 when absent). Binary search over the
    /// word-ordered positions, so it stays cheap on large tables.
    pub fn count(&self, word: &str) -> u64 {
        self.by_word
            .binary_search_by(|&i| self.entries[i as usize].0.as_str().cmp(word))
            .map_or(0, |pos| self.entries[self.by_word[pos] as usize].1)
    }
}

/// Read-only view of a locale's language data.
pub trait StaticIndex: Send + Sync {
    /// Global frequency of a normalised word (0 when unknown).
    fn frequency(&self, word: &str) -> u64;

    /// Successor table for a context of 0–2 normalised words.
    /// An empty context returns the unigram table.
    fn ngram_table(&self, context: &[&str]) -> Option<&NgramTable>;

    /// Whether any bigram or trigram data is loaded.
    fn has_ngrams(&self) -> bool;
}

/// Key under which a multi-word context is stored.
pub(crate) fn context_key(context: &[&str]) -> String {
    context.join(" ")
}
