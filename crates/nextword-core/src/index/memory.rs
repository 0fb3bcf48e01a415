use std::collections::HashMap;

use super::{context_key, NgramTable, StaticIndex};

/// Hash-map backed static index.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    unigrams: NgramTable,
    frequencies: HashMap<String, u64>,
    /// w1 → successors
    bigrams: HashMap<String, NgramTable>,
    /// "w1 w2" → successors
    trigrams: HashMap<String, NgramTable>,
}

impl MemoryIndex {
    pub(super) fn from_parts(
        frequencies: HashMap<String, u64>,
        bigrams: HashMap<String, NgramTable>,
        trigrams: HashMap<String, NgramTable>,
    ) -> Self {
        let unigrams = NgramTable::from_counts(frequencies.iter().map(|(w, c)| (w.clone(), *c)));
        Self {
            unigrams,
            frequencies,
            bigrams,
            trigrams,
        }
    }

    pub fn word_count(&self) -> usize {
        self.unigrams.len()
    }

    /// Number of bigram contexts.
    pub fn bigram_contexts(&self) -> usize {
        self.bigrams.len()
    }

    /// Number of trigram contexts.
    pub fn trigram_contexts(&self) -> usize {
        self.trigrams.len()
    }
}

impl StaticIndex for MemoryIndex {
    fn frequency(&self, word: &str) -> u64 {
        self.frequencies.get(word).copied().unwrap_or(0)
    }

    fn ngram_table(&self, context: &[&str]) -> Option<&NgramTable> {
        match context {
            [] => Some(&self.unigrams),
            [w1] => self.bigrams.get(*w1),
            [_, _] => self.trigrams.get(&context_key(context)),
            _ => None,
        }
    }

    fn has_ngrams(&self) -> bool {
        !self.bigrams.is_empty() || !self.trigrams.is_empty()
    }
}
