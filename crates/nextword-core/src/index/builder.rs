use std::collections::HashMap;

use tracing::debug;

use super::{context_key, MemoryIndex, NgramTable};
use crate::unicode::{is_sentence_terminator, normalize_word};

/// Words shorter than this are skipped during corpus extraction; single
/// letters are mostly tokenisation artifacts.
const MIN_CORPUS_WORD_CHARS: usize = 2;

/// Accumulates unigram/bigram/trigram counts and freezes them into a
/// [`MemoryIndex`].
///
/// All words are normalised on insertion; a word that normalises to the empty
/// string is ignored, as is any n-gram containing one.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    pub(super) unigrams: HashMap<String, u64>,
    /// w1 → (w2 → count)
    pub(super) bigrams: HashMap<String, HashMap<String, u64>>,
    /// (w1, w2) → (w3 → count)
    pub(super) trigrams: HashMap<(String, String), HashMap<String, u64>>,
}

fn bump(map: &mut HashMap<String, u64>, word: String, count: u64) {
    let slot = map.entry(word).or_insert(0);
    *slot = slot.saturating_add(count);
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unigram(&mut self, word: &str, count: u64) -> &mut Self {
        let w = normalize_word(word);
        if !w.is_empty() {
            bump(&mut self.unigrams, w, count);
        }
        self
    }

    pub fn add_bigram(&mut self, w1: &str, w2: &str, count: u64) -> &mut Self {
        let (w1, w2) = (normalize_word(w1), normalize_word(w2));
        if !w1.is_empty() && !w2.is_empty() {
            bump(self.bigrams.entry(w1).or_default(), w2, count);
        }
        self
    }

    pub fn add_trigram(&mut self, w1: &str, w2: &str, w3: &str, count: u64) -> &mut Self {
        let (w1, w2, w3) = (normalize_word(w1), normalize_word(w2), normalize_word(w3));
        if !w1.is_empty() && !w2.is_empty() && !w3.is_empty() {
            bump(self.trigrams.entry((w1, w2)).or_default(), w3, count);
        }
        self
    }

    /// Count words and n-grams from running text.
    ///
    /// N-grams never cross a line break or a sentence terminator.
    pub fn add_text(&mut self, text: &str) -> &mut Self {
        for line in text.lines() {
            for sentence in line.split(is_sentence_terminator) {
                let words: Vec<String> = sentence
                    .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '’')
                    .map(normalize_word)
                    .filter(|w| w.chars().count() >= MIN_CORPUS_WORD_CHARS)
                    .collect();
                self.add_sentence_words(&words);
            }
        }
        self
    }

    fn add_sentence_words(&mut self, words: &[String]) {
        for w in words {
            bump(&mut self.unigrams, w.clone(), 1);
        }
        for pair in words.windows(2) {
            bump(
                self.bigrams.entry(pair[0].clone()).or_default(),
                pair[1].clone(),
                1,
            );
        }
        for triple in words.windows(3) {
            bump(
                self.trigrams
                    .entry((triple[0].clone(), triple[1].clone()))
                    .or_default(),
                triple[2].clone(),
                1,
            );
        }
    }

    /// Drop bigrams and trigrams seen fewer than `min_freq` times.
    /// Unigram counts are kept as-is.
    pub fn retain_min_frequency(&mut self, min_freq: u64) -> &mut Self {
        if min_freq <= 1 {
            return self;
        }
        for inner in self.bigrams.values_mut() {
            inner.retain(|_, c| *c >= min_freq);
        }
        self.bigrams.retain(|_, inner| !inner.is_empty());
        for inner in self.trigrams.values_mut() {
            inner.retain(|_, c| *c >= min_freq);
        }
        self.trigrams.retain(|_, inner| !inner.is_empty());
        self
    }

    pub fn word_count(&self) -> usize {
        self.unigrams.len()
    }

    pub fn bigram_count(&self) -> usize {
        self.bigrams.values().map(HashMap::len).sum()
    }

    pub fn trigram_count(&self) -> usize {
        self.trigrams.values().map(HashMap::len).sum()
    }

    /// Freeze the counts into an immutable index.
    pub fn build(&self) -> MemoryIndex {
        let bigrams: HashMap<String, NgramTable> = self
            .bigrams
            .iter()
            .map(|(w1, inner)| (w1.clone(), NgramTable::from_counts(inner.clone())))
            .collect();
        let trigrams: HashMap<String, NgramTable> = self
            .trigrams
            .iter()
            .map(|((w1, w2), inner)| {
                (
                    context_key(&[w1.as_str(), w2.as_str()]),
                    NgramTable::from_counts(inner.clone()),
                )
            })
            .collect();
        debug!(
            words = self.unigrams.len(),
            bigram_contexts = bigrams.len(),
            trigram_contexts = trigrams.len(),
            "index built"
        );
        MemoryIndex::from_parts(self.unigrams.clone(), bigrams, trigrams)
    }
}
