//! Personal word-transition learning with time-decayed boosting.
//!
//! Records which word the user actually typed after a context and boosts
//! those successors in later predictions. Entries decay with a configurable
//! half-life and the store is capped by number of distinct contexts.
//!
//! Only the context a transition was typed after is stored. Lookups for a
//! single-word context also see every two-word context ending in that word,
//! so "how are" → "you" still boosts "you" after "why are".

mod persistence;
pub mod wal;

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::index::context_key;
use crate::settings::{LearningSettings, Settings};
use crate::unicode::normalize_word;

const MAGIC: &[u8; 4] = b"NWLS";
const VERSION: u8 = 1;

#[derive(Clone)]
pub struct LearningStore {
    /// context key ("see" / "how are") → (next word → PatternEntry)
    patterns: HashMap<String, HashMap<String, PatternEntry>>,
    /// last word → two-word context keys ending in it
    by_tail: HashMap<String, HashSet<String>>,
    settings: LearningSettings,
    /// Bumped on every mutation; lets journal replay skip entries already
    /// contained in a snapshot.
    revision: u64,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    pub count: u32,
    pub last_updated: u64,
}

impl PatternEntry {
    /// Compute boost score with time decay.
    fn boost(&self, now: u64, s: &LearningSettings) -> f64 {
        let raw = (f64::from(self.count) * s.boost_per_use).min(s.max_boost);
        raw * decay(self.last_updated, now, s.half_life_hours)
    }

    fn absorb(&mut self, other: &PatternEntry) {
        self.count = self.count.saturating_add(other.count);
        self.last_updated = self.last_updated.max(other.last_updated);
    }
}

/// One observed transition, as applied to the store and written to the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub revision: u64,
    /// Normalised context words, oldest first (1–2 words).
    pub context: Vec<String>,
    pub word: String,
    pub timestamp: u64,
}

/// Flat serialization format for bincode.
#[derive(Serialize, Deserialize)]
struct StoreData {
    revision: u64,
    patterns: Vec<PatternRecord>,
}

#[derive(Serialize, Deserialize)]
struct PatternRecord {
    context: Vec<String>,
    word: String,
    count: u32,
    last_updated: u64,
}

pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Exponential decay: 1.0 when fresh, 0.5 after one half-life.
fn decay(last_updated: u64, now: u64, half_life_hours: f64) -> f64 {
    let hours = now.saturating_sub(last_updated) as f64 / 3600.0;
    0.5f64.powf(hours / half_life_hours)
}

/// Every suffix of `context`, longest first.
fn suffixes(context: &Context) -> impl Iterator<Item = Vec<&str>> {
    (1..=context.len()).rev().map(move |n| context.suffix(n))
}

/// Last word of a two-word key; `None` for a single-word key.
fn tail(key: &str) -> Option<&str> {
    key.split_once(' ').map(|(_, last)| last)
}

impl Default for LearningStore {
    fn default() -> Self {
        Self::new(&Settings::default().learning)
    }
}

impl LearningStore {
    pub fn new(settings: &LearningSettings) -> Self {
        Self {
            patterns: HashMap::new(),
            by_tail: HashMap::new(),
            settings: settings.clone(),
            revision: 0,
            dirty: false,
        }
    }

    pub fn settings(&self) -> &LearningSettings {
        &self.settings
    }

    /// Number of distinct contexts stored.
    pub fn context_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of (context, word) pairs stored.
    pub fn pattern_count(&self) -> usize {
        self.patterns.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the store changed since the last snapshot was written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag if no mutation happened after `revision`.
    pub fn mark_clean(&mut self, revision: u64) {
        if self.revision == revision {
            self.dirty = false;
        }
    }

    /// Record that `word` followed `context`.
    pub fn record_transition(&mut self, context: &Context, word: &str) -> Option<TransitionRecord> {
        self.record_transition_at(context, word, now_epoch())
    }

    /// Record a transition at an explicit time. Returns the journal record, or
    /// `None` when the context is empty or `word` has no letters.
    pub fn record_transition_at(
        &mut self,
        context: &Context,
        word: &str,
        now: u64,
    ) -> Option<TransitionRecord> {
        let word = normalize_word(word);
        if word.is_empty() || context.is_empty() {
            return None;
        }
        let record = TransitionRecord {
            revision: self.revision + 1,
            context: context.words().iter().map(|w| w.to_string()).collect(),
            word,
            timestamp: now,
        };
        self.apply(&record);
        Some(record)
    }

    /// Apply a transition record (fresh or replayed from the journal).
    pub fn apply(&mut self, record: &TransitionRecord) {
        let context = Context::from_words(&record.context);
        let word = normalize_word(&record.word);
        if word.is_empty() || context.is_empty() {
            return;
        }

        let key = context_key(&context.words());
        self.index_key(&key);
        let entry = self
            .patterns
            .entry(key.clone())
            .or_default()
            .entry(word)
            .or_insert(PatternEntry {
                count: 0,
                last_updated: record.timestamp,
            });
        entry.count = entry.count.saturating_add(1);
        entry.last_updated = entry.last_updated.max(record.timestamp);

        self.revision = self.revision.max(record.revision);
        self.dirty = true;
        self.evict(record.timestamp, Some(&key));
    }

    fn index_key(&mut self, key: &str) {
        if let Some(last) = tail(key) {
            self.by_tail
                .entry(last.to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    fn remove_key(&mut self, key: &str) {
        self.patterns.remove(key);
        if let Some(last) = tail(key) {
            if let Some(keys) = self.by_tail.get_mut(last) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tail.remove(last);
                }
            }
        }
    }

    /// Rebuild the tail index after `patterns` was replaced wholesale.
    fn reindex(&mut self) {
        self.by_tail.clear();
        let keys: Vec<String> = self.patterns.keys().cloned().collect();
        for key in &keys {
            self.index_key(key);
        }
    }

    /// Stored tables visible for an exact context of one or two words.
    fn tables(&self, words: &[&str]) -> Vec<&HashMap<String, PatternEntry>> {
        let mut tables: Vec<_> = self.patterns.get(&context_key(words)).into_iter().collect();
        if let [last] = words {
            tables.extend(
                self.by_tail
                    .get(*last)
                    .into_iter()
                    .flatten()
                    .filter_map(|key| self.patterns.get(key)),
            );
        }
        tables
    }

    /// Combined entry for `word` after an exact context of one or two words.
    fn level_entry(&self, words: &[&str], word: &str) -> Option<PatternEntry> {
        self.tables(words)
            .into_iter()
            .filter_map(|t| t.get(word))
            .fold(None, |acc: Option<PatternEntry>, entry| match acc {
                Some(mut acc) => {
                    acc.absorb(entry);
                    Some(acc)
                }
                None => Some(entry.clone()),
            })
    }

    /// Decayed boost for `word` (normalised) after `context`; 0 when unseen.
    /// The longest context suffix holding the pair wins.
    pub fn boost(&self, context: &Context, word: &str, now: u64) -> f64 {
        suffixes(context)
            .find_map(|words| self.level_entry(&words, word))
            .map_or(0.0, |entry| entry.boost(now, &self.settings))
    }

    /// Learned successors of `context` with a non-zero boost, best first.
    pub fn successors(&self, context: &Context, now: u64) -> Vec<(String, f64)> {
        let mut seen: HashMap<&str, f64> = HashMap::new();
        for words in suffixes(context) {
            let mut level: HashMap<&str, PatternEntry> = HashMap::new();
            for table in self.tables(&words) {
                for (word, entry) in table {
                    match level.entry(word.as_str()) {
                        Entry::Occupied(mut slot) => slot.get_mut().absorb(entry),
                        Entry::Vacant(slot) => {
                            slot.insert(entry.clone());
                        }
                    }
                }
            }
            for (word, entry) in level {
                seen.entry(word)
                    .or_insert_with(|| entry.boost(now, &self.settings));
            }
        }
        let mut results: Vec<(String, f64)> = seen
            .into_iter()
            .filter(|(_, boost)| *boost > 0.0)
            .map(|(w, b)| (w.to_string(), b))
            .collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results
    }

    /// Entry for `word` after exactly `context`, including the two-word
    /// contexts a single-word context is a suffix of.
    pub fn entry(&self, context: &Context, word: &str) -> Option<PatternEntry> {
        if context.is_empty() {
            return None;
        }
        self.level_entry(&context.words(), word)
    }

    /// Stored (context key, word, entry) triples, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &PatternEntry)> {
        self.patterns.iter().flat_map(|(key, inner)| {
            inner
                .iter()
                .map(move |(word, entry)| (key.as_str(), word.as_str(), entry))
        })
    }

    /// Forget everything learned.
    pub fn clear(&mut self) {
        self.patterns.clear();
        self.by_tail.clear();
        self.revision += 1;
        self.dirty = true;
    }

    /// Evict whole contexts, least frequent and least recent first, until the
    /// store is within capacity. The `protected` key is never evicted.
    fn evict(&mut self, now: u64, protected: Option<&str>) {
        let cap = self.settings.capacity;
        if self.patterns.len() <= cap {
            return;
        }
        let half_life = self.settings.half_life_hours;
        let mut all: Vec<(String, f64, u64)> = self
            .patterns
            .iter()
            .filter(|(key, _)| protected != Some(key.as_str()))
            .map(|(key, inner)| {
                let total: u64 = inner.values().map(|e| u64::from(e.count)).sum();
                let last = inner.values().map(|e| e.last_updated).max().unwrap_or(0);
                (key.clone(), total as f64 * decay(last, now, half_life), last)
            })
            .collect();
        let to_remove = (self.patterns.len() - cap).min(all.len());
        if to_remove == 0 {
            return;
        }
        // Partial sort: the `to_remove` weakest contexts end up in all[..to_remove].
        all.select_nth_unstable_by(to_remove - 1, |a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.2.cmp(&b.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        for (key, _, _) in &all[..to_remove] {
            self.remove_key(key);
        }
        debug!(evicted = to_remove, remaining = self.patterns.len());
    }
}
