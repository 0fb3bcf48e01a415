//! Backoff n-gram ranking over the static index.
//!
//! Candidates are looked up at the most specific level the context allows
//! (trigram → bigram → unigram). Each level's counts are normalised by the
//! level total and scaled by a per-level confidence multiplier, which keeps
//! scores from different levels comparable and lets callers tell a
//! unigram-only guess from a well-supported one.


use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::context::Context;
use crate::index::StaticIndex;
use crate::settings::NgramSettings;

/// N-gram order a candidate was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackoffLevel {
    Unigram,
    Bigram,
    Trigram,
}

impl BackoffLevel {
    /// Number of context words the level consumes.
    pub const fn context_len(self) -> usize {
        match self {
            Self::Trigram => 2,
            Self::Bigram => 1,
            Self::Unigram => 0,
        }
    }

    pub fn confidence(self, settings: &NgramSettings) -> f64 {
        match self {
            Self::Trigram => settings.trigram_confidence,
            Self::Bigram => settings.bigram_confidence,
            Self::Unigram => settings.unigram_confidence,
        }
    }

    /// Levels to try, most specific first, for a context of `available` words.
    pub fn cascade(available: usize, has_ngrams: bool) -> &'static [BackoffLevel] {
        match (has_ngrams, available) {
            (false, _) | (true, 0) => &[Self::Unigram],
            (true, 1) => &[Self::Bigram, Self::Unigram],
            (true, _) => &[Self::Trigram, Self::Bigram, Self::Unigram],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedWord {
    pub word: String,
    pub score: f64,
    pub level: BackoffLevel,
}

/// Result of [`NgramModel::rank`], best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub words: Vec<RankedWord>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Most specific level that contributed a candidate.
    /// `Some(Unigram)` means the context did not help at all.
    pub fn deepest_level(&self) -> Option<BackoffLevel> {
        self.words.iter().map(|w| w.level).max()
    }
}

/// Shared ordering for ranked words: score desc, then global frequency desc,
/// then lexicographic.
pub(crate) fn rank_order(a: (f64, u64, &str), b: (f64, u64, &str)) -> Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(b.2))
}

pub struct NgramModel {
    index: Arc<dyn StaticIndex>,
    settings: NgramSettings,
}

impl NgramModel {
    pub fn new(index: Arc<dyn StaticIndex>, settings: &NgramSettings) -> Self {
        Self {
            index,
            settings: settings.clone(),
        }
    }

    pub fn index(&self) -> &dyn StaticIndex {
        self.index.as_ref()
    }

    fn cascade(&self, context: &Context) -> &'static [BackoffLevel] {
        let has_ngrams = self.index.has_ngrams();
        if !has_ngrams && !context.is_empty() {
            debug!("no n-gram tables loaded, unigram-only ranking");
        }
        BackoffLevel::cascade(context.len(), has_ngrams)
    }

    /// Rank up to `limit` next-word candidates for `context`.
    pub fn rank(&self, context: &Context, limit: usize) -> Ranking {
        let _span = debug_span!("ngram_rank", context_len = context.len(), limit).entered();
        if limit == 0 {
            return Ranking::default();
        }

        let mut pool: HashMap<&str, (f64, BackoffLevel)> = HashMap::new();
        for &level in self.cascade(context) {
            let ctx = context.suffix(level.context_len());
            let Some(table) = self.index.ngram_table(&ctx) else {
                continue;
            };
            if table.total() == 0 {
                continue;
            }
            let total = table.total() as f64;
            let confidence = level.confidence(&self.settings);
            for (word, count) in table.entries().iter().take(limit) {
                let score = *count as f64 / total * confidence;
                let slot = pool.entry(word.as_str()).or_insert((score, level));
                if score > slot.0 {
                    *slot = (score, level);
                }
            }
            if pool.len() >= self.settings.min_matches {
                break;
            }
        }

        let mut words: Vec<(RankedWord, u64)> = pool
            .into_iter()
            .map(|(word, (score, level))| {
                let freq = self.index.frequency(word);
                (
                    RankedWord {
                        word: word.to_string(),
                        score,
                        level,
                    },
                    freq,
                )
            })
            .collect();
        words.sort_by(|(a, fa), (b, fb)| {
            rank_order((a.score, *fa, a.word.as_str()), (b.score, *fb, b.word.as_str()))
        });
        words.truncate(limit);

        debug!(candidates = words.len());
        Ranking {
            words: words.into_iter().map(|(w, _)| w).collect(),
        }
    }

    /// Best level score of a single word for `context` (0 when unseen).
    pub fn score(&self, context: &Context, word: &str) -> f64 {
        let mut best = 0.0f64;
        for &level in self.cascade(context) {
            let ctx = context.suffix(level.context_len());
            let Some(table) = self.index.ngram_table(&ctx) else {
                continue;
            };
            if table.total() == 0 {
                continue;
            }
            let count = match level {
                BackoffLevel::Unigram => self.index.frequency(word),
                BackoffLevel::Bigram | BackoffLevel::Trigram => table.count(word),
            };
            let score = count as f64 / table.total() as f64 * level.confidence(&self.settings);
            best = best.max(score);
        }
        best
    }
}
