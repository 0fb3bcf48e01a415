//! Combining word lists from several sources into one builder.

use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

use tracing::debug;

use super::{IndexBuilder, IndexError};

/// How the frequencies of an item present in more than one source are
/// combined. Items found in a single source keep their frequency.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeStrategy {
    Max,
    Sum,
    /// Integer mean over the sources holding the item.
    Avg,
    /// Weighted sum, one weight per source in input order. An empty list
    /// gives the first source holding the item 0.6 and splits 0.4 over the
    /// rest.
    Weighted(Vec<f64>),
}

impl FromStr for MergeStrategy {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "weighted" => Ok(Self::Weighted(Vec::new())),
            other => Err(IndexError::InvalidEntry(format!(
                "unknown merge strategy {other:?} (expected max, sum, avg or weighted)"
            ))),
        }
    }
}

impl MergeStrategy {
    /// `counts` holds (source position, frequency) in source order.
    fn combine(&self, counts: &[(usize, u64)]) -> u64 {
        if let [(_, only)] = counts {
            return *only;
        }
        match self {
            Self::Max => counts.iter().map(|&(_, f)| f).max().unwrap_or(0),
            Self::Sum => counts.iter().fold(0u64, |acc, &(_, f)| acc.saturating_add(f)),
            Self::Avg => {
                let sum: u128 = counts.iter().map(|&(_, f)| u128::from(f)).sum();
                (sum / counts.len() as u128) as u64
            }
            Self::Weighted(weights) if weights.is_empty() => {
                let rest = 0.4 / (counts.len() - 1) as f64;
                counts
                    .iter()
                    .enumerate()
                    .map(|(i, &(_, f))| f as f64 * if i == 0 { 0.6 } else { rest })
                    .sum::<f64>() as u64
            }
            Self::Weighted(weights) => counts
                .iter()
                .map(|&(src, f)| f as f64 * weights.get(src).copied().unwrap_or(0.0))
                .sum::<f64>() as u64,
        }
    }

    fn check(&self, sources: usize) -> Result<(), IndexError> {
        let Self::Weighted(weights) = self else {
            return Ok(());
        };
        if !weights.is_empty() && weights.len() != sources {
            return Err(IndexError::InvalidEntry(format!(
                "{} weights given for {sources} sources",
                weights.len()
            )));
        }
        if weights.iter().any(|w| !(*w >= 0.0)) {
            return Err(IndexError::InvalidEntry(
                "merge weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

type Grouped<K> = HashMap<K, Vec<(usize, u64)>>;

/// Combine every group and keep those reaching `min_freq`.
fn settle<'a, K: Eq + Hash + 'a>(
    grouped: Grouped<K>,
    strategy: &'a MergeStrategy,
    min_freq: u64,
) -> impl Iterator<Item = (K, u64)> + 'a {
    let floor = min_freq.max(1);
    grouped
        .into_iter()
        .map(move |(key, counts)| (key, strategy.combine(&counts)))
        .filter(move |(_, f)| *f >= floor)
}

impl IndexBuilder {
    /// Merge several builders level by level (words, bigrams, trigrams) and
    /// drop every merged item below `min_freq`.
    pub fn merge(
        sources: &[IndexBuilder],
        strategy: &MergeStrategy,
        min_freq: u64,
    ) -> Result<IndexBuilder, IndexError> {
        strategy.check(sources.len())?;

        let mut unigrams: Grouped<String> = HashMap::new();
        let mut bigrams: Grouped<(String, String)> = HashMap::new();
        let mut trigrams: Grouped<(String, String, String)> = HashMap::new();
        for (src, builder) in sources.iter().enumerate() {
            for (w, f) in &builder.unigrams {
                unigrams.entry(w.clone()).or_default().push((src, *f));
            }
            for (w1, inner) in &builder.bigrams {
                for (w2, f) in inner {
                    bigrams
                        .entry((w1.clone(), w2.clone()))
                        .or_default()
                        .push((src, *f));
                }
            }
            for ((w1, w2), inner) in &builder.trigrams {
                for (w3, f) in inner {
                    trigrams
                        .entry((w1.clone(), w2.clone(), w3.clone()))
                        .or_default()
                        .push((src, *f));
                }
            }
        }

        let duplicates = unigrams.values().filter(|c| c.len() > 1).count();
        let mut out = IndexBuilder::new();
        out.unigrams.extend(settle(unigrams, strategy, min_freq));
        for ((w1, w2), f) in settle(bigrams, strategy, min_freq) {
            out.bigrams.entry(w1).or_default().insert(w2, f);
        }
        for ((w1, w2, w3), f) in settle(trigrams, strategy, min_freq) {
            out.trigrams.entry((w1, w2)).or_default().insert(w3, f);
        }
        debug!(
            sources = sources.len(),
            duplicates,
            words = out.unigrams.len(),
            ?strategy,
            "word lists merged"
        );
        Ok(out)
    }
}
