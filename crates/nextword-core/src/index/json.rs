//! JSON word lists as produced by the dictionary tooling.
//!
//! - `unigrams.json`: `[{"w": "word", "f": 123}, ...]`
//! - `bigrams.json`: `{"w1": {"w2": 12}}`
//! - `trigrams.json`: `{"w1": {"w2": {"w3": 4}}}`

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IndexBuilder, IndexError, MemoryIndex};

pub const UNIGRAMS_FILE: &str = "unigrams.json";
pub const BIGRAMS_FILE: &str = "bigrams.json";
pub const TRIGRAMS_FILE: &str = "trigrams.json";

#[derive(Serialize, Deserialize)]
struct UnigramRecord {
    w: String,
    f: u64,
}

type BigramJson = BTreeMap<String, BTreeMap<String, u64>>;
type TrigramJson = BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>;

impl IndexBuilder {
    /// Merge JSON word lists into the builder. Bigram and trigram documents
    /// are optional.
    pub fn add_json(
        &mut self,
        unigrams: &str,
        bigrams: Option<&str>,
        trigrams: Option<&str>,
    ) -> Result<&mut Self, IndexError> {
        let records: Vec<UnigramRecord> = serde_json::from_str(unigrams)?;
        for rec in records {
            if rec.w.trim().is_empty() {
                return Err(IndexError::InvalidEntry(format!(
                    "empty word with frequency {}",
                    rec.f
                )));
            }
            self.add_unigram(&rec.w, rec.f);
        }

        if let Some(raw) = bigrams {
            let doc: BigramJson = serde_json::from_str(raw)?;
            for (w1, inner) in &doc {
                for (w2, f) in inner {
                    self.add_bigram(w1, w2, *f);
                }
            }
        }

        if let Some(raw) = trigrams {
            let doc: TrigramJson = serde_json::from_str(raw)?;
            for (w1, mid) in &doc {
                for (w2, inner) in mid {
                    for (w3, f) in inner {
                        self.add_trigram(w1, w2, w3, *f);
                    }
                }
            }
        }

        Ok(self)
    }

    /// Write the three JSON documents into `dir`, creating it if needed.
    pub fn write_json_dir(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;

        let mut unigrams: Vec<UnigramRecord> = self
            .unigrams
            .iter()
            .map(|(w, f)| UnigramRecord {
                w: w.clone(),
                f: *f,
            })
            .collect();
        unigrams.sort_by(|a, b| b.f.cmp(&a.f).then_with(|| a.w.cmp(&b.w)));

        let bigrams: BigramJson = self
            .bigrams
            .iter()
            .map(|(w1, inner)| (w1.clone(), inner.clone().into_iter().collect()))
            .collect();

        let mut trigrams: TrigramJson = BTreeMap::new();
        for ((w1, w2), inner) in &self.trigrams {
            trigrams
                .entry(w1.clone())
                .or_default()
                .insert(w2.clone(), inner.clone().into_iter().collect());
        }

        write_pretty(&dir.join(UNIGRAMS_FILE), &unigrams)?;
        write_pretty(&dir.join(BIGRAMS_FILE), &bigrams)?;
        write_pretty(&dir.join(TRIGRAMS_FILE), &trigrams)?;
        Ok(())
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexError> {
    let body = serde_json::to_vec_pretty(value)?;
    fs::write(path, body)?;
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<String>, IndexError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl IndexBuilder {
    /// Read a word-list directory as written by
    /// [`write_json_dir`](Self::write_json_dir), or a single unigram list file.
    pub fn load_json_path(path: &Path) -> Result<Self, IndexError> {
        let mut builder = IndexBuilder::new();
        if path.is_dir() {
            let unigrams = fs::read_to_string(path.join(UNIGRAMS_FILE))?;
            let bigrams = read_optional(&path.join(BIGRAMS_FILE))?;
            let trigrams = read_optional(&path.join(TRIGRAMS_FILE))?;
            if bigrams.is_none() && trigrams.is_none() {
                debug!(dir = %path.display(), "no n-gram files, unigram-only index");
            }
            builder.add_json(&unigrams, bigrams.as_deref(), trigrams.as_deref())?;
        } else {
            builder.add_json(&fs::read_to_string(path)?, None, None)?;
        }
        Ok(builder)
    }
}

impl MemoryIndex {
    /// Load an index from a directory holding `unigrams.json` and, optionally,
    /// `bigrams.json` / `trigrams.json`. Missing n-gram files leave the index
    /// in unigram-only mode.
    pub fn load_dir(dir: &Path) -> Result<Self, IndexError> {
        Ok(IndexBuilder::load_json_path(dir)?.build())
    }
}
