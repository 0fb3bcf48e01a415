use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::context::MAX_CONTEXT_WORDS;
use crate::settings::LearningSettings;

use super::{LearningStore, PatternEntry, PatternRecord, StoreData, MAGIC, VERSION};

impl LearningStore {
    /// Serialize to bytes (NWLS format).
    pub fn to_bytes(&self) -> Result<Vec<u8>, io::Error> {
        let data = self.to_data();
        let body = bincode::serialize(&data).map_err(io::Error::other)?;

        let mut buf = Vec::with_capacity(5 + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize from bytes (NWLS format).
    pub fn from_bytes(bytes: &[u8], settings: &LearningSettings) -> Result<Self, io::Error> {
        if bytes.len() < 5 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "too short"));
        }
        if &bytes[0..4] != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad magic"));
        }
        if bytes[4] != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "unsupported version",
            ));
        }
        let data: StoreData = bincode::deserialize(&bytes[5..])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self::from_data(data, settings))
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), io::Error> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Open from file, returning an empty store if the file doesn't exist.
    pub fn open(path: &Path, settings: &LearningSettings) -> Result<Self, io::Error> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes, settings),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new(settings)),
            Err(e) => Err(e),
        }
    }

    /// Like [`open`](Self::open), but an unreadable or corrupt snapshot
    /// yields an empty store instead of an error.
    pub fn open_or_reset(path: &Path, settings: &LearningSettings) -> Self {
        match Self::open(path, settings) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "learning snapshot unreadable, starting empty");
                Self::new(settings)
            }
        }
    }

    fn to_data(&self) -> StoreData {
        let mut patterns = Vec::with_capacity(self.pattern_count());
        for (key, inner) in &self.patterns {
            for (word, entry) in inner {
                patterns.push(PatternRecord {
                    context: key.split(' ').map(str::to_string).collect(),
                    word: word.clone(),
                    count: entry.count,
                    last_updated: entry.last_updated,
                });
            }
        }
        StoreData {
            revision: self.revision,
            patterns,
        }
    }

    fn from_data(data: StoreData, settings: &LearningSettings) -> Self {
        let mut patterns: HashMap<String, HashMap<String, PatternEntry>> = HashMap::new();
        for rec in data.patterns {
            if rec.context.is_empty()
                || rec.context.len() > MAX_CONTEXT_WORDS
                || rec.word.is_empty()
                || rec.count == 0
            {
                continue;
            }
            patterns.entry(rec.context.join(" ")).or_default().insert(
                rec.word,
                PatternEntry {
                    count: rec.count,
                    last_updated: rec.last_updated,
                },
            );
        }

        let mut store = Self::new(settings);
        store.patterns = patterns;
        store.reindex();
        store.revision = data.revision;
        // A smaller capacity may have been configured since the snapshot was written.
        store.evict(super::now_epoch(), None);
        store.dirty = false;
        store
    }
}
