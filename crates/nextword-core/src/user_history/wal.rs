//! Write-ahead journal for learning store persistence.
//!
//! Each recorded transition appends a small CRC-checked frame instead of
//! re-serializing the whole store. A periodic checkpoint writes the full
//! snapshot and truncates the journal.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::settings::LearningSettings;

use super::{LearningStore, TransitionRecord};

const COMPACT_THRESHOLD: usize = 1000;
const FRAME_HEADER: usize = 8;

/// Journal that lives alongside a snapshot file.
pub struct TransitionWal {
    /// Path to the snapshot file (`learning.nwls`).
    checkpoint_path: PathBuf,
    /// Path to the journal file (`learning.nwls.wal`).
    wal_path: PathBuf,
    /// Kept open in append mode to avoid repeated open/close per entry.
    file: Option<File>,
    /// Number of entries in the current journal (since last compaction).
    entry_count: usize,
}

fn read_u32(data: &[u8], pos: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(pos..pos + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

fn encode_frame(record: &TransitionRecord, buf: &mut Vec<u8>) -> io::Result<()> {
    let payload = bincode::serialize(record).map_err(io::Error::other)?;
    let length = u32::try_from(payload.len()).map_err(io::Error::other)?;
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(())
}

impl TransitionWal {
    /// Create a journal handle for the given snapshot path.
    pub fn new(checkpoint_path: &Path) -> Self {
        let mut name: OsString = checkpoint_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".wal");
        Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            wal_path: checkpoint_path.with_file_name(name),
            file: None,
            entry_count: 0,
        }
    }

    /// Replay the journal into `store`. Records already covered by the
    /// snapshot (revision not newer than the store's) are skipped. Reading
    /// stops at the first truncated or corrupt frame.
    /// Returns the number of entries applied.
    pub fn replay(&mut self, store: &mut LearningStore) -> io::Result<usize> {
        let data = match fs::read(&self.wal_path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.entry_count = 0;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut frames = 0;
        let mut applied = 0;
        let mut pos = 0;
        while let (Some(length), Some(expected_crc)) =
            (read_u32(&data, pos), read_u32(&data, pos + 4))
        {
            let length = length as usize;
            let start = pos + FRAME_HEADER;
            let Some(payload) = data.get(start..start + length).filter(|_| length > 0) else {
                warn!(offset = pos, "truncated journal frame, stopping replay");
                break;
            };
            if crc32fast::hash(payload) != expected_crc {
                warn!(offset = pos, "journal frame checksum mismatch, stopping replay");
                break;
            }
            let Ok(record) = bincode::deserialize::<TransitionRecord>(payload) else {
                warn!(offset = pos, "undecodable journal frame, stopping replay");
                break;
            };

            if record.revision > store.revision() {
                store.apply(&record);
                applied += 1;
            }
            frames += 1;
            pos = start + length;
        }

        self.entry_count = frames;
        debug!(frames, applied, "journal replayed");
        Ok(applied)
    }

    /// Append one record to the journal.
    pub fn append(&mut self, record: &TransitionRecord) -> io::Result<()> {
        self.append_batch(std::slice::from_ref(record))
    }

    /// Append several records with a single write.
    pub fn append_batch(&mut self, records: &[TransitionRecord]) -> io::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for record in records {
            encode_frame(record, &mut buf)?;
        }
        let file = self.open_file()?;
        file.write_all(&buf)?;
        file.flush()?;
        self.entry_count += records.len();
        Ok(())
    }

    /// Get or lazily open the journal file handle.
    fn open_file(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(f) => f,
            None => {
                if let Some(parent) = self.wal_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.wal_path)?
            }
        };
        Ok(self.file.insert(file))
    }

    /// Whether the journal has reached the compaction threshold.
    pub fn needs_compact(&self) -> bool {
        self.entry_count >= COMPACT_THRESHOLD
    }

    /// Truncate the journal and reset the entry count.
    /// Call after a snapshot has been written.
    pub fn truncate_wal(&mut self) -> io::Result<()> {
        self.file = None;
        if let Some(parent) = self.wal_path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(&self.wal_path)?;
        self.entry_count = 0;
        Ok(())
    }

    /// Write a snapshot of `store` and truncate the journal.
    pub fn checkpoint(&mut self, store: &LearningStore) -> io::Result<()> {
        store.save(&self.checkpoint_path)?;
        self.truncate_wal()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }
}

/// Open snapshot + replay journal in one call. Never fails: an unreadable
/// snapshot or journal degrades to whatever could be recovered.
pub fn open_with_wal(checkpoint_path: &Path, settings: &LearningSettings) -> (LearningStore, TransitionWal) {
    let mut store = LearningStore::open_or_reset(checkpoint_path, settings);
    let mut wal = TransitionWal::new(checkpoint_path);
    if let Err(e) = wal.replay(&mut store) {
        warn!(path = %wal.wal_path().display(), error = %e, "journal unreadable, ignoring");
    }
    (store, wal)
}
