//! Background persistence for the learning store.
//!
//! The keystroke path only updates the in-memory store and hands journal
//! records to this worker. The worker appends them to the journal, writes
//! a snapshot when the journal grows too long or a checkpoint is requested,
//! and flushes once more on shutdown.

use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use nextword_core::settings::LearningSettings;
use nextword_core::user_history::wal::{open_with_wal, TransitionWal};
use nextword_core::user_history::{LearningStore, TransitionRecord};
use tracing::{debug, warn};

enum Command {
    Journal(TransitionRecord),
    Checkpoint,
    Clear,
    Shutdown,
}

/// Owns the persistence thread for one learning store. Dropping it flushes
/// pending work and joins the thread.
pub struct LearningPersistence {
    tx: mpsc::Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl LearningPersistence {
    /// Load the store at `path` (snapshot plus journal) and start the worker.
    pub fn open(
        path: &Path,
        settings: &LearningSettings,
    ) -> io::Result<(Arc<RwLock<LearningStore>>, Self)> {
        let (store, wal) = open_with_wal(path, settings);
        debug!(
            path = %path.display(),
            contexts = store.context_count(),
            "learning store opened"
        );
        let store = Arc::new(RwLock::new(store));
        let persistence = Self::spawn(Arc::clone(&store), wal)?;
        Ok((store, persistence))
    }

    pub fn spawn(store: Arc<RwLock<LearningStore>>, wal: TransitionWal) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let handle = thread::Builder::new()
            .name("nextword-persist".into())
            .spawn(move || persist_worker(rx, store, wal))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn journal(&self, record: TransitionRecord) {
        self.send(Command::Journal(record));
    }

    /// Request a snapshot if the store changed since the last one.
    pub fn checkpoint(&self) {
        self.send(Command::Checkpoint);
    }

    /// The in-memory store was cleared; drop the journal and persist the
    /// empty snapshot.
    pub fn clear(&self) {
        self.send(Command::Clear);
    }

    fn send(&self, cmd: Command) {
        if self.tx.send(cmd).is_err() {
            warn!("persistence worker is gone, dropping request");
        }
    }
}

impl Drop for LearningPersistence {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("persistence worker panicked");
            }
        }
    }
}

fn persist_worker(
    rx: mpsc::Receiver<Command>,
    store: Arc<RwLock<LearningStore>>,
    mut wal: TransitionWal,
) {
    while let Ok(cmd) = rx.recv() {
        // Batch every journal record already queued behind this one.
        let mut batch = Vec::new();
        let mut next = Some(cmd);
        let mut control = None;
        while let Some(cmd) = next.take() {
            match cmd {
                Command::Journal(record) => batch.push(record),
                other => {
                    control = Some(other);
                    break;
                }
            }
            next = rx.try_recv().ok();
        }

        if !batch.is_empty() {
            if let Err(e) = wal.append_batch(&batch) {
                warn!(error = %e, entries = batch.len(), "journal append failed");
            }
        }

        match control {
            None => {
                if wal.needs_compact() {
                    checkpoint(&store, &mut wal, false);
                }
            }
            Some(Command::Checkpoint) => checkpoint(&store, &mut wal, false),
            Some(Command::Clear) => checkpoint(&store, &mut wal, true),
            Some(Command::Shutdown) => {
                checkpoint(&store, &mut wal, false);
                break;
            }
            Some(Command::Journal(_)) => unreachable!("journal records are batched above"),
        }
    }
    debug!("persistence worker stopped");
}

/// Write a snapshot and truncate the journal. Skipped when nothing changed
/// unless `force` is set.
fn checkpoint(store: &RwLock<LearningStore>, wal: &mut TransitionWal, force: bool) {
    // Serialize a copy so the keystroke path is not blocked on disk I/O.
    let snapshot = match store.read() {
        Ok(s) if force || s.is_dirty() || wal.entry_count() > 0 => s.clone(),
        Ok(_) => return,
        Err(_) => {
            warn!("learning store lock poisoned, skipping checkpoint");
            return;
        }
    };
    let revision = snapshot.revision();
    match wal.checkpoint(&snapshot) {
        Ok(()) => {
            if let Ok(mut s) = store.write() {
                s.mark_clean(revision);
            }
            debug!(revision, contexts = snapshot.context_count(), "learning snapshot written");
        }
        Err(e) => warn!(error = %e, path = %wal.checkpoint_path().display(), "learning snapshot failed"),
    }
}
