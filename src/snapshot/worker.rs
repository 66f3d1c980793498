//! Snapshot Worker
//!
//! Single background thread that refreshes the snapshot after mutations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::collection::Catalog;
use crate::error::Result;

use super::SnapshotStore;

/// Counters shared between the worker thread and its handle
#[derive(Debug, Default)]
struct WorkerStats {
    saves_completed: AtomicU64,
    saves_failed: AtomicU64,
}

/// Background snapshot refresher
///
/// ## Coalescing
/// The request queue holds one message. A request that finds it full is
/// dropped: the pending request has not been picked up yet, so the save it
/// triggers will export state that already includes the new mutation.
pub struct SnapshotWorker {
    sender: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl SnapshotWorker {
    /// Start the worker thread
    pub fn spawn(store: Arc<SnapshotStore>, catalog: Arc<Catalog>) -> Result<Self> {
        let (sender, receiver) = channel::bounded(1);
        let stats = Arc::new(WorkerStats::default());
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("helixdb-snapshot".to_string())
            .spawn(move || Self::run(receiver, store, catalog, thread_stats))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            stats,
        })
    }

    /// Ask for a snapshot refresh without blocking
    ///
    /// Returns `false` when the request was coalesced into a pending one, or
    /// when the worker has been shut down.
    pub fn request(&self) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Disconnected(())) => {
                tracing::warn!("Snapshot worker is gone, dropping request");
                false
            }
        }
    }

    /// Stop accepting requests, finish any pending save, and join the thread
    pub fn shutdown(&mut self) {
        // Closing the channel ends the worker loop once the queue is drained
        self.sender.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Snapshot worker panicked");
            }
        }
    }

    /// Saves written successfully so far
    pub fn saves_completed(&self) -> u64 {
        self.stats.saves_completed.load(Ordering::SeqCst)
    }

    /// Saves that failed so far
    pub fn saves_failed(&self) -> u64 {
        self.stats.saves_failed.load(Ordering::SeqCst)
    }

    fn run(
        receiver: Receiver<()>,
        store: Arc<SnapshotStore>,
        catalog: Arc<Catalog>,
        stats: Arc<WorkerStats>,
    ) {
        tracing::debug!("Snapshot worker started for {}", store.path().display());

        while receiver.recv().is_ok() {
            match store.capture(&catalog) {
                Ok(documents) => {
                    stats.saves_completed.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!("Snapshot saved ({} documents)", documents);
                }
                Err(e) => {
                    // Non-fatal: the WAL still holds every acknowledged write
                    stats.saves_failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!("Snapshot save failed: {}", e);
                }
            }
        }

        tracing::debug!("Snapshot worker stopped");
    }
}

impl Drop for SnapshotWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
