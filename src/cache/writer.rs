//! Serialized write path into the cache.
//!
//! Scan workers never touch the database directly. They hand finished
//! batches to a [`CacheWriter`], whose single thread commits one
//! transaction per batch in submission order.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::database::{CacheError, CacheResult, CacheStore};
use super::entry::Entry;

/// Counters reported when the writer shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Batches received.
    pub batches: usize,
    /// Rows committed.
    pub rows_written: usize,
    /// Batches whose transaction failed.
    pub failed_batches: usize,
}

/// Handle to the dedicated writer thread.
#[derive(Debug)]
pub struct CacheWriter {
    sender: Option<Sender<Vec<Entry>>>,
    handle: Option<JoinHandle<WriterStats>>,
}

impl CacheWriter {
    /// Start a writer thread committing into `store`.
    pub fn spawn(store: Arc<CacheStore>) -> CacheResult<Self> {
        let (sender, receiver) = mpsc::channel::<Vec<Entry>>();

        let handle = std::thread::Builder::new()
            .name("nascatalog-writer".to_string())
            .spawn(move || {
                let mut stats = WriterStats::default();
                for batch in receiver {
                    stats.batches += 1;
                    match store.upsert(&batch) {
                        Ok(n) => stats.rows_written += n,
                        Err(e) => {
                            stats.failed_batches += 1;
                            log::error!("Cache write of {} rows failed: {}", batch.len(), e);
                        }
                    }
                }
                log::debug!(
                    "Cache writer finished: {} batches, {} rows",
                    stats.batches,
                    stats.rows_written
                );
                stats
            })
            .map_err(|source| CacheError::Io {
                path: std::path::PathBuf::from("<writer thread>"),
                source,
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a batch for writing. Empty batches are dropped.
    pub fn submit(&self, batch: Vec<Entry>) -> CacheResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let sender = self.sender.as_ref().ok_or(CacheError::WriterClosed)?;
        sender.send(batch).map_err(|_| CacheError::WriterClosed)
    }

    /// Close the queue and wait until every submitted batch is committed.
    pub fn finish(mut self) -> CacheResult<WriterStats> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| CacheError::WriterClosed),
            None => Err(CacheError::WriterClosed),
        }
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
