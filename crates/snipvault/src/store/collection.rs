use super::atomic::{AtomicWriter, WriteTurn};
use super::backend::StorageBackend;
use super::cache::TtlCache;
use super::reader::CoalescingReader;
use super::retry::RetryPolicy;
use crate::error::Result;
use crate::model::Record;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One JSON file: its cache, its reader, and the shared writer.
pub struct Collection<T: Record, B: StorageBackend> {
    path: PathBuf,
    cache: TtlCache<T>,
    reader: CoalescingReader<T, B>,
    writer: Arc<AtomicWriter<B>>,
    commits: AtomicU64,
    skipped_writes: AtomicU64,
}

impl<T: Record, B: StorageBackend> Collection<T, B> {
    pub fn new(
        backend: Arc<B>,
        writer: Arc<AtomicWriter<B>>,
        path: PathBuf,
        ttl: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reader: CoalescingReader::new(backend, path.clone(), retry),
            cache: TtlCache::new(ttl),
            path,
            writer,
            commits: AtomicU64::new(0),
            skipped_writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot: from cache while fresh, otherwise from disk.
    ///
    /// When the disk read fails for good and an older snapshot is known, that
    /// snapshot is returned instead of the error.
    pub async fn load(&self) -> Result<Arc<Vec<T>>> {
        if let Some(hit) = self.cache.fresh() {
            tracing::trace!(kind = T::KIND, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(kind = T::KIND, path = %self.path.display(), "cache miss");
        let generation = self.cache.generation();
        match self.reader.read().await {
            Ok(records) => {
                if self.cache.fill(generation, records.clone()) {
                    Ok(records)
                } else {
                    // A commit landed while we were reading; prefer it.
                    Ok(self.cache.fresh().unwrap_or(records))
                }
            }
            Err(err) => match self.cache.last_known() {
                Some(stale) => {
                    tracing::warn!(
                        kind = T::KIND,
                        path = %self.path.display(),
                        error = %err,
                        "read failed, serving last known snapshot"
                    );
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    /// Persists the full snapshot and makes it the cached value.
    pub async fn commit(&self, turn: &WriteTurn<'_>, records: Vec<T>) -> Result<Arc<Vec<T>>> {
        let bytes = serde_json::to_vec_pretty(&records)?;
        self.writer.commit(turn, &self.path, &bytes).await?;

        let records = Arc::new(records);
        self.cache.replace(records.clone());
        self.reader.invalidate();
        self.commits.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            kind = T::KIND,
            path = %self.path.display(),
            count = records.len(),
            "committed collection"
        );
        Ok(records)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
        self.reader.invalidate();
    }

    pub(crate) fn note_skipped_write(&self) {
        self.skipped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn disk_reads(&self) -> u64 {
        self.reader.reads_started()
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn skipped_writes(&self) -> u64 {
        self.skipped_writes.load(Ordering::Relaxed)
    }
}
