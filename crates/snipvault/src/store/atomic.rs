use super::backend::StorageBackend;
use super::retry::RetryPolicy;
use crate::error::{Result, SnipError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Store-wide FIFO queue for mutations.
///
/// `tokio::sync::Mutex` hands the lock to waiters in arrival order, which is
/// the ordering guarantee mutations rely on.
#[derive(Default)]
pub struct WriteQueue {
    slot: Mutex<()>,
}

/// Proof that the holder owns the write queue. Dropping it admits the next
/// waiter.
pub struct WriteTurn<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every earlier caller to finish, then returns the turn.
    pub async fn acquire(&self) -> WriteTurn<'_> {
        WriteTurn {
            _guard: self.slot.lock().await,
        }
    }
}

/// `<name>.json` → `<name>.json.tmp`, in the same directory.
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write-temp, verify, rename commit with retry.
pub struct AtomicWriter<B: StorageBackend> {
    backend: Arc<B>,
    retry: RetryPolicy,
}

impl<B: StorageBackend> AtomicWriter<B> {
    pub fn new(backend: Arc<B>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Replaces `target` with `bytes` so that readers see either the old or
    /// the new content, never a mix.
    ///
    /// The caller must hold the write queue. The temp file is removed on the
    /// way out whatever the outcome.
    pub async fn commit(&self, _turn: &WriteTurn<'_>, target: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = temp_path(target);
        let tmp_ref = tmp.as_path();

        let outcome = self
            .retry
            .run("commit", target, move || self.attempt(tmp_ref, target, bytes))
            .await;

        if let Err(e) = self.backend.remove(&tmp).await {
            tracing::debug!(path = %tmp.display(), error = %e, "could not remove temp file");
        }
        outcome
    }

    async fn attempt(&self, tmp: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
        self.backend.write(tmp, bytes).await?;

        let written = self.backend.read(tmp).await?;
        if written.as_deref() != Some(bytes) {
            return Err(SnipError::Verification {
                path: tmp.to_path_buf(),
            });
        }

        self.backend.rename(tmp, target).await?;
        Ok(())
    }
}
