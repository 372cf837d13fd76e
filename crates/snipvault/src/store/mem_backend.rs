use super::backend::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Default)]
struct Counters {
    reads: HashMap<PathBuf, u32>,
    writes: HashMap<PathBuf, u32>,
}

/// In-memory storage backend for testing.
///
/// Every operation yields to the scheduler once before touching state, so
/// overlapping calls interleave the way real file I/O would. Failures can be
/// injected per operation kind, and reads/writes are counted per path.
/// [`MemBackend::hold_reads`] parks every read until the returned guard drops.
pub struct MemBackend {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    read_gate: Arc<RwLock<()>>,
    counters: Mutex<Counters>,
    fail_reads: AtomicU32,
    fail_writes: AtomicU32,
    fail_renames: AtomicU32,
    corrupt_writes: AtomicU32,
    simulate_write_error: AtomicBool,
}

impl Default for MemBackend {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            read_gate: Arc::new(RwLock::new(())),
            counters: Mutex::new(Counters::default()),
            fail_reads: AtomicU32::new(0),
            fail_writes: AtomicU32::new(0),
            fail_renames: AtomicU32::new(0),
            corrupt_writes: AtomicU32::new(0),
            simulate_write_error: AtomicBool::new(false),
        }
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn injected(op: &str, path: &Path) -> io::Error {
    io::Error::other(format!("simulated {} failure on {}", op, path.display()))
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write and rename fail until switched off.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Fail the next `n` reads.
    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` writes.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` renames.
    pub fn fail_next_renames(&self, n: u32) {
        self.fail_renames.store(n, Ordering::SeqCst);
    }

    /// Silently store truncated bytes for the next `n` writes.
    pub fn corrupt_next_writes(&self, n: u32) {
        self.corrupt_writes.store(n, Ordering::SeqCst);
    }

    /// Keep reads pending until the guard is dropped.
    pub async fn hold_reads(&self) -> OwnedRwLockWriteGuard<()> {
        self.read_gate.clone().write_owned().await
    }

    /// Seed a file directly, bypassing counters and fault injection.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), bytes.into());
    }

    /// Current bytes stored at `path`.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.contents(path).is_some()
    }

    /// Number of `read` calls issued for `path`.
    pub fn read_count(&self, path: &Path) -> u32 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.reads.get(path).copied().unwrap_or(0)
    }

    /// Number of times `path` was replaced, by `write` or as a rename target.
    pub fn write_count(&self, path: &Path) -> u32 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.writes.get(path).copied().unwrap_or(0)
    }

    fn count_read(&self, path: &Path) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.reads.entry(path.to_path_buf()).or_default() += 1;
    }

    fn count_write(&self, path: &Path) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.writes.entry(path.to_path_buf()).or_default() += 1;
    }
}

#[async_trait]
impl StorageBackend for MemBackend {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        tokio::task::yield_now().await;
        let _open = self.read_gate.read().await;
        self.count_read(path);
        if take_one(&self.fail_reads) {
            return Err(injected("read", path));
        }
        Ok(self.contents(path))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::task::yield_now().await;
        if self.simulate_write_error.load(Ordering::SeqCst) || take_one(&self.fail_writes) {
            return Err(injected("write", path));
        }
        let stored = if take_one(&self.corrupt_writes) {
            bytes[..bytes.len() / 2].to_vec()
        } else {
            bytes.to_vec()
        };
        self.count_write(path);
        self.insert(path, stored);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::task::yield_now().await;
        if self.simulate_write_error.load(Ordering::SeqCst) || take_one(&self.fail_renames) {
            return Err(injected("rename", to));
        }
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        let bytes = files.remove(from).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", from.display()))
        })?;
        files.insert(to.to_path_buf(), bytes);
        drop(files);
        self.count_write(to);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::task::yield_now().await;
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        Ok(())
    }
}
