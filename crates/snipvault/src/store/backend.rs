use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Abstract interface for raw byte I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// the writer, reader and repositories handle the "what" (atomicity, retry,
/// caching, domain rules).
///
/// Errors are plain `io::Error`s; the retry layer decides which failures to
/// retry.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Read a whole file.
    /// Returns Ok(None) if the file does not exist.
    /// Returns Err only on actual I/O errors (permissions, disk failure).
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Create or truncate `path` and write `bytes` to it, creating parent
    /// directories as needed. Not atomic on its own.
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Atomically replace `to` with `from`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file. Removing a missing file is not an error.
    async fn remove(&self, path: &Path) -> io::Result<()>;
}
