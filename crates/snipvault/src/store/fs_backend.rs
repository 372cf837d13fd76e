use super::backend::StorageBackend;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;

/// Filesystem backend built on `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct FsBackend;

impl FsBackend {
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !fs::try_exists(parent).await? {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        if !fs::try_exists(path).await? {
            return Ok(None);
        }
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            // Removed between the existence check and the read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.ensure_parent(path).await?;
        fs::write(path, bytes).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
