//! # API Facade
//!
//! [`SnipStore`] is the single entry point for every collaborator: tree
//! views and webviews render from it, the sync layer reads snapshots from it
//! and writes changes back through it.
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Owns** all state: caches, the write queue and the backend. Two stores
//!   never share anything, and dropping a store drops its cache.
//! - **Dispatches** to [`SnippetRepository`] and [`DirectoryRepository`].
//! - **Returns structured types** (`Result<...>`), never strings.
//!
//! ## What the API Does NOT Do
//!
//! - **Search, filtering, sorting**: callers sort by `order` themselves.
//! - **User-facing reporting**: errors are returned, not printed.
//!
//! ## Generic Over StorageBackend
//!
//! `SnipStore<B: StorageBackend>`:
//! - Production: `SnipStore<FsBackend>` via [`SnipStore::open`]
//! - Testing: `SnipStore<MemBackend>` (see `store::memory`)

use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::{ConflictPolicy, Directory, Snippet};
use crate::repo::directories::{DeleteReport, DirectoryRepository};
use crate::repo::doctor::{self, DoctorReport};
use crate::repo::snippets::SnippetRepository;
use crate::repo::{SaveOutcome, StoreState};
use crate::store::atomic::AtomicWriter;
use crate::store::fs_backend::FsBackend;
use crate::store::{Collection, StorageBackend, StoreStats, WriteQueue};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The persistent collection store.
pub struct SnipStore<B: StorageBackend = FsBackend> {
    state: StoreState<B>,
    config: StoreConfig,
}

impl SnipStore<FsBackend> {
    /// Opens the store on the filesystem, running the doctor pass first when
    /// `repair_on_open` is set.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let store = Self::with_backend(FsBackend::new(), config)?;
        tracing::info!(
            snippets = %store.snippets_path().display(),
            directories = %store.directories_path().display(),
            "opened snippet store"
        );
        if store.config.repair_on_open {
            store.doctor().await?;
        }
        Ok(store)
    }
}

impl<B: StorageBackend> SnipStore<B> {
    /// Builds a store over `backend`. Does not touch storage.
    pub fn with_backend(backend: B, config: StoreConfig) -> Result<Self> {
        let snippets = config.snippets_path()?;
        let directories = config.directories_path()?;
        Ok(Self::assemble(backend, config, snippets, directories))
    }

    pub(crate) fn assemble(
        backend: B,
        config: StoreConfig,
        snippets_path: PathBuf,
        directories_path: PathBuf,
    ) -> Self {
        let backend = Arc::new(backend);
        let retry = config.retry_policy();
        let ttl = config.cache_ttl();
        let writer = Arc::new(AtomicWriter::new(backend.clone(), retry));

        let snippets = Collection::new(backend.clone(), writer.clone(), snippets_path, ttl, retry);
        let directories = Collection::new(backend.clone(), writer, directories_path, ttl, retry);

        Self {
            state: StoreState {
                backend,
                queue: WriteQueue::new(),
                snippets,
                directories,
                policy: ConflictPolicy::default(),
            },
            config,
        }
    }

    /// Swap the rule used to collapse records sharing an id.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.state.policy = policy;
        self
    }

    pub fn snippets(&self) -> SnippetRepository<'_, B> {
        SnippetRepository::new(&self.state)
    }

    pub fn directories(&self) -> DirectoryRepository<'_, B> {
        DirectoryRepository::new(&self.state)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.state.backend
    }

    pub fn snippets_path(&self) -> &Path {
        self.state.snippets.path()
    }

    pub fn directories_path(&self) -> &Path {
        self.state.directories.path()
    }

    pub fn stats(&self) -> StoreStats {
        self.state.stats()
    }

    // --- Snapshots ---

    pub async fn get_all_snippets(&self) -> Result<Vec<Snippet>> {
        self.snippets().list().await
    }

    pub async fn get_all_directories(&self) -> Result<Vec<Directory>> {
        self.directories().list().await
    }

    pub async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>> {
        self.snippets().get(id).await
    }

    pub async fn get_directory(&self, id: &str) -> Result<Option<Directory>> {
        self.directories().get(id).await
    }

    // --- Mutations ---

    pub async fn save_snippet(&self, snippet: Snippet) -> Result<SaveOutcome> {
        self.snippets().save(snippet).await
    }

    pub async fn update_snippet(&self, snippet: Snippet) -> Result<SaveOutcome> {
        self.snippets().update(snippet).await
    }

    pub async fn delete_snippet(&self, id: &str) -> Result<Snippet> {
        self.snippets().delete(id).await
    }

    pub async fn create_directory(&self, directory: Directory) -> Result<SaveOutcome> {
        self.directories().create(directory).await
    }

    pub async fn update_directory(&self, directory: Directory) -> Result<SaveOutcome> {
        self.directories().update(directory).await
    }

    pub async fn delete_directory(&self, id: &str) -> Result<DeleteReport> {
        self.directories().delete(id).await
    }

    pub async fn update_snippets_order(&self, ids: &[String]) -> Result<()> {
        self.snippets().update_order(ids).await
    }

    pub async fn update_directories_order(&self, ids: &[String]) -> Result<()> {
        self.directories().update_order(ids).await
    }

    // --- Maintenance ---

    /// Forces the next read of both collections to go to disk.
    pub fn clear_cache(&self) {
        self.state.snippets.invalidate();
        self.state.directories.invalidate();
        tracing::debug!("cache cleared");
    }

    /// Verify and fix cross-file consistency issues.
    pub async fn doctor(&self) -> Result<DoctorReport> {
        doctor::run(&self.state).await
    }
}
