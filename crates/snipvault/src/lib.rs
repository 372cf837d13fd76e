//! # Snipvault Architecture
//!
//! Snipvault persists two hierarchical collections, code snippets and the
//! directories that organize them, as JSON files in a local storage
//! directory. The files are shared by a UI layer and a sync layer; this
//! crate is the only thing that writes them.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - SnipStore: owns all state, exposes the collaborator API  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Repository Layer (repo/)                                   │
//! │  - Snippet / Directory operations, cascading delete, doctor │
//! │  - Change detection and duplicate cleanup                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - TTL cache, coalescing reader, atomic writer, write queue │
//! │  - StorageBackend: FsBackend (production), MemBackend (test)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **No torn files**: every commit goes write-temp, verify, rename.
//! - **No lost updates**: mutations queue FIFO and hold their turn from read
//!   to commit.
//! - **Read your writes**: a commit replaces the cached snapshot at once.
//! - **Bounded disk contention**: concurrent reads of one file share a
//!   single disk read; snapshots stay cached for a TTL window.
//!
//! The two files are separate atomic units. See `repo::doctor` for how a
//! crash between the two commits of a cascading delete is repaired.
//!
//! ## Testing Strategy
//!
//! - **Storage units** run against [`store::mem_backend::MemBackend`], which
//!   injects faults and counts reads and writes per path.
//! - **Repository and API tests** use [`store::memory::InMemoryStore`].
//! - **Integration tests** (`tests/`) use [`store::fs_backend::FsBackend`] on
//!   a temp dir.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use api::SnipStore;
pub use config::StoreConfig;
pub use error::{Result, SnipError};
pub use model::{ConflictPolicy, Directory, Record, Snippet};
pub use repo::directories::DeleteReport;
pub use repo::doctor::DoctorReport;
pub use repo::SaveOutcome;
pub use store::StoreStats;
