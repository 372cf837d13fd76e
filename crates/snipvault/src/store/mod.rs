//! # Storage Layer
//!
//! This module persists whole collections to JSON files. The
//! [`StorageBackend`](backend::StorageBackend) trait abstracts raw byte I/O so
//! the same machinery runs against the filesystem or memory.
//!
//! ## Read Path
//!
//! ```text
//! load() ──► TtlCache::fresh ──hit──► snapshot
//!               │ miss
//!               ▼
//!        CoalescingReader::read ──► one shared disk read (retried)
//!               │ failed for good
//!               ▼
//!        last known snapshot (warning) or error
//! ```
//!
//! ## Write Path
//!
//! Every mutation first takes a turn on the store-wide [`WriteQueue`]
//! (FIFO), reads the current snapshot, applies its change in memory, and
//! commits the whole array:
//!
//! 1. **Serialize** with two-space indentation.
//! 2. **Write** to `<name>.json.tmp` next to the target.
//! 3. **Verify** by reading the temp file back and comparing bytes.
//! 4. **Rename** the temp file over the target.
//! 5. **Publish**: the cache takes the new snapshot, the in-flight read is
//!    detached.
//!
//! Steps 2–4 are retried on transient failure; the temp file is removed on
//! the way out.
//!
//! ## Consistency
//!
//! Each file is its own atomic unit. A process dying between the two commits
//! of a cascading directory delete can leave snippets pointing at a missing
//! directory; the doctor pass (`repo::doctor`) repairs that on open.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: production, on `tokio::fs`.
//! - [`mem_backend::MemBackend`]: tests, with fault injection and counters.
//!
//! ## Storage Layout
//!
//! ```text
//! <storage dir>/
//! ├── snippets.json           # [Snippet]
//! ├── directories.json        # [Directory]
//! └── *.json.tmp              # only while a commit is in flight
//! ```

pub mod atomic;
pub mod backend;
pub mod cache;
pub mod collection;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;
pub mod reader;
pub mod retry;

pub use atomic::{WriteQueue, WriteTurn};
pub use backend::StorageBackend;
pub use collection::Collection;
pub use retry::RetryPolicy;

/// Counters describing the work a store has done so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Underlying disk reads started; coalesced callers count once.
    pub disk_reads: u64,
    /// Successful commits.
    pub commits: u64,
    /// Mutations that found nothing to change and wrote nothing.
    pub skipped_writes: u64,
}
