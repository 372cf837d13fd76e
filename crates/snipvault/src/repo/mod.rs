//! # Repositories
//!
//! Domain operations over the two collections. Every mutation follows the
//! same shape:
//!
//! 1. Take a turn on the store-wide write queue.
//! 2. Load the current snapshot (cache or disk).
//! 3. Apply the change to an owned copy.
//! 4. Skip the commit when nothing changed, otherwise commit the full array.
//!
//! The turn is held until the commit finishes, so concurrent mutations
//! behave as if run one after the other in arrival order.
//!
//! - [`snippets::SnippetRepository`]: upsert, update, delete, reorder.
//! - [`directories::DirectoryRepository`]: the same plus cascading delete.
//! - [`doctor`]: repair pass for the cross-file consistency gap.

use crate::error::Result;
use crate::model::{ConflictPolicy, Directory, Record, Snippet};
use crate::store::{Collection, StorageBackend, StoreStats, WriteQueue};
use std::sync::Arc;

pub mod directories;
pub mod doctor;
pub mod snippets;

/// State shared by both repositories. Owned by one store instance.
pub struct StoreState<B: StorageBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) queue: WriteQueue,
    pub(crate) snippets: Collection<Snippet, B>,
    pub(crate) directories: Collection<Directory, B>,
    pub(crate) policy: ConflictPolicy,
}

impl<B: StorageBackend> StoreState<B> {
    pub(crate) fn stats(&self) -> StoreStats {
        StoreStats {
            disk_reads: self.snippets.disk_reads() + self.directories.disk_reads(),
            commits: self.snippets.commits() + self.directories.commits(),
            skipped_writes: self.snippets.skipped_writes() + self.directories.skipped_writes(),
        }
    }

    /// Fails with `DirectoryNotFound` unless `parent` is an existing directory.
    pub(crate) async fn require_directory(&self, parent: &str) -> Result<()> {
        let directories = self.directories.load().await?;
        if directories.iter().any(|d| d.id == parent) {
            Ok(())
        } else {
            Err(crate::error::SnipError::DirectoryNotFound(parent.to_string()))
        }
    }
}

/// What a save or update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
    /// The stored record already matched; nothing was written.
    Unchanged,
}

/// Replaces the record keyed like `record`, or appends it.
pub(crate) fn upsert<T: Record>(records: &mut Vec<T>, record: T) -> SaveOutcome {
    match records.iter_mut().find(|r| r.key() == record.key()) {
        Some(existing) if existing.same_content(&record) => SaveOutcome::Unchanged,
        Some(existing) => {
            *existing = record;
            SaveOutcome::Updated
        }
        None => {
            records.push(record);
            SaveOutcome::Created
        }
    }
}

/// Sets `order = position` for every listed key.
///
/// Returns the first unknown key, leaving `records` untouched, or whether
/// anything changed.
pub(crate) fn apply_order<T: Record>(
    records: &mut [T],
    keys: &[String],
) -> std::result::Result<bool, String> {
    if let Some(missing) = keys
        .iter()
        .find(|k| !records.iter().any(|r| r.key() == k.as_str()))
    {
        return Err(missing.clone());
    }

    let mut changed = false;
    for (position, key) in keys.iter().enumerate() {
        let order = position as i64;
        for record in records.iter_mut().filter(|r| r.key() == key.as_str()) {
            if record.order() != order {
                record.set_order(order);
                changed = true;
            }
        }
    }
    Ok(changed)
}
