//! Repair pass for state the write path cannot rule out on its own.
//!
//! The two collection files commit independently, so a process stopped
//! between the two commits of a cascading delete leaves snippets (or, with
//! older files, directories) pointing at a directory that no longer exists.
//! Files written by earlier versions may also hold duplicate ids or parent
//! cycles.
//!
//! The pass fixes, in order:
//!
//! 1. **Duplicates**: collapsed by the store's conflict policy.
//! 2. **Cycles**: a directory found on its own parent chain is moved to the
//!    root.
//! 3. **Orphaned directories**: a directory whose parent is missing is
//!    removed with its subtree, finishing the interrupted cascade.
//! 4. **Orphaned snippets**: a snippet whose parent is missing is removed.
//!
//! Each file is only written when something changed.

use super::StoreState;
use crate::error::Result;
use crate::model::{Directory, Record};
use crate::store::StorageBackend;
use std::collections::{HashMap, HashSet};

/// Report from the `doctor` operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub duplicate_snippets: usize,
    pub duplicate_directories: usize,
    pub cycles_broken: usize,
    pub orphaned_directories: usize,
    pub orphaned_snippets: usize,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        *self == DoctorReport::default()
    }
}

/// Moves every directory that sits on its own parent chain to the root.
fn break_cycles(directories: &mut [Directory]) -> usize {
    let mut broken = 0;
    for i in 0..directories.len() {
        let parents: HashMap<&str, &str> = directories
            .iter()
            .filter_map(|d| d.parent().map(|p| (d.id.as_str(), p)))
            .collect();

        let start = directories[i].id.as_str();
        let mut seen = HashSet::new();
        let mut current = parents.get(start).copied();
        let mut cyclic = false;
        while let Some(key) = current {
            if key == start {
                cyclic = true;
                break;
            }
            if !seen.insert(key) {
                break;
            }
            current = parents.get(key).copied();
        }

        if cyclic {
            tracing::warn!(id = %directories[i].id, "directory was its own ancestor, moved to root");
            directories[i].set_parent(None);
            broken += 1;
        }
    }
    broken
}

/// Drops directories whose parent is missing, repeating until every
/// remaining parent reference resolves.
fn drop_orphaned_directories(directories: &mut Vec<Directory>) -> usize {
    let before = directories.len();
    loop {
        let ids: HashSet<String> = directories.iter().map(|d| d.id.clone()).collect();
        let len = directories.len();
        directories.retain(|d| d.parent().map_or(true, |p| ids.contains(p)));
        if directories.len() == len {
            break;
        }
    }
    before - directories.len()
}

pub(crate) async fn run<B: StorageBackend>(state: &StoreState<B>) -> Result<DoctorReport> {
    let turn = state.queue.acquire().await;
    let mut report = DoctorReport::default();

    let mut directories = state.directories.load().await?.as_ref().clone();
    let mut snippets = state.snippets.load().await?.as_ref().clone();

    report.duplicate_directories = state.policy.reconcile_all(&mut directories);
    report.cycles_broken = break_cycles(&mut directories);
    report.orphaned_directories = drop_orphaned_directories(&mut directories);

    report.duplicate_snippets = state.policy.reconcile_all(&mut snippets);
    let ids: HashSet<&str> = directories.iter().map(|d| d.id.as_str()).collect();
    let before = snippets.len();
    snippets.retain(|s| s.parent().map_or(true, |p| ids.contains(p)));
    report.orphaned_snippets = before - snippets.len();

    if report.duplicate_directories + report.cycles_broken + report.orphaned_directories > 0 {
        state.directories.commit(&turn, directories).await?;
    }
    if report.duplicate_snippets + report.orphaned_snippets > 0 {
        state.snippets.commit(&turn, snippets).await?;
    }

    if report.is_clean() {
        tracing::debug!("doctor found no inconsistencies");
    } else {
        tracing::warn!(?report, "doctor repaired inconsistencies");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snippet;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_break_cycles_reroots_one_member() {
        let mut dirs = vec![
            Directory::new("a").with_id("x").with_parent("y"),
            Directory::new("b").with_id("y").with_parent("x"),
            Directory::new("c").with_id("z").with_parent("x"),
        ];
        assert_eq!(break_cycles(&mut dirs), 1);
        assert_eq!(dirs[0].parent_id, None);
        assert_eq!(dirs[1].parent_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_drop_orphaned_directories_takes_subtree() {
        let mut dirs = vec![
            Directory::new("kept").with_id("d1"),
            Directory::new("orphan").with_id("d2").with_parent("gone"),
            Directory::new("child").with_id("d3").with_parent("d2"),
        ];
        assert_eq!(drop_orphaned_directories(&mut dirs), 2);
        assert_eq!(dirs.len(), 1);
    }

    #[tokio::test]
    async fn test_clean_store_is_not_written() {
        let store = InMemoryStore::new();
        store
            .directories()
            .create(Directory::new("d").with_id("d1"))
            .await
            .unwrap();
        let commits = store.stats().commits;

        let report = store.doctor().await.unwrap();

        assert!(report.is_clean());
        assert_eq!(store.stats().commits, commits);
    }

    #[tokio::test]
    async fn test_repairs_interrupted_cascade() {
        let store = InMemoryStore::new();
        // Directory file already committed without d1, snippet file not yet.
        store.backend().insert(store.directories_path(), "[]");
        store.backend().insert(
            store.snippets_path(),
            serde_json::to_vec(&vec![
                Snippet::new("orphan", "").with_id("s1").with_parent("d1"),
                Snippet::new("loose", "").with_id("s2"),
            ])
            .unwrap(),
        );

        let report = store.doctor().await.unwrap();

        assert_eq!(report.orphaned_snippets, 1);
        let ids: Vec<_> = store.snippets().list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["s2"]);
    }

    #[tokio::test]
    async fn test_collapses_duplicates_in_both_files() {
        let store = InMemoryStore::new();
        store.backend().insert(
            store.directories_path(),
            serde_json::to_vec(&vec![
                Directory::new("one").with_id("d1"),
                Directory::new("two").with_id("d1"),
            ])
            .unwrap(),
        );
        store.backend().insert(
            store.snippets_path(),
            serde_json::to_vec(&vec![
                Snippet::new("a", "").with_id("s1"),
                Snippet::new("b", "").with_id("s1"),
            ])
            .unwrap(),
        );

        let report = store.doctor().await.unwrap();

        assert_eq!(report.duplicate_directories, 1);
        assert_eq!(report.duplicate_snippets, 1);
        assert_eq!(store.directories().list().await.unwrap().len(), 1);
        assert_eq!(store.snippets().list().await.unwrap().len(), 1);
    }
}
