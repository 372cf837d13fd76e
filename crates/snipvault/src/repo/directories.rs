use super::{apply_order, upsert, SaveOutcome, StoreState};
use crate::error::{Result, SnipError};
use crate::model::{Directory, Record};
use crate::store::StorageBackend;
use std::collections::{HashMap, HashSet, VecDeque};

/// What a cascading delete removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// The target directory first, then its descendants.
    pub directories: Vec<String>,
    pub snippets: Vec<String>,
}

/// `root` plus every directory whose parent chain leads to it.
///
/// Follows `parentId` links breadth first; a cycle in the input cannot make
/// it loop.
pub fn subtree(directories: &[Directory], root: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for dir in directories {
        if let Some(parent) = dir.parent() {
            children.entry(parent).or_default().push(&dir.id);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut ordered = vec![root.to_string()];
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for &child in children.get(current).into_iter().flatten() {
            if seen.insert(child) {
                ordered.push(child.to_string());
                queue.push_back(child);
            }
        }
    }
    ordered
}

/// True when `candidate` is `id` or sits below it.
fn is_self_or_descendant(directories: &[Directory], id: &str, candidate: &str) -> bool {
    let by_id: HashMap<&str, &Directory> = directories.iter().map(|d| (d.id.as_str(), d)).collect();
    let mut seen = HashSet::new();
    let mut current = Some(candidate);
    while let Some(key) = current {
        if key == id {
            return true;
        }
        if !seen.insert(key) {
            return false;
        }
        current = by_id.get(key).and_then(|d| d.parent());
    }
    false
}

/// Directory operations over a store's state.
pub struct DirectoryRepository<'a, B: StorageBackend> {
    state: &'a StoreState<B>,
}

impl<'a, B: StorageBackend> DirectoryRepository<'a, B> {
    pub(crate) fn new(state: &'a StoreState<B>) -> Self {
        Self { state }
    }

    pub async fn list(&self) -> Result<Vec<Directory>> {
        Ok(self.state.directories.load().await?.as_ref().clone())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Directory>> {
        let directories = self.state.directories.load().await?;
        Ok(directories.iter().find(|d| d.id == id).cloned())
    }

    /// Insert or replace by id, with the same duplicate cleanup and
    /// change detection as snippet saves.
    pub async fn create(&self, mut directory: Directory) -> Result<SaveOutcome> {
        directory.ensure_key();

        let turn = self.state.queue.acquire().await;
        let mut records = self.state.directories.load().await?.as_ref().clone();
        self.check_parent(&records, &directory)?;

        let discarded = self.state.policy.reconcile(&mut records, &directory.id);
        if discarded > 0 {
            tracing::warn!(id = %directory.id, discarded, "collapsed duplicate directories");
        }

        let outcome = upsert(&mut records, directory);
        if outcome == SaveOutcome::Unchanged && discarded == 0 {
            self.state.directories.note_skipped_write();
            tracing::debug!("directory unchanged, skipping write");
            return Ok(outcome);
        }

        self.state.directories.commit(&turn, records).await?;
        Ok(outcome)
    }

    /// Replace an existing directory. Fails with `DirectoryNotFound` if
    /// absent, `InvalidParent` if the move would create a cycle.
    pub async fn update(&self, directory: Directory) -> Result<SaveOutcome> {
        let turn = self.state.queue.acquire().await;
        let mut records = self.state.directories.load().await?.as_ref().clone();

        let Some(position) = records.iter().position(|d| d.id == directory.id) else {
            return Err(SnipError::DirectoryNotFound(directory.id));
        };
        if records[position].same_content(&directory) {
            self.state.directories.note_skipped_write();
            tracing::debug!(id = %directory.id, "directory unchanged, skipping write");
            return Ok(SaveOutcome::Unchanged);
        }
        self.check_parent(&records, &directory)?;

        records[position] = directory;
        self.state.directories.commit(&turn, records).await?;
        Ok(SaveOutcome::Updated)
    }

    /// Remove a directory, all its descendant directories and every snippet
    /// inside them.
    ///
    /// The directory file is committed first, then the snippet file. The two
    /// commits are separate atomic units; a crash in between leaves orphaned
    /// snippets for the doctor pass to collect.
    pub async fn delete(&self, id: &str) -> Result<DeleteReport> {
        let turn = self.state.queue.acquire().await;
        let directories = self.state.directories.load().await?;
        if !directories.iter().any(|d| d.id == id) {
            return Err(SnipError::DirectoryNotFound(id.to_string()));
        }

        let removed_dirs = subtree(&directories, id);
        let doomed: HashSet<&str> = removed_dirs.iter().map(String::as_str).collect();

        let snippets = self.state.snippets.load().await?;
        let (removed_snippets, kept_snippets): (Vec<_>, Vec<_>) = snippets
            .iter()
            .cloned()
            .partition(|s| s.parent().is_some_and(|p| doomed.contains(p)));
        let kept_dirs: Vec<Directory> = directories
            .iter()
            .filter(|d| !doomed.contains(d.id.as_str()))
            .cloned()
            .collect();

        self.state.directories.commit(&turn, kept_dirs).await?;
        if !removed_snippets.is_empty() {
            self.state.snippets.commit(&turn, kept_snippets).await?;
        }

        let report = DeleteReport {
            directories: removed_dirs,
            snippets: removed_snippets.into_iter().map(|s| s.id).collect(),
        };
        tracing::info!(
            id,
            directories = report.directories.len(),
            snippets = report.snippets.len(),
            "deleted directory subtree"
        );
        Ok(report)
    }

    /// Give each listed directory `order = position in ids`.
    pub async fn update_order(&self, ids: &[String]) -> Result<()> {
        let turn = self.state.queue.acquire().await;
        let mut records = self.state.directories.load().await?.as_ref().clone();

        let changed = apply_order(&mut records, ids).map_err(SnipError::DirectoryNotFound)?;
        if !changed {
            self.state.directories.note_skipped_write();
            return Ok(());
        }
        self.state.directories.commit(&turn, records).await?;
        Ok(())
    }

    fn check_parent(&self, records: &[Directory], directory: &Directory) -> Result<()> {
        let Some(parent) = directory.parent() else {
            return Ok(());
        };
        if parent == directory.id || is_self_or_descendant(records, &directory.id, parent) {
            return Err(SnipError::InvalidParent {
                key: directory.id.clone(),
                parent: parent.to_string(),
            });
        }
        if !records.iter().any(|d| d.id == parent) {
            return Err(SnipError::DirectoryNotFound(parent.to_string()));
        }
        Ok(())
    }
}
