use super::{apply_order, upsert, SaveOutcome, StoreState};
use crate::error::{Result, SnipError};
use crate::model::{Record, Snippet};
use crate::store::StorageBackend;

/// Snippet operations over a store's state.
pub struct SnippetRepository<'a, B: StorageBackend> {
    state: &'a StoreState<B>,
}

impl<'a, B: StorageBackend> SnippetRepository<'a, B> {
    pub(crate) fn new(state: &'a StoreState<B>) -> Self {
        Self { state }
    }

    /// All snippets in file order. Sorting by `order` is left to callers.
    pub async fn list(&self) -> Result<Vec<Snippet>> {
        Ok(self.state.snippets.load().await?.as_ref().clone())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Snippet>> {
        let snippets = self.state.snippets.load().await?;
        Ok(snippets.iter().find(|s| s.id == id).cloned())
    }

    /// Insert or replace by id.
    ///
    /// Other records sharing the id are collapsed first by the store's
    /// conflict policy. An unchanged record is not written.
    pub async fn save(&self, mut snippet: Snippet) -> Result<SaveOutcome> {
        snippet.ensure_key();

        let turn = self.state.queue.acquire().await;
        if let Some(parent) = snippet.parent() {
            self.state.require_directory(parent).await?;
        }

        let mut records = self.state.snippets.load().await?.as_ref().clone();
        let discarded = self.state.policy.reconcile(&mut records, &snippet.id);
        if discarded > 0 {
            tracing::warn!(id = %snippet.id, discarded, "collapsed duplicate snippets");
        }

        let outcome = upsert(&mut records, snippet);
        if outcome == SaveOutcome::Unchanged && discarded == 0 {
            self.state.snippets.note_skipped_write();
            tracing::debug!("snippet unchanged, skipping write");
            return Ok(outcome);
        }

        self.state.snippets.commit(&turn, records).await?;
        Ok(outcome)
    }

    /// Replace an existing snippet. Fails with `SnippetNotFound` if absent.
    pub async fn update(&self, snippet: Snippet) -> Result<SaveOutcome> {
        let turn = self.state.queue.acquire().await;
        let mut records = self.state.snippets.load().await?.as_ref().clone();

        let Some(position) = records.iter().position(|s| s.id == snippet.id) else {
            return Err(SnipError::SnippetNotFound(snippet.id));
        };
        if records[position].same_content(&snippet) {
            self.state.snippets.note_skipped_write();
            tracing::debug!(id = %snippet.id, "snippet unchanged, skipping write");
            return Ok(SaveOutcome::Unchanged);
        }
        if let Some(parent) = snippet.parent() {
            self.state.require_directory(parent).await?;
        }

        records[position] = snippet;
        self.state.snippets.commit(&turn, records).await?;
        Ok(SaveOutcome::Updated)
    }

    /// Remove a snippet. Fails with `SnippetNotFound` if absent.
    pub async fn delete(&self, id: &str) -> Result<Snippet> {
        let turn = self.state.queue.acquire().await;
        let mut records = self.state.snippets.load().await?.as_ref().clone();

        let Some(removed) = records.iter().find(|s| s.id == id).cloned() else {
            return Err(SnipError::SnippetNotFound(id.to_string()));
        };
        records.retain(|s| s.id != id);

        self.state.snippets.commit(&turn, records).await?;
        Ok(removed)
    }

    /// Give each listed snippet `order = position in ids`.
    pub async fn update_order(&self, ids: &[String]) -> Result<()> {
        let turn = self.state.queue.acquire().await;
        let mut records = self.state.snippets.load().await?.as_ref().clone();

        let changed = apply_order(&mut records, ids).map_err(SnipError::SnippetNotFound)?;
        if !changed {
            self.state.snippets.note_skipped_write();
            return Ok(());
        }
        self.state.snippets.commit(&turn, records).await?;
        Ok(())
    }
}
