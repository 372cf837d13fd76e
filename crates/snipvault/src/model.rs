//! # Domain Model: Snippets, Directories and Identity
//!
//! This module defines the two record types persisted by the store,
//! [`Snippet`] and [`Directory`], and the [`Record`] trait the storage layer
//! uses to treat both collections uniformly.
//!
//! ## Identity Scheme
//!
//! Every record carries an opaque string `id`. Parentage is an explicit
//! `parentId` reference to a directory id; `None` places the record at the
//! root. Paths are never parsed for structure.
//!
//! ```text
//! directories.json                 snippets.json
//! ┌──────────────────────┐         ┌────────────────────────────┐
//! │ id: d1  parent: -    │◄────────│ id: s1  parentId: d1       │
//! │ id: d2  parent: d1   │◄────┐   │ id: s2  parentId: -        │
//! └──────────────────────┘     └───│ id: s3  parentId: d2       │
//!                                  └────────────────────────────┘
//! ```
//!
//! ## On-disk Shape
//!
//! Both files are JSON arrays shared with non-Rust collaborators, so field
//! names are camelCase and optional fields are omitted when absent:
//!
//! ```json
//! { "id": "s1", "name": "hello", "code": "println!()", "language": "rust",
//!   "parentId": "d1", "order": 0, "createdAt": "2024-05-01T10:00:00Z" }
//! ```
//!
//! Only `id` is required. Every other field has a fixed default, so one
//! sparse record never makes a whole collection unreadable and reading the
//! same file twice yields the same records.
//!
//! ## Change Detection
//!
//! [`Record::same_content`] compares only the user-visible payload (name,
//! code, language, parent). `order` and `createdAt` are deliberately outside
//! the comparison; ordering has its own mutation path.
//!
//! ## Identity Conflicts
//!
//! Historical files may contain several records sharing one id. The rule
//! that collapses them is a value, [`ConflictPolicy`], so it can be tested and
//! swapped on its own.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Behaviour shared by every persisted record.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human readable collection name, used in logs.
    const KIND: &'static str;

    fn key(&self) -> &str;

    fn parent(&self) -> Option<&str>;

    fn set_parent(&mut self, parent: Option<String>);

    fn order(&self) -> i64;

    fn set_order(&mut self, order: i64);

    /// Creation time, when the record type tracks one.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// True when the user-visible payload of both records is identical.
    fn same_content(&self, other: &Self) -> bool;

    /// Assigns a fresh id when the record was built without one.
    fn ensure_key(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    /// Records written without a creation time read as the Unix epoch, so
    /// they lose every `KeepNewest` tie-break against dated records.
    #[serde(default = "unknown_creation")]
    pub created_at: DateTime<Utc>,
}

fn unknown_creation() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Snippet {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            code: code.into(),
            language: None,
            parent_id: None,
            order: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

impl Record for Snippet {
    const KIND: &'static str = "snippet";

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn set_parent(&mut self, parent: Option<String>) {
        self.parent_id = parent;
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.code == other.code
            && self.language == other.language
            && self.parent_id == other.parent_id
    }

    fn ensure_key(&mut self) {
        if self.id.trim().is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

impl Directory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            parent_id: None,
            order: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

impl Record for Directory {
    const KIND: &'static str = "directory";

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn set_parent(&mut self, parent: Option<String>) {
        self.parent_id = parent;
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.parent_id == other.parent_id
    }

    fn ensure_key(&mut self) {
        if self.id.trim().is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
    }
}

/// Rule used to collapse several records that share one identity key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the record with the latest creation time. Records without a
    /// creation time, or with equal ones, fall back to the later position.
    #[default]
    KeepNewest,
    /// Keep the record that appears last in the file.
    KeepLast,
}

impl ConflictPolicy {
    /// Collapses every record keyed `key` into one survivor.
    ///
    /// Returns the number of discarded records.
    pub fn reconcile<T: Record>(self, records: &mut Vec<T>, key: &str) -> usize {
        let positions: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.key() == key)
            .map(|(i, _)| i)
            .collect();
        if positions.len() < 2 {
            return 0;
        }

        let winner = match self {
            ConflictPolicy::KeepLast => positions[positions.len() - 1],
            ConflictPolicy::KeepNewest => {
                let mut best = positions[0];
                for &pos in &positions[1..] {
                    if records[pos].created_at() >= records[best].created_at() {
                        best = pos;
                    }
                }
                best
            }
        };

        let mut index = 0;
        records.retain(|r| {
            let keep = r.key() != key || index == winner;
            index += 1;
            keep
        });
        positions.len() - 1
    }

    /// Collapses duplicates for every key in the collection.
    pub fn reconcile_all<T: Record>(self, records: &mut Vec<T>) -> usize {
        let mut seen = std::collections::HashSet::new();
        let duplicated: Vec<String> = records
            .iter()
            .filter(|r| !seen.insert(r.key().to_string()))
            .map(|r| r.key().to_string())
            .collect();

        let mut discarded = 0;
        for key in duplicated {
            discarded += self.reconcile(records, &key);
        }
        discarded
    }
}
