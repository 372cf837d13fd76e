use super::mem_backend::MemBackend;
use crate::api::SnipStore;
use crate::config::StoreConfig;
use std::path::Path;

pub type InMemoryStore = SnipStore<MemBackend>;

/// Root of the virtual storage directory used by in-memory stores.
pub const MEM_ROOT: &str = "/mem";

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let config = StoreConfig::in_dir(MEM_ROOT);
        let root = Path::new(MEM_ROOT);
        let snippets = root.join(&config.snippets_file);
        let directories = root.join(&config.directories_file);
        SnipStore::assemble(MemBackend::new(), config, snippets, directories)
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{Directory, Snippet};

    /// A store holding `root/{child/{grandchild}}` plus one snippet per
    /// directory and one at the root.
    pub async fn nested_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let dirs = [
            Directory::new("root").with_id("root"),
            Directory::new("child").with_id("child").with_parent("root"),
            Directory::new("grandchild").with_id("grandchild").with_parent("child"),
        ];
        for dir in dirs {
            store.create_directory(dir).await.unwrap();
        }
        let snippets = [
            ("s-root", Some("root")),
            ("s-child", Some("child")),
            ("s-grand", Some("grandchild")),
            ("s-loose", None),
        ];
        for (id, parent) in snippets {
            let mut snippet = Snippet::new(id, format!("// {id}")).with_id(id);
            snippet.parent_id = parent.map(str::to_string);
            store.save_snippet(snippet).await.unwrap();
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::nested_store;

    #[tokio::test]
    async fn test_nested_fixture() {
        let store = nested_store().await;
        assert_eq!(store.get_all_directories().await.unwrap().len(), 3);
        assert_eq!(store.get_all_snippets().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_deleting_child_keeps_root() {
        let store = nested_store().await;
        let report = store.delete_directory("child").await.unwrap();
        assert_eq!(report.directories, vec!["child", "grandchild"]);

        let ids: Vec<_> = store
            .get_all_snippets()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s-root", "s-loose"]);
    }
}
