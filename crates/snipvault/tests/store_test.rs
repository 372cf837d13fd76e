use snipvault::store::memory::InMemoryStore;
use snipvault::{Directory, SaveOutcome, SnipError, SnipStore, Snippet, StoreConfig};
use std::collections::HashSet;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> SnipStore {
    SnipStore::open(StoreConfig::in_dir(dir.path())).await.unwrap()
}

// --- Scenarios ---

#[tokio::test]
async fn test_save_then_get_all() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    store
        .save_snippet(Snippet::new("a", "").with_id("s1"))
        .await
        .unwrap();

    let all = store.get_all_snippets().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "s1");
    assert_eq!(all[0].name, "a");
    assert_eq!(all[0].parent_id, None);
}

#[tokio::test]
async fn test_delete_directory_removes_contained_snippet() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    store
        .create_directory(Directory::new("dir").with_id("d1"))
        .await
        .unwrap();
    store
        .save_snippet(Snippet::new("b", "").with_id("s2").with_parent("d1"))
        .await
        .unwrap();
    store.delete_directory("d1").await.unwrap();

    let dirs = store.get_all_directories().await.unwrap();
    assert!(dirs.iter().all(|d| d.id != "d1"));
    let snippets = store.get_all_snippets().await.unwrap();
    assert!(snippets.iter().all(|s| s.id != "s2"));
}

#[tokio::test]
async fn test_update_missing_snippet_leaves_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .save_snippet(Snippet::new("a", "x").with_id("s1"))
        .await
        .unwrap();
    let before = fs::read(store.snippets_path()).unwrap();

    let err = store
        .update_snippet(Snippet::new("ghost", "").with_id("nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, SnipError::SnippetNotFound(_)));
    assert_eq!(fs::read(store.snippets_path()).unwrap(), before);
}

#[tokio::test]
async fn test_unawaited_saves_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let (a, b) = tokio::join!(
        store.save_snippet(Snippet::new("a", "").with_id("s1")),
        store.save_snippet(Snippet::new("b", "").with_id("s2")),
    );
    a.unwrap();
    b.unwrap();

    store.clear_cache();
    let ids: HashSet<_> = store
        .get_all_snippets()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, HashSet::from(["s1".to_string(), "s2".to_string()]));
}

// --- Properties ---

#[tokio::test]
async fn test_concurrent_mutations_match_sequential_application() {
    let base = Snippet::new("shared", "v0").with_id("shared");
    let mut mutations: Vec<Snippet> = (0..10)
        .map(|i| Snippet::new(format!("n{i}"), "").with_id(format!("s{i}")))
        .collect();
    for version in 1..=5 {
        let mut next = base.clone();
        next.code = format!("v{version}");
        mutations.push(next);
    }

    let concurrent_dir = TempDir::new().unwrap();
    let concurrent = open(&concurrent_dir).await;
    let results =
        futures::future::join_all(mutations.iter().cloned().map(|m| concurrent.save_snippet(m)))
            .await;
    assert!(results.iter().all(|r| r.is_ok()));

    let sequential_dir = TempDir::new().unwrap();
    let sequential = open(&sequential_dir).await;
    for m in mutations {
        sequential.save_snippet(m).await.unwrap();
    }

    assert_eq!(
        fs::read(concurrent.snippets_path()).unwrap(),
        fs::read(sequential.snippets_path()).unwrap()
    );
    let shared = concurrent.get_snippet("shared").await.unwrap().unwrap();
    assert_eq!(shared.code, "v5");
}

#[tokio::test]
async fn test_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .create_directory(Directory::new("lang").with_id("d1").with_order(2))
        .await
        .unwrap();
    let snippet = Snippet::new("hello", "fn main() {}\n")
        .with_id("s1")
        .with_language("rust")
        .with_parent("d1")
        .with_order(4);
    store.save_snippet(snippet.clone()).await.unwrap();

    let reopened = open(&dir).await;
    assert_eq!(reopened.get_all_snippets().await.unwrap(), vec![snippet]);
    assert_eq!(
        reopened.get_all_directories().await.unwrap(),
        vec![Directory::new("lang").with_id("d1").with_order(2)]
    );
}

#[tokio::test]
async fn test_files_use_two_space_camel_case_json() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store
        .create_directory(Directory::new("d").with_id("d1"))
        .await
        .unwrap();
    store
        .save_snippet(Snippet::new("a", "").with_id("s1").with_parent("d1"))
        .await
        .unwrap();

    let text = fs::read_to_string(dir.path().join("snippets.json")).unwrap();
    assert!(text.contains("\n    \"parentId\": \"d1\""));
    assert!(text.contains("\"createdAt\""));
    assert!(!text.contains("language"));
    assert!(!dir.path().join("snippets.json.tmp").exists());
}

#[tokio::test]
async fn test_identical_update_keeps_file_untouched() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let snippet = Snippet::new("a", "x").with_id("s1");
    store.save_snippet(snippet.clone()).await.unwrap();
    let commits = store.stats().commits;
    let modified = fs::metadata(store.snippets_path()).unwrap().modified().unwrap();

    let outcome = store.update_snippet(snippet).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert_eq!(store.stats().commits, commits);
    assert_eq!(
        fs::metadata(store.snippets_path()).unwrap().modified().unwrap(),
        modified
    );
}

#[tokio::test]
async fn test_cascading_delete_leaves_nothing_under_deleted_subtree() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    // d0 ── d1 ── d3
    //   └── d2 ── d4 ── d5
    // d6
    let parents = [
        ("d0", None),
        ("d1", Some("d0")),
        ("d2", Some("d0")),
        ("d3", Some("d1")),
        ("d4", Some("d2")),
        ("d5", Some("d4")),
        ("d6", None),
    ];
    for (id, parent) in parents {
        let mut d = Directory::new(id).with_id(id);
        d.parent_id = parent.map(str::to_string);
        store.create_directory(d).await.unwrap();
        let mut s = Snippet::new(format!("in {id}"), "").with_id(format!("s-{id}"));
        s.parent_id = Some(id.to_string());
        store.save_snippet(s).await.unwrap();
    }

    let report = store.delete_directory("d0").await.unwrap();
    assert_eq!(report.directories.len(), 6);
    assert_eq!(report.snippets.len(), 6);

    let gone: HashSet<String> = report.directories.into_iter().collect();
    let dirs = store.get_all_directories().await.unwrap();
    let snippets = store.get_all_snippets().await.unwrap();
    assert_eq!(dirs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["d6"]);
    assert!(dirs
        .iter()
        .all(|d| d.parent_id.as_ref().map_or(true, |p| !gone.contains(p))));
    assert!(snippets
        .iter()
        .all(|s| s.parent_id.as_ref().map_or(true, |p| !gone.contains(p))));
    assert_eq!(snippets.len(), 1);
}

#[tokio::test]
async fn test_concurrent_lists_share_one_read() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("snippets.json"),
        r#"[{"id":"s1","name":"a","code":"","order":0,"createdAt":"2024-01-01T00:00:00Z"}]"#,
    )
    .unwrap();
    let config = StoreConfig {
        repair_on_open: false,
        ..StoreConfig::in_dir(dir.path())
    };
    let store = SnipStore::open(config).await.unwrap();

    let results = futures::future::join_all((0..8).map(|_| store.get_all_snippets())).await;

    assert!(results.iter().all(|r| r.as_ref().unwrap().len() == 1));
    assert_eq!(store.stats().disk_reads, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cache_serves_within_ttl_and_refreshes_after() {
    let store = InMemoryStore::new();
    let path = store.snippets_path().to_path_buf();

    let first = store.get_all_snippets().await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    let second = store.get_all_snippets().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.backend().read_count(&path), 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    store.get_all_snippets().await.unwrap();
    assert_eq!(store.backend().read_count(&path), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_write_failures_are_retried() {
    let store = InMemoryStore::new();
    store.backend().fail_next_writes(2);

    store
        .save_snippet(Snippet::new("a", "").with_id("s1"))
        .await
        .unwrap();

    store.clear_cache();
    assert_eq!(store.get_all_snippets().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_write_failure_is_fatal_and_not_cached() {
    let store = InMemoryStore::new();
    store.backend().set_simulate_write_error(true);

    let err = store
        .save_snippet(Snippet::new("a", "").with_id("s1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SnipError::Fatal { attempts: 3, .. }));
    assert!(store.get_all_snippets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_open_repairs_orphans_from_interrupted_delete() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("directories.json"), "[]").unwrap();
    fs::write(
        dir.path().join("snippets.json"),
        r#"[
  {"id":"s1","name":"orphan","parentId":"d1","order":0,"createdAt":"2024-01-01T00:00:00Z"},
  {"id":"s2","name":"loose","order":1,"createdAt":"2024-01-01T00:00:00Z"}
]"#,
    )
    .unwrap();

    let store = open(&dir).await;

    let ids: Vec<_> = store
        .get_all_snippets()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["s2"]);
    let on_disk = fs::read_to_string(dir.path().join("snippets.json")).unwrap();
    assert!(!on_disk.contains("orphan"));
}

#[tokio::test(start_paused = true)]
async fn test_reads_do_not_wait_for_queued_mutation() {
    let store = InMemoryStore::new();
    store
        .save_snippet(Snippet::new("a", "").with_id("s1"))
        .await
        .unwrap();
    store.clear_cache();
    store.backend().fail_next_renames(2);
    let start = tokio::time::Instant::now();

    let save = store.save_snippet(Snippet::new("b", "").with_id("s2"));
    let read = async {
        tokio::task::yield_now().await;
        let snapshot = store.get_all_snippets().await.unwrap();
        (snapshot, start.elapsed())
    };
    let (saved, (snapshot, read_after)) = tokio::join!(save, read);

    assert_eq!(saved.unwrap(), SaveOutcome::Created);
    assert!(read_after < store.config().retry_policy().delay);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(store.get_all_snippets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_undated_record_keeps_its_timestamp_across_reads_and_saves() {
    let store = InMemoryStore::new();
    store
        .backend()
        .insert(store.snippets_path(), r#"[{"id":"s1","name":"a"}]"#);

    let first = store.get_snippet("s1").await.unwrap().unwrap();
    store.clear_cache();
    let second = store.get_snippet("s1").await.unwrap().unwrap();
    assert_eq!(first.created_at, second.created_at);

    store
        .save_snippet(Snippet::new("b", "").with_id("s2"))
        .await
        .unwrap();
    store.clear_cache();
    let after_save = store.get_snippet("s1").await.unwrap().unwrap();
    assert_eq!(after_save.created_at, first.created_at);
}
