//! End-to-end sync runs against the in-memory Metabase

use super::test_utils::{git_available, test_config, FakeMetabase};
use git2::Repository;
use metabase_git_sync::error::ErrorKind;
use metabase_git_sync::report::CommitOutcome;
use metabase_git_sync::snapshot::{archive_file_name, INIT_MESSAGE, SYNC_MESSAGE};
use metabase_git_sync::sync::SyncPipeline;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn ops_instance() -> FakeMetabase {
    FakeMetabase::new()
        .root(json!({"id": 1, "name": "Ops", "slug": "ops"}))
        .items(1, vec![json!({"id": 42, "model": "question", "name": "Daily"})])
        .native_card(42, "SELECT 1")
}

#[tokio::test]
async fn test_first_sync_writes_mirror_and_initial_commit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = ops_instance();

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    let dir = root.join("1-ops");
    assert_eq!(
        fs::read_to_string(dir.join("question-42.sql")).unwrap(),
        "SELECT 1"
    );

    let collection = read_json(&dir.join("collection-1-metadata.json"));
    assert_eq!(collection["name"], "Ops");
    assert_eq!(collection["_items"][0]["id"], 42);

    let leaf = read_json(&dir.join("question-42-metadata.json"));
    assert_eq!(leaf["name"], "Daily");
    assert_eq!(leaf["_card"]["query_type"], "native");

    assert!(report.fresh_repo);
    assert!(report.degradations.is_empty(), "{:?}", report.degradations);
    assert_eq!(report.collections, 1);
    assert_eq!(report.items, 1);
    assert_eq!(report.resolved_bodies, 1);
    assert_eq!(report.indexed_leaves, 1);
    assert!(report.fingerprint.is_some());

    match &report.commit {
        CommitOutcome::Committed { message, revision } => {
            assert_eq!(message, INIT_MESSAGE);
            let repo = Repository::open(&root).unwrap();
            let head = repo.head().unwrap().peel_to_commit().unwrap();
            assert_eq!(&head.id().to_string(), revision);
            assert_eq!(head.message(), Some(INIT_MESSAGE));
        }
        other => panic!("expected a commit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unchanged_instance_makes_no_second_commit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = ops_instance();

    let first = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();
    let second = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    assert!(!second.fresh_repo);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(
        second.commit,
        CommitOutcome::Unchanged {
            revision: first.commit.revision().map(str::to_string)
        }
    );
}

#[tokio::test]
async fn test_changed_body_gets_sync_commit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();

    let first = SyncPipeline::new(&config, &ops_instance(), root.clone())
        .run()
        .await
        .unwrap();

    let edited = FakeMetabase::new()
        .root(json!({"id": 1, "name": "Ops", "slug": "ops"}))
        .items(1, vec![json!({"id": 42, "model": "question", "name": "Daily"})])
        .native_card(42, "SELECT 2");
    let second = SyncPipeline::new(&config, &edited, root.clone())
        .run()
        .await
        .unwrap();

    match &second.commit {
        CommitOutcome::Committed { message, revision } => {
            assert_eq!(message, SYNC_MESSAGE);
            assert_ne!(Some(revision.as_str()), first.commit.revision());
        }
        other => panic!("expected a commit, got {:?}", other),
    }
    let repo = Repository::open(&root).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 1);
}

#[tokio::test]
async fn test_nested_collections_and_builder_cards() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = FakeMetabase::new()
        .root(json!({"id": 7, "slug": "finance"}))
        .items(
            7,
            vec![
                json!({"id": 8, "model": "collection", "slug": "quarterly"}),
                json!({"id": 100, "model": "card"}),
            ],
        )
        .items(8, vec![json!({"id": 101, "model": "card"})])
        .native_card(100, "SELECT revenue FROM orders")
        .builder_card(101, 12, "SELECT * FROM \"PUBLIC\".\"ORDERS\"");

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    assert!(report.degradations.is_empty(), "{:?}", report.degradations);
    let finance = root.join("7-finance");
    let quarterly = finance.join("8-quarterly");
    assert!(finance.join("card-100.sql").is_file());
    assert_eq!(
        fs::read_to_string(quarterly.join("card-101.sql")).unwrap(),
        "SELECT * FROM \"PUBLIC\".\"ORDERS\""
    );
    assert!(quarterly.join("collection-8-metadata.json").is_file());

    let top = read_json(&finance.join("collection-7-metadata.json"));
    assert_eq!(top["_items"][0]["_items"][0]["id"], 101);
    assert!(api.calls().contains(&"dataset/native".to_string()));
}

#[tokio::test]
async fn test_item_without_card_record_is_skipped() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = FakeMetabase::new()
        .root(json!({"id": 9}))
        .items(
            9,
            vec![
                json!({"id": 5, "model": "card"}),
                json!({"id": 6, "model": "card"}),
            ],
        )
        .native_card(6, "SELECT 6");

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    let dir = root.join("9");
    assert!(!dir.join("card-5-metadata.json").exists());
    assert!(!dir.join("card-5.sql").exists());
    assert!(dir.join("card-6.sql").is_file());
    assert_eq!(report.degradations.count(ErrorKind::Integrity), 1);
    assert!(report.commit.revision().is_some());
}

#[tokio::test]
async fn test_unsupported_query_type_keeps_metadata_only() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = FakeMetabase::new()
        .root(json!({"id": 3}))
        .items(3, vec![json!({"id": 30, "model": "card"})])
        .card(json!({"id": 30, "query_type": "mongo"}));

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    let dir = root.join("3");
    assert!(dir.join("card-30-metadata.json").is_file());
    assert!(!dir.join("card-30.sql").exists());
    assert!(report.degradations.count(ErrorKind::SerializationGap) >= 1);
    assert_eq!(report.resolved_bodies, 0);
}

#[tokio::test]
async fn test_failed_collection_fetch_degrades() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = FakeMetabase::new()
        .root(json!({"id": 1, "slug": "ops"}))
        .root(json!({"id": 2, "slug": "broken"}))
        .items(1, vec![json!({"id": 42, "model": "question"})])
        .failing_collection(2)
        .native_card(42, "SELECT 1");

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    assert!(root.join("1-ops").join("question-42.sql").is_file());
    let broken = read_json(&root.join("2-broken").join("collection-2-metadata.json"));
    assert_eq!(broken["_items"], json!([]));
    assert_eq!(report.degradations.count(ErrorKind::Transport), 1);
}

#[tokio::test]
async fn test_cyclic_listing_terminates() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let api = FakeMetabase::new()
        .root(json!({"id": 1, "slug": "a"}))
        .items(1, vec![json!({"id": 2, "model": "collection", "slug": "b"})])
        .items(2, vec![json!({"id": 1, "model": "collection", "slug": "a"})]);

    let report = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.degradations.count(ErrorKind::Cycle), 1);
    assert!(root.join("1-a").join("2-b").join("1-a").is_dir());
    assert!(report.commit.revision().is_some());
}

#[tokio::test]
async fn test_rejected_login_aborts_run() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let config = test_config();
    let mut api = ops_instance();
    api.reject_login = true;

    let err = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(!root.exists());
    assert_eq!(api.calls(), vec!["session".to_string()]);
}

#[tokio::test]
async fn test_archive_written_next_to_repo_once() {
    if !git_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    let mut config = test_config();
    config.repo.archive = true;
    let api = ops_instance();

    let first = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();
    let revision = first.commit.revision().unwrap().to_string();
    let expected = temp.path().join(archive_file_name(&revision));
    assert_eq!(first.archive, Some(expected.display().to_string()));
    assert!(expected.is_file());

    let second = SyncPipeline::new(&config, &api, root.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(second.archive, None);
    assert!(second.degradations.is_empty(), "{:?}", second.degradations);
}
