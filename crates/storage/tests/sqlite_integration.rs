use progress_core::model::{ActivityDocument, ExerciseId, ExerciseInput};
use progress_core::time::fixed_now;
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

fn utc() -> chrono::FixedOffset {
    chrono::FixedOffset::east_opt(0).unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_activity_document() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let mut doc = ActivityDocument::empty();
    doc.record_exercise(
        ExerciseId::new("ex1"),
        ExerciseInput::default().with_time_spent(10),
        fixed_now(),
        utc(),
    );
    let json = serde_json::to_string(&doc).unwrap();
    repo.set("activityTracker", &json).await.unwrap();

    let stored = repo.get("activityTracker").await.unwrap().expect("stored");
    let loaded = ActivityDocument::from_stored(serde_json::from_str(&stored).unwrap()).unwrap();
    assert!(!loaded.migrated);
    assert_eq!(loaded.document, doc);
}

#[tokio::test]
async fn sqlite_set_overwrites_and_remove_deletes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // A second migration run is a no-op.
    repo.migrate().await.expect("migrate twice");

    repo.set("k", "first").await.unwrap();
    repo.set("k", "second").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("second"));

    repo.remove("k").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap(), None);
    repo.remove("k").await.unwrap();
}

#[tokio::test]
async fn sqlite_storage_keeps_session_scope_in_memory() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_scopes?mode=memory&cache=shared")
        .await
        .expect("storage");

    storage.session.set("activitySession", "{}").await.unwrap();
    assert_eq!(storage.persistent.get("activitySession").await.unwrap(), None);
    assert!(storage.session.get("activitySession").await.unwrap().is_some());
}
