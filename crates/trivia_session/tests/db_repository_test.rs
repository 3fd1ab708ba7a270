//! Tests for the SQLite session store.

use diesel::{Connection, RunQueryDsl, SqliteConnection};
use tempfile::NamedTempFile;

use trivia_session::{
    CoordinatorOptions, LoadOutcome, Session, SessionHandle, SessionStore, SqliteSessionStore,
    StoreErrorKind, SubmissionKind, SubmitRequest, Team,
};

/// Creates a temporary database file and an opened store. The file handle
/// must stay in scope to keep the file alive.
fn setup_test_db() -> (NamedTempFile, SqliteSessionStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteSessionStore::open(db_path).expect("Failed to open store");
    (db_file, store)
}

fn teams() -> Vec<Team> {
    vec![Team::new("red", "Red"), Team::new("blue", "Blue")]
}

#[test]
fn test_load_empty_database_is_not_found() {
    let (_db, mut store) = setup_test_db();
    let err = store.load().expect_err("Empty store should not load");
    assert_eq!(err.kind, StoreErrorKind::NotFound);
}

#[test]
fn test_save_then_load() {
    let (_db, mut store) = setup_test_db();
    let session = Session::new("main".to_string(), teams());
    store.save(&session).expect("Save failed");
    let loaded = store.load().expect("Load failed");
    assert_eq!(loaded, session);
}

#[test]
fn test_save_replaces_single_record() {
    let (_db, mut store) = setup_test_db();
    store
        .save(&Session::new("first".to_string(), teams()))
        .expect("Save failed");
    store
        .save(&Session::new("second".to_string(), teams()))
        .expect("Save failed");
    assert_eq!(store.load().expect("Load failed").id(), "second");
}

#[test]
fn test_record_survives_reopen() {
    let (db, mut store) = setup_test_db();
    store
        .save(&Session::new("main".to_string(), teams()))
        .expect("Save failed");
    drop(store);

    let path = db.path().to_str().expect("Invalid path").to_string();
    let mut reopened = SqliteSessionStore::open(path).expect("Reopen failed");
    assert_eq!(reopened.load().expect("Load failed").teams().len(), 2);
}

#[test]
fn test_garbage_payload_is_corrupt() {
    let (db, mut store) = setup_test_db();
    let mut conn =
        SqliteConnection::establish(db.path().to_str().expect("Invalid path")).expect("Connect");
    diesel::sql_query("INSERT INTO session_records (id, payload) VALUES (1, '{not json')")
        .execute(&mut conn)
        .expect("Insert failed");

    let err = store.load().expect_err("Garbage should not load");
    assert_eq!(err.kind, StoreErrorKind::Corrupt);
}

#[tokio::test]
async fn test_coordinator_restores_scores_after_restart() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let path = db_file.path().to_str().expect("Invalid path").to_string();

    {
        let store = SqliteSessionStore::open(path.clone()).expect("Open failed");
        let (handle, outcome) =
            SessionHandle::spawn(store, CoordinatorOptions::new("main", teams())).expect("Spawn");
        assert_eq!(outcome, LoadOutcome::Fresh);

        let question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "text": "Capital of France?",
            "options": ["Paris", "Lyon"],
            "correctIndex": 0,
            "points": 100,
            "timeLimitSecs": 30,
            "roundType": "STANDARD",
            "difficulty": "EASY"
        }))
        .expect("Question JSON");
        handle.inject_question(question).await.expect("Inject");
        handle
            .set_status(trivia_session::SessionStatus::Live)
            .await
            .expect("Go live");
        handle
            .submit(SubmitRequest {
                team_id: "red".to_string(),
                question_id: "q1".to_string(),
                answer: Some(0),
                kind: SubmissionKind::Answer,
            })
            .await
            .expect("Submit");
        handle.reveal_and_score().await.expect("Reveal");
    }

    let store = SqliteSessionStore::open(path).expect("Reopen failed");
    let (handle, outcome) =
        SessionHandle::spawn(store, CoordinatorOptions::new("main", Vec::new())).expect("Spawn");
    assert_eq!(outcome, LoadOutcome::Restored);
    let session = handle.get_session().await.expect("Get");
    assert_eq!(*session.team("red").expect("red").score(), 100);
    assert_eq!(*session.team("blue").expect("blue").score(), 0);
}
