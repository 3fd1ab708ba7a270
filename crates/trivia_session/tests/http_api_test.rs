//! Tests for the HTTP facade.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use trivia_session::{CoordinatorOptions, MemorySessionStore, SessionHandle, Team, router};

fn app() -> (Router, MemorySessionStore) {
    let store = MemorySessionStore::new();
    let teams = vec![Team::new("red", "Red"), Team::new("blue", "Blue")];
    let (handle, _) =
        SessionHandle::spawn(store.clone(), CoordinatorOptions::new("main", teams)).expect("Spawn");
    (router(handle), store)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .expect("Valid request");
    let response = app.clone().oneshot(request).await.expect("Infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body readable")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

fn question(id: &str, round: &str) -> Value {
    json!({
        "id": id,
        "text": "Which element has the symbol Fe?",
        "options": ["Iron", "Fluorine", "Lead"],
        "correctIndex": 0,
        "explanation": "Fe comes from the Latin ferrum.",
        "hint": "It rusts.",
        "points": 100,
        "timeLimitSecs": 30,
        "roundType": round,
        "difficulty": "EASY"
    })
}

#[tokio::test]
async fn test_get_session_uses_wire_names() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PREVIEW");
    assert_eq!(body["nextRoundType"], "STANDARD");
    assert_eq!(body["askAiState"], "IDLE");
    assert_eq!(body["teams"][0]["id"], "red");
    assert_eq!(body["teams"][0]["score"], 0);
}

#[tokio::test]
async fn test_full_standard_round_over_http() {
    let (app, _) = app();
    let (status, _) = call(&app, "POST", "/session/question", Some(question("q1", "STANDARD"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/session/status", Some(json!({"status": "LIVE"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "LIVE");
    assert_eq!(body["session"]["isReading"], true);

    let (status, _) = call(&app, "POST", "/session/reading/complete", None).await;
    assert_eq!(status, StatusCode::OK);

    let submit = json!({"teamId": "red", "questionId": "q1", "answer": 0, "type": "ANSWER"});
    let (status, body) = call(&app, "POST", "/session/submit", Some(submit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["outcome"], "RECORDED");
    assert_eq!(body["outcome"]["correct"], true);

    let (status, body) = call(&app, "POST", "/session/reveal", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changes"][0]["teamId"], "red");
    assert_eq!(body["changes"][0]["delta"], 100);
    assert_eq!(body["session"]["teams"][0]["score"], 100);

    let (status, body) = call(&app, "POST", "/session/explanation/reveal", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["explanationVisible"], true);
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let (app, _) = app();
    let (status, body) = call(&app, "POST", "/session/status", Some(json!({"status": "LIVE"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_unknown_team_is_not_found() {
    let (app, _) = app();
    call(&app, "POST", "/session/question", Some(question("q1", "STANDARD"))).await;
    let (status, _) = call(
        &app,
        "POST",
        "/session/hint/request",
        Some(json!({"teamId": "green"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let (app, _) = app();
    let (status, body) = call(&app, "POST", "/session/status", Some(json!({"status": "PAUSED"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, "POST", "/session/submit", Some(json!({"teamId": "red"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ask_ai_payload_is_validated() {
    let (app, _) = app();
    call(&app, "POST", "/session/question", Some(question("q1", "ASK_AI"))).await;

    let (status, body) = call(
        &app,
        "POST",
        "/session/ask-ai/state",
        Some(json!({"state": "LISTENING"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["askAiState"], "LISTENING");

    let (status, _) = call(
        &app,
        "POST",
        "/session/ask-ai/state",
        Some(json!({"state": "PROCESSING", "question": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "POST",
        "/session/ask-ai/judge",
        Some(json!({"verdict": "AI_WRONG"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_question_source_is_bad_gateway() {
    let (app, _) = app();
    let (status, _) = call(
        &app,
        "POST",
        "/session/question/next",
        Some(json!({"difficulty": "HARD"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_store_failure_is_service_unavailable() {
    let (app, store) = app();
    store.set_fail_saves(true);
    let (status, _) = call(
        &app,
        "POST",
        "/session/next-round-type",
        Some(json!({"roundType": "BUZZER"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = call(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nextRoundType"], "STANDARD");
}
