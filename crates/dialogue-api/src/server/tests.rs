use axum::body::Body;
use axum::http::Request as HttpRequest;
use contracts::{Speaker, Stage};
use tower::ServiceExt;

use super::*;

fn test_state(token: Option<&str>) -> AppState {
    let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
    let credentials = Arc::new(StaticCredentialProvider::new(token.map(str::to_string)));
    AppState::new(catalog, credentials, 5)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = HttpRequest::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn open_session(app: &Router, session_id: &str) {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({ "session_id": session_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn pagination_enforces_bounds() {
    let (start, end, next_cursor) = paginate(100, Some(10), Some(20)).expect("page should work");
    assert_eq!(start, 10);
    assert_eq!(end, 30);
    assert_eq!(next_cursor, Some(30));

    let (_, end, next_cursor) = paginate(3, None, Some(0)).expect("page size is clamped");
    assert_eq!(end, 1);
    assert_eq!(next_cursor, Some(1));

    let out_of_range = paginate(5, Some(10), Some(1));
    assert!(out_of_range.is_err());
}

#[test]
fn session_ids_are_validated() {
    assert!(validate_session_id("trainee-01.a_b").is_ok());
    assert!(validate_session_id("").is_err());
    assert!(validate_session_id("has space").is_err());
    assert!(new_session_id().starts_with("session_"));
}

#[tokio::test]
async fn full_session_over_http() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "walk").await;

    let (status, outcome) = call(&app, Method::POST, "/api/v1/sessions/walk/advance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["stage"], "prebrief");

    call(&app, Method::POST, "/api/v1/sessions/walk/advance", None).await;
    let (_, outcome) = call(
        &app,
        Method::POST,
        "/api/v1/sessions/walk/messages",
        Some(json!({ "text": "How much will this cost?" })),
    )
    .await;
    assert_eq!(outcome["stage"], "simulation");
    assert_eq!(outcome["appended"].as_array().map(Vec::len), Some(2));

    let (_, status_body) = call(&app, Method::GET, "/api/v1/sessions/walk/status", None).await;
    assert_eq!(status_body["progress"], 1);
    assert_eq!(status_body["rotation_counter"], 1);
    assert_eq!(status_body["active_speaker"], "antagonist");

    let (_, outcome) = call(&app, Method::POST, "/api/v1/sessions/walk/end", None).await;
    assert_eq!(outcome["stage"], "debrief");
}

#[tokio::test]
async fn rejected_action_is_reported_in_outcome() {
    let app = router(test_state(None));
    open_session(&app, "no_token").await;

    let (status, outcome) =
        call(&app, Method::POST, "/api/v1/sessions/no_token/advance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["stage"], "intro");
    assert_eq!(outcome["diagnostic"]["error_code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = router(test_state(Some("tok")));
    let (status, body) = call(&app, Method::GET, "/api/v1/sessions/missing/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn duplicate_session_id_conflicts() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "dup").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/sessions",
        Some(json!({ "session_id": "dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "SESSION_CONFLICT");
}

#[tokio::test]
async fn transcript_pages_follow_cursor() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "paged").await;
    call(&app, Method::POST, "/api/v1/sessions/paged/advance", None).await;
    call(&app, Method::POST, "/api/v1/sessions/paged/advance", None).await;

    let (_, page) = call(
        &app,
        Method::GET,
        "/api/v1/sessions/paged/transcript?page_size=2",
        None,
    )
    .await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["next_cursor"], 2);
    assert_eq!(page["turns"][0]["sequence"], 1);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/sessions/paged/transcript?cursor=9",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn snapshot_restores_under_new_id() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "origin").await;
    call(&app, Method::POST, "/api/v1/sessions/origin/advance", None).await;

    let (_, mut snapshot) = call(&app, Method::GET, "/api/v1/sessions/origin/snapshot", None).await;
    assert_eq!(snapshot["stage"], "prebrief");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/sessions/restore",
        Some(snapshot.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    snapshot["session_id"] = json!("copy");
    let (status, restored) =
        call(&app, Method::POST, "/api/v1/sessions/restore", Some(snapshot)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["status"]["stage"], "prebrief");
    assert!(restored["diagnostic"].is_null());

    let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    let ids = list["sessions"]
        .as_array()
        .expect("sessions")
        .iter()
        .map(|status| status["session_id"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["copy".to_string(), "origin".to_string()]);
}

#[tokio::test]
async fn unknown_stage_snapshot_restores_at_intro() {
    let app = router(test_state(Some("tok")));
    let snapshot = SessionSnapshot {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id: "odd".to_string(),
        stage: "warmup".to_string(),
        rotation_counter: 0,
        progress: 0,
        progress_threshold: None,
        turns: Vec::new(),
    };

    let (status, restored) = call(
        &app,
        Method::POST,
        "/api/v1/sessions/restore",
        Some(json!(snapshot)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["status"]["stage"], Stage::Intro.as_str());
    assert_eq!(restored["diagnostic"]["error_code"], "UNKNOWN_STAGE");
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "done").await;
    call(&app, Method::POST, "/api/v1/sessions/done/advance", None).await;

    let (status, closed) = call(&app, Method::DELETE, "/api/v1/sessions/done", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["session_id"], "done");
    assert_eq!(closed["stage"], "prebrief");

    let (status, body) = call(&app, Method::GET, "/api/v1/sessions/done/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "SESSION_NOT_FOUND");

    let (status, _) = call(&app, Method::DELETE, "/api/v1/sessions/done", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = call(&app, Method::GET, "/api/v1/sessions", None).await;
    assert!(list["sessions"].as_array().expect("sessions").is_empty());

    open_session(&app, "done").await;
    let (_, status_body) = call(&app, Method::GET, "/api/v1/sessions/done/status", None).await;
    assert_eq!(status_body["stage"], "intro");
}

#[tokio::test]
async fn snapshot_with_progress_past_threshold_is_rejected() {
    let app = router(test_state(Some("tok")));
    let snapshot = SessionSnapshot {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id: "skewed".to_string(),
        stage: "simulation".to_string(),
        rotation_counter: 0,
        progress: u32::MAX,
        progress_threshold: Some(5),
        turns: Vec::new(),
    };

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/sessions/restore",
        Some(json!(snapshot)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_QUERY");

    let (status, _) = call(&app, Method::GET, "/api/v1/sessions/skewed/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn render_status_is_echoed() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "render").await;

    let report = RenderReport {
        speaker: Speaker::Narrator,
        status: contracts::RenderStatus::Speaking,
        detail: None,
    };
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/sessions/render/render_status",
        Some(json!(report)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reports"][0]["status"], "speaking");

    let (_, status_body) = call(&app, Method::GET, "/api/v1/sessions/render/status", None).await;
    assert_eq!(status_body["stage"], "intro");
}

#[tokio::test]
async fn catalog_summary_lists_rules_in_order() {
    let app = router(test_state(Some("tok")));
    let (status, body) = call(&app, Method::GET, "/api/v1/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback_category"], "fallback");
    assert_eq!(body["rule_order"][0], "opening");
}

#[tokio::test]
async fn markdown_transcript_uses_short_labels() {
    let app = router(test_state(Some("tok")));
    open_session(&app, "md").await;
    call(&app, Method::POST, "/api/v1/sessions/md/advance", None).await;

    let response = app
        .clone()
        .oneshot(
            HttpRequest::builder()
                .uri("/api/v1/sessions/md/transcript/markdown")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let markdown = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(markdown.starts_with("**Noa**: "));
}
