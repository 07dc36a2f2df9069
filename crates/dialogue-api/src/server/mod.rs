use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use contracts::{
    ActionOutcome, ApiError, ErrorCode, HostAction, RenderReport, SessionSnapshot, SessionStatus,
    Turn, SCHEMA_VERSION_V1,
};
use dialogue_core::{Catalog, CatalogSummary, DialogueError, Session};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::{CredentialProvider, HostConfig, SessionApi, StaticCredentialProvider};

const DEFAULT_PAGE_SIZE: usize = 200;
const MAX_PAGE_SIZE: usize = 1000;

include!("error.rs");
include!("state.rs");
include!("routes/session.rs");
include!("routes/stream.rs");
include!("util.rs");

pub async fn serve(config: HostConfig) -> Result<(), ServerError> {
    let catalog = Arc::new(config.load_catalog()?);
    let credentials = Arc::new(StaticCredentialProvider::new(config.access_token.clone()));
    let state = AppState::new(catalog, credentials, config.progress_threshold);
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "rehearsal host listening");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/catalog", get(get_catalog))
        .route("/api/v1/sessions", post(create_session).get(list_sessions))
        .route("/api/v1/sessions/restore", post(restore_session))
        .route("/api/v1/sessions/{session_id}", delete(close_session))
        .route("/api/v1/sessions/{session_id}/status", get(get_status))
        .route("/api/v1/sessions/{session_id}/messages", post(submit_message))
        .route("/api/v1/sessions/{session_id}/advance", post(advance_session))
        .route("/api/v1/sessions/{session_id}/end", post(end_simulation))
        .route("/api/v1/sessions/{session_id}/restart", post(restart_session))
        .route("/api/v1/sessions/{session_id}/transcript", get(get_transcript))
        .route(
            "/api/v1/sessions/{session_id}/transcript/markdown",
            get(get_transcript_markdown),
        )
        .route("/api/v1/sessions/{session_id}/snapshot", get(get_snapshot))
        .route(
            "/api/v1/sessions/{session_id}/render_status",
            post(record_render_status),
        )
        .route("/api/v1/sessions/{session_id}/stream", get(stream_session))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests;
