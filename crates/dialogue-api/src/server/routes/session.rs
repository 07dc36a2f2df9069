#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    progress_threshold: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    schema_version: String,
    session_id: String,
    status: SessionStatus,
}

#[derive(Debug, Serialize)]
struct ListSessionsResponse {
    schema_version: String,
    sessions: Vec<SessionStatus>,
}

#[derive(Debug, Deserialize)]
struct SubmitTextRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptQuery {
    cursor: Option<usize>,
    page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
struct TranscriptPage {
    schema_version: String,
    session_id: String,
    total: usize,
    next_cursor: Option<usize>,
    turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
struct RestoreResponse {
    schema_version: String,
    session_id: String,
    status: SessionStatus,
    appended: Vec<Turn>,
    diagnostic: Option<ApiError>,
}

#[derive(Debug, Serialize)]
struct RenderStatusResponse {
    schema_version: String,
    session_id: String,
    reports: Vec<RenderReport>,
}

async fn get_catalog(State(state): State<AppState>) -> Json<CatalogSummary> {
    Json(state.catalog.summary())
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, HttpApiError> {
    let session_id = match request.session_id {
        Some(requested) => validate_session_id(&requested)?,
        None => new_session_id(),
    };
    let threshold = match request.progress_threshold {
        Some(0) => {
            return Err(HttpApiError::invalid_query(
                "progress_threshold must be at least 1",
                None,
            ))
        }
        Some(threshold) => threshold,
        None => state.progress_threshold,
    };

    let session = Session::new(session_id.clone(), state.catalog.clone())
        .with_progress_threshold(threshold);
    let api = state.open_session(session);
    let status = api.status();
    insert_session(&state, api).await?;

    info!(session_id = %session_id, progress_threshold = threshold, "session opened");
    broadcast_messages(&state, vec![StreamMessage::session_status(&status)]);

    Ok(Json(CreateSessionResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id,
        status,
    }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let handles = {
        let sessions = state.sessions.lock().await;
        sessions.values().cloned().collect::<Vec<_>>()
    };

    let mut statuses = Vec::with_capacity(handles.len());
    for handle in handles {
        statuses.push(handle.lock().await.status());
    }
    statuses.sort_by(|a, b| a.session_id.cmp(&b.session_id));

    Json(ListSessionsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        sessions: statuses,
    })
}

/// Drops the session and its transcript. Open streams receive `session.closed` and end.
async fn close_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let handle = remove_session(&state, &session_id).await?;
    let status = handle.lock().await.status();

    info!(session_id = %session_id, stage = %status.stage, "session closed");
    broadcast_messages(&state, vec![StreamMessage::session_closed(&status)]);
    Ok(Json(status))
}

async fn get_status(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, HttpApiError> {
    let handle = require_session(&state, &session_id).await?;
    let status = handle.lock().await.status();
    Ok(Json(status))
}

async fn submit_message(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<SubmitTextRequest>,
) -> Result<Json<ActionOutcome>, HttpApiError> {
    apply_action(
        &state,
        &session_id,
        HostAction::SubmitText { text: request.text },
    )
    .await
}

async fn advance_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActionOutcome>, HttpApiError> {
    apply_action(&state, &session_id, HostAction::Advance).await
}

async fn end_simulation(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActionOutcome>, HttpApiError> {
    apply_action(&state, &session_id, HostAction::EndSimulation).await
}

async fn restart_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActionOutcome>, HttpApiError> {
    apply_action(&state, &session_id, HostAction::Restart).await
}

async fn apply_action(
    state: &AppState,
    session_id: &str,
    action: HostAction,
) -> Result<Json<ActionOutcome>, HttpApiError> {
    let handle = require_session(state, session_id).await?;
    let (outcome, messages) = {
        let mut api = handle.lock().await;
        let outcome = api.submit(action);
        let messages = outcome_messages(&api, &outcome);
        (outcome, messages)
    };

    broadcast_messages(state, messages);
    Ok(Json(outcome))
}

async fn get_transcript(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<TranscriptPage>, HttpApiError> {
    let handle = require_session(&state, &session_id).await?;
    let api = handle.lock().await;
    let turns = api.transcript();
    let (start, end, next_cursor) = paginate(turns.len(), query.cursor, query.page_size)?;

    Ok(Json(TranscriptPage {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id,
        total: turns.len(),
        next_cursor,
        turns: turns[start..end].to_vec(),
    }))
}

async fn get_transcript_markdown(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, HttpApiError> {
    let handle = require_session(&state, &session_id).await?;
    let markdown = handle.lock().await.transcript_markdown();
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    )
        .into_response())
}

async fn get_snapshot(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, HttpApiError> {
    let handle = require_session(&state, &session_id).await?;
    let snapshot = handle.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn restore_session(
    State(state): State<AppState>,
    Json(snapshot): Json<SessionSnapshot>,
) -> Result<Json<RestoreResponse>, HttpApiError> {
    let session_id = validate_session_id(&snapshot.session_id)?;
    let restored =
        Session::restore(state.catalog.clone(), snapshot).map_err(HttpApiError::from_dialogue)?;

    let api = state.open_session(restored.session);
    let status = api.status();
    let mut messages = restored
        .appended
        .iter()
        .map(|turn| StreamMessage::turn_appended(&api, turn))
        .collect::<Vec<_>>();
    messages.push(StreamMessage::session_status(&status));
    insert_session(&state, api).await?;

    info!(session_id = %session_id, stage = %status.stage, "session restored");
    broadcast_messages(&state, messages);

    Ok(Json(RestoreResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id,
        status,
        appended: restored.appended,
        diagnostic: restored.diagnostic,
    }))
}

async fn record_render_status(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(report): Json<RenderReport>,
) -> Result<Json<RenderStatusResponse>, HttpApiError> {
    let handle = require_session(&state, &session_id).await?;
    let reports = {
        let mut api = handle.lock().await;
        api.record_render_status(report.clone());
        api.render_status()
    };

    broadcast_messages(
        &state,
        vec![StreamMessage::render_status(&session_id, &report)],
    );

    Ok(Json(RenderStatusResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        session_id,
        reports,
    }))
}
