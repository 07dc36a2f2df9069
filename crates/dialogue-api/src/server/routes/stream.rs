async fn stream_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, HttpApiError> {
    let initial_message = {
        let handle = require_session(&state, &session_id).await?;
        let status = handle.lock().await.status();
        StreamMessage::session_status(&status)
    };

    Ok(ws.on_upgrade(move |socket| stream_socket(socket, state, session_id, initial_message)))
}

async fn stream_socket(
    mut socket: WebSocket,
    state: AppState,
    session_id: String,
    initial_message: StreamMessage,
) {
    if send_stream_message(&mut socket, &initial_message)
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.stream_tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Ok(message) => {
                        if message.session_id != session_id {
                            continue;
                        }

                        if send_stream_message(&mut socket, &message).await.is_err() {
                            break;
                        }
                        if message.message_type == SESSION_CLOSED {
                            let _ = socket.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        let warning = StreamMessage::warning(
                            &session_id,
                            0,
                            format!("stream client lagged and skipped {skipped} message(s); refetch the transcript"),
                        );

                        if send_stream_message(&mut socket, &warning).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

async fn send_stream_message(
    socket: &mut WebSocket,
    message: &StreamMessage,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

const SESSION_CLOSED: &str = "session.closed";

#[derive(Debug, Clone, Serialize)]
struct StreamMessage {
    schema_version: String,
    #[serde(rename = "type")]
    message_type: String,
    session_id: String,
    sequence: u64,
    reconnect_token: String,
    payload: Value,
}

impl StreamMessage {
    /// Carries the renderer payload so an avatar client can speak the turn without a refetch.
    fn turn_appended(api: &SessionApi, turn: &Turn) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "turn.appended".to_string(),
            session_id: api.session_id().to_string(),
            sequence: turn.sequence,
            reconnect_token: reconnect_token("turn", turn.sequence),
            payload: json!({
                "turn": turn,
                "utterance": api.utterance(turn),
            }),
        }
    }

    fn session_status(status: &SessionStatus) -> Self {
        let sequence = status.turn_count as u64;
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "session.status".to_string(),
            session_id: status.session_id.clone(),
            sequence,
            reconnect_token: reconnect_token("status", sequence),
            payload: json!(status),
        }
    }

    fn session_closed(status: &SessionStatus) -> Self {
        let sequence = status.turn_count as u64;
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: SESSION_CLOSED.to_string(),
            session_id: status.session_id.clone(),
            sequence,
            reconnect_token: reconnect_token("closed", sequence),
            payload: json!(status),
        }
    }

    fn render_status(session_id: &str, report: &RenderReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "render.status".to_string(),
            session_id: session_id.to_string(),
            sequence: 0,
            reconnect_token: reconnect_token("render", 0),
            payload: json!(report),
        }
    }

    fn warning(session_id: &str, sequence: u64, warning: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "warning".to_string(),
            session_id: session_id.to_string(),
            sequence,
            reconnect_token: reconnect_token("warning", sequence),
            payload: json!({ "message": warning }),
        }
    }
}
