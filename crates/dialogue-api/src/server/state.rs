type SessionHandle = Arc<Mutex<SessionApi>>;

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    credentials: Arc<dyn CredentialProvider>,
    progress_threshold: u32,
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        credentials: Arc<dyn CredentialProvider>,
        progress_threshold: u32,
    ) -> Self {
        let (stream_tx, _) = broadcast::channel(1024);
        Self {
            catalog,
            credentials,
            progress_threshold,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            stream_tx,
        }
    }

    fn open_session(&self, session: Session) -> SessionApi {
        SessionApi::new(session, self.credentials.clone())
    }
}

/// Looks the session up and releases the map lock before the caller locks the session itself.
async fn require_session(state: &AppState, session_id: &str) -> Result<SessionHandle, HttpApiError> {
    let sessions = state.sessions.lock().await;
    sessions
        .get(session_id)
        .cloned()
        .ok_or_else(|| HttpApiError::session_not_found(session_id))
}

async fn insert_session(state: &AppState, api: SessionApi) -> Result<(), HttpApiError> {
    let session_id = api.session_id().to_string();
    let mut sessions = state.sessions.lock().await;
    if sessions.contains_key(&session_id) {
        return Err(HttpApiError::session_conflict(&session_id));
    }
    sessions.insert(session_id, Arc::new(Mutex::new(api)));
    Ok(())
}

async fn remove_session(state: &AppState, session_id: &str) -> Result<SessionHandle, HttpApiError> {
    let mut sessions = state.sessions.lock().await;
    sessions
        .remove(session_id)
        .ok_or_else(|| HttpApiError::session_not_found(session_id))
}

fn outcome_messages(api: &SessionApi, outcome: &ActionOutcome) -> Vec<StreamMessage> {
    let mut messages = outcome
        .appended
        .iter()
        .map(|turn| StreamMessage::turn_appended(api, turn))
        .collect::<Vec<_>>();

    if outcome.transitioned() || !outcome.appended.is_empty() {
        messages.push(StreamMessage::session_status(&api.status()));
    }

    if let Some(diagnostic) = &outcome.diagnostic {
        messages.push(StreamMessage::warning(
            api.session_id(),
            api.status().turn_count as u64,
            diagnostic.message.clone(),
        ));
    }

    messages
}

fn broadcast_messages(state: &AppState, messages: Vec<StreamMessage>) {
    for message in messages {
        let _ = state.stream_tx.send(message);
    }
}
