//! Host facade over a dialogue session: credential acquisition, render bookkeeping, an action
//! audit log, and the HTTP/WebSocket server.

mod config;
mod credentials;
mod server;

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{
    ActionOutcome, ErrorCode, HostAction, RenderReport, SessionSnapshot, SessionStatus, Speaker,
    Stage, Turn, Utterance,
};
use dialogue_core::{Catalog, Session};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use config::{ConfigError, HostConfig, DEFAULT_BIND_ADDR};
pub use credentials::{CredentialProvider, StaticCredentialProvider, UpstreamError};
pub use server::{router, serve, AppState, ServerError};

/// Audit entry for one submitted host action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    pub index: u64,
    pub action: String,
    pub previous_stage: Stage,
    pub stage: Stage,
    pub accepted: bool,
    pub appended_turns: usize,
    pub error_code: Option<ErrorCode>,
}

pub struct SessionApi {
    session: Session,
    credentials: Arc<dyn CredentialProvider>,
    action_log: Vec<ActionRecord>,
    render_status: BTreeMap<Speaker, RenderReport>,
    last_upstream_error: Option<String>,
}

impl std::fmt::Debug for SessionApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionApi")
            .field("session", &self.session)
            .field("action_log", &self.action_log.len())
            .field("render_status", &self.render_status)
            .field("last_upstream_error", &self.last_upstream_error)
            .finish()
    }
}

impl SessionApi {
    pub fn new(session: Session, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            session,
            credentials,
            action_log: Vec::new(),
            render_status: BTreeMap::new(),
            last_upstream_error: None,
        }
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        self.session.catalog()
    }

    pub fn submit(&mut self, action: HostAction) -> ActionOutcome {
        let upstream_error =
            if matches!(action, HostAction::Advance) && self.session.stage() == Stage::Intro {
                self.ensure_credential().err()
            } else {
                None
            };

        let mut outcome = self.session.apply(action);
        if let (Some(diagnostic), Some(err)) = (outcome.diagnostic.as_mut(), upstream_error) {
            if diagnostic.error_code == ErrorCode::UpstreamUnavailable {
                diagnostic.details = Some(err.to_string());
            }
        }

        self.action_log.push(ActionRecord {
            index: self.action_log.len() as u64,
            action: outcome.action.clone(),
            previous_stage: outcome.previous_stage,
            stage: outcome.stage,
            accepted: outcome.accepted(),
            appended_turns: outcome.appended.len(),
            error_code: outcome
                .diagnostic
                .as_ref()
                .map(|diagnostic| diagnostic.error_code),
        });
        outcome
    }

    /// Requests a capability token unless the session already holds one. Nothing is retried.
    pub fn ensure_credential(&mut self) -> Result<(), UpstreamError> {
        if self.session.has_credential() {
            return Ok(());
        }

        match self.credentials.issue() {
            Ok(token) => {
                info!(session_id = %self.session.session_id(), "capability token acquired");
                self.session.set_credential(token);
                self.last_upstream_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(
                    session_id = %self.session.session_id(),
                    error = %err,
                    "capability token request failed"
                );
                self.last_upstream_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Drops the held token so the next advance out of intro requests a fresh one.
    pub fn invalidate_credential(&mut self) -> bool {
        self.session.clear_credential().is_some()
    }

    pub fn last_upstream_error(&self) -> Option<&str> {
        self.last_upstream_error.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn transcript(&self) -> &[Turn] {
        self.session.turns()
    }

    pub fn transcript_markdown(&self) -> String {
        self.session.transcript_markdown()
    }

    pub fn utterance(&self, turn: &Turn) -> Utterance {
        let roster = self.session.catalog().roster();
        let profile = roster.profile(turn.speaker);
        Utterance {
            sequence: turn.sequence,
            speaker: turn.speaker,
            display_name: roster.display_name(turn.speaker).to_string(),
            avatar_id: profile.map(|profile| profile.avatar_id.clone()),
            voice_id: profile.map(|profile| profile.voice_id.clone()),
            text: turn.text.clone(),
        }
    }

    /// Renderer payloads for every turn after `sequence`.
    pub fn utterances_since(&self, sequence: u64) -> Vec<Utterance> {
        self.session
            .log()
            .since(sequence)
            .iter()
            .map(|turn| self.utterance(turn))
            .collect()
    }

    /// Stores the latest renderer report per speaker. The dialogue never reads it back.
    pub fn record_render_status(&mut self, report: RenderReport) {
        self.render_status.insert(report.speaker, report);
    }

    pub fn render_status(&self) -> Vec<RenderReport> {
        self.render_status.values().cloned().collect()
    }

    pub fn action_log(&self) -> &[ActionRecord] {
        &self.action_log
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use contracts::RenderStatus;
    use dialogue_core::SteppedClock;

    use super::*;

    fn api_with(token: Option<&str>) -> SessionApi {
        let catalog = Arc::new(Catalog::builtin().expect("builtin catalog"));
        let session = Session::new("api_test", catalog).with_clock(SteppedClock::default());
        let provider = StaticCredentialProvider::new(token.map(str::to_string));
        SessionApi::new(session, Arc::new(provider))
    }

    #[test]
    fn advance_requests_token_once() {
        let mut api = api_with(Some("tok"));
        let outcome = api.submit(HostAction::Advance);

        assert_eq!(outcome.stage, Stage::Prebrief);
        assert!(api.status().credential_present);
        assert!(api.last_upstream_error().is_none());
    }

    #[test]
    fn missing_token_surfaces_upstream_diagnostic() {
        let mut api = api_with(None);
        let outcome = api.submit(HostAction::Advance);

        assert_eq!(outcome.stage, Stage::Intro);
        let diagnostic = outcome.diagnostic.expect("diagnostic");
        assert_eq!(diagnostic.error_code, ErrorCode::UpstreamUnavailable);
        assert!(diagnostic
            .details
            .as_deref()
            .is_some_and(|details| details.contains("no access token")));
        assert!(api.last_upstream_error().is_some());
        assert_eq!(
            api.action_log()[0].error_code,
            Some(ErrorCode::UpstreamUnavailable)
        );
    }

    #[test]
    fn invalidated_token_is_requested_again_after_restart() {
        let mut api = api_with(Some("tok"));
        api.submit(HostAction::Advance);
        assert!(api.invalidate_credential());
        assert!(!api.status().credential_present);
        assert!(!api.invalidate_credential());

        api.submit(HostAction::Advance);
        api.submit(HostAction::EndSimulation);
        api.submit(HostAction::Advance);
        api.submit(HostAction::Restart);
        assert_eq!(api.status().stage, Stage::Intro);

        let outcome = api.submit(HostAction::Advance);
        assert_eq!(outcome.stage, Stage::Prebrief);
        assert!(api.status().credential_present);
    }

    #[test]
    fn action_log_records_accepted_and_rejected() {
        let mut api = api_with(Some("tok"));
        api.submit(HostAction::SubmitText {
            text: "too early".to_string(),
        });
        api.submit(HostAction::Advance);

        let log = api.action_log();
        assert_eq!(log.len(), 2);
        assert!(!log[0].accepted);
        assert_eq!(log[0].error_code, Some(ErrorCode::InvalidTransition));
        assert!(log[1].accepted);
        assert_eq!(log[1].appended_turns, 1);
        assert_eq!(log[1].index, 1);
    }

    #[test]
    fn utterances_carry_renderer_identity() {
        let mut api = api_with(Some("tok"));
        api.submit(HostAction::Advance);
        api.submit(HostAction::Advance);

        let utterances = api.utterances_since(1);
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].speaker, Speaker::Narrator);
        assert_eq!(utterances[1].speaker, Speaker::Antagonist);
        assert_eq!(utterances[1].display_name, "Sam Richards");
        assert!(utterances[1].avatar_id.is_some());
        assert!(utterances[1].voice_id.is_some());
    }

    #[test]
    fn render_status_is_stored_not_interpreted() {
        let mut api = api_with(Some("tok"));
        let before = api.status();
        api.record_render_status(RenderReport {
            speaker: Speaker::Antagonist,
            status: RenderStatus::Error,
            detail: Some("stream dropped".to_string()),
        });
        api.record_render_status(RenderReport {
            speaker: Speaker::Antagonist,
            status: RenderStatus::Ready,
            detail: None,
        });

        let reports = api.render_status();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, RenderStatus::Ready);
        assert_eq!(api.status(), before);
    }
}
