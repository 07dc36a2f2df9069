//! Session state and the stage state machine.
//!
//! A `Session` owns its stage, transcript, rotation counter, and progress counter. Every host
//! action runs to completion against a checkpoint: if any step fails, the transcript and both
//! counters are restored and the action is reported back as ignored.

mod actions;
mod entry;
mod restore;

use std::sync::Arc;

use contracts::{SessionStatus, Speaker, Stage, Turn, DEFAULT_PROGRESS_THRESHOLD, SCHEMA_VERSION_V1};
use tracing::info;

use crate::bank::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::credential::CapabilityToken;
use crate::error::DialogueError;
use crate::selector::{self, RotationCounter};
use crate::transcript::ConversationLog;

pub use restore::Restored;

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    stage: Stage,
    log_len: usize,
    rotation: RotationCounter,
    progress: u32,
}

#[derive(Debug)]
pub struct Session {
    session_id: String,
    catalog: Arc<Catalog>,
    stage: Stage,
    log: ConversationLog,
    rotation: RotationCounter,
    progress: u32,
    progress_threshold: u32,
    credential: Option<CapabilityToken>,
    clock: Box<dyn Clock>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        Self {
            session_id: session_id.into(),
            catalog,
            stage: Stage::Intro,
            log: ConversationLog::new(),
            rotation: RotationCounter::default(),
            progress: 0,
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
            credential: None,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Exchanges after which the simulation hands over to the debrief. Clamped to at least one.
    pub fn with_progress_threshold(mut self, threshold: u32) -> Self {
        self.progress_threshold = threshold.max(1);
        self
    }

    pub fn with_credential(mut self, token: CapabilityToken) -> Self {
        self.credential = Some(token);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn turns(&self) -> &[Turn] {
        self.log.turns()
    }

    pub fn rotation(&self) -> RotationCounter {
        self.rotation
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn progress_threshold(&self) -> u32 {
        self.progress_threshold
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&CapabilityToken> {
        self.credential.as_ref()
    }

    pub fn set_credential(&mut self, token: CapabilityToken) {
        self.credential = Some(token);
    }

    pub fn clear_credential(&mut self) -> Option<CapabilityToken> {
        self.credential.take()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.session_id.clone(),
            stage: self.stage,
            active_speaker: self.stage.active_speaker(),
            progress: self.progress,
            progress_threshold: self.progress_threshold,
            rotation_counter: self.rotation.value(),
            turn_count: self.log.len(),
            credential_present: self.credential.is_some(),
        }
    }

    pub fn transcript_markdown(&self) -> String {
        self.log.render_markdown(self.catalog.roster())
    }

    /// Response category for trainee `text`. Only meaningful while the simulation runs.
    pub fn classify(&self, text: &str) -> Result<&str, DialogueError> {
        self.require_simulation("classify")?;
        Ok(self
            .catalog
            .classifier()
            .classify(text, self.catalog.bank()))
    }

    /// Next antagonist line for `category`, advancing the shared rotation counter.
    pub fn select_response(&mut self, category: &str) -> Result<String, DialogueError> {
        self.require_simulation("select_response")?;
        let selection = selector::select(self.catalog.bank(), category, &mut self.rotation)?;
        Ok(selection.line.to_string())
    }

    fn require_simulation(&self, operation: &'static str) -> Result<(), DialogueError> {
        if self.stage == Stage::Simulation {
            Ok(())
        } else {
            Err(DialogueError::OutsideSimulation {
                stage: self.stage,
                operation,
            })
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            stage: self.stage,
            log_len: self.log.len(),
            rotation: self.rotation,
            progress: self.progress,
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.stage = checkpoint.stage;
        self.log.truncate(checkpoint.log_len);
        self.rotation = checkpoint.rotation;
        self.progress = checkpoint.progress;
    }

    fn say(&mut self, speaker: Speaker, text: impl Into<String>) -> Result<(), DialogueError> {
        let timestamp = self.clock.now();
        self.log.append(speaker, text, timestamp)?;
        Ok(())
    }

    fn transition(&mut self, next: Stage) -> Result<(), DialogueError> {
        let previous = self.stage;
        self.stage = next;
        info!(
            session_id = %self.session_id,
            from = %previous,
            to = %next,
            "stage transition"
        );
        self.run_entry_effects()
    }
}
