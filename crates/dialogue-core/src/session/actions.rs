use contracts::{ActionOutcome, HostAction};
use tracing::{debug, warn};

use super::*;

impl Session {
    pub fn apply(&mut self, action: HostAction) -> ActionOutcome {
        match action {
            HostAction::SubmitText { text } => self.submit_text(&text),
            HostAction::Advance => self.advance(),
            HostAction::EndSimulation => self.end_simulation(),
            HostAction::Restart => self.restart(),
        }
    }

    pub fn submit_text(&mut self, text: &str) -> ActionOutcome {
        self.run_action("submit_text", |session| session.handle_text(text))
    }

    /// Explicit stage advance: intro to prebrief, prebrief to simulation, debrief to end.
    pub fn advance(&mut self) -> ActionOutcome {
        self.run_action("advance", Self::handle_advance)
    }

    pub fn end_simulation(&mut self) -> ActionOutcome {
        self.run_action("end_simulation", |session| match session.stage {
            Stage::Simulation => session.transition(Stage::Debrief),
            stage => Err(DialogueError::InvalidTransition {
                stage,
                action: "end_simulation",
            }),
        })
    }

    /// Back to a fresh intro. The capability token survives the reset.
    pub fn restart(&mut self) -> ActionOutcome {
        self.run_action("restart", |session| match session.stage {
            Stage::End => {
                session.log.clear();
                session.rotation = RotationCounter::default();
                session.progress = 0;
                session.transition(Stage::Intro)
            }
            stage => Err(DialogueError::InvalidTransition {
                stage,
                action: "restart",
            }),
        })
    }

    fn run_action(
        &mut self,
        action: &'static str,
        handler: impl FnOnce(&mut Self) -> Result<(), DialogueError>,
    ) -> ActionOutcome {
        let checkpoint = self.checkpoint();

        let diagnostic = match handler(self) {
            Ok(()) => None,
            Err(err) => {
                self.rollback(checkpoint);
                warn!(
                    session_id = %self.session_id,
                    stage = %self.stage,
                    action,
                    error = %err,
                    "action ignored"
                );
                Some(err.to_api_error())
            }
        };

        let appended = if self.log.len() >= checkpoint.log_len {
            self.log.turns()[checkpoint.log_len..].to_vec()
        } else {
            self.log.turns().to_vec()
        };

        ActionOutcome {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.session_id.clone(),
            action: action.to_string(),
            previous_stage: checkpoint.stage,
            stage: self.stage,
            appended,
            diagnostic,
        }
    }

    fn handle_text(&mut self, text: &str) -> Result<(), DialogueError> {
        match self.stage {
            stage @ (Stage::Intro | Stage::End) => Err(DialogueError::InvalidTransition {
                stage,
                action: "submit_text",
            }),
            _ if text.trim().is_empty() => Err(DialogueError::EmptyMessage),
            Stage::Prebrief => {
                self.say(Speaker::Trainee, text)?;
                let ack = self.catalog.scripts().prebrief_ack.clone();
                self.say(Speaker::Narrator, ack)
            }
            Stage::Simulation => self.handle_exchange(text),
            Stage::Debrief => {
                self.say(Speaker::Trainee, text)?;
                let prompt = self.catalog.scripts().debrief_prompt.clone();
                self.say(Speaker::Narrator, prompt)
            }
        }
    }

    fn handle_exchange(&mut self, text: &str) -> Result<(), DialogueError> {
        let progress = self
            .progress
            .checked_add(1)
            .ok_or(DialogueError::CounterOverflow("progress"))?;
        let category = self.classify(text)?.to_string();
        let reply = self.select_response(&category)?;
        debug!(
            session_id = %self.session_id,
            category = %category,
            rotation = self.rotation.value(),
            "antagonist reply selected"
        );

        self.say(Speaker::Trainee, text)?;
        self.say(Speaker::Antagonist, reply)?;
        self.progress = progress;

        if self.progress >= self.progress_threshold {
            let sign_off = self.catalog.sign_off().to_string();
            self.say(Speaker::Antagonist, sign_off)?;
            self.transition(Stage::Debrief)?;
        }
        Ok(())
    }

    fn handle_advance(&mut self) -> Result<(), DialogueError> {
        match self.stage {
            Stage::Intro => {
                if self.credential.is_none() {
                    return Err(DialogueError::CredentialMissing);
                }
                self.transition(Stage::Prebrief)
            }
            Stage::Prebrief => {
                let transition = self.catalog.scripts().transition.clone();
                self.say(Speaker::Narrator, transition)?;
                self.transition(Stage::Simulation)
            }
            Stage::Debrief => self.transition(Stage::End),
            stage @ (Stage::Simulation | Stage::End) => Err(DialogueError::InvalidTransition {
                stage,
                action: "advance",
            }),
        }
    }
}
