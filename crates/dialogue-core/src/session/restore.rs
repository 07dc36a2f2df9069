use contracts::{ApiError, SessionSnapshot};
use tracing::error;

use super::*;

/// A session rebuilt from a snapshot, with the stage-recovery diagnostic if one was needed.
#[derive(Debug)]
pub struct Restored {
    pub session: Session,
    pub diagnostic: Option<ApiError>,
    pub appended: Vec<Turn>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            session_id: self.session_id.clone(),
            stage: self.stage.as_str().to_string(),
            rotation_counter: self.rotation.value(),
            progress: self.progress,
            progress_threshold: Some(self.progress_threshold),
            turns: self.log.turns().to_vec(),
        }
    }

    /// Rebuilds a session from `snapshot`. An unrecognized stage puts the session back at
    /// intro and reports the anomaly instead of failing; malformed turns are rejected.
    pub fn restore(
        catalog: Arc<Catalog>,
        snapshot: SessionSnapshot,
    ) -> Result<Restored, DialogueError> {
        Self::restore_with_clock(catalog, snapshot, SystemClock)
    }

    pub fn restore_with_clock(
        catalog: Arc<Catalog>,
        snapshot: SessionSnapshot,
        clock: impl Clock + 'static,
    ) -> Result<Restored, DialogueError> {
        if snapshot.schema_version != SCHEMA_VERSION_V1 {
            return Err(DialogueError::SchemaVersion {
                got: snapshot.schema_version,
                expected: SCHEMA_VERSION_V1,
            });
        }

        let log = ConversationLog::from_turns(snapshot.turns)?;
        let (stage, diagnostic) = match snapshot.stage.parse::<Stage>() {
            Ok(stage) => (stage, None),
            Err(unknown) => {
                let err = DialogueError::UnknownStage(unknown.0);
                error!(
                    session_id = %snapshot.session_id,
                    error = %err,
                    "recovering session at intro"
                );
                (Stage::Intro, Some(err.to_api_error()))
            }
        };

        let mut session = Session::new(snapshot.session_id, catalog).with_clock(clock);
        if let Some(threshold) = snapshot.progress_threshold {
            session = session.with_progress_threshold(threshold);
        }
        session.stage = stage;
        session.log = log;
        session.rotation = RotationCounter::new(snapshot.rotation_counter);
        if snapshot.progress > session.progress_threshold {
            return Err(DialogueError::InvalidSnapshot(format!(
                "progress {} exceeds progress_threshold {}",
                snapshot.progress, session.progress_threshold
            )));
        }
        session.progress = snapshot.progress;

        let before = session.log.len();
        session.run_entry_effects()?;
        let appended = session.log.turns()[before..].to_vec();

        Ok(Restored {
            session,
            diagnostic,
            appended,
        })
    }
}
