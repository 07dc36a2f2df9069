//! v1 cross-boundary contracts for the dialogue core, the HTTP host, and avatar renderers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod render;

pub use render::{CharacterProfile, RenderReport, RenderStatus, Utterance};

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const DEFAULT_PROGRESS_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intro,
    Prebrief,
    Simulation,
    Debrief,
    End,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Intro,
        Stage::Prebrief,
        Stage::Simulation,
        Stage::Debrief,
        Stage::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Prebrief => "prebrief",
            Self::Simulation => "simulation",
            Self::Debrief => "debrief",
            Self::End => "end",
        }
    }

    /// Character the trainee is facing while this stage is active.
    pub fn active_speaker(&self) -> Speaker {
        match self {
            Self::Simulation => Speaker::Antagonist,
            Self::Intro | Self::Prebrief | Self::Debrief | Self::End => Speaker::Narrator,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stage value: {:?}", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| UnknownStage(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Narrator,
    Antagonist,
    Trainee,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narrator => "narrator",
            Self::Antagonist => "antagonist",
            Self::Trainee => "trainee",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript entry. `sequence` is 1-based and dense within a session run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub sequence: u64,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAction {
    SubmitText { text: String },
    Advance,
    EndSimulation,
    Restart,
}

impl HostAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SubmitText { .. } => "submit_text",
            Self::Advance => "advance",
            Self::EndSimulation => "end_simulation",
            Self::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionNotFound,
    SessionConflict,
    InvalidAction,
    InvalidTransition,
    InvalidQuery,
    UnknownStage,
    ConfigurationError,
    UpstreamUnavailable,
    ContractVersionUnsupported,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

/// Result of one host action: the stage after the action, every turn it appended, and a
/// diagnostic when the action was ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionOutcome {
    pub schema_version: String,
    pub session_id: String,
    pub action: String,
    pub previous_stage: Stage,
    pub stage: Stage,
    pub appended: Vec<Turn>,
    pub diagnostic: Option<ApiError>,
}

impl ActionOutcome {
    pub fn accepted(&self) -> bool {
        self.diagnostic.is_none()
    }

    pub fn transitioned(&self) -> bool {
        self.previous_stage != self.stage
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub schema_version: String,
    pub session_id: String,
    pub stage: Stage,
    pub active_speaker: Speaker,
    pub progress: u32,
    pub progress_threshold: u32,
    pub rotation_counter: u64,
    pub turn_count: usize,
    pub credential_present: bool,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session_id={} stage={} progress={}/{} rotation={} turns={}",
            self.session_id,
            self.stage,
            self.progress,
            self.progress_threshold,
            self.rotation_counter,
            self.turn_count
        )
    }
}

/// Portable session state. `stage` stays a raw string so that foreign or corrupted values
/// reach the core and go through stage recovery instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub schema_version: String,
    pub session_id: String,
    pub stage: String,
    pub rotation_counter: u64,
    pub progress: u32,
    #[serde(default)]
    pub progress_threshold: Option<u32>,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parses_case_insensitively() {
        assert_eq!(" Simulation ".parse::<Stage>(), Ok(Stage::Simulation));
        assert_eq!("END".parse::<Stage>(), Ok(Stage::End));
        assert_eq!(
            "warmup".parse::<Stage>(),
            Err(UnknownStage("warmup".to_string()))
        );
    }

    #[test]
    fn stage_wire_names_match_as_str() {
        for stage in Stage::ALL {
            let encoded = serde_json::to_string(&stage).expect("stage encodes");
            assert_eq!(encoded, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn host_action_uses_type_tag() {
        let parsed: HostAction =
            serde_json::from_str(r#"{"type":"submit_text","text":"hello"}"#).expect("action");
        assert_eq!(
            parsed,
            HostAction::SubmitText {
                text: "hello".to_string()
            }
        );
        let advance: HostAction = serde_json::from_str(r#"{"type":"advance"}"#).expect("advance");
        assert_eq!(advance.label(), "advance");
    }

    #[test]
    fn only_simulation_faces_the_antagonist() {
        assert_eq!(Stage::Simulation.active_speaker(), Speaker::Antagonist);
        assert_eq!(Stage::Debrief.active_speaker(), Speaker::Narrator);
    }
}
