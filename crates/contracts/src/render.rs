//! Renderer-facing contracts. The core never interprets render status.

use serde::{Deserialize, Serialize};

use crate::Speaker;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterProfile {
    pub display_name: String,
    pub short_name: String,
    pub role: String,
    pub avatar_id: String,
    pub voice_id: String,
}

/// A turn addressed to the avatar/voice renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utterance {
    pub sequence: u64,
    pub speaker: Speaker,
    pub display_name: String,
    pub avatar_id: Option<String>,
    pub voice_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Ready,
    Speaking,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderReport {
    pub speaker: Speaker,
    pub status: RenderStatus,
    #[serde(default)]
    pub detail: Option<String>,
}
