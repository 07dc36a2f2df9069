use chrono::{DateTime, Utc};
use contracts::{Speaker, Turn};

use crate::error::DialogueError;
use crate::roster::Roster;

/// Append-only transcript of one session run. Cleared only by a session restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_turns(turns: Vec<Turn>) -> Result<Self, DialogueError> {
        let mut log = Self::new();
        for turn in turns {
            log.append(turn.speaker, turn.text, turn.timestamp)?;
        }
        Ok(log)
    }

    pub(crate) fn append(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<&Turn, DialogueError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DialogueError::EmptyTurn);
        }
        let sequence = self.turns.len() as u64 + 1;
        self.turns.push(Turn {
            sequence,
            speaker,
            text,
            timestamp,
        });
        Ok(&self.turns[self.turns.len() - 1])
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Turns with a sequence number greater than `sequence`.
    pub fn since(&self, sequence: u64) -> &[Turn] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.turns.len());
        &self.turns[start..]
    }

    pub fn has_speaker(&self, speaker: Speaker) -> bool {
        self.turns.iter().any(|turn| turn.speaker == speaker)
    }

    pub fn contains(&self, speaker: Speaker, text: &str) -> bool {
        self.turns
            .iter()
            .any(|turn| turn.speaker == speaker && turn.text == text)
    }

    pub fn count(&self, speaker: Speaker) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.speaker == speaker)
            .count()
    }

    /// Markdown conversation history, one `**Label**: text` paragraph per turn.
    pub fn render_markdown(&self, roster: &Roster) -> String {
        self.turns
            .iter()
            .map(|turn| format!("**{}**: {}", roster.label(turn.speaker), turn.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
