use serde::{Deserialize, Serialize};

use crate::bank::ResponseBank;
use crate::error::DialogueError;

/// Round-robin position shared by every category of a session.
///
/// The index picked inside a category depends on how many antagonist responses the session has
/// produced overall, not on how often that category was hit before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RotationCounter(u64);

impl RotationCounter {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub category: &'a str,
    pub index: usize,
    pub line: &'a str,
}

/// Picks `lines[counter mod len]` from `category` and advances the counter by one.
///
/// The counter is left untouched when the category does not exist.
pub fn select<'a>(
    bank: &'a ResponseBank,
    category: &str,
    counter: &mut RotationCounter,
) -> Result<Selection<'a>, DialogueError> {
    let entry = bank
        .category(category)
        .ok_or_else(|| DialogueError::MissingCategory(category.to_string()))?;

    let len = entry.len() as u64;
    if len == 0 {
        return Err(DialogueError::Configuration(format!(
            "category {category} has no lines"
        )));
    }
    let index = (counter.value() % len) as usize;
    counter.advance();

    Ok(Selection {
        category: entry.name(),
        index,
        line: &entry.lines()[index],
    })
}
