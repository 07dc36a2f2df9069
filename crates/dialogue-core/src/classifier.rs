//! Ordered keyword rules mapping trainee text to a response category.
//!
//! Rules are evaluated in declaration order and the first match wins, no matter where in the
//! text the match occurs. A keyword ending in `*` is a stem and matches any word starting with
//! it; every other keyword must match a whole word.

use regex::Regex;
use tracing::debug;

use crate::bank::ResponseBank;
use crate::error::DialogueError;

#[derive(Debug, Clone)]
pub struct IntentRule {
    category: String,
    keywords: Vec<String>,
    pattern: Regex,
}

impl IntentRule {
    pub fn new<S: AsRef<str>>(
        category: impl Into<String>,
        keywords: &[S],
    ) -> Result<Self, DialogueError> {
        let category = category.into();
        let keywords = keywords
            .iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty() && keyword != "*")
            .collect::<Vec<_>>();

        if keywords.is_empty() {
            return Err(DialogueError::Configuration(format!(
                "classifier rule for {category} has no keywords"
            )));
        }

        let alternation = keywords
            .iter()
            .map(|keyword| keyword_fragment(keyword))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{alternation})\b")).map_err(|source| {
            DialogueError::Pattern {
                category: category.clone(),
                source,
            }
        })?;

        Ok(Self {
            category,
            keywords,
            pattern,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `normalized` must already be lower-cased.
    fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

fn keyword_fragment(keyword: &str) -> String {
    match keyword.strip_suffix('*') {
        Some(stem) => format!(r"{}\w*", regex::escape(stem)),
        None => regex::escape(keyword),
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// First rule whose keywords occur in `text`, ignoring case.
    pub fn first_match(&self, text: &str) -> Option<&IntentRule> {
        let normalized = text.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }

    /// Category to answer `text` with. Falls back when no rule matches or the matched
    /// category is absent from `bank`.
    pub fn classify<'a>(&'a self, text: &str, bank: &'a ResponseBank) -> &'a str {
        let category = match self.first_match(text) {
            Some(rule) if bank.contains(rule.category()) => rule.category(),
            Some(rule) => {
                debug!(
                    category = rule.category(),
                    "matched category missing from bank; using fallback"
                );
                bank.fallback()
            }
            None => bank.fallback(),
        };
        debug!(category, "classified trainee message");
        category
    }
}
