//! Versioned scenario catalog: response bank, classifier rules, narrator scripts, and roster.
//!
//! A catalog is validated as a whole when it is loaded. Anything a session could later trip
//! over (an empty category, a rule pointing at a missing category, a blank script) is a
//! configuration error here, so no session is ever built on top of a broken catalog.

use std::collections::BTreeSet;
use std::path::Path;

use contracts::SCHEMA_VERSION_V1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{IntentClassifier, IntentRule};
use crate::error::DialogueError;
use crate::roster::Roster;

const BUILTIN_CATALOG: &str = include_str!("../assets/response_bank.json");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NarratorScripts {
    pub prebrief: String,
    pub prebrief_ack: String,
    pub transition: String,
    pub debrief: String,
    pub debrief_prompt: String,
}

impl NarratorScripts {
    fn validate(&self) -> Result<(), DialogueError> {
        let entries = [
            ("prebrief", &self.prebrief),
            ("prebrief_ack", &self.prebrief_ack),
            ("transition", &self.transition),
            ("debrief", &self.debrief),
            ("debrief_prompt", &self.debrief_prompt),
        ];
        for (name, text) in entries {
            if text.trim().is_empty() {
                return Err(DialogueError::Configuration(format!(
                    "narrator script {name} is empty"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    lines: Vec<String>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Categorized antagonist lines. Every category holds at least one non-empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBank {
    categories: Vec<Category>,
    fallback: String,
    opening: String,
}

impl ResponseBank {
    pub fn new(
        categories: Vec<(String, Vec<String>)>,
        fallback: impl Into<String>,
        opening: impl Into<String>,
    ) -> Result<Self, DialogueError> {
        let fallback = fallback.into();
        let opening = opening.into();
        let mut seen = BTreeSet::new();
        let mut validated = Vec::with_capacity(categories.len());

        for (name, lines) in categories {
            if name.trim().is_empty() {
                return Err(DialogueError::Configuration(
                    "category name is empty".to_string(),
                ));
            }
            if !seen.insert(name.clone()) {
                return Err(DialogueError::Configuration(format!(
                    "category {name} is declared twice"
                )));
            }
            if lines.is_empty() {
                return Err(DialogueError::Configuration(format!(
                    "category {name} has no lines"
                )));
            }
            if let Some(position) = lines.iter().position(|line| line.trim().is_empty()) {
                return Err(DialogueError::Configuration(format!(
                    "category {name} line {position} is empty"
                )));
            }
            validated.push(Category { name, lines });
        }

        for required in [&fallback, &opening] {
            if !seen.contains(required) {
                return Err(DialogueError::Configuration(format!(
                    "required category {required} is missing"
                )));
            }
        }

        Ok(Self {
            categories: validated,
            fallback,
            opening,
        })
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.category(name).is_some()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn opening(&self) -> &str {
        &self.opening
    }

    /// The fixed first line the antagonist opens the simulation with. Never rotated.
    pub fn opening_line(&self) -> &str {
        self.category(&self.opening)
            .and_then(|category| category.lines.first())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    schema_version: String,
    catalog_version: String,
    fallback_category: String,
    opening_category: String,
    roster: Roster,
    narrator: NarratorScripts,
    antagonist_sign_off: String,
    rules: Vec<RuleDocument>,
    categories: Vec<CategoryDocument>,
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    category: String,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryDocument {
    name: String,
    lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    bank: ResponseBank,
    classifier: IntentClassifier,
    scripts: NarratorScripts,
    sign_off: String,
    roster: Roster,
}

impl Catalog {
    pub fn builtin() -> Result<Self, DialogueError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DialogueError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            catalog_version = %catalog.version,
            "loaded catalog from file"
        );
        Ok(catalog)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DialogueError> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        if document.schema_version != SCHEMA_VERSION_V1 {
            return Err(DialogueError::SchemaVersion {
                got: document.schema_version,
                expected: SCHEMA_VERSION_V1,
            });
        }

        let bank = ResponseBank::new(
            document
                .categories
                .into_iter()
                .map(|category| (category.name, category.lines))
                .collect(),
            document.fallback_category,
            document.opening_category,
        )?;

        let rules = document
            .rules
            .into_iter()
            .map(|rule| IntentRule::new(rule.category, &rule.keywords))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_parts(
            document.catalog_version,
            bank,
            IntentClassifier::new(rules),
            document.narrator,
            document.antagonist_sign_off,
            document.roster,
        )
    }

    pub fn from_parts(
        version: impl Into<String>,
        bank: ResponseBank,
        classifier: IntentClassifier,
        scripts: NarratorScripts,
        sign_off: impl Into<String>,
        roster: Roster,
    ) -> Result<Self, DialogueError> {
        for rule in classifier.rules() {
            if !bank.contains(rule.category()) {
                return Err(DialogueError::Configuration(format!(
                    "classifier rule references unknown category {}",
                    rule.category()
                )));
            }
        }
        scripts.validate()?;

        let sign_off = sign_off.into();
        if sign_off.trim().is_empty() {
            return Err(DialogueError::Configuration(
                "antagonist sign-off line is empty".to_string(),
            ));
        }

        let catalog = Self {
            version: version.into(),
            bank,
            classifier,
            scripts,
            sign_off,
            roster,
        };
        debug!(
            catalog_version = %catalog.version,
            categories = catalog.bank.categories().len(),
            rules = catalog.classifier.rules().len(),
            "catalog validated"
        );
        Ok(catalog)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bank(&self) -> &ResponseBank {
        &self.bank
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn scripts(&self) -> &NarratorScripts {
        &self.scripts
    }

    pub fn sign_off(&self) -> &str {
        &self.sign_off
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn summary(&self) -> CatalogSummary {
        let categories = self
            .bank
            .categories()
            .iter()
            .map(|category| CategorySummary {
                name: category.name().to_string(),
                line_count: category.len(),
                keywords: self
                    .classifier
                    .rules()
                    .iter()
                    .filter(|rule| rule.category() == category.name())
                    .flat_map(|rule| rule.keywords().iter().cloned())
                    .collect(),
            })
            .collect();

        CatalogSummary {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            catalog_version: self.version.clone(),
            fallback_category: self.bank.fallback().to_string(),
            opening_category: self.bank.opening().to_string(),
            rule_order: self
                .classifier
                .rules()
                .iter()
                .map(|rule| rule.category().to_string())
                .collect(),
            categories,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogSummary {
    pub schema_version: String,
    pub catalog_version: String,
    pub fallback_category: String,
    pub opening_category: String,
    pub rule_order: Vec<String>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub name: String,
    pub line_count: usize,
    pub keywords: Vec<String>,
}
