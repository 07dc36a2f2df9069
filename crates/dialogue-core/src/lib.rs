//! Deterministic dialogue core for the scripted negotiation exercise.
//!
//! The core knows nothing about avatars, networks, or storage. A host drives a [`Session`]
//! with four actions (`submit_text`, `advance`, `end_simulation`, `restart`) and receives the
//! resulting stage plus the turns each action appended. Given the same catalog, clock, and
//! action sequence, a session always produces the same transcript.

pub mod bank;
pub mod classifier;
pub mod clock;
pub mod credential;
pub mod error;
pub mod roster;
pub mod selector;
pub mod session;
pub mod transcript;

pub use bank::{Catalog, CatalogSummary, Category, NarratorScripts, ResponseBank};
pub use classifier::{IntentClassifier, IntentRule};
pub use clock::{Clock, SteppedClock, SystemClock};
pub use credential::CapabilityToken;
pub use error::DialogueError;
pub use roster::Roster;
pub use selector::{select, RotationCounter, Selection};
pub use session::{Restored, Session};
pub use transcript::ConversationLog;
