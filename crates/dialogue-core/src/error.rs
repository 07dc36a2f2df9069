use contracts::{ApiError, ErrorCode, Stage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("catalog configuration error: {0}")]
    Configuration(String),
    #[error("catalog could not be read: {0}")]
    CatalogIo(#[from] std::io::Error),
    #[error("catalog could not be parsed: {0}")]
    CatalogParse(#[from] serde_json::Error),
    #[error("invalid keyword pattern for category {category}: {source}")]
    Pattern {
        category: String,
        #[source]
        source: regex::Error,
    },
    #[error("action {action} is not valid during stage {stage}")]
    InvalidTransition { stage: Stage, action: &'static str },
    #[error("{operation} is only available during the simulation stage (current stage {stage})")]
    OutsideSimulation {
        stage: Stage,
        operation: &'static str,
    },
    #[error("response bank has no category {0}")]
    MissingCategory(String),
    #[error("trainee message is empty")]
    EmptyMessage,
    #[error("turn text must not be empty")]
    EmptyTurn,
    #[error("unknown stage value {0:?}; session reset to intro")]
    UnknownStage(String),
    #[error("no capability token is available to open the session")]
    CredentialMissing,
    #[error("snapshot is inconsistent: {0}")]
    InvalidSnapshot(String),
    #[error("{0} counter cannot advance any further")]
    CounterOverflow(&'static str),
    #[error("unsupported schema_version: got={got} expected={expected}")]
    SchemaVersion { got: String, expected: &'static str },
}

impl DialogueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_)
            | Self::CatalogIo(_)
            | Self::CatalogParse(_)
            | Self::Pattern { .. }
            | Self::MissingCategory(_) => ErrorCode::ConfigurationError,
            Self::InvalidTransition { .. } | Self::OutsideSimulation { .. } => {
                ErrorCode::InvalidTransition
            }
            Self::EmptyMessage | Self::EmptyTurn => ErrorCode::InvalidAction,
            Self::UnknownStage(_) => ErrorCode::UnknownStage,
            Self::CredentialMissing => ErrorCode::UpstreamUnavailable,
            Self::SchemaVersion { .. } => ErrorCode::ContractVersionUnsupported,
            Self::InvalidSnapshot(_) => ErrorCode::InvalidQuery,
            Self::CounterOverflow(_) => ErrorCode::InvalidAction,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let details = match self {
            Self::InvalidTransition { stage, action } => {
                Some(format!("stage={stage} action={action}"))
            }
            Self::OutsideSimulation { stage, operation } => {
                Some(format!("stage={stage} operation={operation}"))
            }
            Self::MissingCategory(category) => Some(format!("category={category}")),
            Self::UnknownStage(raw) => Some(format!("stage={raw}")),
            _ => None,
        };
        ApiError::new(self.code(), self.to_string(), details)
    }
}
