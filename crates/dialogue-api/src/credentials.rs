use dialogue_core::CapabilityToken;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no access token is configured for the streaming-session provider")]
    NotConfigured,
    #[error("streaming-session provider rejected the request: {0}")]
    Rejected(String),
}

/// Supplies the opaque capability token a session needs before leaving the intro stage.
pub trait CredentialProvider: Send + Sync {
    fn issue(&self) -> Result<CapabilityToken, UpstreamError>;
}

/// Hands out one pre-provisioned token, typically read from the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    token: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|value| !value.trim().is_empty()),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn issue(&self) -> Result<CapabilityToken, UpstreamError> {
        self.token
            .as_deref()
            .map(CapabilityToken::new)
            .ok_or(UpstreamError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_counts_as_missing() {
        let provider = StaticCredentialProvider::new(Some("  ".to_string()));
        assert!(matches!(provider.issue(), Err(UpstreamError::NotConfigured)));

        let provider = StaticCredentialProvider::new(Some("tok".to_string()));
        assert_eq!(provider.issue().expect("token").expose(), "tok");
    }
}
