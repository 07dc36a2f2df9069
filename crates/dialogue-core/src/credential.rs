use std::fmt;

/// Opaque capability token handed out by the streaming-session provider. Never inspected.
#[derive(Clone, PartialEq, Eq)]
pub struct CapabilityToken(String);

impl CapabilityToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapabilityToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let token = CapabilityToken::new("tok_live_123");
        assert!(!format!("{token:?}").contains("tok_live_123"));
        assert_eq!(token.expose(), "tok_live_123");
    }
}
