//! Auth error types.

/// Reasons a connecting peer is rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The connection URL could not be parsed.
    #[error("connection URL is not valid: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Neither the cookie nor the URL carried a token.
    #[error("no token in cookie or connection URL")]
    MissingToken,

    /// The token did not resolve to a user identity.
    #[error("token does not resolve to a user identity")]
    EmptyIdentity,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_display() {
        assert_eq!(
            AuthError::MissingToken.to_string(),
            "no token in cookie or connection URL"
        );
    }

    #[test]
    fn url_error_conversion() {
        let parse_err = url::Url::parse("http://[::1").unwrap_err();
        let err: AuthError = parse_err.into();
        assert!(matches!(err, AuthError::InvalidUrl(_)));
        assert!(err.to_string().starts_with("connection URL is not valid"));
    }
}
