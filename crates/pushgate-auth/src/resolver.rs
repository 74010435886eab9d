//! Session parameter resolution from connection metadata.

use pushgate_core::SessionParams;
use tracing::{debug, warn};
use url::Url;

use crate::errors::AuthError;
use crate::validator::TokenValidator;

/// Base used to resolve request-target URLs such as `/ws?token=abc`.
const PLACEHOLDER_BASE: &str = "ws://localhost/";

/// Query parameter that carries the token.
const TOKEN_PARAM: &str = "token";

/// Resolve the session parameters for a new connection.
///
/// A non-empty `cookie` is the token; otherwise the `token` query parameter of
/// `url` is used. The token must be non-empty and must map to a non-empty user
/// identity through `validator`.
pub fn resolve_session_params(
    cookie: &str,
    url: &str,
    session_id: &str,
    validator: &dyn TokenValidator,
) -> Result<SessionParams, AuthError> {
    let token = if cookie.is_empty() {
        let parsed = parse_connection_url(url).inspect_err(|e| {
            warn!(session_id, error = %e, "connection URL is not valid");
        })?;
        parsed
            .query_pairs()
            .find(|(k, _)| k == TOKEN_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    } else {
        cookie.to_owned()
    };

    if token.is_empty() {
        warn!(session_id, "no token presented");
        return Err(AuthError::MissingToken);
    }

    let identity = validator
        .identify(&token)
        .filter(|id| !id.user_id.is_empty())
        .ok_or_else(|| {
            warn!(session_id, "token did not resolve to a user");
            AuthError::EmptyIdentity
        })?;

    debug!(session_id, user_id = %identity.user_id, "session parameters resolved");
    Ok(SessionParams {
        token,
        session_id: session_id.to_owned(),
        user_id: identity.user_id,
        group_id: identity.group_id,
        org_id: identity.org_id,
        org_name: identity.org_name,
    })
}

fn parse_connection_url(raw: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(PLACEHOLDER_BASE)?.join(raw),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Identity, StaticTokens, TokenAsUserId};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn token_from_url_query() {
        let params =
            resolve_session_params("", "ws://example.com/ws?token=abc123", "s1", &TokenAsUserId)
                .unwrap();
        assert_eq!(params.token, "abc123");
        assert_eq!(params.session_id, "s1");
        assert_eq!(params.user_id, "abc123");
    }

    #[test]
    fn token_from_relative_request_target() {
        let params = resolve_session_params("", "/ws?x=1&token=abc123", "s1", &TokenAsUserId).unwrap();
        assert_eq!(params.token, "abc123");
    }

    #[test]
    fn cookie_takes_precedence() {
        let params = resolve_session_params(
            "from-cookie",
            "ws://example.com/ws?token=from-url",
            "s1",
            &TokenAsUserId,
        )
        .unwrap();
        assert_eq!(params.token, "from-cookie");
    }

    #[test]
    fn cookie_skips_url_parsing() {
        let params = resolve_session_params("c", "http://[::1", "s1", &TokenAsUserId).unwrap();
        assert_eq!(params.token, "c");
    }

    #[test]
    fn missing_token_rejected() {
        assert_matches!(
            resolve_session_params("", "ws://example.com/ws", "s1", &TokenAsUserId),
            Err(AuthError::MissingToken)
        );
        assert_matches!(
            resolve_session_params("", "ws://example.com/ws?token=", "s1", &TokenAsUserId),
            Err(AuthError::MissingToken)
        );
        assert_matches!(
            resolve_session_params("", "", "s1", &TokenAsUserId),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn unparsable_url_rejected() {
        assert_matches!(
            resolve_session_params("", "http://[::1", "s1", &TokenAsUserId),
            Err(AuthError::InvalidUrl(_))
        );
    }

    #[test]
    fn unknown_token_has_empty_identity() {
        let table = StaticTokens::new();
        assert_matches!(
            resolve_session_params("nope", "", "s1", &table),
            Err(AuthError::EmptyIdentity)
        );
    }

    #[test]
    fn empty_user_id_rejected() {
        let table = StaticTokens::new().with("abc", Identity::default());
        assert_matches!(
            resolve_session_params("abc", "", "s1", &table),
            Err(AuthError::EmptyIdentity)
        );
    }

    #[test]
    fn identity_fields_copied() {
        let table = StaticTokens::new().with(
            "abc",
            Identity {
                user_id: "u-1".into(),
                group_id: 4,
                org_id: 5,
                org_name: "acme".into(),
            },
        );
        let params = resolve_session_params("", "/ws?token=abc", "s7", &table).unwrap();
        assert_eq!(params.user_id, "u-1");
        assert_eq!(params.group_id, 4);
        assert_eq!(params.org_id, 5);
        assert_eq!(params.org_name, "acme");
        assert_eq!(params.session_id, "s7");
    }

    proptest! {
        #[test]
        fn any_query_token_resolves(token in "[A-Za-z0-9_-]{1,40}") {
            let url = format!("wss://push.example.com/ws?token={token}");
            let params = resolve_session_params("", &url, "s", &TokenAsUserId).unwrap();
            prop_assert_eq!(params.token, token);
        }

        #[test]
        fn non_empty_cookie_always_wins(cookie in "[a-z]{1,16}", token in "[0-9]{1,16}") {
            let url = format!("/ws?token={token}");
            let params = resolve_session_params(&cookie, &url, "s", &TokenAsUserId).unwrap();
            prop_assert_eq!(params.token, cookie);
        }
    }
}
