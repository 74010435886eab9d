//! Token → identity derivation boundary.

use std::collections::HashMap;
use std::sync::Arc;

use pushgate_settings::{AuthSettings, TokenIdentity};
use tracing::warn;

/// The identity a token stands for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// User id. Empty means "no identity".
    pub user_id: String,
    /// Group id.
    pub group_id: i64,
    /// Organisation id.
    pub org_id: i64,
    /// Organisation name.
    pub org_name: String,
}

impl From<TokenIdentity> for Identity {
    fn from(t: TokenIdentity) -> Self {
        Self {
            user_id: t.user_id,
            group_id: t.group_id,
            org_id: t.org_id,
            org_name: t.org_name,
        }
    }
}

/// Derives a user identity from a presented token.
///
/// Returning `None` (or an identity with an empty `user_id`) rejects the
/// connection.
pub trait TokenValidator: Send + Sync {
    /// Look up the identity for `token`.
    fn identify(&self, token: &str) -> Option<Identity>;
}

/// A fixed token table.
#[derive(Clone, Debug, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Identity>,
}

impl StaticTokens {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a token.
    #[must_use]
    pub fn with(mut self, token: impl Into<String>, identity: Identity) -> Self {
        let _ = self.tokens.insert(token.into(), identity);
        self
    }

    /// Number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenValidator for StaticTokens {
    fn identify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

/// Uses the token itself as the user id. Development only.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenAsUserId;

impl TokenValidator for TokenAsUserId {
    fn identify(&self, token: &str) -> Option<Identity> {
        Some(Identity {
            user_id: token.to_owned(),
            ..Identity::default()
        })
    }
}

/// Build the validator described by the auth settings.
pub fn validator_from_settings(settings: &AuthSettings) -> Arc<dyn TokenValidator> {
    if settings.token_as_user_id {
        warn!("auth.tokenAsUserId is enabled; any token is accepted as its own user id");
        return Arc::new(TokenAsUserId);
    }
    let table = settings
        .tokens
        .iter()
        .fold(StaticTokens::new(), |table, (token, identity)| {
            table.with(token.clone(), identity.clone().into())
        });
    if table.is_empty() {
        warn!("no tokens configured; every connection will be rejected");
    }
    Arc::new(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user: &str) -> Identity {
        Identity {
            user_id: user.into(),
            ..Identity::default()
        }
    }

    #[test]
    fn static_tokens_lookup() {
        let table = StaticTokens::new().with("abc", identity("u-1"));
        assert_eq!(table.identify("abc").unwrap().user_id, "u-1");
        assert!(table.identify("xyz").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn static_tokens_replace() {
        let table = StaticTokens::new()
            .with("abc", identity("u-1"))
            .with("abc", identity("u-2"));
        assert_eq!(table.identify("abc").unwrap().user_id, "u-2");
    }

    #[test]
    fn token_as_user_id() {
        let id = TokenAsUserId.identify("alice").unwrap();
        assert_eq!(id.user_id, "alice");
        assert_eq!(id.org_id, 0);
    }

    #[test]
    fn from_settings_static_table() {
        let mut settings = AuthSettings::default();
        let _ = settings.tokens.insert(
            "abc123".into(),
            TokenIdentity {
                user_id: "u-9".into(),
                group_id: 1,
                org_id: 2,
                org_name: "acme".into(),
            },
        );
        let validator = validator_from_settings(&settings);
        let id = validator.identify("abc123").unwrap();
        assert_eq!(id.user_id, "u-9");
        assert_eq!(id.org_name, "acme");
        assert!(validator.identify("other").is_none());
    }

    #[test]
    fn from_settings_token_as_user_id() {
        let settings = AuthSettings {
            token_as_user_id: true,
            ..AuthSettings::default()
        };
        let validator = validator_from_settings(&settings);
        assert_eq!(validator.identify("bob").unwrap().user_id, "bob");
    }
}
