//! Per-connection session parameters.

use std::fmt;

/// Authentication and identity parameters resolved once at connect time.
///
/// Immutable after resolution; owned by the session actor.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// The credential the peer presented.
    pub token: String,
    /// Unique id of the underlying connection.
    pub session_id: String,
    /// User identity derived from the token. Never empty.
    pub user_id: String,
    /// Group the user belongs to.
    pub group_id: i64,
    /// Organisation id.
    pub org_id: i64,
    /// Organisation display name.
    pub org_name: String,
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("token", &"<redacted>")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("group_id", &self.group_id)
            .field("org_id", &self.org_id)
            .field("org_name", &self.org_name)
            .finish()
    }
}
