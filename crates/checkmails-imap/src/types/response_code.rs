//! Response codes.

use super::Capability;

/// Bracketed response code carried by status responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// AUTHENTICATIONFAILED (RFC 5530): credentials were rejected.
    AuthenticationFailed,
    /// AUTHORIZATIONFAILED (RFC 5530): credentials valid but access denied.
    AuthorizationFailed,
    /// CAPABILITY response.
    Capability(Vec<Capability>),
    /// NONEXISTENT (RFC 5530): the selected folder does not exist.
    NonExistent,
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// UNAVAILABLE (RFC 5530): temporary server-side failure.
    Unavailable,
    /// Unknown response code.
    Unknown(String),
}

impl ResponseCode {
    /// Returns true if the code reports rejected credentials.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::AuthorizationFailed)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_codes() {
        assert!(ResponseCode::AuthenticationFailed.is_auth_failure());
        assert!(ResponseCode::AuthorizationFailed.is_auth_failure());
        assert!(!ResponseCode::Unavailable.is_auth_failure());
        assert!(!ResponseCode::Unknown("X".to_string()).is_auth_failure());
    }
}
