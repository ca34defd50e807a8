//! Type-state markers for IMAP client connection states.

use std::sync::Arc;

/// Marker type for the not-authenticated state.
///
/// In this state, only LOGIN is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state a folder can be selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected folder.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Arc<str>,
    pub(crate) exists: u32,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>, exists: u32) -> Self {
        Self {
            mailbox: mailbox.into(),
            exists,
        }
    }

    /// Returns the name of the selected folder.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the message count reported by SELECT.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.exists
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

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_state_accessors() {
        let selected = Selected::new("INBOX", 12);
        assert_eq!(selected.mailbox(), "INBOX");
        assert_eq!(selected.exists(), 12);
    }
}
