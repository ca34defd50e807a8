//! Mailbox credential storage.
//!
//! Each mailbox keeps its server, login, password and folder in the
//! platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager
//!
//! The keyring is unlocked by the user session, so no master password is
//! asked for.

use std::fmt;

use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Error;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "checkmails";

/// Connection information for one mailbox.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxCredentials {
    /// IMAP server, optionally with an explicit `:port` (993 by default).
    pub server: String,
    /// Login name.
    pub login: String,
    /// Password.
    pub password: String,
    /// Folder to watch.
    pub folder: String,
}

impl MailboxCredentials {
    /// Creates credentials watching the given folder.
    pub fn new(
        server: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            login: login.into(),
            password: password.into(),
            folder: folder.into(),
        }
    }

    /// Checks that the credentials are usable before they are stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed server, an empty login or
    /// an empty folder.
    pub fn validate(&self) -> crate::Result<()> {
        checkmails_imap::Config::parse(&self.server).map_err(|e| Error::Config(e.to_string()))?;
        if self.login.trim().is_empty() {
            return Err(Error::Config("empty login".to_string()));
        }
        if self.folder.trim().is_empty() {
            return Err(Error::Config("empty folder".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for MailboxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxCredentials")
            .field("server", &self.server)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored entry is not valid.
    #[error("Malformed credential entry: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Storage of [`MailboxCredentials`] keyed by mailbox name.
pub trait CredentialStore: Send + Sync {
    /// Loads the credentials of a mailbox.
    ///
    /// Returns `None` for an unknown mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load(&self, mailbox: &str) -> CredentialResult<Option<MailboxCredentials>>;

    /// Saves the credentials of a mailbox, replacing previous ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, mailbox: &str, credentials: &MailboxCredentials) -> CredentialResult<()>;

    /// Deletes the credentials of a mailbox. Deleting an unknown mailbox is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn delete(&self, mailbox: &str) -> CredentialResult<()>;
}

/// Credential store backed by the system keyring.
///
/// One entry per mailbox holds the JSON-serialized credentials.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringCredentialStore {
    /// Creates a store using a custom keyring service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, mailbox: &str) -> CredentialResult<Entry> {
        Ok(Entry::new(&self.service, &self.entry_key(mailbox))?)
    }

    /// Keyring entry key of a mailbox, prefixed with the service name.
    fn entry_key(&self, mailbox: &str) -> String {
        format!("{}_mailbox_{mailbox}", self.service)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self, mailbox: &str) -> CredentialResult<Option<MailboxCredentials>> {
        match self.entry(mailbox)?.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!(%mailbox, "no credentials found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, mailbox: &str, credentials: &MailboxCredentials) -> CredentialResult<()> {
        let json = serde_json::to_string(credentials)?;
        self.entry(mailbox)?.set_password(&json)?;
        debug!(%mailbox, "stored credentials");
        Ok(())
    }

    fn delete(&self, mailbox: &str) -> CredentialResult<()> {
        match self.entry(mailbox)?.delete_credential() {
            Ok(()) => {
                debug!(%mailbox, "deleted credentials");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(%mailbox, "no credentials to delete");
                Ok(())
            }
            Err(e) => {
                warn!(%mailbox, "failed to delete credentials: {e}");
                Err(e.into())
            }
        }
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
    fn test_debug_redacts_password() {
        let creds = MailboxCredentials::new("imap.example.org", "ann", "hunter2", "INBOX");
        let debug = format!("{creds:?}");
        assert!(debug.contains("imap.example.org"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_validate() {
        assert!(MailboxCredentials::new("imap.example.org", "ann", "pw", "INBOX").validate().is_ok());
        assert!(MailboxCredentials::new("imap.example.org:1993", "ann", "", "Lists/rust").validate().is_ok());
        assert!(MailboxCredentials::new("imap.example.org:0", "ann", "pw", "INBOX").validate().is_err());
        assert!(MailboxCredentials::new("", "ann", "pw", "INBOX").validate().is_err());
        assert!(MailboxCredentials::new("imap.example.org", " ", "pw", "INBOX").validate().is_err());
        assert!(MailboxCredentials::new("imap.example.org", "ann", "pw", "").validate().is_err());
    }

    #[test]
    fn test_entry_key() {
        assert_eq!(
            KeyringCredentialStore::default().entry_key("Work"),
            "checkmails_mailbox_Work"
        );
        assert_eq!(
            KeyringCredentialStore::new("checkmails-test").entry_key("Work"),
            "checkmails-test_mailbox_Work"
        );
    }

    // Note: These tests interact with the actual system keyring.
    // Run manually with `cargo test -- --ignored`

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve() {
        let store = KeyringCredentialStore::new("checkmails-test");
        let creds = MailboxCredentials::new("imap.example.org:1993", "ann", "secret", "INBOX");

        store.save("keyring-test", &creds).unwrap();
        assert_eq!(store.load("keyring-test").unwrap(), Some(creds));

        store.delete("keyring-test").unwrap();
        assert_eq!(store.load("keyring-test").unwrap(), None);
        store.delete("keyring-test").unwrap();
    }
}
