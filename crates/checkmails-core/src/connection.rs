//! Mailbox sessions: connect, search unseen, fetch headers, logout.
//!
//! The controller only talks to the [`MailboxConnector`] and
//! [`MailboxSession`] traits. [`ImapConnector`] implements them over
//! `checkmails-imap`.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use checkmails_imap::{Authenticated, Client, Config, ImapStream, Selected, Uid, connect_tls};
use checkmails_mime::HeaderSummary;
use tracing::{debug, info};

use crate::credentials::MailboxCredentials;

/// Header fields fetched for per-message notifications.
const SUMMARY_FIELDS: [&str; 3] = ["SUBJECT", "FROM", "DATE"];

/// Identifier of a message within the watched folder (its IMAP UID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uid> for MessageId {
    fn from(uid: Uid) -> Self {
        Self(uid.get())
    }
}

/// Failure of a session operation, already classified for recovery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server rejected the login or password.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server name could not be resolved.
    #[error("cannot resolve server: {0}")]
    Resolve(String),

    /// Reset, protocol hiccup or server refusal worth retrying.
    #[error("{0}")]
    Transient(String),

    /// Anything else, such as a TLS certificate failure.
    #[error("{0}")]
    Unexpected(String),
}

impl From<checkmails_imap::Error> for SessionError {
    fn from(err: checkmails_imap::Error) -> Self {
        use checkmails_imap::Error;

        let message = err.to_string();
        match err {
            Error::Auth(_) => Self::Auth(message),
            Error::Resolve { .. } => Self::Resolve(message),
            Error::Io(_)
            | Error::No(_)
            | Error::Bad(_)
            | Error::Bye(_)
            | Error::Parse { .. }
            | Error::Protocol(_) => Self::Transient(message),
            Error::Tls(_) | Error::InvalidDnsName(_) | Error::Config(_) => {
                Self::Unexpected(message)
            }
        }
    }
}

/// Opens sessions on mailboxes.
pub trait MailboxConnector: Send + Sync + 'static {
    /// Session type produced by this connector.
    type Session: MailboxSession;

    /// Connects, authenticates and selects the folder to watch.
    fn connect(
        &self,
        credentials: &MailboxCredentials,
    ) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}

/// A live, authenticated session with the watched folder selected.
pub trait MailboxSession: Sized + Send + 'static {
    /// Returns the identifiers of all unseen messages.
    fn search_unseen(
        &mut self,
    ) -> impl Future<Output = Result<BTreeSet<MessageId>, SessionError>> + Send;

    /// Fetches the subject, sender and date of a message without its body.
    ///
    /// Returns `None` if the message disappeared in the meantime.
    fn fetch_header(
        &mut self,
        id: MessageId,
    ) -> impl Future<Output = Result<Option<HeaderSummary>, SessionError>> + Send;

    /// Ends the session. Best effort: failures are logged, never returned.
    fn logout(self) -> impl Future<Output = ()> + Send;
}

/// Connector for IMAP over implicit TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

impl ImapConnector {
    /// Creates a new connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn login(
        credentials: &MailboxCredentials,
    ) -> Result<Client<ImapStream, Authenticated>, SessionError> {
        let config = Config::parse(&credentials.server)?;
        let stream = connect_tls(&config).await?;
        let client = Client::from_stream(stream).await?;
        Ok(client
            .login(&credentials.login, &credentials.password)
            .await?)
    }
}

impl MailboxConnector for ImapConnector {
    type Session = ImapSession;

    async fn connect(&self, credentials: &MailboxCredentials) -> Result<ImapSession, SessionError> {
        let client = Self::login(credentials).await?;
        let (client, exists) = client.select(&credentials.folder).await?;
        info!(
            server = %credentials.server,
            folder = %credentials.folder,
            exists,
            "folder selected"
        );
        Ok(ImapSession { client })
    }
}

/// Session opened by [`ImapConnector`].
pub struct ImapSession {
    client: Client<ImapStream, Selected>,
}

impl fmt::Debug for ImapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSession")
            .field("folder", &self.client.selected().mailbox())
            .finish_non_exhaustive()
    }
}

impl MailboxSession for ImapSession {
    async fn search_unseen(&mut self) -> Result<BTreeSet<MessageId>, SessionError> {
        let uids = self.client.uid_search_unseen().await?;
        Ok(uids.into_iter().map(MessageId::from).collect())
    }

    async fn fetch_header(&mut self, id: MessageId) -> Result<Option<HeaderSummary>, SessionError> {
        let Some(uid) = Uid::new(id.0) else {
            return Ok(None);
        };
        let header = self.client.uid_fetch_header(uid, &SUMMARY_FIELDS).await?;
        Ok(header.map(|raw| HeaderSummary::from_bytes(&raw)))
    }

    async fn logout(self) {
        if let Err(e) = self.client.logout().await {
            debug!(error = %e, "logout failed");
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
    fn test_error_classification() {
        use checkmails_imap::Error;

        let auth: SessionError = Error::Auth("LOGIN failed".to_string()).into();
        assert!(matches!(auth, SessionError::Auth(_)));

        let resolve: SessionError = Error::Resolve {
            host: "imap.invalid".to_string(),
            source: std::io::Error::other("no such host"),
        }
        .into();
        assert!(matches!(resolve, SessionError::Resolve(ref m) if m.contains("imap.invalid")));

        for err in [
            Error::No("busy".to_string()),
            Error::Bye("shutting down".to_string()),
            Error::Io(std::io::ErrorKind::ConnectionReset.into()),
        ] {
            assert!(matches!(SessionError::from(err), SessionError::Transient(_)));
        }

        let config: SessionError = Error::Config("bad port".to_string()).into();
        assert!(matches!(config, SessionError::Unexpected(_)));

        let certificate: SessionError =
            Error::Tls(rustls::Error::InvalidCertificate(rustls::CertificateError::Expired)).into();
        assert!(matches!(certificate, SessionError::Unexpected(ref m) if m.starts_with("TLS error")));
    }

    #[test]
    fn test_message_id_from_uid() {
        let uid = Uid::new(42).unwrap();
        assert_eq!(MessageId::from(uid), MessageId(42));
        assert_eq!(MessageId(42).to_string(), "42");
    }

    #[tokio::test]
    async fn test_unresolvable_server_is_resolve_error() {
        let creds = MailboxCredentials::new("imap.host.invalid", "ann", "secret", "INBOX");
        let err = ImapConnector::new().connect(&creds).await.unwrap_err();
        assert!(matches!(err, SessionError::Resolve(_)), "unexpected error: {err}");
    }
}
