//! # checkmails-core
//!
//! Mailbox lifecycle controller of the `checkmails` unread mail checker.
//!
//! This crate provides:
//! - The [`Controller`] event loop: connect, check and logout workers per
//!   mailbox, barrier polling, timeouts, connectivity loss and reconnects
//! - Settings and credential storage
//! - IMAP mailbox sessions over `checkmails-imap`
//! - The collaborator interfaces the binary implements: notifications, tray
//!   icon and the prompt for rejected logins

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backoff;
pub mod connection;
pub mod controller;
pub mod credentials;
mod error;
pub mod notify;
pub mod probe;
pub mod prompt;
pub mod scheduler;
pub mod settings;
pub mod tray;

pub use connection::{
    ImapConnector, ImapSession, MailboxConnector, MailboxSession, MessageId, SessionError,
};
pub use controller::{Collaborators, ControlCommand, ControlHandle, Controller};
pub use credentials::{
    CredentialError, CredentialResult, CredentialStore, KeyringCredentialStore,
    MailboxCredentials,
};
pub use error::{Error, Result};
pub use notify::NotificationSink;
pub use probe::{ConnectivityProbe, TcpProbe};
pub use prompt::{AuthDecision, AuthPrompt};
pub use settings::{JsonSettingsStore, MailboxList, Settings, SettingsStore};
pub use tray::{MenuItem, TrayIcon};
