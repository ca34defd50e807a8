//! # checkmails-imap
//!
//! A small IMAP4rev1 client used to poll a single folder for unseen mail.
//!
//! Only the commands an unread-mail checker needs are implemented: LOGIN,
//! SELECT, `UID SEARCH`, header-only `UID FETCH`, NOOP and LOGOUT. Connections
//! always use implicit TLS via rustls.
//!
//! ## Quick Start
//!
//! ```ignore
//! use checkmails_imap::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> checkmails_imap::Result<()> {
//!     let config = Config::parse("imap.example.com:993")?;
//!     let stream = checkmails_imap::connection::connect_tls(&config).await?;
//!     let client = Client::from_stream(stream).await?;
//!
//!     let client = client.login("user@example.com", "password").await?;
//!     let (mut client, _exists) = client.select("INBOX").await?;
//!
//!     let unseen = client.uid_search_unseen().await?;
//!     for uid in &unseen {
//!         if let Some(header) = client.uid_fetch_header(*uid, &["SUBJECT"]).await? {
//!             println!("{}", String::from_utf8_lossy(&header));
//!         }
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select() ──→ Selected
//! ```
//!
//! `logout()` is available in every state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FramedStream, ImapStream, NotAuthenticated,
    ResponseAccumulator, Selected, connect_tls,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{Capability, ResponseCode, Status, Tag, Uid};

/// Default port for IMAP over implicit TLS.
pub const DEFAULT_PORT: u16 = 993;
