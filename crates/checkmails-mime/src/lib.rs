//! # checkmails-mime
//!
//! Just enough RFC 5322 / RFC 2047 to turn a fetched header block into
//! notification text.
//!
//! ```
//! use checkmails_mime::HeaderSummary;
//!
//! let raw = b"Subject: =?utf-8?Q?Caf=C3=A9?=\r\nFrom: Ann <ann@example.org>\r\n\r\n";
//! let summary = HeaderSummary::from_bytes(raw);
//! assert_eq!(summary.subject, "Café");
//! assert_eq!(summary.from, "Ann <ann@example.org>");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod summary;

pub mod encoding;

pub use error::{Error, Result};
pub use header::Headers;
pub use summary::{HeaderSummary, format_date};
