//! IMAP command builder.
//!
//! Only the commands needed to poll a folder for unseen mail are modelled.

mod serialize;
mod tag_generator;
mod types;

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria};

use crate::types::Uid;

use serialize::{write_astring, write_fetch_attributes};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// SELECT command.
    Select {
        /// Folder to select.
        mailbox: String,
    },

    // Selected State Commands
    /// UID SEARCH command.
    UidSearch {
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID FETCH command for a single message.
    UidFetch {
        /// Message UID.
        uid: Uid,
        /// Items to fetch.
        attributes: Vec<FetchAttribute>,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox);
            }

            Self::UidSearch { criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                buf.extend_from_slice(criteria.as_str().as_bytes());
            }

            Self::UidFetch { uid, attributes } => {
                buf.extend_from_slice(format!("UID FETCH {uid} ").as_bytes());
                write_fetch_attributes(&mut buf, attributes);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command name used in log lines.
    ///
    /// LOGIN arguments are never part of it.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::UidSearch { .. } => "UID SEARCH",
            Self::UidFetch { .. } => "UID FETCH",
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
    fn test_capability_command() {
        let cmd = Command::Capability;
        assert_eq!(cmd.serialize("A001"), b"A001 CAPABILITY\r\n");
    }

    #[test]
    fn test_login_command() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(cmd.serialize("A001"), b"A001 LOGIN user pass\r\n");
    }

    #[test]
    fn test_login_quoted() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "pa ss\"word".to_string(),
        };
        assert_eq!(
            cmd.serialize("A001"),
            b"A001 LOGIN user@example.com \"pa ss\\\"word\"\r\n"
        );
    }

    #[test]
    fn test_select_command() {
        let cmd = Command::Select {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(cmd.serialize("A001"), b"A001 SELECT INBOX\r\n");
    }

    #[test]
    fn test_select_folder_with_space() {
        let cmd = Command::Select {
            mailbox: "Mailing Lists".to_string(),
        };
        assert_eq!(cmd.serialize("A002"), b"A002 SELECT \"Mailing Lists\"\r\n");
    }

    #[test]
    fn test_uid_search_unseen() {
        let cmd = Command::UidSearch {
            criteria: SearchCriteria::Unseen,
        };
        assert_eq!(cmd.serialize("A003"), b"A003 UID SEARCH UNSEEN\r\n");
    }

    #[test]
    fn test_uid_fetch_header_fields() {
        let cmd = Command::UidFetch {
            uid: Uid::new(42).unwrap(),
            attributes: vec![FetchAttribute::header_fields(["SUBJECT", "FROM", "DATE"])],
        };
        assert_eq!(
            cmd.serialize("A004"),
            b"A004 UID FETCH 42 (BODY.PEEK[HEADER.FIELDS (SUBJECT FROM DATE)])\r\n"
        );
    }

    #[test]
    fn test_uid_fetch_multiple_attributes() {
        let cmd = Command::UidFetch {
            uid: Uid::new(7).unwrap(),
            attributes: vec![FetchAttribute::Uid, FetchAttribute::header_fields(["DATE"])],
        };
        assert_eq!(
            cmd.serialize("A005"),
            b"A005 UID FETCH 7 (UID BODY.PEEK[HEADER.FIELDS (DATE)])\r\n"
        );
    }

    #[test]
    fn test_name_hides_credentials() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(cmd.name(), "LOGIN");
    }
}
