//! Core IMAP types.
//!
//! Status words, tags, UIDs, capabilities and response codes as seen by a
//! read-only polling client.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod identifiers;
mod response_code;

pub use capability::{Capability, Status};
pub use identifiers::{Tag, Uid};
pub use response_code::ResponseCode;

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
    fn test_uid_new() {
        assert!(Uid::new(0).is_none());
        assert!(Uid::new(1).is_some());
        assert_eq!(Uid::new(123).unwrap().get(), 123);
    }

    #[test]
    fn test_uid_ordering() {
        let mut uids = vec![Uid::new(9).unwrap(), Uid::new(2).unwrap(), Uid::new(5).unwrap()];
        uids.sort();
        let values: Vec<u32> = uids.iter().map(|u| u.get()).collect();
        assert_eq!(values, vec![2, 5, 9]);
    }

    #[test]
    fn test_capability_parse() {
        assert_eq!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1);
        assert_eq!(Capability::parse("IMAP4REV2"), Capability::Imap4Rev2);
        assert_eq!(Capability::parse("logindisabled"), Capability::LoginDisabled);
        assert_eq!(
            Capability::parse("AUTH=PLAIN"),
            Capability::Auth("PLAIN".to_string())
        );
        assert_eq!(
            Capability::parse("IDLE"),
            Capability::Unknown("IDLE".to_string())
        );
    }

    #[test]
    fn test_status_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bye.is_ok());
    }
}
