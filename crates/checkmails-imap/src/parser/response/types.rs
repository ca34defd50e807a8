//! Response data types.

use crate::types::{Capability, ResponseCode, Uid};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// UID.
    Uid(Uid),
    /// Header block returned for a `BODY[HEADER...]` section.
    Header(Vec<u8>),
}

/// Untagged response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// OK response.
    Ok {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// NO response.
    No {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// BAD response.
    Bad {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// PREAUTH greeting.
    PreAuth {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// BYE response.
    Bye {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<Capability>),
    /// SEARCH results (UIDs for `UID SEARCH`, sequence numbers otherwise).
    Search(Vec<u32>),
    /// Message count.
    Exists(u32),
    /// FETCH data.
    Fetch {
        /// Sequence number.
        seq: u32,
        /// Items the client cares about.
        items: Vec<FetchItem>,
    },
    /// Any response the client does not interpret.
    Other(String),
}
