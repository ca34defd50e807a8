//! Command-related type definitions.

/// SEARCH criteria understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages without the `\Seen` flag.
    Unseen,
}

impl SearchCriteria {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Unique identifier.
    Uid,
    /// Selected header fields, `BODY.PEEK[HEADER.FIELDS (...)]`.
    ///
    /// The PEEK form never sets `\Seen`.
    HeaderFields(Vec<String>),
}

impl FetchAttribute {
    /// Builds a header-fields attribute from field names.
    #[must_use]
    pub fn header_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HeaderFields(fields.into_iter().map(Into::into).collect())
    }
}
