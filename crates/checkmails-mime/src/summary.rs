//! Notification-ready view of a message header.

use chrono::{DateTime, Local};

use crate::header::Headers;

/// Subject, sender and date of a message, decoded for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSummary {
    /// Decoded `Subject`, empty when missing.
    pub subject: String,
    /// Decoded `From`, empty when missing.
    pub from: String,
    /// `Date` rendered in local time, verbatim when unparsable.
    pub date: String,
}

impl HeaderSummary {
    /// Builds a summary from a raw header block.
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self::from_headers(&Headers::parse(raw))
    }

    /// Builds a summary from parsed headers.
    #[must_use]
    pub fn from_headers(headers: &Headers) -> Self {
        Self {
            subject: headers.get_decoded("Subject").unwrap_or_default(),
            from: headers.get_decoded("From").unwrap_or_default(),
            date: headers.get("Date").map(format_date).unwrap_or_default(),
        }
    }
}

/// Renders an RFC 2822 date in the local timezone.
///
/// Trailing comments such as `(UTC)` are tolerated. Anything chrono cannot
/// parse is returned unchanged.
#[must_use]
pub fn format_date(raw: &str) -> String {
    let trimmed = raw
        .split_once(" (")
        .map_or(raw, |(date, _)| date)
        .trim();

    DateTime::parse_from_rfc2822(trimmed).map_or_else(
        |_| raw.to_string(),
        |date| {
            date.with_timezone(&Local)
                .format("%a %d %b %Y, %H:%M")
                .to_string()
        },
    )
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
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_summary_from_bytes() {
        let raw = b"Subject: =?utf-8?Q?R=C3=A9union?=\r\nFrom: Bob <bob@example.org>\r\n\r\n";
        let summary = HeaderSummary::from_bytes(raw);
        assert_eq!(summary.subject, "Réunion");
        assert_eq!(summary.from, "Bob <bob@example.org>");
        assert_eq!(summary.date, "");
    }

    #[test]
    fn test_format_date_local() {
        let raw = "Tue, 3 Mar 2026 10:00:00 +0000 (UTC)";
        let expected = Local
            .from_utc_datetime(
                &DateTime::parse_from_rfc2822("Tue, 3 Mar 2026 10:00:00 +0000")
                    .unwrap()
                    .naive_utc(),
            )
            .format("%a %d %b %Y, %H:%M")
            .to_string();
        assert_eq!(format_date(raw), expected);
    }

    #[test]
    fn test_format_date_unparsable() {
        assert_eq!(format_date("sometime last week"), "sometime last week");
    }

    proptest! {
        #[test]
        fn plain_ascii_subjects_survive(subject in "[A-Za-z0-9 ,.!]{1,40}") {
            let raw = format!("Subject: {subject}\r\n\r\n");
            let summary = HeaderSummary::from_bytes(raw.as_bytes());
            prop_assert_eq!(summary.subject, subject.trim());
        }
    }
}
