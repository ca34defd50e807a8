//! Header block parsing.

use std::collections::HashMap;

use crate::encoding::decode_rfc2047;

/// Collection of message headers, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Gets the first value for a header with encoded words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if no header was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Parses a raw header block.
    ///
    /// Folded continuation lines are unfolded into a single space. Parsing
    /// stops at the first empty line. Lines without a colon are ignored, and
    /// non-UTF-8 bytes are replaced.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
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
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Subject", "Hi");
        assert_eq!(headers.get("Subject"), Some("Hi"));
        assert_eq!(headers.get("SUBJECT"), Some("Hi"));
        assert!(headers.get("From").is_none());
    }

    #[test]
    fn test_headers_parse() {
        let raw = concat!(
            "From: sender@example.com\r\n",
            "Subject: A very long\r\n",
            "\tsubject line\r\n",
            "Date: Tue, 3 Mar 2026 10:00:00 +0000\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(raw.as_bytes());
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(headers.get("subject"), Some("A very long subject line"));
        assert!(headers.get("body").is_none());
    }

    #[test]
    fn test_headers_parse_repeated() {
        let headers = Headers::parse(b"Received: a\r\nReceived: b\r\n");
        assert_eq!(headers.get_all("received"), vec!["a", "b"]);
    }

    #[test]
    fn test_headers_parse_garbage() {
        let headers = Headers::parse(b"no colon here\r\n \tdangling\r\n");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_get_decoded() {
        let headers = Headers::parse(b"Subject: =?utf-8?B?SMOpbGxv?= there\r\n");
        assert_eq!(headers.get_decoded("Subject").as_deref(), Some("Héllo there"));
    }
}
