//! Transfer-encoding and RFC 2047 decoding utilities.
//!
//! Only decoding is supported: header values arrive encoded from the server
//! and are turned into display text.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045) into raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains an invalid escape sequence.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        match &bytes[i + 1..] {
            [b'\r', b'\n', ..] => i += 3,
            [b'\n', ..] => i += 2,
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                result.push((hex_value(*hi) << 4) | hex_value(*lo));
                i += 3;
            }
            _ => {
                return Err(Error::InvalidEncoding(format!(
                    "invalid escape sequence at byte {i}"
                )));
            }
        }
    }

    Ok(result)
}

const fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Converts bytes in the given charset to a string.
///
/// UTF-8 and ASCII are decoded lossily, the ISO-8859-1 family maps bytes to
/// code points one to one. Unknown charsets fall back to lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    // RFC 2231 allows a language suffix: utf-8*en
    let charset = charset.split('*').next().unwrap_or(charset).to_lowercase();

    match charset.as_str() {
        "iso-8859-1" | "iso-8859-15" | "latin1" | "windows-1252" | "cp1252" => {
            bytes.iter().copied().map(char::from).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes a single encoded word of the form `=?charset?encoding?text?=`.
///
/// # Errors
///
/// Returns an error if the word is malformed or its payload does not decode.
pub fn decode_encoded_word(word: &str) -> Result<String> {
    let inner = word
        .strip_prefix("=?")
        .and_then(|w| w.strip_suffix("?="))
        .ok_or_else(|| Error::InvalidEncoding("not an encoded word".to_string()))?;

    let mut parts = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(text)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    let bytes = match encoding {
        "B" | "b" => decode_base64(text)?,
        "Q" | "q" => decode_quoted_printable(&text.replace('_', " "))?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    Ok(decode_charset(&bytes, charset))
}

/// Decodes every RFC 2047 encoded word inside a header value.
///
/// Plain text around encoded words is kept. Whitespace separating two
/// adjacent encoded words is dropped, as RFC 2047 section 6.2 requires.
/// Words that fail to decode are left verbatim.
#[must_use]
pub fn decode_rfc2047(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        let decoded = encoded_word_len(candidate)
            .and_then(|len| decode_encoded_word(&candidate[..len]).ok().map(|s| (len, s)));

        match decoded {
            Some((len, text)) => {
                if !(after_word && before.chars().all(char::is_whitespace)) {
                    out.push_str(before);
                }
                out.push_str(&text);
                rest = &candidate[len..];
                after_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Returns the length of the encoded word at the start of `s`, if any.
fn encoded_word_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("=?")?;
    let charset_end = body.find('?')?;
    let after_charset = &body[charset_end + 1..];
    let encoding_end = after_charset.find('?')?;
    let text = &after_charset[encoding_end + 1..];
    let text_end = text.find("?=")?;

    let len = 2 + charset_end + 1 + encoding_end + 1 + text_end + 2;
    let word = &s[..len];
    if word.chars().any(char::is_whitespace) {
        return None;
    }

    Some(len)
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
    fn test_base64_decode() {
        assert_eq!(decode_base64("SGVsbG8s IFdvcmxkIQ==").unwrap(), b"Hello, World!");
        assert!(decode_base64("***").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("Hello, World!").unwrap(), b"Hello, World!");
        assert_eq!(
            decode_quoted_printable("H=C3=A9llo").unwrap(),
            "Héllo".as_bytes()
        );
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert!(decode_quoted_printable("broken=Z").is_err());
        assert!(decode_quoted_printable("trailing=").is_err());
    }

    #[test]
    fn test_encoded_word_base64() {
        assert_eq!(decode_encoded_word("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_encoded_word_q_with_underscore() {
        assert_eq!(
            decode_encoded_word("=?UTF-8?Q?Caf=C3=A9_cr=C3=A8me?=").unwrap(),
            "Café crème"
        );
    }

    #[test]
    fn test_encoded_word_latin1() {
        assert_eq!(decode_encoded_word("=?ISO-8859-1?Q?Gr=FC=DFe?=").unwrap(), "Grüße");
    }

    #[test]
    fn test_encoded_word_unknown_encoding() {
        assert!(decode_encoded_word("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2047_mixed_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?Q?r=C3=A9union?= demain"),
            "Re: réunion demain"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Hello?= =?utf-8?Q?_World?="),
            "Hello World"
        );
    }

    #[test]
    fn test_rfc2047_plain_and_malformed_pass_through() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("a =? b"), "a =? b");
        assert_eq!(decode_rfc2047("=?utf-8?B?***?="), "=?utf-8?B?***?=");
    }
}
