//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::{Error, Result};

use super::types::FetchItem;

/// Parses the parenthesized item list of a FETCH response.
///
/// Only `UID` and `BODY[HEADER...]` items are kept; everything else is
/// skipped.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen | Token::Eof => break,
            Token::Atom(name) => match name.to_uppercase().as_str() {
                "UID" => {
                    lexer.expect_space()?;
                    let n = lexer.read_number()?;
                    let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: format!("invalid UID value: {n} (UID cannot be 0)"),
                    })?;
                    items.push(FetchItem::Uid(uid));
                }
                "BODY" | "RFC822.HEADER" => {
                    let section = parse_body_section(lexer)?;
                    lexer.expect_space()?;
                    let data = match lexer.next_token()? {
                        Token::Literal(d) => Some(d),
                        Token::QuotedString(s) => Some(s.into_bytes()),
                        _ => None,
                    };
                    let is_header = name.eq_ignore_ascii_case("RFC822.HEADER")
                        || section.to_uppercase().starts_with("HEADER");
                    if let (true, Some(data)) = (is_header, data) {
                        items.push(FetchItem::Header(data));
                    }
                }
                _ => skip_fetch_value(lexer)?,
            },
            _ => {}
        }
    }

    Ok(items)
}

/// Consumes an optional `[section]` and `<origin>` after BODY.
fn parse_body_section(lexer: &mut Lexer<'_>) -> Result<String> {
    let mut section = String::new();

    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let raw = lexer.take_until(b']').ok_or_else(|| Error::Parse {
            position: lexer.position(),
            message: "unterminated body section".to_string(),
        })?;
        section = String::from_utf8_lossy(raw).into_owned();
    }

    if lexer.peek() == Some(b'<') {
        let _ = lexer.take_until(b'>');
    }

    Ok(section)
}

/// Skips the value of an uninteresting FETCH item.
fn skip_fetch_value(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }

    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::RParen | Token::Eof => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unexpected end of FETCH item".to_string(),
                });
            }
            _ if depth == 0 => return Ok(()),
            _ => {}
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
    fn test_parse_fetch_uid_valid() {
        let mut lexer = Lexer::new(b"(UID 42)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(42).unwrap())]);
    }

    #[test]
    fn test_parse_fetch_uid_zero_rejected() {
        let mut lexer = Lexer::new(b"(UID 0)");
        assert!(parse_fetch_response(&mut lexer).is_err());
    }

    #[test]
    fn test_parse_header_fields_literal() {
        let input = b"(UID 7 BODY[HEADER.FIELDS (SUBJECT DATE)] {14}\r\nSubject: x\r\n\r\n)";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items,
            vec![
                FetchItem::Uid(Uid::new(7).unwrap()),
                FetchItem::Header(b"Subject: x\r\n\r\n".to_vec()),
            ]
        );
    }

    #[test]
    fn test_skips_flags_and_other_items() {
        let input = b"(FLAGS (\\Seen \\Answered) RFC822.SIZE 1200 UID 9)";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(9).unwrap())]);
    }

    #[test]
    fn test_body_text_is_not_a_header() {
        let input = b"(BODY[TEXT] {2}\r\nhi)";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_nil_header() {
        let input = b"(UID 3 BODY[HEADER] NIL)";
        let mut lexer = Lexer::new(input);
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(3).unwrap())]);
    }
}
