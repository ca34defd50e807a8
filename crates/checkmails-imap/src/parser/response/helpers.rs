//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, ResponseCode};
use crate::Result;

/// Parses a bracketed response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "AUTHORIZATIONFAILED" => ResponseCode::AuthorizationFailed,
        "NONEXISTENT" => ResponseCode::NonExistent,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "UNAVAILABLE" => ResponseCode::Unavailable,
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Arguments of codes we do not model may contain anything but `]`.
    if lexer.take_until(b']').is_none() {
        return Err(crate::Error::Parse {
            position: lexer.position(),
            message: "unterminated response code".to_string(),
        });
    }

    Ok(code)
}

/// Parses space-separated capability atoms.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a SEARCH response.
///
/// Non-numeric trailers such as `(MODSEQ 42)` are ignored.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Vec<u32> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token() {
            Ok(Token::Number(n)) if n > 0 => nums.push(n),
            Ok(Token::Number(_) | Token::Space) => {}
            _ => break,
        }
    }

    nums
}

/// Reads text until CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();

    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end + 2);

    String::from_utf8_lossy(&remaining[..end]).into_owned()
}
