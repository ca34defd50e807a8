//! IMAP protocol parser.
//!
//! A sans-I/O parser for the server responses a polling client receives:
//! status responses, CAPABILITY, SEARCH, EXISTS and FETCH with header
//! literals. Anything else parses as [`UntaggedResponse::Other`].
//!
//! # Example
//!
//! ```
//! use checkmails_imap::parser::{ResponseParser, Response, UntaggedResponse};
//!
//! let input = b"* SEARCH 3 5 8\r\n";
//! let response = ResponseParser::parse(input).unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Search(ids)) => {
//!         assert_eq!(ids, vec![3, 5, 8]);
//!     }
//!     _ => panic!("Expected SEARCH"),
//! }
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
