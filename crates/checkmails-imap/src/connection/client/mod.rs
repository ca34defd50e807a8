//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Completion line of a command.
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) status: Status,
    pub(crate) code: Option<ResponseCode>,
    pub(crate) text: String,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Sends a NOOP command to keep the connection alive.
    pub async fn noop(&mut self) -> Result<()> {
        let (_, completion) = self.execute(&Command::Noop).await?;
        Self::ensure_ok(completion)
    }

    /// Gracefully disconnects from the server.
    ///
    /// Errors after the LOGOUT command was written are ignored: the server
    /// is free to drop the connection right after its BYE.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next();
        self.stream
            .write_command(&Command::Logout.serialize(&tag))
            .await?;

        if let Err(e) = self.read_until_tagged(&tag).await {
            debug!(error = %e, "connection closed during LOGOUT");
        }
        let _ = self.stream.shutdown().await;

        Ok(())
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }

    /// Sends a command and collects every response up to its completion.
    ///
    /// Returns the untagged responses and the parsed completion line.
    pub(crate) async fn execute(
        &mut self,
        command: &Command,
    ) -> Result<(Vec<Vec<u8>>, Completion)> {
        let tag = self.tag_gen.next();
        debug!(%tag, command = command.name(), "sending command");
        self.stream.write_command(&command.serialize(&tag)).await?;

        let mut responses = self.read_until_tagged(&tag).await?;
        let tagged = responses
            .pop()
            .ok_or_else(|| Error::Protocol("missing tagged response".to_string()))?;
        let completion = Self::parse_completion(&tagged, &tag)?;

        Ok((responses, completion))
    }

    /// Reads responses until we get a tagged response matching our tag.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut accumulator = ResponseAccumulator::new(tag);
        accumulator.read_until_tagged(&mut self.stream).await
    }

    /// Maps a non-OK completion to an error.
    pub(crate) fn ensure_ok(completion: Completion) -> Result<()> {
        match completion.status {
            Status::Ok | Status::PreAuth => Ok(()),
            Status::No => Err(Error::No(completion.text)),
            Status::Bad => Err(Error::Bad(completion.text)),
            Status::Bye => Err(Error::Bye(completion.text)),
        }
    }

    fn parse_completion(line: &[u8], tag: &str) -> Result<Completion> {
        match ResponseParser::parse(line)? {
            Response::Tagged {
                tag: resp_tag,
                status,
                code,
                text,
            } if resp_tag.as_str() == tag => Ok(Completion { status, code, text }),
            _ => Err(Error::Protocol("missing tagged response".to_string())),
        }
    }
}
