//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::command::Command;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a folder.
    ///
    /// Consumes self and returns a selected client on success, together with
    /// the message count announced by the server.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, u32)> {
        let command = Command::Select {
            mailbox: mailbox.to_string(),
        };
        let (responses, completion) = self.execute(&command).await?;
        Self::ensure_ok(completion)?;

        let exists = responses
            .iter()
            .filter_map(|bytes| match ResponseParser::parse(bytes) {
                Ok(Response::Untagged(UntaggedResponse::Exists(n))) => Some(n),
                _ => None,
            })
            .last()
            .unwrap_or(0);

        Ok((self.transition(Selected::new(mailbox, exists)), exists))
    }
}
