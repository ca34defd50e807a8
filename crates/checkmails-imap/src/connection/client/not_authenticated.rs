//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it advertises.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let mut capabilities = Vec::new();

        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                debug!(%text, "server greeting");
                if let Some(ResponseCode::Capability(caps)) = code {
                    capabilities = caps;
                }
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// A NO completion is reported as [`Error::Auth`], as is a BAD carrying an
    /// `AUTHENTICATIONFAILED` code.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::Protocol("server disabled LOGIN".to_string()));
        }

        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let (responses, completion) = self.execute(&command).await?;

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Capability(caps))) =
                ResponseParser::parse(response_bytes)
            {
                self.capabilities = caps;
            }
        }

        let auth_code = completion
            .code
            .as_ref()
            .is_some_and(ResponseCode::is_auth_failure);

        match completion.status {
            Status::No => return Err(Error::Auth(completion.text)),
            Status::Bad if auth_code => return Err(Error::Auth(completion.text)),
            _ => Self::ensure_ok(completion)?,
        }

        if let Some(ResponseCode::Capability(caps)) = completion_caps(&responses) {
            self.capabilities = caps;
        }

        Ok(self.transition(Authenticated))
    }
}

/// Finds capabilities piggybacked on an untagged OK during LOGIN.
fn completion_caps(responses: &[Vec<u8>]) -> Option<ResponseCode> {
    responses.iter().find_map(|bytes| match ResponseParser::parse(bytes) {
        Ok(Response::Untagged(UntaggedResponse::Ok {
            code: Some(code @ ResponseCode::Capability(_)),
            ..
        })) => Some(code),
        _ => None,
    })
}
