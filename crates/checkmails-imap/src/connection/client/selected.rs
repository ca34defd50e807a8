//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Selected;
use crate::command::{Command, FetchAttribute, SearchCriteria};
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::Uid;
use crate::Result;

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected folder state.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Runs `UID SEARCH` and returns the matching UIDs in server order.
    pub async fn uid_search(&mut self, criteria: SearchCriteria) -> Result<Vec<Uid>> {
        let (responses, completion) = self.execute(&Command::UidSearch { criteria }).await?;
        Self::ensure_ok(completion)?;

        let mut uids = Vec::new();
        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Search(ids))) =
                ResponseParser::parse(response_bytes)
            {
                uids.extend(ids.into_iter().filter_map(Uid::new));
            }
        }

        Ok(uids)
    }

    /// Returns the UIDs of every message without the `\Seen` flag.
    pub async fn uid_search_unseen(&mut self) -> Result<Vec<Uid>> {
        self.uid_search(SearchCriteria::Unseen).await
    }

    /// Fetches selected header fields of one message without marking it seen.
    ///
    /// Returns the raw header block, or `None` if the message vanished
    /// before the fetch.
    pub async fn uid_fetch_header(&mut self, uid: Uid, fields: &[&str]) -> Result<Option<Vec<u8>>> {
        let command = Command::UidFetch {
            uid,
            attributes: vec![
                FetchAttribute::Uid,
                FetchAttribute::header_fields(fields.iter().copied()),
            ],
        };
        let (responses, completion) = self.execute(&command).await?;
        Self::ensure_ok(completion)?;

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { items, .. })) =
                ResponseParser::parse(response_bytes)
            {
                // Servers may push unsolicited FETCH for other messages.
                let matches_uid = items
                    .iter()
                    .all(|item| !matches!(item, FetchItem::Uid(u) if *u != uid));
                if !matches_uid {
                    continue;
                }
                if let Some(header) = items.into_iter().find_map(|item| match item {
                    FetchItem::Header(data) => Some(data),
                    FetchItem::Uid(_) => None,
                }) {
                    return Ok(Some(header));
                }
            }
        }

        Ok(None)
    }
}
