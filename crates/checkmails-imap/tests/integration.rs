//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to replay a server transcript without a
//! real server connection.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use checkmails_imap::{Client, Error, Uid};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap();
        let data = self.responses.get_ref();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_full_poll_session() {
    let transcript = b"* OK [CAPABILITY IMAP4rev1] ready\r\n\
A0000 OK [CAPABILITY IMAP4rev1 IDLE] Logged in\r\n\
* FLAGS (\\Seen \\Answered)\r\n\
* 12 EXISTS\r\n\
* 0 RECENT\r\n\
A0001 OK [READ-WRITE] SELECT completed\r\n\
* SEARCH 4 9\r\n\
A0002 OK SEARCH completed\r\n\
* 2 FETCH (UID 9 BODY[HEADER.FIELDS (SUBJECT FROM DATE)] {18}\r\n\
Subject: Hello\r\n\r\n)\r\n\
A0003 OK FETCH completed\r\n\
* BYE logging out\r\n\
A0004 OK LOGOUT completed\r\n";

    let (stream, sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user@example.com", "secret").await.unwrap();
    let (mut client, exists) = client.select("INBOX").await.unwrap();
    assert_eq!(exists, 12);
    assert_eq!(client.selected().mailbox(), "INBOX");

    let unseen = client.uid_search_unseen().await.unwrap();
    let values: Vec<u32> = unseen.iter().map(|u| u.get()).collect();
    assert_eq!(values, vec![4, 9]);

    let header = client
        .uid_fetch_header(Uid::new(9).unwrap(), &["SUBJECT", "FROM", "DATE"])
        .await
        .unwrap();
    assert_eq!(header.as_deref(), Some(&b"Subject: Hello\r\n\r\n"[..]));

    client.logout().await.unwrap();

    let sent = sent_text(&sent);
    assert_eq!(
        sent,
        "A0000 LOGIN user@example.com secret\r\n\
A0001 SELECT INBOX\r\n\
A0002 UID SEARCH UNSEEN\r\n\
A0003 UID FETCH 9 (UID BODY.PEEK[HEADER.FIELDS (SUBJECT FROM DATE)])\r\n\
A0004 LOGOUT\r\n"
    );
}

#[tokio::test]
async fn test_login_rejected_is_auth_error() {
    let transcript = b"* OK ready\r\nA0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n";

    let (stream, _sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let err = client.login("user", "wrong").await.unwrap_err();

    assert!(err.is_auth(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_select_missing_folder_is_no() {
    let transcript = b"* OK ready\r\n\
A0000 OK Logged in\r\n\
A0001 NO [NONEXISTENT] Unknown Mailbox: Archive\r\n";

    let (stream, _sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let err = client.select("Archive").await.unwrap_err();

    assert!(matches!(err, Error::No(ref text) if text.contains("Archive")));
}

#[tokio::test]
async fn test_bye_greeting() {
    let (stream, _sent) = MockStream::new(b"* BYE too many connections\r\n");
    let err = Client::from_stream(stream).await.unwrap_err();

    assert!(matches!(err, Error::Bye(ref text) if text == "too many connections"));
}

#[tokio::test]
async fn test_connection_drop_mid_search() {
    let transcript = b"* OK ready\r\n\
A0000 OK Logged in\r\n\
A0001 OK SELECT completed\r\n\
* SEARCH 1";

    let (stream, _sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let (mut client, exists) = client.select("INBOX").await.unwrap();
    assert_eq!(exists, 0);

    let err = client.uid_search_unseen().await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn test_fetch_of_expunged_message_returns_none() {
    let transcript = b"* OK ready\r\n\
A0000 OK Logged in\r\n\
A0001 OK SELECT completed\r\n\
A0002 OK FETCH completed\r\n";

    let (stream, _sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let (mut client, _) = client.select("INBOX").await.unwrap();

    let header = client
        .uid_fetch_header(Uid::new(5).unwrap(), &["SUBJECT"])
        .await
        .unwrap();
    assert!(header.is_none());
}

#[tokio::test]
async fn test_noop_after_select() {
    let transcript = b"* OK ready\r\n\
A0000 OK Logged in\r\n\
A0001 OK SELECT completed\r\n\
* 3 EXISTS\r\n\
A0002 OK NOOP completed\r\n";

    let (stream, sent) = MockStream::new(transcript);
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("user", "pass").await.unwrap();
    let (mut client, _) = client.select("INBOX").await.unwrap();
    client.noop().await.unwrap();

    assert!(sent_text(&sent).ends_with("A0002 NOOP\r\n"));
}
