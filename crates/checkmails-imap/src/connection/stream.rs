//! Stream types for IMAP connections.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::Config;
use crate::{Error, Result};

/// A TLS-encrypted IMAP stream.
///
/// Boxed to keep the client small when moved between states.
pub struct ImapStream(Box<TlsStream<TcpStream>>);

impl ImapStream {
    /// Wraps an established TLS stream.
    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self(Box::new(stream))
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }
}

/// Creates a TLS connector with default root certificates.
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Connects to a server with TLS from the start.
///
/// Name resolution is done up front so that a lookup failure surfaces as
/// [`Error::Resolve`] rather than a generic I/O error.
pub async fn connect_tls(config: &Config) -> Result<ImapStream> {
    let addrs: Vec<_> = tokio::net::lookup_host(config.address())
        .await
        .map_err(|source| Error::Resolve {
            host: config.host.clone(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(Error::Resolve {
            host: config.host.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no address records"),
        });
    }

    debug!(host = %config.host, candidates = addrs.len(), "resolved IMAP server");
    let tcp = TcpStream::connect(addrs.as_slice()).await?;

    let server_name = ServerName::try_from(config.host.clone())?;
    let tls = create_tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(handshake_error)?;

    Ok(ImapStream::tls(tls))
}

/// Unwraps the rustls error that tokio-rustls carries inside an I/O error.
fn handshake_error(err: io::Error) -> Error {
    let tls = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .cloned();
    tls.map_or(Error::Io(err), Error::Tls)
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
    fn test_create_tls_connector() {
        let _connector = create_tls_connector();
    }

    #[test]
    fn test_handshake_error_keeps_certificate_failure() {
        let rejected = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );
        assert!(matches!(
            handshake_error(rejected),
            Error::Tls(rustls::Error::InvalidCertificate(_))
        ));

        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(matches!(handshake_error(reset), Error::Io(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_resolve_error() {
        let config = Config::new("host.invalid");
        let err = connect_tls(&config).await.err().unwrap();
        assert!(err.is_resolve(), "unexpected error: {err}");
    }
}
