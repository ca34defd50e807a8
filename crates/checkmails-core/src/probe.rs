//! Internet reachability probe.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Host contacted by [`TcpProbe`] by default.
pub const DEFAULT_PROBE_ADDRESS: &str = "www.google.com:443";

/// Bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Answers whether the machine can currently reach the Internet.
pub trait ConnectivityProbe: Send + Sync + 'static {
    /// Returns true if the Internet is reachable.
    fn is_online(&self) -> impl Future<Output = bool> + Send;
}

/// Probe that opens a TCP connection to a well-known host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_ADDRESS, DEFAULT_PROBE_TIMEOUT)
    }
}

impl TcpProbe {
    /// Creates a probe for `host:port`, bounded by `timeout`.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(address = %self.address, error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!(address = %self.address, "probe timed out");
                false
            }
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
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(address, Duration::from_secs(1));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host() {
        let probe = TcpProbe::new("probe.host.invalid:443", Duration::from_secs(1));
        assert!(!probe.is_online().await);
    }
}
