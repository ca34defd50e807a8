//! Connection configuration types.

use crate::{DEFAULT_PORT, Error, Result};

/// IMAP connection configuration.
///
/// Connections always use implicit TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Config {
    /// Creates a new configuration on the default port (993).
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Parses a `host` or `host:port` server string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the port is not a
    /// valid non-zero number.
    pub fn parse(server: &str) -> Result<Self> {
        let server = server.trim();
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| Error::Config(format!("invalid port in {server:?}")))?;
                (host, port)
            }
            None => (server, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Error::Config("empty server name".to_string()));
        }

        Ok(Self::new(host).with_port(port))
    }

    /// Returns the `host:port` address used for the TCP connection.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
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
    fn test_default_port() {
        let config = Config::parse("imap.example.com").unwrap();
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.address(), "imap.example.com:993");
    }

    #[test]
    fn test_explicit_port() {
        let config = Config::parse(" imap.example.com:1993 ").unwrap();
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 1993);
    }

    #[test]
    fn test_invalid_port() {
        assert!(Config::parse("imap.example.com:abc").is_err());
        assert!(Config::parse("imap.example.com:0").is_err());
        assert!(Config::parse("imap.example.com:70000").is_err());
    }

    #[test]
    fn test_empty_host() {
        assert!(Config::parse("").is_err());
        assert!(Config::parse(":993").is_err());
    }
}
