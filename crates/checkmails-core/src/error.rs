//! Errors of the settings and configuration layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The settings file could not be read or written.
    #[error("cannot access settings file {}: {source}", path.display())]
    SettingsFile {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`crate::Settings`].
    #[error("malformed settings file {}: {source}", path.display())]
    SettingsFormat {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A mailbox or platform setting is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
