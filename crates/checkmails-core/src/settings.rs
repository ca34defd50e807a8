//! Application settings and their JSON persistence.
//!
//! Settings live in `<config dir>/checkmails/settings.json`. A missing file
//! yields the defaults; unknown keys are ignored and missing keys take their
//! default value.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Default time between two checks, in milliseconds.
pub const DEFAULT_TIME_MS: u64 = 300_000;

/// Default bound on a single connect or check, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Ordered list of mailbox names without duplicates.
///
/// Stored as a single comma-separated string (`"Work, Home"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MailboxList(Vec<String>);

impl MailboxList {
    /// Parses a comma-separated list, dropping empty names and duplicates.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut list = Self::default();
        for name in value.split(',') {
            list.insert(name);
        }
        list
    }

    /// True if `name` can be stored in a list: non-blank and without commas.
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty() && !name.contains(',')
    }

    /// Appends a name unless it is empty or already listed.
    ///
    /// Returns true if the name was added.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    /// Removes a name. Returns true if it was listed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        self.0.len() != before
    }

    /// Returns true if the name is listed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// Iterates over the names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no name is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MailboxList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl From<String> for MailboxList {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MailboxList> for String {
    fn from(list: MailboxList) -> Self {
        list.to_string()
    }
}

/// User-facing options of the checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Time between two checks, in milliseconds.
    pub time: u64,
    /// Bound on a single connect or check, in milliseconds.
    pub timeout: u64,
    /// Notify the per-mailbox unread counts after each check.
    pub notify_nb_unread: bool,
    /// Notify every newly arrived unread message.
    pub notify_new_unread: bool,
    /// Look for new releases on start. Kept for file compatibility only.
    pub check_update: bool,
    /// Mailboxes that are checked.
    pub active: MailboxList,
    /// Mailboxes that are configured but not checked.
    pub inactive: MailboxList,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time: DEFAULT_TIME_MS,
            timeout: DEFAULT_TIMEOUT_MS,
            notify_nb_unread: true,
            notify_new_unread: true,
            check_update: true,
            active: MailboxList::default(),
            inactive: MailboxList::default(),
        }
    }
}

impl Settings {
    /// Time between two checks.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_millis(self.time)
    }

    /// Bound on a single connect or check.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Returns true if the mailbox is in the active list.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Moves a mailbox from the active to the inactive list.
    pub fn deactivate(&mut self, name: &str) {
        self.active.remove(name);
        self.inactive.insert(name);
    }

    /// Moves a mailbox from the inactive to the active list.
    pub fn activate(&mut self, name: &str) {
        self.inactive.remove(name);
        self.active.insert(name);
    }

    /// Removes a mailbox from both lists.
    pub fn forget(&mut self, name: &str) {
        self.active.remove(name);
        self.inactive.remove(name);
    }

    /// Enforces that no mailbox is both active and inactive.
    ///
    /// A name found in both lists stays active.
    pub fn normalize(&mut self) {
        let both: Vec<String> = self
            .inactive
            .iter()
            .filter(|name| self.active.contains(name))
            .map(str::to_string)
            .collect();

        for name in both {
            warn!(mailbox = %name, "mailbox listed as both active and inactive, keeping it active");
            self.inactive.remove(&name);
        }
    }
}

/// Persistence of [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Loads the settings, falling back to defaults when none are saved.
    ///
    /// # Errors
    ///
    /// Returns an error if saved settings exist but cannot be read.
    fn load(&self) -> Result<Settings>;

    /// Saves the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings stored as pretty-printed JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the platform's default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn at_default_path() -> Result<Self> {
        default_path().map(Self::new)
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_error(&self, source: std::io::Error) -> Error {
        Error::SettingsFile {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => return Err(self.file_error(e)),
        };

        let mut settings: Settings =
            serde_json::from_str(&contents).map_err(|source| Error::SettingsFormat {
                path: self.path.clone(),
                source,
            })?;
        settings.normalize();
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.file_error(e))?;
        }

        let contents =
            serde_json::to_string_pretty(settings).map_err(|source| Error::SettingsFormat {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, contents).map_err(|e| self.file_error(e))?;

        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Returns `<config dir>/checkmails/settings.json`.
///
/// # Errors
///
/// Returns an error if the platform has no configuration directory.
pub fn default_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("checkmails").join("settings.json"))
        .ok_or_else(|| Error::Config("no configuration directory on this platform".to_string()))
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
    fn test_mailbox_list_parse() {
        let list = MailboxList::parse("Work, Home,, Work ,  ");
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["Work", "Home"]);
        assert_eq!(list.to_string(), "Work, Home");
        assert!(MailboxList::parse("").is_empty());
    }

    #[test]
    fn test_valid_names() {
        assert!(MailboxList::is_valid_name("Work"));
        assert!(MailboxList::is_valid_name("Home mail"));
        assert!(!MailboxList::is_valid_name("  "));
        assert!(!MailboxList::is_valid_name("a,b"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.check_interval(), Duration::from_secs(300));
        assert_eq!(settings.operation_timeout(), Duration::from_secs(60));
        assert!(settings.notify_nb_unread);
        assert!(settings.notify_new_unread);
        assert!(settings.active.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"time": 120000, "active": "A, B", "inactive": "C"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.time, 120000);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT_MS);
        assert_eq!(settings.active.len(), 2);
        assert!(settings.inactive.contains("C"));

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["active"], "A, B");
    }

    #[test]
    fn test_deactivate_and_activate() {
        let mut settings = Settings::default();
        settings.active = MailboxList::parse("A, B");

        settings.deactivate("B");
        assert!(!settings.is_active("B"));
        assert!(settings.inactive.contains("B"));

        settings.activate("B");
        assert!(settings.is_active("B"));
        assert!(settings.inactive.is_empty());

        settings.forget("A");
        assert!(!settings.is_active("A"));
    }

    #[test]
    fn test_normalize_keeps_active() {
        let mut settings = Settings::default();
        settings.active = MailboxList::parse("A, B");
        settings.inactive = MailboxList::parse("B, C");

        settings.normalize();
        assert!(settings.is_active("B"));
        assert_eq!(settings.inactive.to_string(), "C");
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("checkmails-settings-{}", std::process::id()));
        let store = JsonSettingsStore::new(dir.join("settings.json"));

        assert_eq!(store.load().unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.active = MailboxList::parse("Work");
        settings.notify_new_unread = false;
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_store_malformed_file() {
        let dir = std::env::temp_dir().join(format!("checkmails-malformed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonSettingsStore::new(path.clone()).load().unwrap_err();
        assert!(matches!(err, Error::SettingsFormat { path: ref p, .. } if *p == path));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
