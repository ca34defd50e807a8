//! Tray icon capability.
//!
//! The concrete backend is chosen by the binary and injected into the
//! controller, which only flips labels, enables items and updates the
//! tooltip.

use std::fmt;

/// Entries of the tray menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItem {
    /// Show the last check summary.
    Details,
    /// Check right now.
    Check,
    /// Log out of every mailbox and connect again.
    Reconnect,
    /// Suspend or restart the checks.
    Suspend,
    /// Reread settings and credentials.
    Reload,
    /// Log out and exit.
    Quit,
}

impl MenuItem {
    /// Every item, in menu order.
    pub const ALL: [Self; 6] = [
        Self::Details,
        Self::Check,
        Self::Reconnect,
        Self::Suspend,
        Self::Reload,
        Self::Quit,
    ];

    /// Initial label of the item.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Details => "Details",
            Self::Check => "Check",
            Self::Reconnect => "Reconnect",
            Self::Suspend => "Suspend",
            Self::Reload => "Reload",
            Self::Quit => "Quit",
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Menu and tooltip operations of a tray icon backend.
pub trait TrayIcon: Send + Sync {
    /// Appends an item to the menu.
    fn add_menu_item(&mut self, item: MenuItem);

    /// Changes the label of an item.
    fn set_item_label(&mut self, item: MenuItem, label: &str);

    /// Enables or greys out an item.
    fn set_item_enabled(&mut self, item: MenuItem, enabled: bool);

    /// Changes the tooltip of the icon.
    fn set_tooltip(&mut self, tooltip: &str);
}
