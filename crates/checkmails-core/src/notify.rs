//! Desktop notification sink.

/// Receives user-facing notifications and the unread total.
///
/// Both calls are fire-and-forget: implementations must not block the
/// caller on the desktop notification service.
pub trait NotificationSink: Send + Sync {
    /// Shows a notification.
    fn notify(&self, title: &str, body: &str);

    /// Renders the unread total on the tray icon.
    fn set_badge_count(&self, count: usize);
}
