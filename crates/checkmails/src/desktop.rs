//! Desktop notifications through the notification daemon.

use checkmails_core::NotificationSink;
use notify_rust::Notification;
use tracing::{info, warn};

/// Icon shown next to every notification.
const ICON: &str = "mail-unread";

/// How long a notification stays on screen, in milliseconds.
const TIMEOUT_MS: i32 = 10_000;

/// [`NotificationSink`] backed by `notify-rust`.
///
/// Notifications are shown from the blocking pool so the controller never
/// waits on D-Bus.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    icon: String,
    timeout_ms: i32,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            icon: ICON.to_string(),
            timeout_ms: TIMEOUT_MS,
        }
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!(%title, %body, "notification");

        let (title, body, icon) = (title.to_string(), body.to_string(), self.icon.clone());
        let timeout = self.timeout_ms;
        tokio::task::spawn_blocking(move || {
            if let Err(e) = Notification::new()
                .summary(&title)
                .body(&body)
                .icon(&icon)
                .timeout(timeout)
                .show()
            {
                warn!(error = %e, "cannot show notification");
            }
        });
    }

    fn set_badge_count(&self, count: usize) {
        info!(count, "unread total");
    }
}
