//! Desktop notifications through `notify-rust`.

use notify_rust::{Notification, Timeout};

use super::error::NotificationError;
use super::NotificationSender;

const APP_NAME: &str = "tomato-timer";

/// Sends notifications to the desktop notification service.
///
/// `send` blocks on the service round trip; call it from
/// `tokio::task::spawn_blocking`.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotificationSender {
    icon: Option<String>,
}

impl DesktopNotificationSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a named icon from the desktop theme.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

impl NotificationSender for DesktopNotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .timeout(Timeout::Milliseconds(5_000));
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(notify_rust::Urgency::Normal);
        if let Some(icon) = &self.icon {
            notification.icon(icon);
        }

        notification
            .show()
            .map(|_| ())
            .map_err(|e| NotificationError::SendFailed(e.to_string()))
    }

    fn is_available(&self) -> bool {
        true
    }
}
