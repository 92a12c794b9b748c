//! Notification system error types.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to send a notification.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// No notification service is reachable (no session bus, headless).
    #[error("notification service is not available")]
    NotAvailable,

    /// The dedup lock file could not be read or written.
    #[error("notification lock error: {0}")]
    Lock(String),
}

impl NotificationError {
    /// Returns true if retrying later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::Lock(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "check that a notification daemon is running",
            Self::NotAvailable => "run inside a desktop session or disable notifications",
            Self::Lock(_) => "check permissions of the data directory",
        }
    }
}
