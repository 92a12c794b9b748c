//! Desktop notification support.
//!
//! This module provides:
//!
//! - [`NotificationSender`], the seam the completion feedback calls into
//! - [`DesktopNotificationSender`], delivering through `notify-rust`
//! - [`NotificationLock`], a file-backed dedup table shared by all daemons
//!   of the same user
//! - [`MockNotificationSender`] for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tomato_timer::notification::{DesktopNotificationSender, NotificationSender};
//!
//! let sender = DesktopNotificationSender::new();
//! sender.send("Focus Session Complete!", "Time to switch tasks!")?;
//! # Ok::<(), tomato_timer::notification::NotificationError>(())
//! ```

mod desktop;
pub mod error;
mod lock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use self::desktop::DesktopNotificationSender;
pub use self::error::NotificationError;
pub use self::lock::{completion_key, NotificationLock, LOCK_EXPIRY_MS, LOCK_FILE_NAME};

/// Something that can put a notification in front of the user.
///
/// `send` may block; async callers should go through `spawn_blocking`.
pub trait NotificationSender: Send + Sync {
    /// Sends a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification service rejected it.
    fn send(&self, title: &str, body: &str) -> Result<(), NotificationError>;

    /// Returns true if notifications can be delivered at all.
    fn is_available(&self) -> bool;
}

#[derive(Debug)]
pub struct MockNotificationSender {
    notifications: Mutex<Vec<(String, String)>>,
    available: AtomicBool,
    should_fail: AtomicBool,
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationSender {
    #[must_use]
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Returns the recorded `(title, body)` pairs.
    #[must_use]
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear_recorded(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl NotificationSender for MockNotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
