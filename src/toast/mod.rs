//! Short-lived messages for whoever is watching the timer.

use std::time::Duration;

use crate::types::{Toast, ToastKind};

/// Lifetime of the completion toast.
pub const COMPLETION_TOAST_LIFETIME: Duration = Duration::from_secs(5);

/// Live toasts, oldest first.
#[derive(Debug, Default)]
pub struct ToastBoard {
    toasts: Vec<Toast>,
}

impl ToastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, kind: ToastKind, lifetime: Duration, now_ms: u64) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            expires_at: now_ms + lifetime.as_millis() as u64,
        });
    }

    /// Drops expired toasts and returns the rest.
    pub fn active(&mut self, now_ms: u64) -> Vec<Toast> {
        self.toasts.retain(|t| t.expires_at > now_ms);
        self.toasts.clone()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
