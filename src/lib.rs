//! Tomato Timer Library
//!
//! This library provides the core functionality for the Tomato Timer.
//! It includes:
//! - A drift-free timer engine and the driver that ticks it
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Type definitions for settings, snapshots and wire messages
//! - Task list persistence and completion toasts
//! - Completion sounds and desktop notifications

pub mod cli;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod sound;
pub mod tasks;
pub mod toast;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    format_time, parse_time, IpcRequest, IpcResponse, ResponseData, SoundKind, Task, TimerMode,
    TimerParams, TimerSnapshot, TimerStatus, Toast, ToastKind,
};

pub use config::AppConfig;

pub use daemon::{
    Clock, Daemon, DaemonOptions, ManualClock, MonotonicClock, TimerDriver, TimerEngine,
    TimerEvent,
};

// Re-export notification types
pub use notification::{
    DesktopNotificationSender, MockNotificationSender, NotificationError, NotificationLock,
    NotificationSender,
};

// Re-export sound types
pub use sound::{MockSoundPlayer, RodioSoundPlayer, SoundError, SoundPlayer};

pub use tasks::{TaskError, TaskStore};
pub use toast::ToastBoard;
