//! Core data types for the Tomato Timer.
//!
//! This module defines the data structures used for:
//! - Timer mode/status and configuration with validation
//! - Snapshots published to subscribers
//! - Tasks and toasts shown by the CLI
//! - IPC request/response serialization

mod format;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use format::{format_time, parse_time, ParseTimeError};

/// Upper bound for any configured duration (24 hours).
pub const MAX_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

// ============================================================================
// TimerMode
// ============================================================================

/// The kind of session the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimerMode {
    /// Focused work session
    #[default]
    Focus,
    /// Short break between focus sessions
    ShortBreak,
    /// Long break after every `long_break_interval` focus sessions
    LongBreak,
}

impl TimerMode {
    /// Returns the wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short-break",
            TimerMode::LongBreak => "long-break",
        }
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    /// Returns true for either break mode.
    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Focus)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(TimerMode::Focus),
            "short-break" | "short" => Ok(TimerMode::ShortBreak),
            "long-break" | "long" => Ok(TimerMode::LongBreak),
            other => Err(format!(
                "unknown mode '{other}' (expected focus, short-break or long-break)"
            )),
        }
    }
}

// ============================================================================
// TimerStatus
// ============================================================================

/// Whether the timer is counting down, frozen or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    /// Not started, showing the full duration
    #[default]
    Idle,
    /// Counting down against an end time
    Running,
    /// Frozen with time left
    Paused,
    /// Reached zero, waiting for the auto-transition
    Completed,
}

impl TimerStatus {
    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }

    /// Returns true if the tick sampler should be active.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerStatus::Running)
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SoundKind
// ============================================================================

/// The tone played when a session completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    #[default]
    Bell,
    Knock,
    Chime,
    Digital,
}

impl SoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundKind::Bell => "bell",
            SoundKind::Knock => "knock",
            SoundKind::Chime => "chime",
            SoundKind::Digital => "digital",
        }
    }
}

impl FromStr for SoundKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bell" => Ok(SoundKind::Bell),
            "knock" => Ok(SoundKind::Knock),
            "chime" => Ok(SoundKind::Chime),
            "digital" => Ok(SoundKind::Digital),
            other => Err(format!(
                "unknown sound '{other}' (expected bell, knock, chime or digital)"
            )),
        }
    }
}

// ============================================================================
// TimerParams
// ============================================================================

/// Errors raised when validating timer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A duration was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    /// A duration exceeded 24 hours.
    #[error("{field} must not exceed 24 hours")]
    DurationTooLong { field: &'static str },

    /// The long break interval was zero.
    #[error("longBreakInterval must be at least 1")]
    ZeroInterval,

    /// The volume was outside [0, 1].
    #[error("soundVolume must be between 0 and 1, got {0}")]
    InvalidVolume(f32),
}

/// Configuration for the timer engine and its feedback collaborators.
///
/// Durations are in milliseconds. The engine assumes the params passed
/// `validate`; it performs no runtime checks of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerParams {
    pub focus_duration: u64,
    pub short_break_duration: u64,
    pub long_break_duration: u64,
    /// Completed focus sessions before a long break
    pub long_break_interval: u32,
    /// Start the next session right after the auto-transition
    pub auto_start: bool,
    /// Reserved; completion behaves the same either way
    pub overtime: bool,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub sound_type: SoundKind,
    /// Playback volume in [0, 1]
    pub sound_volume: f32,
}

impl Default for TimerParams {
    fn default() -> Self {
        Self {
            focus_duration: 25 * 60 * 1000,
            short_break_duration: 5 * 60 * 1000,
            long_break_duration: 15 * 60 * 1000,
            long_break_interval: 4,
            auto_start: false,
            overtime: false,
            notifications_enabled: false,
            sound_enabled: true,
            sound_type: SoundKind::Bell,
            sound_volume: 0.5,
        }
    }
}

impl TimerParams {
    /// Returns the configured length of a session in the given mode.
    pub fn duration(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_duration,
            TimerMode::ShortBreak => self.short_break_duration,
            TimerMode::LongBreak => self.long_break_duration,
        }
    }

    pub fn with_focus_duration(mut self, ms: u64) -> Self {
        self.focus_duration = ms;
        self
    }

    pub fn with_short_break_duration(mut self, ms: u64) -> Self {
        self.short_break_duration = ms;
        self
    }

    pub fn with_long_break_duration(mut self, ms: u64) -> Self {
        self.long_break_duration = ms;
        self
    }

    pub fn with_long_break_interval(mut self, interval: u32) -> Self {
        self.long_break_interval = interval;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Returns the volume clamped to [0, 1]; NaN maps to silence.
    pub fn clamped_volume(&self) -> f32 {
        if self.sound_volume.is_nan() {
            0.0
        } else {
            self.sound_volume.clamp(0.0, 1.0)
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("focusDuration", self.focus_duration),
            ("shortBreakDuration", self.short_break_duration),
            ("longBreakDuration", self.long_break_duration),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
            if value > MAX_DURATION_MS {
                return Err(ConfigError::DurationTooLong { field });
            }
        }
        if self.long_break_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if !self.sound_volume.is_finite() || !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(ConfigError::InvalidVolume(self.sound_volume));
        }
        Ok(())
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Owned copy of the engine's public state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub status: TimerStatus,
    /// Remaining milliseconds
    pub time_left: u64,
    pub sessions_completed: u32,
    pub params: TimerParams,
}

impl TimerSnapshot {
    /// Returns the full length of the current session.
    pub fn duration(&self) -> u64 {
        self.params.duration(self.mode)
    }

    /// Fraction of the session already elapsed, in [0, 1].
    pub fn progress(&self) -> f64 {
        let duration = self.duration();
        if duration == 0 {
            return 1.0;
        }
        let elapsed = duration.saturating_sub(self.time_left);
        elapsed as f64 / duration as f64
    }
}

// ============================================================================
// Task
// ============================================================================

/// A task tracked alongside the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub completed: bool,
    /// Creation time in epoch milliseconds
    pub created_at: u64,
}

/// Partial update applied to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(alias = "estimate")]
    pub estimated_pomodoros: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.estimated_pomodoros.is_none() && self.notes.is_none()
    }
}

// ============================================================================
// Toast
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

/// Short-lived message shown to whoever is watching the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    /// Epoch milliseconds after which the toast is dropped
    pub expires_at: u64,
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start or resume the current session
    Start,
    /// Pause the running session
    Pause,
    /// Reset the current session to its full duration
    Reset,
    /// Complete the current session immediately
    Skip,
    /// Switch to another mode
    Switch { mode: TimerMode },
    /// Replace the timer parameters
    Params { params: TimerParams },
    /// Query the current status
    Status,
    TaskAdd {
        title: String,
        #[serde(default = "default_estimate")]
        estimate: u32,
    },
    TaskList,
    TaskDone { id: String },
    TaskRemove { id: String },
    TaskActivate { id: Option<String> },
    TaskUpdate {
        id: String,
        #[serde(flatten)]
        update: TaskUpdate,
    },
    TaskReorder { ids: Vec<String> },
}

fn default_estimate() -> u32 {
    1
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<TimerSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toasts: Vec<Toast>,
}

impl ResponseData {
    /// Creates response data carrying only a timer snapshot.
    pub fn from_snapshot(snapshot: TimerSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // TimerMode / TimerStatus Tests
    // ------------------------------------------------------------------------

    mod mode_status_tests {
        use super::*;

        #[test]
        fn test_default_mode_and_status() {
            assert_eq!(TimerMode::default(), TimerMode::Focus);
            assert_eq!(TimerStatus::default(), TimerStatus::Idle);
        }

        #[test]
        fn test_mode_wire_names() {
            assert_eq!(
                serde_json::to_string(&TimerMode::ShortBreak).unwrap(),
                "\"short-break\""
            );
            assert_eq!(
                serde_json::to_string(&TimerMode::LongBreak).unwrap(),
                "\"long-break\""
            );
            let mode: TimerMode = serde_json::from_str("\"focus\"").unwrap();
            assert_eq!(mode, TimerMode::Focus);
        }

        #[test]
        fn test_mode_from_str_accepts_short_aliases() {
            assert_eq!("short".parse::<TimerMode>(), Ok(TimerMode::ShortBreak));
            assert_eq!("long-break".parse::<TimerMode>(), Ok(TimerMode::LongBreak));
            assert!("lunch".parse::<TimerMode>().is_err());
        }

        #[test]
        fn test_is_break() {
            assert!(!TimerMode::Focus.is_break());
            assert!(TimerMode::ShortBreak.is_break());
            assert!(TimerMode::LongBreak.is_break());
        }

        #[test]
        fn test_status_is_running() {
            assert!(TimerStatus::Running.is_running());
            assert!(!TimerStatus::Paused.is_running());
            assert!(!TimerStatus::Completed.is_running());
            assert_eq!(TimerStatus::Completed.to_string(), "completed");
        }
    }

    // ------------------------------------------------------------------------
    // TimerParams Tests
    // ------------------------------------------------------------------------

    mod timer_params_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let params = TimerParams::default();
            assert_eq!(params.focus_duration, 1_500_000);
            assert_eq!(params.short_break_duration, 300_000);
            assert_eq!(params.long_break_duration, 900_000);
            assert_eq!(params.long_break_interval, 4);
            assert!(!params.auto_start);
            assert!(!params.overtime);
            assert!(!params.notifications_enabled);
            assert!(params.sound_enabled);
            assert_eq!(params.sound_type, SoundKind::Bell);
            assert_eq!(params.sound_volume, 0.5);
        }

        #[test]
        fn test_duration_per_mode() {
            let params = TimerParams::default()
                .with_focus_duration(10)
                .with_short_break_duration(20)
                .with_long_break_duration(30);
            assert_eq!(params.duration(TimerMode::Focus), 10);
            assert_eq!(params.duration(TimerMode::ShortBreak), 20);
            assert_eq!(params.duration(TimerMode::LongBreak), 30);
        }

        #[test]
        fn test_validate_defaults_ok() {
            assert!(TimerParams::default().validate().is_ok());
        }

        #[test]
        fn test_validate_rejects_zero_duration() {
            let params = TimerParams::default().with_short_break_duration(0);
            assert_eq!(
                params.validate(),
                Err(ConfigError::ZeroDuration {
                    field: "shortBreakDuration"
                })
            );
        }

        #[test]
        fn test_validate_rejects_long_duration() {
            let params = TimerParams::default().with_focus_duration(MAX_DURATION_MS + 1);
            assert!(matches!(
                params.validate(),
                Err(ConfigError::DurationTooLong { .. })
            ));
        }

        #[test]
        fn test_validate_rejects_zero_interval() {
            let params = TimerParams::default().with_long_break_interval(0);
            assert_eq!(params.validate(), Err(ConfigError::ZeroInterval));
        }

        #[test]
        fn test_validate_rejects_bad_volume() {
            let params = TimerParams {
                sound_volume: 1.5,
                ..TimerParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ConfigError::InvalidVolume(_))
            ));

            let params = TimerParams {
                sound_volume: f32::NAN,
                ..TimerParams::default()
            };
            assert!(params.validate().is_err());
            assert_eq!(params.clamped_volume(), 0.0);
        }

        #[test]
        fn test_camel_case_with_missing_fields() {
            let json = r#"{"focusDuration": 60000, "autoStart": true, "soundType": "digital"}"#;
            let params: TimerParams = serde_json::from_str(json).unwrap();
            assert_eq!(params.focus_duration, 60_000);
            assert!(params.auto_start);
            assert_eq!(params.sound_type, SoundKind::Digital);
            assert_eq!(params.short_break_duration, 300_000);
            assert_eq!(params.long_break_interval, 4);
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot / Task Tests
    // ------------------------------------------------------------------------

    mod snapshot_task_tests {
        use super::*;

        fn snapshot(time_left: u64) -> TimerSnapshot {
            TimerSnapshot {
                mode: TimerMode::Focus,
                status: TimerStatus::Running,
                time_left,
                sessions_completed: 0,
                params: TimerParams::default().with_focus_duration(1000),
            }
        }

        #[test]
        fn test_progress() {
            assert_eq!(snapshot(1000).progress(), 0.0);
            assert_eq!(snapshot(250).progress(), 0.75);
            assert_eq!(snapshot(0).progress(), 1.0);
        }

        #[test]
        fn test_snapshot_uses_time_left_key() {
            let json = serde_json::to_value(snapshot(42)).unwrap();
            assert_eq!(json["timeLeft"], 42);
            assert_eq!(json["sessionsCompleted"], 0);
        }

        #[test]
        fn test_task_layout() {
            let task = Task {
                id: "abc".to_string(),
                title: "Write report".to_string(),
                notes: None,
                estimated_pomodoros: 3,
                completed_pomodoros: 1,
                completed: false,
                created_at: 1_700_000_000_000,
            };
            let json = serde_json::to_value(&task).unwrap();
            assert_eq!(json["estimatedPomodoros"], 3);
            assert_eq!(json["completedPomodoros"], 1);
            assert_eq!(json["createdAt"], 1_700_000_000_000u64);
            assert!(json.get("notes").is_none());
        }
    }

    // ------------------------------------------------------------------------
    // IPC Type Tests
    // ------------------------------------------------------------------------

    mod ipc_tests {
        use super::*;

        #[test]
        fn test_request_tags() {
            let json = serde_json::to_string(&IpcRequest::Start).unwrap();
            assert_eq!(json, r#"{"command":"start"}"#);

            let json = serde_json::to_string(&IpcRequest::Switch {
                mode: TimerMode::LongBreak,
            })
            .unwrap();
            assert_eq!(json, r#"{"command":"switch","mode":"long-break"}"#);
        }

        #[test]
        fn test_task_add_default_estimate() {
            let request: IpcRequest =
                serde_json::from_str(r#"{"command":"task_add","title":"Read"}"#).unwrap();
            match request {
                IpcRequest::TaskAdd { title, estimate } => {
                    assert_eq!(title, "Read");
                    assert_eq!(estimate, 1);
                }
                other => panic!("unexpected request: {:?}", other),
            }
        }

        #[test]
        fn test_task_update_flattened() {
            let request: IpcRequest = serde_json::from_str(
                r#"{"command":"task_update","id":"t1","estimatedPomodoros":5}"#,
            )
            .unwrap();
            match request {
                IpcRequest::TaskUpdate { id, update } => {
                    assert_eq!(id, "t1");
                    assert_eq!(update.estimated_pomodoros, Some(5));
                    assert!(update.title.is_none());
                }
                other => panic!("unexpected request: {:?}", other),
            }
        }

        #[test]
        fn test_response_helpers() {
            let ok = IpcResponse::success("done", None);
            assert!(ok.is_success());
            let err = IpcResponse::error("boom");
            assert!(!err.is_success());
            assert_eq!(err.message, "boom");

            let json = serde_json::to_string(&ok).unwrap();
            assert!(!json.contains("data"));
        }
    }
}
