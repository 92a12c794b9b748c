//! Display utilities for the Tomato Timer CLI.
//!
//! This module provides formatted output for:
//! - Timer status
//! - Task lists
//! - Settings
//! - Toasts and errors
//!
//! Every `show_*` function prints what the matching `render_*` returns.

use crate::types::{format_time, Task, TimerParams, TimerSnapshot, TimerStatus, Toast, ToastKind};

/// Number of id characters shown in task lists.
pub const SHORT_ID_LEN: usize = 8;

const PROGRESS_BAR_WIDTH: usize = 24;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the response message of a command.
    pub fn show_message(message: &str) {
        if !message.is_empty() {
            println!("{}", message);
        }
    }

    /// Shows the full timer status.
    pub fn show_snapshot(snapshot: &TimerSnapshot, active_task: Option<&Task>) {
        println!("{}", Self::render_snapshot(snapshot, active_task));
    }

    pub fn render_snapshot(snapshot: &TimerSnapshot, active_task: Option<&Task>) -> String {
        let interval = snapshot.params.long_break_interval;
        let mut lines = vec![
            format!(
                "{}  {}  [{}]",
                snapshot.mode.label(),
                format_time(snapshot.time_left as i64, false),
                Self::status_label(snapshot.status)
            ),
            Self::render_progress(snapshot.progress()),
            format!(
                "Sessions: {} ({} of {} until long break)",
                snapshot.sessions_completed,
                snapshot.sessions_completed % interval.max(1),
                interval
            ),
        ];
        if let Some(task) = active_task {
            lines.push(format!(
                "Task: {} ({}/{})",
                task.title, task.completed_pomodoros, task.estimated_pomodoros
            ));
        }
        lines.join("\n")
    }

    /// Renders one line for `watch`, overwritten in place.
    pub fn render_watch_line(snapshot: &TimerSnapshot) -> String {
        format!(
            "{} {}  {}  [{}]",
            Self::status_icon(snapshot.status),
            snapshot.mode.label(),
            format_time(snapshot.time_left as i64, false),
            Self::status_label(snapshot.status)
        )
    }

    /// Shows the task list with the active task marked.
    pub fn show_tasks(tasks: &[Task], active_task_id: Option<&str>) {
        println!("{}", Self::render_tasks(tasks, active_task_id));
    }

    pub fn render_tasks(tasks: &[Task], active_task_id: Option<&str>) -> String {
        if tasks.is_empty() {
            return "No tasks".to_string();
        }

        tasks
            .iter()
            .map(|task| {
                let marker = if Some(task.id.as_str()) == active_task_id {
                    '>'
                } else {
                    ' '
                };
                let check = if task.completed { 'x' } else { ' ' };
                format!(
                    "{} [{}] {}  {}  {}/{}",
                    marker,
                    check,
                    Self::short_id(&task.id),
                    task.title,
                    task.completed_pomodoros,
                    task.estimated_pomodoros
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shows the timer settings.
    pub fn show_params(params: &TimerParams) {
        println!("{}", Self::render_params(params));
    }

    pub fn render_params(params: &TimerParams) -> String {
        let minutes = |ms: u64| ms as f64 / 60_000.0;
        [
            format!("Focus:          {} min", minutes(params.focus_duration)),
            format!("Short break:    {} min", minutes(params.short_break_duration)),
            format!("Long break:     {} min", minutes(params.long_break_duration)),
            format!("Interval:       {}", params.long_break_interval),
            format!("Auto start:     {}", on_off(params.auto_start)),
            format!(
                "Sound:          {} ({}, volume {:.2})",
                on_off(params.sound_enabled),
                params.sound_type.as_str(),
                params.sound_volume
            ),
            format!("Notifications:  {}", on_off(params.notifications_enabled)),
        ]
        .join("\n")
    }

    /// Shows toasts that are still live.
    pub fn show_toasts(toasts: &[Toast]) {
        for toast in toasts {
            println!("{}", Self::render_toast(toast));
        }
    }

    pub fn render_toast(toast: &Toast) -> String {
        let tag = match toast.kind {
            ToastKind::Success => "*",
            ToastKind::Error => "!",
            ToastKind::Info => "i",
        };
        format!("{} {}", tag, toast.message)
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Returns the first [`SHORT_ID_LEN`] characters of `id`.
    pub fn short_id(id: &str) -> &str {
        match id.char_indices().nth(SHORT_ID_LEN) {
            Some((end, _)) => &id[..end],
            None => id,
        }
    }

    fn render_progress(progress: f64) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * PROGRESS_BAR_WIDTH as f64).round()) as usize;
        format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            (progress.clamp(0.0, 1.0) * 100.0).round() as u32
        )
    }

    fn status_label(status: TimerStatus) -> &'static str {
        match status {
            TimerStatus::Idle => "ready",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "done",
        }
    }

    fn status_icon(status: TimerStatus) -> &'static str {
        match status {
            TimerStatus::Running => ">",
            TimerStatus::Paused => "||",
            TimerStatus::Idle | TimerStatus::Completed => "[]",
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

// ============================================================================
// Tests
// ============================================================================
