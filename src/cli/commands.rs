//! Command definitions for the Tomato Timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::types::{SoundKind, TimerMode, TimerParams, MAX_DURATION_MS};

// ============================================================================
// CLI Structure
// ============================================================================

/// Tomato Timer - a drift-free Pomodoro timer
#[derive(Parser, Debug)]
#[command(
    name = "tomato-timer",
    version,
    about = "A drift-free Pomodoro timer",
    long_about = "A Pomodoro timer that runs as a small daemon and is driven from the terminal.\n\
                  Focus sessions alternate with short breaks, with a long break after every\n\
                  few focus sessions.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or resume the current session
    Start,

    /// Pause the running session
    Pause,

    /// Reset the current session to its full duration
    Reset,

    /// Finish the current session now
    Skip,

    /// Switch to another mode
    Switch {
        /// Target mode: focus, short-break or long-break
        #[arg(value_parser = parse_mode)]
        mode: TimerMode,
    },

    /// Show current timer status
    Status,

    /// Show a live countdown until interrupted
    Watch,

    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Run the daemon in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// `config` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,

    /// Change one or more settings
    Set(ConfigSetArgs),
}

/// `task` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task at the top of the list
    Add {
        /// Task title
        #[arg(value_parser = validate_task_title)]
        title: String,

        /// Estimated pomodoros
        #[arg(
            short,
            long,
            default_value = "1",
            value_parser = clap::value_parser!(u32).range(1..=99)
        )]
        estimate: u32,
    },

    /// List tasks
    List,

    /// Toggle a task's done flag
    Done {
        /// Task id (a unique prefix is enough)
        id: String,
    },

    /// Remove a task
    Remove {
        /// Task id (a unique prefix is enough)
        id: String,
    },

    /// Make a task the active one
    Activate {
        /// Task id (a unique prefix is enough)
        id: String,
    },

    /// Clear the active task
    Deactivate,

    /// Change a task's title, estimate or notes
    Edit {
        /// Task id (a unique prefix is enough)
        id: String,

        /// New title
        #[arg(long, value_parser = validate_task_title)]
        title: Option<String>,

        /// New estimate in pomodoros
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=99))]
        estimate: Option<u32>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Move a task to a new position in the list
    Move {
        /// Task id (a unique prefix is enough)
        id: String,

        /// Target position, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
}

// ============================================================================
// Config Set Arguments
// ============================================================================

/// Arguments for `config set`. Unset flags keep their current value.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSetArgs {
    /// Focus duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1440))]
    pub focus: Option<u64>,

    /// Short break duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1440))]
    pub short_break: Option<u64>,

    /// Long break duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1440))]
    pub long_break: Option<u64>,

    /// Focus sessions before a long break
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=99))]
    pub interval: Option<u32>,

    /// Start the next session automatically
    #[arg(long)]
    pub auto_start: Option<bool>,

    /// Play a sound on completion
    #[arg(long)]
    pub sound: Option<bool>,

    /// Completion sound: bell, knock, chime or digital
    #[arg(long, value_parser = parse_sound)]
    pub sound_type: Option<SoundKind>,

    /// Sound volume between 0 and 1
    #[arg(long, value_parser = parse_volume)]
    pub volume: Option<f32>,

    /// Show desktop notifications on completion
    #[arg(long)]
    pub notifications: Option<bool>,
}

impl ConfigSetArgs {
    /// Returns true if no flag was given.
    pub fn is_empty(&self) -> bool {
        self.focus.is_none()
            && self.short_break.is_none()
            && self.long_break.is_none()
            && self.interval.is_none()
            && self.auto_start.is_none()
            && self.sound.is_none()
            && self.sound_type.is_none()
            && self.volume.is_none()
            && self.notifications.is_none()
    }

    /// Applies the given flags on top of `params`.
    pub fn apply(&self, mut params: TimerParams) -> TimerParams {
        const MINUTE_MS: u64 = 60 * 1000;

        if let Some(minutes) = self.focus {
            params.focus_duration = (minutes * MINUTE_MS).min(MAX_DURATION_MS);
        }
        if let Some(minutes) = self.short_break {
            params.short_break_duration = (minutes * MINUTE_MS).min(MAX_DURATION_MS);
        }
        if let Some(minutes) = self.long_break {
            params.long_break_duration = (minutes * MINUTE_MS).min(MAX_DURATION_MS);
        }
        if let Some(interval) = self.interval {
            params.long_break_interval = interval;
        }
        if let Some(auto_start) = self.auto_start {
            params.auto_start = auto_start;
        }
        if let Some(sound) = self.sound {
            params.sound_enabled = sound;
        }
        if let Some(kind) = self.sound_type {
            params.sound_type = kind;
        }
        if let Some(volume) = self.volume {
            params.sound_volume = volume;
        }
        if let Some(notifications) = self.notifications {
            params.notifications_enabled = notifications;
        }
        params
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

fn parse_mode(s: &str) -> Result<TimerMode, String> {
    s.parse()
}

fn parse_sound(s: &str) -> Result<SoundKind, String> {
    s.parse()
}

fn parse_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !(0.0..=1.0).contains(&volume) {
        return Err("volume must be between 0 and 1".to_string());
    }
    Ok(volume)
}

/// Validates the task title.
///
/// - Must not be blank
/// - Must not exceed 200 characters
fn validate_task_title(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("task title must not be empty".to_string());
    }
    if s.chars().count() > 200 {
        return Err("task title must be at most 200 characters".to_string());
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================
