//! Timer engine for the Tomato Timer.
//!
//! This module provides the core timer state machine:
//! - Mode/status transitions (focus → short/long break → focus)
//! - Drift-free countdown derived from an absolute end time
//! - Session counting and the long-break interval rule
//! - Auto-transition with optional auto-start
//!
//! The engine does no scheduling of its own. [`TimerEngine::tick`] is called
//! by the driver every [`TICK_INTERVAL`] while running, and
//! [`TimerEngine::advance`] once [`SETTLE_DELAY`] has passed in `completed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::types::{TimerMode, TimerParams, TimerSnapshot, TimerStatus};

use super::clock::Clock;

/// Sampling period of the tick loop. Finer than the display resolution so
/// the countdown looks smooth and completion is detected promptly.
pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Time a completed session stays at zero before the next mode is entered.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);

// ============================================================================
// TimerEvent
// ============================================================================

/// Transition events, one per state change that matters to collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started { mode: TimerMode },
    /// Countdown frozen
    Paused { mode: TimerMode, time_left: u64 },
    /// Current session rewound to its full duration
    Reset { mode: TimerMode },
    /// Manual mode change
    ModeSwitched { mode: TimerMode },
    /// Parameters replaced
    ParamsUpdated,
    /// Session reached zero (or was skipped). Fires once per session.
    Completed { mode: TimerMode, skipped: bool },
    /// Auto-transition into the next mode
    Advanced {
        from: TimerMode,
        to: TimerMode,
        sessions_completed: u32,
        auto_started: bool,
    },
}

// ============================================================================
// TimerEngine
// ============================================================================

/// The Pomodoro state machine.
///
/// # Preconditions
///
/// `params` must have passed [`TimerParams::validate`]. The engine does not
/// re-check durations or the long-break interval.
pub struct TimerEngine {
    mode: TimerMode,
    status: TimerStatus,
    /// Remaining milliseconds in the current session
    time_left: u64,
    /// Absolute completion time; `Some` exactly while running
    end_time: Option<u64>,
    sessions_completed: u32,
    params: TimerParams,
    clock: Arc<dyn Clock>,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
}

impl TimerEngine {
    /// Creates an idle focus-mode engine with the full focus duration.
    pub fn new(
        params: TimerParams,
        clock: Arc<dyn Clock>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let time_left = params.duration(TimerMode::Focus);
        let initial = TimerSnapshot {
            mode: TimerMode::Focus,
            status: TimerStatus::Idle,
            time_left,
            sessions_completed: 0,
            params: params.clone(),
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            mode: TimerMode::Focus,
            status: TimerStatus::Idle,
            time_left,
            end_time: None,
            sessions_completed: 0,
            params,
            clock,
            event_tx,
            snapshot_tx,
        }
    }

    // ------------------------------------------------------------------------
    // Public state
    // ------------------------------------------------------------------------

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn params(&self) -> &TimerParams {
        &self.params
    }

    /// Returns an owned copy of the public state.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            status: self.status,
            time_left: self.time_left,
            sessions_completed: self.sessions_completed,
            params: self.params.clone(),
        }
    }

    /// Subscribes to state changes. The receiver always holds the latest
    /// snapshot; every transition and every tick that moves the countdown
    /// replaces it.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Starts or resumes the countdown from the current `time_left`.
    ///
    /// Returns false (and changes nothing) when already running, or when the
    /// session has completed and is waiting for the auto-transition.
    pub fn start(&mut self) -> bool {
        match self.status {
            TimerStatus::Running | TimerStatus::Completed => false,
            TimerStatus::Idle | TimerStatus::Paused => {
                self.arm();
                debug!(mode = %self.mode, time_left = self.time_left, "timer started");
                self.emit(TimerEvent::Started { mode: self.mode });
                self.publish();
                true
            }
        }
    }

    /// Freezes the countdown at its current value.
    ///
    /// Returns false when not running. If the session expired since the last
    /// tick, it completes instead of pausing.
    pub fn pause(&mut self) -> bool {
        if !self.status.is_running() {
            return false;
        }
        if self.tick() {
            return false;
        }

        self.status = TimerStatus::Paused;
        self.end_time = None;
        debug!(mode = %self.mode, time_left = self.time_left, "timer paused");
        self.emit(TimerEvent::Paused {
            mode: self.mode,
            time_left: self.time_left,
        });
        self.publish();
        true
    }

    /// Rewinds the current mode to its full duration. Keeps the session count.
    pub fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.time_left = self.params.duration(self.mode);
        self.end_time = None;
        debug!(mode = %self.mode, "timer reset");
        self.emit(TimerEvent::Reset { mode: self.mode });
        self.publish();
    }

    /// Completes the current session immediately.
    ///
    /// A session that is already completed stays as it is; the completion
    /// edge is not fired twice.
    pub fn skip(&mut self) {
        if self.status == TimerStatus::Completed {
            return;
        }
        self.complete(true);
    }

    /// Manually switches mode, landing on `idle` with the full duration.
    /// Does not consult or change the session count.
    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.enter_mode(mode);
        debug!(mode = %mode, "mode switched");
        self.emit(TimerEvent::ModeSwitched { mode });
        self.publish();
    }

    /// Replaces the parameters. The remaining time of the current session is
    /// not rescaled; new durations apply from the next reset or mode change.
    pub fn set_params(&mut self, params: TimerParams) {
        self.params = params;
        debug!("timer params updated");
        self.emit(TimerEvent::ParamsUpdated);
        self.publish();
    }

    /// Re-derives `time_left` from the end time.
    ///
    /// Returns true exactly when this call moved the session into
    /// `completed`. Does nothing unless running.
    pub fn tick(&mut self) -> bool {
        if !self.status.is_running() {
            return false;
        }
        let Some(end_time) = self.end_time else {
            return false;
        };

        let now = self.clock.now_ms();
        if end_time <= now {
            self.complete(false);
            return true;
        }

        let remaining = end_time - now;
        if remaining != self.time_left {
            self.time_left = remaining;
            self.publish();
        }
        false
    }

    /// Performs the auto-transition out of `completed`.
    ///
    /// Leaving focus bumps the session count and picks a long break when the
    /// count is a multiple of the interval, otherwise a short break. Leaving
    /// a break always returns to focus. With `auto_start` the new session is
    /// armed in the same step, so no idle state is ever published in between.
    ///
    /// Returns the new mode, or `None` when the engine was not completed.
    pub fn advance(&mut self) -> Option<TimerMode> {
        if self.status != TimerStatus::Completed {
            return None;
        }

        let from = self.mode;
        let next = match from {
            TimerMode::Focus => {
                self.sessions_completed += 1;
                if self.sessions_completed % self.params.long_break_interval.max(1) == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };

        self.enter_mode(next);
        let auto_started = self.params.auto_start;
        if auto_started {
            self.arm();
        }

        debug!(
            from = %from,
            to = %next,
            sessions = self.sessions_completed,
            auto_started,
            "auto-transition"
        );
        self.emit(TimerEvent::Advanced {
            from,
            to: next,
            sessions_completed: self.sessions_completed,
            auto_started,
        });
        self.publish();
        Some(next)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn arm(&mut self) {
        self.end_time = Some(self.clock.now_ms() + self.time_left);
        self.status = TimerStatus::Running;
    }

    fn enter_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.status = TimerStatus::Idle;
        self.time_left = self.params.duration(mode);
        self.end_time = None;
    }

    fn complete(&mut self, skipped: bool) {
        self.status = TimerStatus::Completed;
        self.time_left = 0;
        self.end_time = None;
        debug!(mode = %self.mode, skipped, "session completed");
        self.emit(TimerEvent::Completed {
            mode: self.mode,
            skipped,
        });
        self.publish();
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("timer event receiver dropped");
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

// ============================================================================
// Tests
// ============================================================================
