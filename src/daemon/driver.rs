//! Scheduling for the timer engine.
//!
//! The driver owns the two timers the engine needs:
//! - a tick sampler firing every [`TICK_INTERVAL`] while running
//! - a one-shot settle timer of [`SETTLE_DELAY`] while completed
//!
//! Both are recreated whenever the engine enters the matching status and
//! dropped (cancelled) as soon as it leaves it, so at most one of each is
//! ever pending.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::debug;

use crate::types::{TimerSnapshot, TimerStatus};

use super::timer::{TimerEngine, SETTLE_DELAY, TICK_INTERVAL};

/// Drives a shared [`TimerEngine`] from tokio timers.
pub struct TimerDriver {
    engine: Arc<Mutex<TimerEngine>>,
    snapshots: watch::Receiver<TimerSnapshot>,
}

impl TimerDriver {
    pub async fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        let snapshots = engine.lock().await.subscribe();
        Self { engine, snapshots }
    }

    /// Runs until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let status = self.snapshots.borrow_and_update().status;
            let keep_running = match status {
                TimerStatus::Running => self.sample(shutdown.as_mut()).await,
                TimerStatus::Completed => self.settle(shutdown.as_mut()).await,
                TimerStatus::Idle | TimerStatus::Paused => self.wait(shutdown.as_mut()).await,
            };
            if !keep_running {
                debug!("timer driver stopped");
                return;
            }
        }
    }

    /// Ticks the engine until it stops running. Returns false on shutdown.
    async fn sample<F>(&mut self, mut shutdown: std::pin::Pin<&mut F>) -> bool
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.as_mut() => return false,
                _ = ticker.tick() => {
                    self.engine.lock().await.tick();
                }
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }

            if !self.snapshots.borrow_and_update().status.is_running() {
                return true;
            }
        }
    }

    /// Waits out the settle delay, then advances. Returns false on shutdown.
    async fn settle<F>(&mut self, mut shutdown: std::pin::Pin<&mut F>) -> bool
    where
        F: Future<Output = ()>,
    {
        let delay = sleep(SETTLE_DELAY);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = shutdown.as_mut() => return false,
                _ = &mut delay => {
                    self.engine.lock().await.advance();
                    return true;
                }
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    if self.snapshots.borrow_and_update().status != TimerStatus::Completed {
                        return true;
                    }
                }
            }
        }
    }

    /// Sleeps until the next state change. Returns false on shutdown.
    async fn wait<F>(&mut self, mut shutdown: std::pin::Pin<&mut F>) -> bool
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown.as_mut() => false,
            changed = self.snapshots.changed() => changed.is_ok(),
        }
    }
}
