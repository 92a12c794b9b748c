//! Completion feedback.
//!
//! Consumes the engine's [`TimerEvent`] stream and reacts to each completion
//! edge exactly once:
//!
//! 1. a toast is always posted
//! 2. a finished focus session is credited to the active task
//! 3. the cross-process dedup lock is claimed; losing the claim ends here
//! 4. the completion tone plays if sound is enabled
//! 5. a desktop notification is sent if notifications are enabled
//!
//! Every step is best effort. Failures are logged and never reach the engine.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::notification::{completion_key, NotificationLock, NotificationSender};
use crate::sound::SoundPlayer;
use crate::tasks::TaskStore;
use crate::toast::{ToastBoard, COMPLETION_TOAST_LIFETIME};
use crate::types::{TimerMode, TimerSnapshot, ToastKind};

use super::clock::Clock;
use super::timer::TimerEvent;

/// Body of the desktop notification.
pub const NOTIFICATION_BODY: &str = "Time to switch tasks!";

/// Title shown when a session of `mode` completes.
pub fn completion_title(mode: TimerMode) -> &'static str {
    if mode.is_break() {
        "Break Over!"
    } else {
        "Focus Session Complete!"
    }
}

/// Reacts to completion edges.
pub struct CompletionFeedback {
    snapshots: watch::Receiver<TimerSnapshot>,
    clock: Arc<dyn Clock>,
    toasts: Arc<Mutex<ToastBoard>>,
    tasks: Arc<Mutex<TaskStore>>,
    lock: NotificationLock,
    sound: Option<Arc<dyn SoundPlayer>>,
    notifier: Option<Arc<dyn NotificationSender>>,
}

impl CompletionFeedback {
    pub fn new(
        snapshots: watch::Receiver<TimerSnapshot>,
        clock: Arc<dyn Clock>,
        toasts: Arc<Mutex<ToastBoard>>,
        tasks: Arc<Mutex<TaskStore>>,
        lock: NotificationLock,
    ) -> Self {
        Self {
            snapshots,
            clock,
            toasts,
            tasks,
            lock,
            sound: None,
            notifier: None,
        }
    }

    pub fn with_sound(mut self, player: Option<Arc<dyn SoundPlayer>>) -> Self {
        self.sound = player;
        self
    }

    pub fn with_notifier(mut self, sender: Option<Arc<dyn NotificationSender>>) -> Self {
        self.notifier = sender;
        self
    }

    /// Handles events until the engine drops its sender.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<TimerEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
        }
        debug!("timer event stream closed");
    }

    /// Handles one event. Everything except completions is ignored.
    pub async fn handle(&self, event: &TimerEvent) {
        let TimerEvent::Completed { mode, skipped } = *event else {
            return;
        };
        let now = self.clock.now_ms();
        let title = completion_title(mode);
        info!(mode = %mode, skipped, "{}", title);

        self.toasts
            .lock()
            .await
            .push(title, ToastKind::Success, COMPLETION_TOAST_LIFETIME, now);

        if mode == TimerMode::Focus {
            let mut tasks = self.tasks.lock().await;
            if let Some(id) = tasks.active_task().map(|task| task.id.clone()) {
                match tasks.increment_pomodoro(&id) {
                    Ok(count) => debug!(task = %id, count, "pomodoro credited"),
                    Err(e) => warn!("failed to credit pomodoro: {}", e),
                }
            }
        }

        if !self.lock.try_claim(&completion_key(mode, now), now) {
            debug!(
                lock = %self.lock.path().display(),
                "completion already handled by another instance"
            );
            return;
        }

        let params = self.snapshots.borrow().params.clone();

        if params.sound_enabled {
            if let Some(player) = self.sound.as_ref().filter(|p| p.is_available()) {
                if let Err(e) = player.play(params.sound_type, params.clamped_volume()) {
                    warn!("completion sound failed: {} ({})", e, e.suggestion());
                }
            }
        }

        if params.notifications_enabled {
            if let Some(sender) = self.notifier.as_ref().filter(|s| s.is_available()) {
                let sender = Arc::clone(sender);
                let delivered =
                    tokio::task::spawn_blocking(move || sender.send(title, NOTIFICATION_BODY)).await;
                match delivered {
                    Ok(Ok(())) => debug!("notification sent"),
                    Ok(Err(e)) => warn!("notification failed: {} ({})", e, e.suggestion()),
                    Err(e) => warn!("notification task failed: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::daemon::clock::ManualClock;
    use crate::notification::MockNotificationSender;
    use crate::sound::MockSoundPlayer;
    use crate::types::{SoundKind, TimerParams, TimerStatus};

    const T0: u64 = 1_700_000_000_000;

    struct Fixture {
        feedback: CompletionFeedback,
        clock: Arc<ManualClock>,
        toasts: Arc<Mutex<ToastBoard>>,
        tasks: Arc<Mutex<TaskStore>>,
        sound: Arc<MockSoundPlayer>,
        notifier: Arc<MockNotificationSender>,
        _snapshot_tx: watch::Sender<TimerSnapshot>,
        dir: TempDir,
    }

    fn create_fixture(params: TimerParams) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let (snapshot_tx, snapshots) = watch::channel(TimerSnapshot {
            mode: TimerMode::Focus,
            status: TimerStatus::Completed,
            time_left: 0,
            sessions_completed: 0,
            params,
        });
        let toasts = Arc::new(Mutex::new(ToastBoard::new()));
        let tasks = Arc::new(Mutex::new(TaskStore::load(dir.path())));
        let sound = Arc::new(MockSoundPlayer::new());
        let notifier = Arc::new(MockNotificationSender::new());

        let feedback = CompletionFeedback::new(
            snapshots,
            clock.clone(),
            toasts.clone(),
            tasks.clone(),
            NotificationLock::in_dir(dir.path()),
        )
        .with_sound(Some(sound.clone()))
        .with_notifier(Some(notifier.clone()));

        Fixture {
            feedback,
            clock,
            toasts,
            tasks,
            sound,
            notifier,
            _snapshot_tx: snapshot_tx,
            dir,
        }
    }

    fn completed(mode: TimerMode) -> TimerEvent {
        TimerEvent::Completed {
            mode,
            skipped: false,
        }
    }

    fn all_on() -> TimerParams {
        TimerParams {
            notifications_enabled: true,
            sound_type: SoundKind::Chime,
            sound_volume: 0.8,
            ..TimerParams::default()
        }
    }

    #[tokio::test]
    async fn test_focus_completion_fans_out_once() {
        let fx = create_fixture(all_on());
        let task = fx.tasks.lock().await.add("Write", 2, T0).unwrap();
        fx.tasks.lock().await.set_active(Some(&task.id)).unwrap();

        fx.feedback.handle(&completed(TimerMode::Focus)).await;

        let toasts = fx.toasts.lock().await.active(T0);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Focus Session Complete!");
        assert_eq!(toasts[0].kind, ToastKind::Success);
        assert_eq!(toasts[0].expires_at, T0 + 5_000);

        assert_eq!(fx.sound.get_play_calls(), vec![(SoundKind::Chime, 0.8)]);
        assert_eq!(
            fx.notifier.get_notifications(),
            vec![(
                "Focus Session Complete!".to_string(),
                "Time to switch tasks!".to_string()
            )]
        );
        assert_eq!(
            fx.tasks.lock().await.get(&task.id).unwrap().completed_pomodoros,
            1
        );
    }

    #[tokio::test]
    async fn test_break_completion_does_not_credit_task() {
        let fx = create_fixture(all_on());
        let task = fx.tasks.lock().await.add("Write", 2, T0).unwrap();
        fx.tasks.lock().await.set_active(Some(&task.id)).unwrap();

        fx.feedback.handle(&completed(TimerMode::LongBreak)).await;

        assert_eq!(fx.toasts.lock().await.active(T0)[0].message, "Break Over!");
        assert_eq!(fx.notifier.get_notifications()[0].0, "Break Over!");
        assert_eq!(
            fx.tasks.lock().await.get(&task.id).unwrap().completed_pomodoros,
            0
        );
    }

    #[tokio::test]
    async fn test_dedup_lock_suppresses_second_claim() {
        let fx = create_fixture(all_on());

        // A second daemon sharing the same data directory
        let other = CompletionFeedback::new(
            fx.feedback.snapshots.clone(),
            fx.clock.clone(),
            fx.toasts.clone(),
            fx.tasks.clone(),
            NotificationLock::in_dir(fx.dir.path()),
        )
        .with_sound(Some(fx.sound.clone()));

        fx.feedback.handle(&completed(TimerMode::Focus)).await;
        fx.clock.advance(300);
        other.handle(&completed(TimerMode::Focus)).await;

        // Toast from both, system-wide effects from the first only
        assert_eq!(fx.toasts.lock().await.len(), 2);
        assert_eq!(fx.sound.play_count(), 1);
        assert_eq!(fx.notifier.notification_count(), 1);
    }

    #[tokio::test]
    async fn test_focus_credit_survives_lost_claim() {
        let fx = create_fixture(all_on());
        let task = fx.tasks.lock().await.add("Write", 3, T0).unwrap();
        fx.tasks.lock().await.set_active(Some(&task.id)).unwrap();

        // Two focus completions inside the same second share a lock key
        fx.feedback.handle(&completed(TimerMode::Focus)).await;
        fx.clock.advance(300);
        fx.feedback.handle(&completed(TimerMode::Focus)).await;

        assert_eq!(
            fx.tasks.lock().await.get(&task.id).unwrap().completed_pomodoros,
            2
        );
        assert_eq!(fx.sound.play_count(), 1);
        assert_eq!(fx.notifier.notification_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_feedback_is_silent() {
        let params = TimerParams {
            sound_enabled: false,
            notifications_enabled: false,
            ..TimerParams::default()
        };
        let fx = create_fixture(params);

        fx.feedback.handle(&completed(TimerMode::Focus)).await;

        assert_eq!(fx.toasts.lock().await.len(), 1);
        assert_eq!(fx.sound.play_count(), 0);
        assert_eq!(fx.notifier.notification_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let fx = create_fixture(all_on());
        fx.sound.set_should_fail(true);
        fx.notifier.set_should_fail(true);
        let task = fx.tasks.lock().await.add("Write", 1, T0).unwrap();
        fx.tasks.lock().await.set_active(Some(&task.id)).unwrap();

        fx.feedback.handle(&completed(TimerMode::Focus)).await;

        assert_eq!(
            fx.tasks.lock().await.get(&task.id).unwrap().completed_pomodoros,
            1
        );
    }

    #[tokio::test]
    async fn test_unavailable_player_is_skipped() {
        let fx = create_fixture(all_on());
        fx.sound.set_available(false);

        fx.feedback.handle(&completed(TimerMode::Focus)).await;

        assert_eq!(fx.sound.play_count(), 0);
        assert_eq!(fx.notifier.notification_count(), 1);
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let fx = create_fixture(all_on());

        fx.feedback
            .handle(&TimerEvent::Started {
                mode: TimerMode::Focus,
            })
            .await;
        fx.feedback.handle(&TimerEvent::ParamsUpdated).await;

        assert!(fx.toasts.lock().await.is_empty());
        assert_eq!(fx.sound.play_count(), 0);
    }

    #[tokio::test]
    async fn test_run_drains_until_sender_dropped() {
        let fx = create_fixture(all_on());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(completed(TimerMode::Focus)).unwrap();
        tx.send(TimerEvent::ParamsUpdated).unwrap();
        drop(tx);

        let toasts = fx.toasts.clone();
        let sound = fx.sound.clone();
        fx.feedback.run(rx).await;

        assert_eq!(toasts.lock().await.len(), 1);
        assert_eq!(sound.play_count(), 1);
    }
}
