//! Daemon module for the Tomato Timer.
//!
//! This module contains the core daemon functionality:
//! - `clock`: Time sources for the engine
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `driver`: Tick sampler and settle timer around the engine
//! - `feedback`: Toast, sound, notification and task credit on completion
//! - `ipc`: Unix socket server and request dispatch
//!
//! [`Daemon`] wires them together and serves until shut down.

pub mod clock;
pub mod driver;
pub mod feedback;
pub mod ipc;
pub mod timer;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::notification::{DesktopNotificationSender, NotificationLock, NotificationSender};
use crate::sound::{try_create_player, SoundPlayer};
use crate::tasks::TaskStore;
use crate::toast::ToastBoard;
use crate::types::TimerParams;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use driver::TimerDriver;
pub use feedback::CompletionFeedback;
pub use ipc::{IpcServer, RequestHandler};
pub use timer::{TimerEngine, TimerEvent};

/// Everything the daemon needs to start.
pub struct DaemonOptions {
    pub params: TimerParams,
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    /// Where accepted `params` requests are saved, with the config they
    /// are merged into
    pub config: Option<(AppConfig, PathBuf)>,
    pub sound: Option<Arc<dyn SoundPlayer>>,
    pub notifier: Option<Arc<dyn NotificationSender>>,
}

impl DaemonOptions {
    /// Options for `params` with no sound or notification output.
    pub fn new(params: TimerParams, socket_path: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            params,
            socket_path,
            data_dir,
            config: None,
            sound: None,
            notifier: None,
        }
    }

    /// Resolves paths from `config` and opens the real audio and
    /// notification outputs.
    pub fn from_config(config: AppConfig, config_path: PathBuf) -> Result<Self> {
        let socket_path = config.socket_path()?;
        let data_dir = config.data_dir()?;
        let notifier: Arc<dyn NotificationSender> = Arc::new(DesktopNotificationSender::new());

        Ok(Self {
            params: config.params.clone(),
            socket_path,
            data_dir,
            config: Some((config, config_path)),
            sound: try_create_player(),
            notifier: Some(notifier),
        })
    }
}

/// A bound, not yet running daemon.
pub struct Daemon {
    server: IpcServer,
    engine: Arc<Mutex<TimerEngine>>,
    handler: Arc<RequestHandler>,
    feedback: CompletionFeedback,
    events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl Daemon {
    /// Builds all components and binds the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or the socket cannot
    /// be bound.
    pub fn bind(options: DaemonOptions) -> Result<Self> {
        options
            .params
            .validate()
            .context("Invalid timer settings")?;

        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let (event_tx, events) = mpsc::unbounded_channel();
        let engine = TimerEngine::new(options.params, clock.clone(), event_tx);
        let snapshots = engine.subscribe();
        let engine = Arc::new(Mutex::new(engine));

        let tasks = Arc::new(Mutex::new(TaskStore::load(&options.data_dir)));
        let toasts = Arc::new(Mutex::new(ToastBoard::new()));

        let mut handler =
            RequestHandler::new(engine.clone(), tasks.clone(), toasts.clone(), clock.clone());
        if let Some((config, path)) = options.config {
            handler = handler.with_config(config, path);
        }

        let feedback = CompletionFeedback::new(
            snapshots,
            clock,
            toasts,
            tasks,
            NotificationLock::in_dir(&options.data_dir),
        )
        .with_sound(options.sound)
        .with_notifier(options.notifier);

        let server = IpcServer::new(&options.socket_path)?;
        info!(socket = %options.socket_path.display(), "daemon listening");

        Ok(Self {
            server,
            engine,
            handler: Arc::new(handler),
            feedback,
            events,
        })
    }

    pub fn socket_path(&self) -> &std::path::Path {
        self.server.socket_path()
    }

    /// Serves requests until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            server,
            engine,
            handler,
            feedback,
            events,
        } = self;

        let driver = TimerDriver::new(engine).await;
        let (stop_driver, driver_stopped) = oneshot::channel::<()>();
        let driver_task = tokio::spawn(driver.run_until(async move {
            let _ = driver_stopped.await;
        }));
        let feedback_task = tokio::spawn(feedback.run(events));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = server.accept() => match accepted {
                    Ok(stream) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            if let Err(e) = IpcServer::handle_connection(stream, &handler).await {
                                warn!("IPC connection failed: {:#}", e);
                            }
                        });
                    }
                    Err(e) => warn!("{:#}", e),
                },
            }
        }

        info!("daemon shutting down");
        let _ = stop_driver.send(());
        driver_task.await.context("Timer driver panicked")?;
        feedback_task.abort();
        drop(server);
        Ok(())
    }

    /// Serves requests until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
