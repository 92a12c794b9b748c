//! IPC Server for the Tomato Timer.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer and task commands
//! - Integration with TimerEngine, TaskStore and ToastBoard
//!
//! The protocol is one JSON request and one JSON response per connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::tasks::TaskStore;
use crate::toast::ToastBoard;
use crate::types::{
    IpcRequest, IpcResponse, ResponseData, TaskUpdate, TimerMode, TimerParams, TimerStatus,
};

use super::clock::Clock;
use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (64KB)
pub const MAX_MESSAGE_SIZE: usize = 65536;

/// Read chunk size
const READ_CHUNK_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read message: {0}")]
    ReadError(String),

    /// Connection closed before a full message arrived
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Malformed message
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Message too large
    #[error("Message too large (max {MAX_MESSAGE_SIZE} bytes)")]
    TooLarge,
}

/// Reads one JSON value from `stream`.
///
/// Reads in chunks until the bytes so far parse, so a message split across
/// several writes is still accepted. Shared by the server and the client.
pub async fn read_message<T>(stream: &mut UnixStream, read_timeout: Duration) -> Result<T, IpcError>
where
    T: serde::de::DeserializeOwned,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = match timeout(read_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string())),
            Err(_) => return Err(IpcError::Timeout),
        };
        if n == 0 {
            return Err(if buffer.is_empty() {
                IpcError::ConnectionClosed
            } else {
                IpcError::Malformed("truncated message".to_string())
            });
        }

        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > MAX_MESSAGE_SIZE {
            return Err(IpcError::TooLarge);
        }

        match serde_json::from_slice(&buffer) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_eof() => continue,
            Err(e) => return Err(IpcError::Malformed(e.to_string())),
        }
    }
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        // Remove existing socket file if present
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let request = read_message(stream, Duration::from_secs(READ_TIMEOUT_SECS))
            .await
            .context("Failed to receive IPC request")?;
        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Serves one connection: read a request, dispatch it, write the response.
    pub async fn handle_connection(mut stream: UnixStream, handler: &RequestHandler) -> Result<()> {
        let response = match Self::receive_request(&mut stream).await {
            Ok(request) => {
                debug!(?request, "IPC request");
                handler.handle(request).await
            }
            Err(e) => {
                warn!("Rejected IPC request: {:#}", e);
                IpcResponse::error(format!("Invalid request: {:#}", e))
            }
        };
        Self::send_response(&mut stream, &response).await
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Where `params` requests are persisted.
struct ConfigSink {
    path: PathBuf,
    config: Mutex<AppConfig>,
}

/// Handles IPC requests by dispatching to the engine and the task store.
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: Arc<Mutex<TimerEngine>>,
    tasks: Arc<Mutex<TaskStore>>,
    toasts: Arc<Mutex<ToastBoard>>,
    clock: Arc<dyn Clock>,
    config: Option<ConfigSink>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(
        engine: Arc<Mutex<TimerEngine>>,
        tasks: Arc<Mutex<TaskStore>>,
        toasts: Arc<Mutex<ToastBoard>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            tasks,
            toasts,
            clock,
            config: None,
        }
    }

    /// Persists accepted `params` requests into `config` at `path`.
    pub fn with_config(mut self, config: AppConfig, path: PathBuf) -> Self {
        self.config = Some(ConfigSink {
            path,
            config: Mutex::new(config),
        });
        self
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start => self.handle_start().await,
            IpcRequest::Pause => self.handle_pause().await,
            IpcRequest::Reset => self.handle_reset().await,
            IpcRequest::Skip => self.handle_skip().await,
            IpcRequest::Switch { mode } => self.handle_switch(mode).await,
            IpcRequest::Params { params } => self.handle_params(params).await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::TaskAdd { title, estimate } => self.handle_task_add(title, estimate).await,
            IpcRequest::TaskList => self.task_response("").await,
            IpcRequest::TaskDone { id } => self.handle_task_done(id).await,
            IpcRequest::TaskRemove { id } => self.handle_task_remove(id).await,
            IpcRequest::TaskActivate { id } => self.handle_task_activate(id).await,
            IpcRequest::TaskUpdate { id, update } => self.handle_task_update(id, update).await,
            IpcRequest::TaskReorder { ids } => self.handle_task_reorder(ids).await,
        }
    }

    // ------------------------------------------------------------------------
    // Timer commands
    // ------------------------------------------------------------------------

    /// Handles the start command.
    async fn handle_start(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        if engine.start() {
            let message = format!("{} started", engine.mode().label());
            return self.timer_response(message, &engine).await;
        }
        match engine.status() {
            TimerStatus::Completed => IpcResponse::error("Session already complete"),
            _ => IpcResponse::error("Timer is already running"),
        }
    }

    /// Handles the pause command.
    async fn handle_pause(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        if engine.pause() {
            return self.timer_response("Timer paused", &engine).await;
        }
        match engine.status() {
            TimerStatus::Completed => IpcResponse::error("Session already complete"),
            _ => IpcResponse::error("Timer is not running"),
        }
    }

    /// Handles the reset command.
    async fn handle_reset(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.reset();
        self.timer_response("Timer reset", &engine).await
    }

    /// Handles the skip command.
    async fn handle_skip(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        if engine.status() == TimerStatus::Completed {
            return IpcResponse::error("Session already complete");
        }
        engine.skip();
        self.timer_response("Session skipped", &engine).await
    }

    /// Handles the switch command.
    async fn handle_switch(&self, mode: TimerMode) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.switch_mode(mode);
        self.timer_response(format!("Switched to {}", mode.label()), &engine)
            .await
    }

    /// Handles the params command.
    ///
    /// An idle session is rewound so it shows the new duration right away.
    async fn handle_params(&self, params: TimerParams) -> IpcResponse {
        if let Err(e) = params.validate() {
            return IpcResponse::error(e.to_string());
        }

        let mut engine = self.engine.lock().await;
        engine.set_params(params.clone());
        if engine.status() == TimerStatus::Idle {
            engine.reset();
        }

        if let Some(sink) = &self.config {
            let mut config = sink.config.lock().await;
            config.params = params;
            if let Err(e) = config.save_to(&sink.path) {
                warn!("Failed to save settings: {:#}", e);
            }
        }

        self.timer_response("Settings updated", &engine).await
    }

    /// Handles the status command.
    async fn handle_status(&self) -> IpcResponse {
        let snapshot = self.engine.lock().await.snapshot();
        let tasks = self.tasks.lock().await;
        let data = ResponseData {
            snapshot: Some(snapshot),
            tasks: Some(tasks.tasks().to_vec()),
            active_task_id: tasks.active_task_id().map(String::from),
            toasts: self.live_toasts().await,
        };

        IpcResponse::success("", Some(data))
    }

    // ------------------------------------------------------------------------
    // Task commands
    // ------------------------------------------------------------------------

    async fn handle_task_add(&self, title: String, estimate: u32) -> IpcResponse {
        let now = self.clock.now_ms();
        let result = self.tasks.lock().await.add(&title, estimate, now);
        match result {
            Ok(task) => self.task_response(format!("Added \"{}\"", task.title)).await,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_task_done(&self, id: String) -> IpcResponse {
        let result = self.tasks.lock().await.toggle_complete(&id);
        match result {
            Ok(true) => self.task_response("Task marked done").await,
            Ok(false) => self.task_response("Task reopened").await,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_task_remove(&self, id: String) -> IpcResponse {
        let result = self.tasks.lock().await.remove(&id);
        match result {
            Ok(task) => self.task_response(format!("Removed \"{}\"", task.title)).await,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_task_activate(&self, id: Option<String>) -> IpcResponse {
        let result = self.tasks.lock().await.set_active(id.as_deref());
        match (result, id) {
            (Ok(()), Some(_)) => self.task_response("Active task set").await,
            (Ok(()), None) => self.task_response("Active task cleared").await,
            (Err(e), _) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_task_update(&self, id: String, update: TaskUpdate) -> IpcResponse {
        if update.is_empty() {
            return IpcResponse::error("Nothing to update");
        }
        let result = self.tasks.lock().await.update(&id, update);
        match result {
            Ok(_) => self.task_response("Task updated").await,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_task_reorder(&self, ids: Vec<String>) -> IpcResponse {
        let result = self.tasks.lock().await.reorder(&ids);
        match result {
            Ok(()) => self.task_response("Tasks reordered").await,
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    // ------------------------------------------------------------------------
    // Response helpers
    // ------------------------------------------------------------------------

    async fn timer_response(&self, message: impl Into<String>, engine: &TimerEngine) -> IpcResponse {
        let mut data = ResponseData::from_snapshot(engine.snapshot());
        data.toasts = self.live_toasts().await;
        IpcResponse::success(message, Some(data))
    }

    async fn task_response(&self, message: impl Into<String>) -> IpcResponse {
        let tasks = self.tasks.lock().await;
        let data = ResponseData {
            tasks: Some(tasks.tasks().to_vec()),
            active_task_id: tasks.active_task_id().map(String::from),
            ..ResponseData::default()
        };
        IpcResponse::success(message, Some(data))
    }

    async fn live_toasts(&self) -> Vec<crate::types::Toast> {
        let now = self.clock.now_ms();
        self.toasts.lock().await.active(now)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use crate::daemon::clock::ManualClock;
    use crate::daemon::timer::TimerEvent;
    use crate::types::ToastKind;

    const T0: u64 = 1_700_000_000_000;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    struct Fixture {
        handler: RequestHandler,
        engine: Arc<Mutex<TimerEngine>>,
        toasts: Arc<Mutex<ToastBoard>>,
        clock: Arc<ManualClock>,
        _events: mpsc::UnboundedReceiver<TimerEvent>,
        dir: TempDir,
    }

    fn create_handler() -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let (tx, events) = mpsc::unbounded_channel();
        let engine = Arc::new(Mutex::new(TimerEngine::new(
            TimerParams::default(),
            clock.clone(),
            tx,
        )));
        let tasks = Arc::new(Mutex::new(TaskStore::load(dir.path())));
        let toasts = Arc::new(Mutex::new(ToastBoard::new()));
        let handler = RequestHandler::new(engine.clone(), tasks, toasts.clone(), clock.clone())
            .with_config(AppConfig::default(), dir.path().join("config.json"));

        Fixture {
            handler,
            engine,
            toasts,
            clock,
            _events: events,
            dir,
        }
    }

    fn snapshot_of(response: &IpcResponse) -> crate::types::TimerSnapshot {
        response
            .data
            .as_ref()
            .and_then(|d| d.snapshot.clone())
            .expect("response carries a snapshot")
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path);

            assert!(server.is_ok());
            assert!(socket_path.exists());
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let socket_path = create_temp_socket_path();
            std::fs::write(&socket_path, "dummy").unwrap();

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_switch() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let request = r#"{"command":"switch","mode":"long-break"}"#;
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();

            assert!(matches!(
                request,
                IpcRequest::Switch {
                    mode: TimerMode::LongBreak
                }
            ));
            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_split_writes() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(br#"{"command":"#).await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
                stream.write_all(br#""status"}"#).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();

            assert!(matches!(request, IpcRequest::Status));
            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"not valid json").await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;

            assert!(request.is_err());
        }

        #[tokio::test]
        async fn test_connection_closed() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                let stream = UnixStream::connect(&client_path).await.unwrap();
                drop(stream);
            });

            let mut stream = server.accept().await.unwrap();
            let result = IpcServer::receive_request(&mut stream).await;

            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_handle_connection_round_trip() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let fx = create_handler();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(br#"{"command":"start"}"#).await.unwrap();
                stream.flush().await.unwrap();
                read_message::<IpcResponse>(&mut stream, Duration::from_secs(5))
                    .await
                    .unwrap()
            });

            let stream = server.accept().await.unwrap();
            IpcServer::handle_connection(stream, &fx.handler)
                .await
                .unwrap();

            let response = client_handle.await.unwrap();
            assert!(response.is_success());
            assert_eq!(response.message, "Focus started");
            assert_eq!(snapshot_of(&response).status, TimerStatus::Running);
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let socket_path = create_temp_socket_path();

            {
                let server = IpcServer::new(&socket_path).unwrap();
                assert_eq!(server.socket_path(), socket_path);
                assert!(socket_path.exists());
            }

            assert!(!socket_path.exists());
        }

        #[test]
        fn test_ipc_error_display() {
            assert_eq!(IpcError::Timeout.to_string(), "Operation timed out");
            assert!(IpcError::TooLarge.to_string().contains("65536"));
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test]
        async fn test_handle_status() {
            let fx = create_handler();

            let response = fx.handler.handle(IpcRequest::Status).await;

            assert!(response.is_success());
            let data = response.data.unwrap();
            let snapshot = data.snapshot.unwrap();
            assert_eq!(snapshot.mode, TimerMode::Focus);
            assert_eq!(snapshot.status, TimerStatus::Idle);
            assert_eq!(snapshot.time_left, 1_500_000);
            assert_eq!(data.tasks, Some(vec![]));
            assert_eq!(data.active_task_id, None);
        }

        #[tokio::test]
        async fn test_start_twice_is_an_error() {
            let fx = create_handler();

            let first = fx.handler.handle(IpcRequest::Start).await;
            fx.clock.advance(500);
            let second = fx.handler.handle(IpcRequest::Start).await;

            assert!(first.is_success());
            assert!(!second.is_success());
            assert_eq!(second.message, "Timer is already running");
            assert_eq!(fx.engine.lock().await.end_time(), Some(T0 + 1_500_000));
        }

        #[tokio::test]
        async fn test_pause_reports_frozen_time() {
            let fx = create_handler();
            fx.handler.handle(IpcRequest::Start).await;
            fx.clock.advance(5_000);

            let response = fx.handler.handle(IpcRequest::Pause).await;

            assert!(response.is_success());
            let snapshot = snapshot_of(&response);
            assert_eq!(snapshot.status, TimerStatus::Paused);
            assert_eq!(snapshot.time_left, 1_495_000);
        }

        #[tokio::test]
        async fn test_pause_not_running() {
            let fx = create_handler();

            let response = fx.handler.handle(IpcRequest::Pause).await;

            assert!(!response.is_success());
            assert_eq!(response.message, "Timer is not running");
        }

        #[tokio::test]
        async fn test_skip_and_skip_again() {
            let fx = create_handler();

            let response = fx.handler.handle(IpcRequest::Skip).await;
            assert!(response.is_success());
            assert_eq!(snapshot_of(&response).status, TimerStatus::Completed);

            let again = fx.handler.handle(IpcRequest::Skip).await;
            assert!(!again.is_success());
            assert_eq!(again.message, "Session already complete");
        }

        #[tokio::test]
        async fn test_switch_and_reset() {
            let fx = create_handler();

            let response = fx
                .handler
                .handle(IpcRequest::Switch {
                    mode: TimerMode::ShortBreak,
                })
                .await;
            assert_eq!(response.message, "Switched to Short Break");
            assert_eq!(snapshot_of(&response).time_left, 300_000);

            fx.handler.handle(IpcRequest::Start).await;
            fx.clock.advance(10_000);
            fx.engine.lock().await.tick();

            let response = fx.handler.handle(IpcRequest::Reset).await;
            let snapshot = snapshot_of(&response);
            assert_eq!(snapshot.mode, TimerMode::ShortBreak);
            assert_eq!(snapshot.status, TimerStatus::Idle);
            assert_eq!(snapshot.time_left, 300_000);
        }

        #[tokio::test]
        async fn test_params_rewinds_idle_session_and_persists() {
            let fx = create_handler();
            let params = TimerParams::default().with_focus_duration(50 * 60 * 1000);

            let response = fx.handler.handle(IpcRequest::Params { params }).await;

            assert!(response.is_success());
            assert_eq!(snapshot_of(&response).time_left, 3_000_000);

            let saved = AppConfig::load_from(&fx.dir.path().join("config.json")).unwrap();
            assert_eq!(saved.params.focus_duration, 3_000_000);
        }

        #[tokio::test]
        async fn test_params_keep_running_session() {
            let fx = create_handler();
            fx.handler.handle(IpcRequest::Start).await;
            fx.clock.advance(1_000);

            let params = TimerParams::default().with_focus_duration(60_000);
            fx.handler.handle(IpcRequest::Params { params }).await;

            let engine = fx.engine.lock().await;
            assert_eq!(engine.status(), TimerStatus::Running);
            assert_eq!(engine.end_time(), Some(T0 + 1_500_000));
        }

        #[tokio::test]
        async fn test_params_invalid() {
            let fx = create_handler();
            let params = TimerParams::default().with_long_break_interval(0);

            let response = fx.handler.handle(IpcRequest::Params { params }).await;

            assert!(!response.is_success());
            assert!(response.message.contains("longBreakInterval"));
            assert_eq!(fx.engine.lock().await.params().long_break_interval, 4);
        }

        #[tokio::test]
        async fn test_responses_carry_live_toasts() {
            let fx = create_handler();
            fx.toasts.lock().await.push(
                "Break Over!",
                ToastKind::Success,
                Duration::from_secs(5),
                T0,
            );

            let response = fx.handler.handle(IpcRequest::Status).await;
            assert_eq!(response.data.unwrap().toasts.len(), 1);

            fx.clock.advance(5_000);
            let response = fx.handler.handle(IpcRequest::Status).await;
            assert!(response.data.unwrap().toasts.is_empty());
        }
    }

    // ------------------------------------------------------------------------
    // Task command tests
    // ------------------------------------------------------------------------

    mod task_command_tests {
        use super::*;

        async fn add(fx: &Fixture, title: &str) -> String {
            let response = fx
                .handler
                .handle(IpcRequest::TaskAdd {
                    title: title.to_string(),
                    estimate: 2,
                })
                .await;
            assert!(response.is_success(), "{}", response.message);
            response.data.unwrap().tasks.unwrap()[0].id.clone()
        }

        #[tokio::test]
        async fn test_task_lifecycle() {
            let fx = create_handler();
            let id = add(&fx, "Write report").await;

            let response = fx
                .handler
                .handle(IpcRequest::TaskActivate {
                    id: Some(id.clone()),
                })
                .await;
            assert_eq!(response.data.unwrap().active_task_id, Some(id.clone()));

            let response = fx
                .handler
                .handle(IpcRequest::TaskDone { id: id.clone() })
                .await;
            assert_eq!(response.message, "Task marked done");
            assert!(response.data.unwrap().tasks.unwrap()[0].completed);

            let response = fx
                .handler
                .handle(IpcRequest::TaskUpdate {
                    id: id.clone(),
                    update: TaskUpdate {
                        title: Some("Write summary".to_string()),
                        ..TaskUpdate::default()
                    },
                })
                .await;
            assert_eq!(response.data.unwrap().tasks.unwrap()[0].title, "Write summary");

            let response = fx
                .handler
                .handle(IpcRequest::TaskRemove { id: id.clone() })
                .await;
            let data = response.data.unwrap();
            assert!(data.tasks.unwrap().is_empty());
            assert_eq!(data.active_task_id, None);
        }

        #[tokio::test]
        async fn test_task_reorder_and_list() {
            let fx = create_handler();
            let a = add(&fx, "a").await;
            let b = add(&fx, "b").await;

            fx.handler
                .handle(IpcRequest::TaskReorder {
                    ids: vec![a.clone(), b.clone()],
                })
                .await;

            let response = fx.handler.handle(IpcRequest::TaskList).await;
            let ids: Vec<String> = response
                .data
                .unwrap()
                .tasks
                .unwrap()
                .into_iter()
                .map(|t| t.id)
                .collect();
            assert_eq!(ids, vec![a, b]);
        }

        #[tokio::test]
        async fn test_task_errors() {
            let fx = create_handler();

            let response = fx
                .handler
                .handle(IpcRequest::TaskDone {
                    id: "missing".to_string(),
                })
                .await;
            assert!(!response.is_success());
            assert_eq!(response.message, "task not found: missing");

            let response = fx
                .handler
                .handle(IpcRequest::TaskAdd {
                    title: " ".to_string(),
                    estimate: 1,
                })
                .await;
            assert!(!response.is_success());

            let response = fx
                .handler
                .handle(IpcRequest::TaskUpdate {
                    id: "missing".to_string(),
                    update: TaskUpdate::default(),
                })
                .await;
            assert_eq!(response.message, "Nothing to update");
        }

        #[tokio::test]
        async fn test_deactivate() {
            let fx = create_handler();
            let id = add(&fx, "a").await;
            fx.handler
                .handle(IpcRequest::TaskActivate { id: Some(id) })
                .await;

            let response = fx.handler.handle(IpcRequest::TaskActivate { id: None }).await;

            assert_eq!(response.message, "Active task cleared");
            assert_eq!(response.data.unwrap().active_task_id, None);
        }
    }
}
