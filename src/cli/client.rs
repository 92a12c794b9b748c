//! IPC client for talking to the Tomato Timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - One method per daemon request
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::config::AppConfig;
use crate::daemon::ipc::read_message;
use crate::types::{IpcRequest, IpcResponse, TaskUpdate, TimerMode, TimerParams};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
    max_retries: u32,
}

impl IpcClient {
    /// Creates a client for the socket configured in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_socket_path(config.socket_path()?))
    }

    /// Creates a client for a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Overrides the number of connection attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Returns true if something accepts connections on the socket.
    pub async fn is_daemon_running(&self) -> bool {
        matches!(
            timeout(self.timeout, UnixStream::connect(&self.socket_path)).await,
            Ok(Ok(_))
        )
    }

    pub async fn start(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Start).await
    }

    pub async fn pause(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Pause).await
    }

    pub async fn reset(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Reset).await
    }

    pub async fn skip(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Skip).await
    }

    pub async fn switch(&self, mode: TimerMode) -> Result<IpcResponse> {
        self.request(&IpcRequest::Switch { mode }).await
    }

    /// Replaces the daemon's timer parameters.
    pub async fn set_params(&self, params: TimerParams) -> Result<IpcResponse> {
        self.request(&IpcRequest::Params { params }).await
    }

    pub async fn status(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Status).await
    }

    pub async fn task_add(&self, title: &str, estimate: u32) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskAdd {
            title: title.to_string(),
            estimate,
        })
        .await
    }

    pub async fn task_list(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskList).await
    }

    pub async fn task_done(&self, id: &str) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskDone { id: id.to_string() })
            .await
    }

    pub async fn task_remove(&self, id: &str) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskRemove { id: id.to_string() })
            .await
    }

    /// Sets the active task, or clears it with `None`.
    pub async fn task_activate(&self, id: Option<&str>) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskActivate {
            id: id.map(String::from),
        })
        .await
    }

    pub async fn task_update(&self, id: &str, update: TaskUpdate) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskUpdate {
            id: id.to_string(),
            update,
        })
        .await
    }

    pub async fn task_reorder(&self, ids: Vec<String>) -> Result<IpcResponse> {
        self.request(&IpcRequest::TaskReorder { ids }).await
    }

    /// Sends `request` and turns an error response into an `Err`.
    async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request_with_retry(request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a request, retrying transport failures only.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        "request failed (attempt {}/{}): {:#}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let io_timeout = Duration::from_secs(IO_TIMEOUT_SECS);

        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Cannot connect to the daemon at {}. Start it with 'tomato-timer daemon'",
                    self.socket_path.display()
                )
            })?;

        let request_json = serde_json::to_vec(request).context("Failed to serialize request")?;

        timeout(io_timeout, stream.write_all(&request_json))
            .await
            .context("Write timed out")?
            .context("Failed to send request")?;

        timeout(io_timeout, stream.flush())
            .await
            .context("Flush timed out")?
            .context("Failed to flush request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to shut down the write half")?;

        let response: IpcResponse = read_message(&mut stream, io_timeout)
            .await
            .context("Failed to read the daemon's response")?;

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
