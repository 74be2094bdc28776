//! HTTP transport.
//!
//! Each started transfer runs as its own tokio task. Pause stops polling the
//! response body, which leaves the connection open and lets TCP flow control
//! hold the server back; resume picks up where the stream stopped. Cancel
//! drops the task's future, closing the connection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use dlq_core::{
    Destination, DownloadError, DownloadResult, Payload, TransferId, TransferListener,
    TransferRequest, TransportPort,
};

use crate::progress::ProgressThrottle;

/// Fallback file name when the URL path has no usable last segment.
const FALLBACK_FILE_NAME: &str = "download";

/// Upper bound on the up-front buffer reservation for in-memory transfers.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Directory receiving `Destination::File` downloads.
    pub download_dir: PathBuf,
    /// Minimum spacing between two progress reports for one transfer.
    pub progress_interval: Duration,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            download_dir: std::env::temp_dir(),
            progress_interval: Duration::from_millis(100),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpTransportConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory for file downloads.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set the minimum spacing between progress reports.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// The last non-empty path segment of `url`, or `"download"`.
pub fn file_name_for(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
}

/// Control handles for one running transfer.
struct TransferControl {
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
}

type Transfers = Arc<Mutex<HashMap<TransferId, TransferControl>>>;

/// [`TransportPort`] backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    config: Arc<HttpTransportConfig>,
    runtime: Handle,
    transfers: Transfers,
}

impl HttpTransport {
    /// Create a transport that spawns onto the current tokio runtime.
    ///
    /// Fails outside of a runtime context.
    pub fn new(config: HttpTransportConfig) -> DownloadResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| DownloadError::other(format!("No tokio runtime available: {e}")))?;
        Self::with_runtime(config, runtime)
    }

    /// Create a transport that spawns onto `runtime`.
    ///
    /// Use this when the manager is driven from threads outside the runtime.
    pub fn with_runtime(config: HttpTransportConfig, runtime: Handle) -> DownloadResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DownloadError::other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            runtime,
            transfers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The transport configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Where a `Destination::File` transfer is written.
    ///
    /// The item ID prefix keeps two downloads of the same URL apart.
    pub fn destination_path(&self, request: &TransferRequest) -> PathBuf {
        self.config.download_dir.join(format!(
            "{}-{}",
            request.id.item(),
            file_name_for(&request.url)
        ))
    }

    /// Number of transfers currently running or paused.
    pub fn active_transfers(&self) -> usize {
        lock(&self.transfers).len()
    }
}

impl TransportPort for HttpTransport {
    fn start(
        &self,
        request: TransferRequest,
        listener: Arc<dyn TransferListener>,
    ) -> Result<(), DownloadError> {
        let cancel = CancellationToken::new();
        let (paused_tx, paused_rx) = watch::channel(false);
        let path = match request.destination {
            Destination::File => Some(self.destination_path(&request)),
            Destination::Memory => None,
        };

        lock(&self.transfers).insert(
            request.id.clone(),
            TransferControl {
                cancel: cancel.clone(),
                paused: paused_tx,
            },
        );

        tracing::debug!(target: "dlq.transport", transfer = %request.id, url = %request.url, "Spawning transfer");

        let job = TransferJob {
            client: self.client.clone(),
            progress_interval: self.config.progress_interval,
            request,
            path,
            listener,
            paused: paused_rx,
            transfers: Arc::clone(&self.transfers),
        };
        self.runtime.spawn(job.run(cancel));
        Ok(())
    }

    fn pause(&self, id: &TransferId) {
        if let Some(control) = lock(&self.transfers).get(id) {
            control.paused.send_replace(true);
            tracing::debug!(target: "dlq.transport", transfer = %id, "Transfer paused");
        }
    }

    fn resume(&self, id: &TransferId) {
        if let Some(control) = lock(&self.transfers).get(id) {
            control.paused.send_replace(false);
            tracing::debug!(target: "dlq.transport", transfer = %id, "Transfer resumed");
        }
    }

    fn cancel(&self, id: &TransferId) {
        if let Some(control) = lock(&self.transfers).remove(id) {
            control.cancel.cancel();
            tracing::debug!(target: "dlq.transport", transfer = %id, "Transfer cancelled");
        }
    }
}

/// One spawned transfer.
struct TransferJob {
    client: Client,
    progress_interval: Duration,
    request: TransferRequest,
    path: Option<PathBuf>,
    listener: Arc<dyn TransferListener>,
    paused: watch::Receiver<bool>,
    transfers: Transfers,
}

impl TransferJob {
    async fn run(mut self, cancel: CancellationToken) {
        let id = self.request.id.clone();

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.transfer() => Some(result),
        };

        lock(&self.transfers).remove(&id);

        let result = match result {
            Some(result) if !cancel.is_cancelled() => result,
            _ => {
                tracing::debug!(target: "dlq.transport", transfer = %id, "Transfer aborted");
                self.discard_partial_file().await;
                return;
            }
        };

        match result {
            Ok(payload) => self.listener.on_success(&id, payload),
            Err(error) => {
                tracing::debug!(target: "dlq.transport", transfer = %id, error = %error, "Transfer failed");
                self.discard_partial_file().await;
                self.listener.on_failure(&id, error);
            }
        }
    }

    async fn transfer(&mut self) -> DownloadResult<Payload> {
        let response = self
            .client
            .get(self.request.url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network_with_status(
                format!("HTTP {status} for {}", self.request.url),
                status.as_u16(),
            ));
        }

        let expected = response.content_length();
        let mut sink = Sink::open(self.path.as_deref(), expected).await?;
        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let mut stream = response.bytes_stream();
        let mut bytes_read: u64 = 0;

        loop {
            wait_while_paused(&mut self.paused).await;
            let Some(chunk) = stream.next().await else {
                break;
            };
            let chunk = chunk.map_err(network_error)?;
            sink.write(&chunk).await?;
            bytes_read += chunk.len() as u64;

            if throttle.should_emit() {
                self.listener
                    .on_progress(&self.request.id, bytes_read, expected);
            }
        }

        // The last report always goes out so observers see the final count.
        self.listener
            .on_progress(&self.request.id, bytes_read, expected);
        sink.finish().await
    }

    async fn discard_partial_file(&self) {
        if let Some(path) = &self.path {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(target: "dlq.transport", path = %path.display(), error = %e, "Failed to remove partial download");
                }
            }
        }
    }
}

/// Where the bytes of one transfer go.
enum Sink {
    Memory(BytesMut),
    File { file: tokio::fs::File, path: PathBuf },
}

impl Sink {
    async fn open(path: Option<&Path>, expected: Option<u64>) -> DownloadResult<Self> {
        let Some(path) = path else {
            let capacity = expected
                .and_then(|len| usize::try_from(len).ok())
                .unwrap_or(0)
                .min(MAX_PREALLOCATION);
            return Ok(Self::Memory(BytesMut::with_capacity(capacity)));
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::from_io_error(&e))?;
        }
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| DownloadError::from_io_error(&e))?;
        Ok(Self::File {
            file,
            path: path.to_path_buf(),
        })
    }

    async fn write(&mut self, chunk: &[u8]) -> DownloadResult<()> {
        match self {
            Self::Memory(buffer) => {
                buffer.extend_from_slice(chunk);
                Ok(())
            }
            Self::File { file, .. } => file
                .write_all(chunk)
                .await
                .map_err(|e| DownloadError::from_io_error(&e)),
        }
    }

    async fn finish(self) -> DownloadResult<Payload> {
        match self {
            Self::Memory(buffer) => Ok(Payload::Data(buffer.freeze())),
            Self::File { mut file, path } => {
                file.flush()
                    .await
                    .map_err(|e| DownloadError::from_io_error(&e))?;
                Ok(Payload::File(path))
            }
        }
    }
}

/// Park until the paused flag is cleared or the control handle is dropped.
async fn wait_while_paused(paused: &mut watch::Receiver<bool>) {
    loop {
        let is_paused = *paused.borrow_and_update();
        if !is_paused || paused.changed().await.is_err() {
            return;
        }
    }
}

fn network_error(e: reqwest::Error) -> DownloadError {
    match e.status() {
        Some(status) => DownloadError::network_with_status(e.to_string(), status.as_u16()),
        None => DownloadError::network(e.to_string()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
