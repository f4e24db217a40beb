use crate::core::{ClientEvent, ConnectionState, NotificationClient};
use crate::traits::{NotificationConsumer, NotifyError, Result, TokenProvider};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Notification type that signals a finished scan
const COMPLETION_TYPE: &str = "scan_complete";

/// Look up a field in a notification frame
///
/// Backend frames wrap details under `notification`, with identifiers
/// either at that level or nested one deeper under `data`. Flat frames are
/// tolerated too.
fn field<'a>(frame: &'a Value, key: &str) -> Option<&'a Value> {
    let body = frame.get("notification").unwrap_or(frame);
    body.get(key)
        .or_else(|| body.get("data").and_then(|data| data.get(key)))
}

fn field_string(frame: &Value, key: &str) -> Option<String> {
    match field(frame, key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier comparison tolerant of numeric ids on the wire
fn field_matches(frame: &Value, key: &str, expected: &str) -> bool {
    match field(frame, key) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        _ => false,
    }
}

/// Terminal result of a watched scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_id: Option<String>,
    pub repository_id: Option<String>,
    pub message: Option<String>,
    /// The completion notification exactly as it arrived
    pub notification: Value,
}

impl ScanOutcome {
    fn from_frame(frame: Value) -> Self {
        Self {
            scan_id: field_string(&frame, "scan_id"),
            repository_id: field_string(&frame, "repository_id"),
            message: field(&frame, "message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            notification: frame,
        }
    }
}

/// Consumer that watches a scan-scoped channel for its completion signal
///
/// Every frame that is not a completion signal for the watched job is
/// relayed to the progress channel in arrival order. The completion outcome
/// is surfaced exactly once; repeated completion signals after it are
/// dropped, while everything else keeps flowing as progress.
pub struct CompletionWatcher {
    job_id: String,
    repository_id: Option<String>,
    outcome_tx: Sender<ScanOutcome>,
    progress_tx: Sender<Value>,
    done: bool,
}

impl CompletionWatcher {
    pub fn new(
        job_id: impl Into<String>,
        repository_id: Option<String>,
        outcome_tx: Sender<ScanOutcome>,
        progress_tx: Sender<Value>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            repository_id,
            outcome_tx,
            progress_tx,
            done: false,
        }
    }

    /// Whether a frame is the completion signal for the watched job
    ///
    /// The `type` discriminator sits at the top level of the frame, next to
    /// the `notification` wrapper. Matches on the job identifier, or on the
    /// owning repository identifier when the watcher was given one.
    fn is_completion(&self, frame: &Value) -> bool {
        if frame.get("type").and_then(Value::as_str) != Some(COMPLETION_TYPE) {
            return false;
        }
        if field_matches(frame, "scan_id", &self.job_id) {
            return true;
        }
        match &self.repository_id {
            Some(repo) => field_matches(frame, "repository_id", repo),
            None => false,
        }
    }
}

impl NotificationConsumer for CompletionWatcher {
    fn deliver(&mut self, notification: Value) -> Result<()> {
        if self.is_completion(&notification) {
            if self.done {
                debug!("[ScanWS] Ignoring repeated completion for job {}", self.job_id);
                return Ok(());
            }
            self.done = true;
            info!("[ScanWS] Job {} reported complete", self.job_id);
            let outcome = ScanOutcome::from_frame(notification);
            return self
                .outcome_tx
                .send(outcome)
                .map_err(|e| NotifyError::ChannelSend(e.to_string()));
        }
        self.progress_tx
            .send(notification)
            .map_err(|e| NotifyError::ChannelSend(e.to_string()))
    }
}

/// The client and channels behind one bound job
struct ScanBinding {
    job_id: String,
    client: NotificationClient,
    outcome_rx: Receiver<ScanOutcome>,
    progress_rx: Receiver<Value>,
}

/// Binds a notification channel to one background scan at a time
///
/// Enforces single-socket-per-job for its owning context: binding a new job
/// (or re-binding the same one) first closes the existing scoped channel
/// with the normal code, so at most one scan-scoped transport is ever live
/// per controller. Completion is detected in-band and surfaced through
/// [`try_recv_outcome`](Self::try_recv_outcome); the controller does not
/// force-close on completion, the backend tears the channel down from its
/// side.
///
/// `dispose()` is the only release path and is safe to call any number of
/// times.
pub struct ScanAffinityController {
    backend_url: String,
    token_provider: Arc<dyn TokenProvider>,
    repository_id: Option<String>,
    binding: Option<ScanBinding>,
}

impl ScanAffinityController {
    /// Create a controller for one UI context
    ///
    /// # Arguments
    /// * `backend_url` - Backend base URL; the ws/wss scheme is derived
    ///   from it
    /// * `token_provider` - Re-resolved on every connection attempt
    pub fn new(backend_url: impl Into<String>, token_provider: impl TokenProvider + 'static) -> Self {
        Self {
            backend_url: backend_url.into(),
            token_provider: Arc::new(token_provider),
            repository_id: None,
            binding: None,
        }
    }

    /// Also treat completions for this repository as belonging to the
    /// watched job
    pub fn for_repository(mut self, repository_id: impl Into<String>) -> Self {
        self.repository_id = Some(repository_id.into());
        self
    }

    /// Job currently bound, if any
    pub fn job_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.job_id.as_str())
    }

    /// State of the scoped channel; `Idle` when nothing is bound
    pub fn status(&self) -> ConnectionState {
        self.binding
            .as_ref()
            .map(|b| b.client.status())
            .unwrap_or(ConnectionState::Idle)
    }

    /// Whether a scoped channel is live (connecting or open)
    pub fn is_watching(&self) -> bool {
        matches!(
            self.status(),
            ConnectionState::Connecting | ConnectionState::Open
        )
    }

    /// Bind to a job, closing any previously bound channel first
    ///
    /// The old channel (same job or not) is closed with code 1000 and fully
    /// torn down before the new scoped connection is opened. Without an
    /// auth token the binding is still recorded but no transport is
    /// created.
    ///
    /// # Returns
    /// Whether a connection chain was launched.
    pub async fn bind_to_job(&mut self, job_id: impl Into<String>) -> bool {
        let job_id = job_id.into();
        self.release_binding().await;

        info!("[ScanWS] Binding to job {}", job_id);

        let (outcome_tx, outcome_rx) = unbounded();
        let (progress_tx, progress_rx) = unbounded();
        let watcher = CompletionWatcher::new(
            job_id.clone(),
            self.repository_id.clone(),
            outcome_tx,
            progress_tx,
        );

        let mut client = NotificationClient::builder()
            .backend_url(self.backend_url.clone())
            .consumer(watcher)
            .token_provider(Arc::clone(&self.token_provider))
            .scan_id(job_id.clone())
            .build();

        let launched = client.connect().await;
        self.binding = Some(ScanBinding {
            job_id,
            client,
            outcome_rx,
            progress_rx,
        });
        launched
    }

    /// Start watching a job discovered as already running
    ///
    /// A no-op when this controller is already watching the same job on a
    /// live channel; otherwise behaves like [`bind_to_job`](Self::bind_to_job).
    pub async fn adopt_running_job(&mut self, job_id: impl Into<String>) -> bool {
        let job_id = job_id.into();
        if let Some(binding) = &self.binding {
            if binding.job_id == job_id && self.is_watching() {
                debug!("[ScanWS] Already watching job {}", job_id);
                return false;
            }
        }
        self.bind_to_job(job_id).await
    }

    /// Completion outcome for the bound job, if one has arrived
    pub fn try_recv_outcome(&self) -> Option<ScanOutcome> {
        self.binding
            .as_ref()
            .and_then(|b| b.outcome_rx.try_recv().ok())
    }

    /// Next non-completion notification from the scoped channel
    pub fn try_recv_progress(&self) -> Option<Value> {
        self.binding
            .as_ref()
            .and_then(|b| b.progress_rx.try_recv().ok())
    }

    /// Next lifecycle event from the scoped channel
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.binding.as_ref().and_then(|b| b.client.try_recv_event())
    }

    /// Transmit on the scoped channel if it is open
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        self.binding
            .as_ref()
            .map(|b| b.client.send(message))
            .unwrap_or(false)
    }

    /// Release the scoped channel
    ///
    /// Closes with the normal code and cancels heartbeat and retry timers.
    /// Idempotent.
    pub async fn dispose(&mut self) {
        self.release_binding().await;
    }

    async fn release_binding(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            debug!("[ScanWS] Releasing channel for job {}", binding.job_id);
            binding.client.disconnect().await;
        }
    }
}
