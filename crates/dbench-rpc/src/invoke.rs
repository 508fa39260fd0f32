//! Generic invoke mechanism and request tracking
//!
//! This module provides:
//! - Request ID tracking for matching responses
//! - The [`InvokeClient`] that forwards name-and-argument invocations
//! - Timeout handling for stalled invocations
//! - Bounded retry used by the connect operation

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, RwLock};

use dbench_core::prelude::*;

use crate::protocol::build_request;

/// Default timeout for a single invocation
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A pending invocation awaiting its response
struct PendingRequest {
    /// Channel to send the outcome
    response_tx: oneshot::Sender<InvokeOutcome>,
    /// When this request was created
    created_at: Instant,
}

/// Outcome of a single invocation
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub id: u64,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl InvokeOutcome {
    pub fn from_response(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        Self {
            id,
            success: error.is_none(),
            result,
            error: error.map(|e| match e {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        }
    }

    fn failed(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Tracks pending invocations and matches responses
pub struct RequestTracker {
    /// Map of request ID to pending request
    pending: Arc<RwLock<HashMap<u64, PendingRequest>>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new pending invocation.
    /// Returns (request_id, receiver for the outcome)
    pub async fn register(&self) -> (u64, oneshot::Receiver<InvokeOutcome>) {
        let id = next_request_id();
        let (tx, rx) = oneshot::channel();

        let pending = PendingRequest {
            response_tx: tx,
            created_at: Instant::now(),
        };

        self.pending.write().await.insert(id, pending);

        (id, rx)
    }

    /// Handle an incoming response from the daemon.
    /// Returns true if the response was matched to a pending invocation.
    pub async fn handle_response(
        &self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> bool {
        if let Some(pending) = self.pending.write().await.remove(&id) {
            let outcome = InvokeOutcome::from_response(id, result, error);
            let _ = pending.response_tx.send(outcome);
            true
        } else {
            false
        }
    }

    /// Cancel all pending invocations (e.g., when the daemon exits)
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.write().await;
        for (id, req) in pending.drain() {
            let _ = req
                .response_tx
                .send(InvokeOutcome::failed(id, "Request cancelled"));
        }
    }

    /// Remove stale invocations that have timed out
    pub async fn cleanup_stale(&self, timeout: Duration) -> Vec<u64> {
        let mut pending = self.pending.write().await;
        let now = Instant::now();

        let stale: Vec<u64> = pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.created_at) > timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(req) = pending.remove(id) {
                let _ = req
                    .response_tx
                    .send(InvokeOutcome::failed(*id, "Request timed out"));
            }
        }

        stale
    }

    /// Get the number of pending invocations
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards name-and-argument invocations to the backend daemon.
///
/// Stateless apart from the pending-request table; every exposed backend
/// operation reduces to one `invoke(name, params)` call.
#[derive(Clone)]
pub struct InvokeClient {
    /// Channel to send raw JSON lines to the daemon's stdin
    stdin_tx: mpsc::Sender<String>,
    /// Request tracker for response matching
    tracker: Arc<RequestTracker>,
    /// Timeout applied to each invocation
    timeout: Duration,
}

impl std::fmt::Debug for InvokeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeClient")
            .field("stdin_tx", &"<channel>")
            .field("tracker", &"<tracker>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InvokeClient {
    pub fn new(stdin_tx: mpsc::Sender<String>, tracker: Arc<RequestTracker>) -> Self {
        Self {
            stdin_tx,
            tracker,
            timeout: DEFAULT_INVOKE_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create an InvokeClient for testing (uses a dummy channel)
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn new_for_test() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self::new(tx, Arc::new(RequestTracker::default()))
    }

    /// Invoke a backend operation and wait for its result.
    ///
    /// Backend-reported failures come back as [`Error::Backend`];
    /// transport problems (daemon gone, timeout) as [`Error::Process`]
    /// or [`Error::ChannelSend`].
    pub async fn invoke(&self, method: &str, params: Value) -> Result<Value> {
        // Register the pending invocation
        let (id, response_rx) = self.tracker.register().await;

        let line = build_request(id, method, params);

        debug!("Invoking #{id}: {method}");

        self.stdin_tx
            .send(line)
            .await
            .map_err(|_| Error::channel_send("backend stdin"))?;

        // Wait for the response with timeout
        match tokio::time::timeout(self.timeout, response_rx).await {
            Ok(Ok(outcome)) => {
                debug!("Invocation #{id} completed: success={}", outcome.success);
                if outcome.success {
                    Ok(outcome.result.unwrap_or(Value::Null))
                } else {
                    Err(Error::backend(
                        outcome.error.unwrap_or_else(|| "unknown error".to_string()),
                    ))
                }
            }
            Ok(Err(_)) => {
                // Channel closed (invocation was cancelled)
                Err(Error::process("Invocation cancelled"))
            }
            Err(_) => {
                // Timeout - cleanup the pending invocation
                self.tracker.cleanup_stale(Duration::ZERO).await;
                Err(Error::process(format!(
                    "Invocation '{method}' timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    /// Get the request tracker (for response handling)
    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}

/// Run `op` up to `attempts` times, pausing `delay` between attempts and
/// re-throwing the last failure once every attempt has failed.
pub async fn retry_with_delay<T, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!("Attempt {attempt}/{attempts} failed: {err}");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::process("retry ran zero attempts")))
}
