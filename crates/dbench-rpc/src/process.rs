//! Backend daemon process management

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use dbench_core::prelude::*;

use crate::invoke::{InvokeClient, RequestTracker};
use crate::protocol::Response;

/// Name of the backend daemon executable looked up on PATH
pub const BACKEND_PROGRAM: &str = "dbenchd";

/// How long `shutdown()` waits for the daemon to die after the kill signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve the backend daemon executable.
///
/// An explicit override path must exist; without one the daemon is looked
/// up on PATH under [`BACKEND_PROGRAM`].
pub fn locate_backend(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => dunce::canonicalize(path).map_err(|_| Error::BackendNotFound),
        None => which::which(BACKEND_PROGRAM).map_err(|_| Error::BackendNotFound),
    }
}

/// Manages the backend daemon child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background
/// task that calls `child.wait()`, so the real exit code is captured even
/// when stdout closes first. `BackendProcess` retains a kill channel to
/// request a force-kill, an atomic flag for synchronous `has_exited()`
/// checks, and a [`Notify`] handle so `shutdown()` can await termination
/// without holding a lock across `.await`.
#[derive(Debug)]
pub struct BackendProcess {
    /// Client handed to the proxy layer; clones share the stdin channel
    client: InvokeClient,
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to force-kill the process.
    /// Consumed on first use.
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl BackendProcess {
    /// Spawn the backend daemon and wire up its stdio.
    pub fn spawn(program: &Path) -> Result<Self> {
        info!("Spawning backend daemon: {}", program.display());

        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::BackendNotFound
                } else {
                    Error::ProcessSpawn {
                        reason: e.to_string(),
                    }
                }
            })?;

        let pid = child.id();
        info!("Backend daemon started with PID: {:?}", pid);

        let tracker = Arc::new(RequestTracker::new());

        // Take ownership of stdin and create the invocation channel
        let stdin = child.stdin.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stdin was not captured".to_string(),
        })?;
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(Self::stdin_writer(stdin, stdin_rx));

        // Stdout carries response lines; match them against the tracker
        let stdout = child.stdout.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stdout was not captured".to_string(),
        })?;
        tokio::spawn(Self::stdout_reader(stdout, Arc::clone(&tracker)));

        // Stderr is diagnostics only
        let stderr = child.stderr.take().ok_or_else(|| Error::ProcessSpawn {
            reason: "stderr was not captured".to_string(),
        })?;
        tokio::spawn(Self::stderr_reader(stderr));

        // Shared exit-state primitives
        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());

        // Kill channel: BackendProcess holds the sender, wait task the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // Dedicated wait task takes ownership of `child`.
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            Arc::clone(&tracker),
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            client: InvokeClient::new(stdin_tx, tracker),
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Background task: owns `child`, waits for it to exit, fails all
    /// pending invocations once it has.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        tracker: Arc<RequestTracker>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            // Natural exit path
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Backend daemon exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for backend daemon: {}", e);
                        None
                    }
                }
            }
            // Force-kill path: kill_tx was sent by shutdown
            _ = kill_rx => {
                info!("Kill signal received, force-killing backend daemon");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill backend daemon: {}", e);
                }
                match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Mark the process as exited and wake waiters before failing the
        // pending invocations, so `has_exited()` is true by the time
        // callers observe their errors.
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();

        debug!("Backend daemon gone (code: {:?}), cancelling pending invocations", code);
        tracker.cancel_all().await;
    }

    /// Read response lines from stdout and complete pending invocations
    async fn stdout_reader(stdout: tokio::process::ChildStdout, tracker: Arc<RequestTracker>) {
        let mut reader = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("stdout: {}", line);

            match Response::parse(&line) {
                Some(response) => {
                    let matched = tracker
                        .handle_response(response.id, response.result, response.error)
                        .await;
                    if !matched {
                        debug!("Unmatched response id {}", response.id);
                    }
                }
                None => {
                    // Diagnostics the daemon writes outside the protocol
                    debug!("Ignoring non-protocol line: {}", line);
                }
            }
        }

        info!("stdout reader finished, backend daemon likely exiting");
    }

    /// Read stderr lines and log them
    async fn stderr_reader(stderr: tokio::process::ChildStderr) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            if !line.trim().is_empty() {
                warn!("backend stderr: {}", line);
            }
        }

        debug!("stderr reader finished");
    }

    /// Write invocation lines to stdin
    async fn stdin_writer(mut stdin: tokio::process::ChildStdin, mut rx: mpsc::Receiver<String>) {
        while let Some(line) = rx.recv().await {
            debug!("Sending to backend: {}", line);

            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                error!("Failed to write to stdin: {}", e);
                break;
            }
            if let Err(e) = stdin.write_all(b"\n").await {
                error!("Failed to write newline: {}", e);
                break;
            }
            if let Err(e) = stdin.flush().await {
                error!("Failed to flush stdin: {}", e);
                break;
            }
        }

        debug!("stdin writer finished");
    }

    /// Get a client for issuing invocations against this daemon
    pub fn client(&self) -> InvokeClient {
        self.client.clone()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the daemon has exited (synchronous check)
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Kill the daemon and wait (bounded) for it to go away.
    pub async fn shutdown(mut self) {
        if self.has_exited() {
            return;
        }

        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }

        let notified = self.exit_notify.notified();
        if self.has_exited() {
            return;
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, notified).await.is_err() {
            warn!("Backend daemon did not exit within {:?}", SHUTDOWN_TIMEOUT);
        }
    }
}
