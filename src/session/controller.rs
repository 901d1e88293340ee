use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::state::{RecordingSnapshot, SessionStatus};
use crate::capture::{CaptureBackend, CaptureError, CaptureExit, CaptureTerminator};
use crate::storage::{self, RecordingStore, ValidationError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture tool not installed")]
    ToolNotFound,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("failed to launch capture process: {0}")]
    LaunchFailed(String),

    #[error("capture process exited unexpectedly (code {code})")]
    UnexpectedProcessExit { code: i32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::ToolNotFound => Self::ToolNotFound,
            CaptureError::LaunchFailed(e) => Self::LaunchFailed(e.to_string()),
        }
    }
}

/// A capture in flight: the process terminator plus the two tasks serving it.
struct ActiveCapture {
    path: PathBuf,
    terminator: CaptureTerminator,
    /// Set before a caller-driven termination so the exit watcher knows the
    /// coming exit event is expected and leaves teardown to the caller.
    expected_exit: Arc<AtomicBool>,
    watcher: JoinHandle<CaptureExit>,
    ticker: JoinHandle<()>,
}

/// The recording state machine tying the capture backend and the file store
/// together.
///
/// At most one session records at a time. State changes are published through
/// a watch channel (see [`subscribe`](Self::subscribe)); every failure is
/// terminal for its session and `start` is always permitted again afterwards.
pub struct SessionController {
    backend: Arc<dyn CaptureBackend>,
    store: RecordingStore,
    max_duration: Duration,
    state: Arc<watch::Sender<RecordingSnapshot>>,
    active: Mutex<Option<ActiveCapture>>,
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        store: RecordingStore,
        max_duration: Duration,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(RecordingSnapshot::idle());
        Self {
            backend,
            store,
            max_duration,
            state: Arc::new(state_tx),
            active: Mutex::new(None),
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> RecordingSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change and elapsed-second tick.
    pub fn subscribe(&self) -> watch::Receiver<RecordingSnapshot> {
        self.state.subscribe()
    }

    /// Start a new recording session. Returns the output path the capture
    /// tool is writing to.
    pub async fn start(&self) -> Result<PathBuf, SessionError> {
        let mut active = self.active.lock().await;

        if !self.state.borrow().status.can_start() {
            return Err(SessionError::AlreadyRecording);
        }

        // A finished session can leave joined-out handles behind; drop them.
        if let Some(previous) = active.take() {
            previous.watcher.abort();
            previous.ticker.abort();
        }

        // Pre-flight: if the tool cannot be located, fail before anything is
        // spawned so the caller sees a clear "not installed" condition
        // instead of an opaque spawn failure.
        if let Err(err) = self.backend.locate() {
            return Err(self.fail_preflight(err.into()));
        }

        if let Err(err) = self.store.ensure_directory() {
            return Err(self.fail_preflight(err.into()));
        }

        let path = self.store.next_recording_path();
        let handle = match self.backend.launch(&path, self.max_duration).await {
            Ok(handle) => handle,
            Err(err) => return Err(self.fail_preflight(err.into())),
        };

        let started_at = Utc::now();
        let expected_exit = Arc::new(AtomicBool::new(false));
        let (terminator, exit_rx) = handle.into_parts();

        self.state.send_replace(RecordingSnapshot {
            status: SessionStatus::Recording,
            file_path: Some(path.clone()),
            started_at: Some(started_at),
            elapsed_secs: 0,
            last_error: None,
        });
        info!("recording started: {}", path.display());

        // Elapsed ticker: one increment per second while Recording. Halts
        // itself on any state change, so every teardown path clears it.
        let ticker = tokio::spawn({
            let state = Arc::clone(&self.state);
            async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    let still_recording = state.send_if_modified(|snapshot| {
                        if snapshot.status == SessionStatus::Recording {
                            snapshot.elapsed_secs += 1;
                            true
                        } else {
                            false
                        }
                    });
                    if !still_recording {
                        break;
                    }
                }
            }
        });

        // Exit watcher: resolves spontaneous exits (duration cap, crash).
        // When the exit was requested by stop()/shutdown() it only reports
        // the code and leaves teardown to the requester.
        let watcher = tokio::spawn({
            let state = Arc::clone(&self.state);
            let store = self.store.clone();
            let expected = Arc::clone(&expected_exit);
            let path = path.clone();
            async move {
                let exit = match exit_rx.await {
                    Ok(exit) => exit,
                    Err(_) => {
                        warn!("capture driver dropped without reporting an exit");
                        CaptureExit::Signal
                    }
                };

                if expected.load(Ordering::SeqCst) {
                    return exit;
                }

                if exit.is_clean() {
                    // The tool's own duration cap ran out: same completion
                    // path as a caller-driven stop.
                    info!("capture reached its duration limit: {}", path.display());
                    match storage::validate(&path, store.min_file_bytes()) {
                        Ok(()) => {
                            state.send_modify(|s| s.status = SessionStatus::Stopped);
                        }
                        Err(err) => {
                            warn!("recording failed validation: {}", err);
                            state.send_modify(|s| {
                                s.status = SessionStatus::Failed;
                                s.last_error = Some(err.to_string());
                            });
                        }
                    }
                } else {
                    let code = exit_code(exit);
                    error!("capture process exited unexpectedly (code {})", code);
                    let err = SessionError::UnexpectedProcessExit { code };
                    state.send_modify(|s| {
                        s.status = SessionStatus::Failed;
                        s.last_error = Some(err.to_string());
                    });
                }

                exit
            }
        });

        *active = Some(ActiveCapture {
            path: path.clone(),
            terminator,
            expected_exit,
            watcher,
            ticker,
        });

        Ok(path)
    }

    /// Stop the running recording, validate the file and return its path.
    ///
    /// On validation failure the session moves to `Failed` and the partial
    /// file is left on disk for inspection, never silently deleted.
    pub async fn stop(&self) -> Result<PathBuf, SessionError> {
        let mut active_guard = self.active.lock().await;

        if self.state.borrow().status != SessionStatus::Recording {
            return Err(SessionError::NotRecording);
        }
        let Some(mut active) = active_guard.take() else {
            return Err(SessionError::NotRecording);
        };

        let exit = self.finish_capture(&mut active).await;

        // The process may have died abnormally in the instant before the
        // expected-exit flag was set; the watcher has already failed the
        // session then.
        if self.state.borrow().status == SessionStatus::Failed {
            return Err(SessionError::UnexpectedProcessExit {
                code: exit_code(exit),
            });
        }

        match storage::validate(&active.path, self.store.min_file_bytes()) {
            Ok(()) => {
                info!("recording stopped: {}", active.path.display());
                self.state.send_modify(|s| s.status = SessionStatus::Stopped);
                Ok(active.path)
            }
            Err(err) => {
                warn!("recording failed validation: {}", err);
                self.state.send_modify(|s| {
                    s.status = SessionStatus::Failed;
                    s.last_error = Some(err.to_string());
                });
                Err(SessionError::Validation(err))
            }
        }
    }

    /// Host teardown. Kills any running capture and clears the ticker through
    /// the same termination path as `stop`, then resets to `Idle`; validation
    /// is skipped and the file is left on disk.
    pub async fn shutdown(&self) {
        let mut active_guard = self.active.lock().await;
        if let Some(mut active) = active_guard.take() {
            self.finish_capture(&mut active).await;
            info!("session torn down: {}", active.path.display());
        }
        self.state.send_replace(RecordingSnapshot::idle());
    }

    /// The single teardown routine behind `stop` and `shutdown`: flags the
    /// exit as expected, terminates the process, waits for it to be reaped
    /// and halts the elapsed ticker.
    async fn finish_capture(&self, active: &mut ActiveCapture) -> CaptureExit {
        active.expected_exit.store(true, Ordering::SeqCst);
        self.state.send_if_modified(|snapshot| {
            if snapshot.status == SessionStatus::Recording {
                snapshot.status = SessionStatus::Stopping;
                true
            } else {
                false
            }
        });

        active.terminator.terminate();
        let exit = match (&mut active.watcher).await {
            Ok(exit) => exit,
            Err(e) => {
                error!("capture watcher task failed: {}", e);
                CaptureExit::Signal
            }
        };
        active.ticker.abort();
        exit
    }

    /// Record a pre-flight failure: no process was spawned, the session moves
    /// straight to `Failed`.
    fn fail_preflight(&self, err: SessionError) -> SessionError {
        warn!("recording pre-flight failed: {}", err);
        self.state.send_replace(RecordingSnapshot {
            status: SessionStatus::Failed,
            file_path: None,
            started_at: None,
            elapsed_secs: 0,
            last_error: Some(err.to_string()),
        });
        err
    }
}

fn exit_code(exit: CaptureExit) -> i32 {
    match exit {
        CaptureExit::Code(code) => code,
        CaptureExit::Signal => -1,
    }
}
