use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Capture parameters passed to every backend. The transcription models the
/// service targets expect mono 16-bit PCM at 16 kHz, so these are fixed.
pub const SAMPLE_RATE: u32 = 16_000;
pub const CHANNELS: u16 = 1;
pub const BIT_DEPTH: u16 = 16;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture executable could not be found; nothing was spawned.
    #[error("capture tool not installed (looked for `rec`/`sox` in well-known locations and PATH)")]
    ToolNotFound,

    /// The executable was found but spawning it failed.
    #[error("failed to launch capture tool: {0}")]
    LaunchFailed(#[from] std::io::Error),
}

/// How a capture process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureExit {
    /// The process exited with a code.
    Code(i32),
    /// The process was killed by a signal; no exit code is available.
    Signal,
}

impl CaptureExit {
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Code(0))
    }
}

/// Handle to a running capture process.
///
/// The exit event fires exactly once when the process is gone, whether the
/// exit was requested through [`terminate`](Self::terminate) or spontaneous.
pub struct CaptureHandle {
    exit_rx: oneshot::Receiver<CaptureExit>,
    terminate_tx: Option<oneshot::Sender<()>>,
}

impl CaptureHandle {
    /// Assemble a handle from its two channels. Backends (including test
    /// doubles) must send the exit exactly once and listen for the
    /// termination request on the paired receiver.
    pub fn from_parts(
        exit_rx: oneshot::Receiver<CaptureExit>,
        terminate_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            exit_rx,
            terminate_tx: Some(terminate_tx),
        }
    }

    /// Request termination. Idempotent; a no-op once the process has exited.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.terminate_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Split into the terminate half and the exit event, so they can live on
    /// different tasks.
    pub fn into_parts(self) -> (CaptureTerminator, oneshot::Receiver<CaptureExit>) {
        (
            CaptureTerminator {
                tx: self.terminate_tx,
            },
            self.exit_rx,
        )
    }

    /// Wait for the process to exit.
    pub async fn wait(self) -> CaptureExit {
        self.exit_rx.await.unwrap_or(CaptureExit::Signal)
    }
}

/// Terminate half of a split [`CaptureHandle`].
pub struct CaptureTerminator {
    tx: Option<oneshot::Sender<()>>,
}

impl CaptureTerminator {
    /// Request termination. Idempotent; a no-op once the process has exited.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Audio capture backend trait
///
/// The production implementation drives an external SoX process; tests
/// substitute a scripted backend.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Locate the capture executable. Pure lookup, no side effects; the
    /// result is never cached across calls.
    fn locate(&self) -> Result<PathBuf, CaptureError>;

    /// Spawn the capture tool recording to `output`, hard-capped at
    /// `max_duration` by the tool itself (its trim argument), independent of
    /// any caller-driven stop.
    async fn launch(
        &self,
        output: &Path,
        max_duration: Duration,
    ) -> Result<CaptureHandle, CaptureError>;
}
