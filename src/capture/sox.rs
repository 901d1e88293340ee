use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::backend::{
    CaptureBackend, CaptureError, CaptureExit, CaptureHandle, BIT_DEPTH, CHANNELS, SAMPLE_RATE,
};
use super::tool::locate_capture_tool;

/// Capture backend driving SoX (`rec` or `sox`) as an external process.
///
/// The controller never reads audio data from the child; the only contact
/// surface is spawn, SIGTERM and the exit status.
pub struct SoxBackend {
    override_path: Option<PathBuf>,
}

impl SoxBackend {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }

    fn build_args(tool: &Path, output: &Path, max_duration: Duration) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        // `sox` wants the default input device named explicitly; `rec`
        // implies it.
        if tool.file_stem().is_some_and(|stem| stem == "sox") {
            args.push("-d".into());
        }

        args.push("-r".into());
        args.push(SAMPLE_RATE.to_string().into());
        args.push("-c".into());
        args.push(CHANNELS.to_string().into());
        args.push("-b".into());
        args.push(BIT_DEPTH.to_string().into());
        args.push("-e".into());
        args.push("signed-integer".into());
        args.push(output.as_os_str().to_os_string());

        // The tool enforces the duration cap itself; the session's elapsed
        // counter carries no correctness weight.
        args.push("trim".into());
        args.push("0".into());
        args.push(max_duration.as_secs().to_string().into());

        args
    }
}

#[async_trait]
impl CaptureBackend for SoxBackend {
    fn locate(&self) -> Result<PathBuf, CaptureError> {
        locate_capture_tool(self.override_path.as_deref()).ok_or(CaptureError::ToolNotFound)
    }

    async fn launch(
        &self,
        output: &Path,
        max_duration: Duration,
    ) -> Result<CaptureHandle, CaptureError> {
        let tool = self.locate()?;

        let mut child = Command::new(&tool)
            .args(Self::build_args(&tool, output, max_duration))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        info!(
            "capture started: {} -> {} (max {}s)",
            tool.display(),
            output.display(),
            max_duration.as_secs()
        );

        let (exit_tx, exit_rx) = oneshot::channel();
        let (term_tx, term_rx) = oneshot::channel::<()>();

        // Driver task: owns the child, relays termination requests and
        // reports the exit exactly once.
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = term_rx => {
                    request_stop(&mut child);
                    child.wait().await
                }
            };

            let exit = match status {
                Ok(status) => match status.code() {
                    Some(code) => CaptureExit::Code(code),
                    None => CaptureExit::Signal,
                },
                Err(e) => {
                    error!("waiting on capture process failed: {}", e);
                    CaptureExit::Signal
                }
            };

            let _ = exit_tx.send(exit);
        });

        Ok(CaptureHandle::from_parts(exit_rx, term_tx))
    }
}

/// Ask the child to stop. SIGTERM rather than SIGKILL so SoX flushes and
/// finalizes the WAV header before exiting.
#[cfg(unix)]
fn request_stop(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // id() is None once the child has been reaped; nothing to signal then.
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!("SIGTERM to capture process failed: {}", e);
        }
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("failed to kill capture process: {}", e);
    }
}
