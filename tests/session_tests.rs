// Integration tests for the recording session state machine
//
// A scripted capture backend stands in for the external tool: it writes a
// fixture WAV on launch, exits cleanly when terminated, and lets a test
// force a spontaneous exit with any code. A spawn counter verifies that
// failed pre-flights never reach the process layer.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use voxnote::capture::{CaptureBackend, CaptureError, CaptureExit, CaptureHandle};
use voxnote::session::{SessionController, SessionError, SessionStatus};
use voxnote::storage::{self, RecordingStore, ValidationError};

const MIN_FILE_BYTES: u64 = 1024;
const MAX_DURATION: Duration = Duration::from_secs(600);

/// Scripted stand-in for the external capture tool.
struct ScriptedBackend {
    installed: bool,
    /// Seconds of silence written to the output file on launch.
    fixture_secs: u32,
    spawns: AtomicUsize,
    /// Sender driving a spontaneous exit of the current fake process.
    forced: Mutex<Option<oneshot::Sender<CaptureExit>>>,
}

impl ScriptedBackend {
    fn new(fixture_secs: u32) -> Self {
        Self {
            installed: true,
            fixture_secs,
            spawns: AtomicUsize::new(0),
            forced: Mutex::new(None),
        }
    }

    fn not_installed() -> Self {
        Self {
            installed: false,
            ..Self::new(0)
        }
    }

    fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Make the fake process die on its own with the given exit.
    fn force_exit(&self, exit: CaptureExit) {
        let sender = self
            .forced
            .lock()
            .unwrap()
            .take()
            .expect("no capture running");
        let _ = sender.send(exit);
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    fn locate(&self) -> Result<PathBuf, CaptureError> {
        if self.installed {
            Ok(PathBuf::from("/usr/bin/rec"))
        } else {
            Err(CaptureError::ToolNotFound)
        }
    }

    async fn launch(
        &self,
        output: &Path,
        _max_duration: Duration,
    ) -> Result<CaptureHandle, CaptureError> {
        self.locate()?;
        self.spawns.fetch_add(1, Ordering::SeqCst);
        write_wav(output, self.fixture_secs);

        let (exit_tx, exit_rx) = oneshot::channel();
        let (term_tx, term_rx) = oneshot::channel::<()>();
        let (forced_tx, forced_rx) = oneshot::channel::<CaptureExit>();
        *self.forced.lock().unwrap() = Some(forced_tx);

        tokio::spawn(async move {
            let exit = tokio::select! {
                _ = term_rx => CaptureExit::Code(0),
                forced = forced_rx => forced.unwrap_or(CaptureExit::Signal),
            };
            let _ = exit_tx.send(exit);
        });

        Ok(CaptureHandle::from_parts(exit_rx, term_tx))
    }
}

/// Write `secs` seconds of 16 kHz mono 16-bit silence.
fn write_wav(path: &Path, secs: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(secs * 16_000) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn controller_with(
    backend: ScriptedBackend,
    dir: &Path,
) -> (Arc<ScriptedBackend>, SessionController) {
    let backend = Arc::new(backend);
    let store = RecordingStore::new(dir, MIN_FILE_BYTES);
    let controller = SessionController::new(
        Arc::clone(&backend) as Arc<dyn CaptureBackend>,
        store,
        MAX_DURATION,
    );
    (backend, controller)
}

#[tokio::test]
async fn missing_tool_fails_preflight_without_spawning() {
    let dir = TempDir::new().unwrap();
    let (backend, controller) = controller_with(ScriptedBackend::not_installed(), dir.path());

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, SessionError::ToolNotFound));
    assert_eq!(
        backend.spawn_count(),
        0,
        "nothing may be spawned when the tool is missing"
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert!(snapshot.last_error.unwrap().contains("not installed"));
}

#[tokio::test]
async fn second_start_is_rejected_and_leaves_the_first_running() {
    let dir = TempDir::new().unwrap();
    let (backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    let first = controller.start().await.unwrap();
    let err = controller.start().await.unwrap_err();

    assert!(matches!(err, SessionError::AlreadyRecording));
    assert_eq!(
        backend.spawn_count(),
        1,
        "second start must not spawn another process"
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Recording);
    assert_eq!(snapshot.file_path, Some(first));

    controller.shutdown().await;
}

#[tokio::test]
async fn stop_without_start_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    let err = controller.stop().await.unwrap_err();
    assert!(matches!(err, SessionError::NotRecording));
}

#[tokio::test(start_paused = true)]
async fn stop_after_three_seconds_returns_a_valid_file() {
    let dir = TempDir::new().unwrap();
    let (_backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    let path = controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let stopped = controller.stop().await.unwrap();
    assert_eq!(stopped, path);
    assert!(stopped.exists());

    let estimate = storage::estimate_duration(&stopped).unwrap();
    assert_eq!(estimate.seconds, 3);
    assert!(!estimate.approximate);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Stopped);

    // The display counter and the on-disk duration never diverge by more
    // than rounding error.
    let diff = (snapshot.elapsed_secs as i64 - estimate.seconds as i64).abs();
    assert!(
        diff <= 1,
        "elapsed {}s should be within 1s of the recorded {}s",
        snapshot.elapsed_secs,
        estimate.seconds
    );
}

#[tokio::test]
async fn failed_validation_keeps_the_file_on_disk() {
    let dir = TempDir::new().unwrap();
    // A zero-second fixture is a bare header, well under the size floor.
    let (_backend, controller) = controller_with(ScriptedBackend::new(0), dir.path());

    let path = controller.start().await.unwrap();
    let err = controller.stop().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::TooSmall { .. })
    ));
    assert!(path.exists(), "failed recordings stay on disk for inspection");
    assert_eq!(controller.snapshot().status, SessionStatus::Failed);

    // A fresh session may start after the failure.
    controller.start().await.unwrap();
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn abnormal_exit_fails_the_session_and_stops_the_ticker() {
    let dir = TempDir::new().unwrap();
    let (backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    backend.force_exit(CaptureExit::Code(1));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert!(snapshot.last_error.unwrap().contains("unexpectedly"));

    let frozen = snapshot.elapsed_secs;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        controller.snapshot().elapsed_secs,
        frozen,
        "no further ticks after an abnormal exit"
    );

    // The controller accepts a new session afterwards.
    controller.start().await.unwrap();
    assert_eq!(backend.spawn_count(), 2);
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn duration_cap_completes_the_session() {
    let dir = TempDir::new().unwrap();
    let (backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    let path = controller.start().await.unwrap();

    // The tool's own trim argument ran out: clean exit without a stop call.
    backend.force_exit(CaptureExit::Code(0));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    assert_eq!(snapshot.file_path, Some(path));
}

#[tokio::test(start_paused = true)]
async fn shutdown_kills_the_capture_and_clears_the_ticker() {
    let dir = TempDir::new().unwrap();
    let (_backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    controller.shutdown().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.elapsed_secs, 0);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        controller.snapshot().elapsed_secs,
        0,
        "no ticks after teardown"
    );
}

#[tokio::test]
async fn state_changes_are_published() {
    let dir = TempDir::new().unwrap();
    let (_backend, controller) = controller_with(ScriptedBackend::new(3), dir.path());

    let mut rx = controller.subscribe();
    assert_eq!(rx.borrow_and_update().status, SessionStatus::Idle);

    controller.start().await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status, SessionStatus::Recording);

    controller.stop().await.unwrap();
    // Intermediate states coalesce; the latest value is Stopped.
    assert_eq!(rx.borrow_and_update().status, SessionStatus::Stopped);
}
