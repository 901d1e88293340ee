use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const RECORDING_PREFIX: &str = "recording-";
pub const RECORDING_EXT: &str = "wav";

/// Owns the flat recordings directory: path generation, listing and
/// best-effort retention. There is no index file; the directory listing is
/// the index.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    directory: PathBuf,
    min_file_bytes: u64,
}

impl RecordingStore {
    pub fn new(directory: impl Into<PathBuf>, min_file_bytes: u64) -> Self {
        Self {
            directory: directory.into(),
            min_file_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Smallest file size considered a plausible recording.
    pub fn min_file_bytes(&self) -> u64 {
        self.min_file_bytes
    }

    /// Create the recordings directory if absent. Idempotent.
    pub fn ensure_directory(&self) -> io::Result<()> {
        fs::create_dir_all(&self.directory)
    }

    /// Output path for a capture starting now.
    ///
    /// Uniqueness relies on second-level timestamp resolution; two captures
    /// started within the same wall-clock second collide. That is an accepted
    /// limitation, not masked here.
    pub fn next_recording_path(&self) -> PathBuf {
        self.recording_path_at(Utc::now())
    }

    /// Output path for a capture starting at `at`. Colons and fractional
    /// seconds are kept out of the name so it is legal on common filesystems.
    pub fn recording_path_at(&self, at: DateTime<Utc>) -> PathBuf {
        let stamp = at.format("%Y-%m-%dT%H-%M-%SZ");
        self.directory
            .join(format!("{RECORDING_PREFIX}{stamp}.{RECORDING_EXT}"))
    }

    /// All recordings in the directory, sorted by name (which is timestamp
    /// order). A missing directory lists as empty.
    pub fn list_recordings(&self) -> io::Result<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut recordings: Vec<PathBuf> = fs::read_dir(&self.directory)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_recording(path))
            .collect();

        recordings.sort();
        Ok(recordings)
    }

    /// Delete recordings whose modification time is older than `max_age`.
    ///
    /// Best-effort cleanup: per-file failures are logged and skipped, never
    /// propagated. Returns the number of files deleted.
    pub fn prune_older_than(&self, max_age: Duration) -> io::Result<usize> {
        let recordings = self.list_recordings()?;
        if recordings.is_empty() {
            debug!("no recordings found, skipping prune");
            return Ok(0);
        }

        let mut deleted = 0;
        for path in recordings {
            let age = match file_age(&path) {
                Some(age) => age,
                None => {
                    warn!("could not read mtime for {}, skipping", path.display());
                    continue;
                }
            };

            if age <= max_age {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    debug!("pruned recording: {}", path.display());
                }
                Err(e) => {
                    warn!("failed to delete {}: {}", path.display(), e);
                }
            }
        }

        if deleted > 0 {
            info!("prune complete: deleted {} recordings", deleted);
        }
        Ok(deleted)
    }
}

fn is_recording(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(RECORDING_PREFIX)
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORDING_EXT))
}

/// Age of a file since its last modification; None when the metadata is
/// unreadable or the mtime sits in the future.
fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    match modified.elapsed() {
        Ok(age) => Some(age),
        // Clock skew put the mtime ahead of now; treat as just-modified.
        Err(_) => Some(Duration::ZERO),
    }
}
