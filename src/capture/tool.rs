use std::env;
use std::path::{Path, PathBuf};

/// Well-known install locations checked before falling back to PATH.
const TOOL_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/usr/bin",
    "/opt/local/bin",
];

/// Candidate binary names in preference order. `rec` is the SoX front end
/// that records from the default input device; plain `sox` needs `-d`.
const TOOL_NAMES: &[&str] = &["rec", "sox"];

/// Find the capture executable.
///
/// A configured override short-circuits the search (and must point at an
/// existing file). Otherwise the well-known directories are scanned in order,
/// then each entry of PATH. Pure lookup; the result is not cached.
pub fn locate_capture_tool(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return path.is_file().then(|| path.to_path_buf());
    }

    for dir in TOOL_DIRS {
        for name in TOOL_NAMES {
            let candidate = Path::new(dir).join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        for name in TOOL_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn override_must_exist() {
        let missing = Path::new("/definitely/not/a/real/capture/tool");
        assert_eq!(locate_capture_tool(Some(missing)), None);
    }

    #[test]
    fn override_hit_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("rec");
        fs::write(&tool, b"#!/bin/sh\n").unwrap();

        assert_eq!(locate_capture_tool(Some(&tool)), Some(tool));
    }
}
