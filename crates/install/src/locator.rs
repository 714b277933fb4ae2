//! Find the package root inside an extracted archive

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// How many bytes of a candidate file are inspected
pub const HEADER_SCAN_BYTES: usize = 8 * 1024;

/// Deepest directory level searched below the extraction root
pub const MAX_DEPTH: usize = 2;

/// Recognizes the manifest file that marks a package root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSignature {
    /// File extension of candidate files, compared case-insensitively
    pub extension: String,
    /// Header marker; it must be followed by a non-blank value
    pub marker: String,
}

impl Default for ManifestSignature {
    fn default() -> Self {
        Self {
            extension: "php".to_string(),
            marker: "Plugin Name:".to_string(),
        }
    }
}

impl ManifestSignature {
    fn is_candidate(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// Whether `header` carries the marker followed by a value
    #[must_use]
    pub fn matches(&self, header: &[u8]) -> bool {
        let text = String::from_utf8_lossy(header).to_ascii_lowercase();
        let marker = self.marker.to_ascii_lowercase();
        text.find(&marker)
            .is_some_and(|at| text[at + marker.len()..].chars().any(|c| !c.is_whitespace()))
    }

    fn file_matches(&self, path: &Path) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        let mut header = Vec::with_capacity(HEADER_SCAN_BYTES);
        if file
            .take(HEADER_SCAN_BYTES as u64)
            .read_to_end(&mut header)
            .is_err()
        {
            return false;
        }
        self.matches(&header)
    }
}

/// Locate the package root below `extracted`.
///
/// Levels are searched shallowest first, siblings in name order, down to
/// [`MAX_DEPTH`]. The first directory holding a file that matches
/// `signature` is returned. Symbolic links are never followed.
#[must_use]
pub fn locate_root(extracted: &Path, signature: &ManifestSignature) -> Option<PathBuf> {
    let mut level = vec![extracted.to_path_buf()];

    for depth in 0..=MAX_DEPTH {
        let mut next = Vec::new();
        for dir in &level {
            let (files, dirs) = sorted_children(dir);
            if files
                .iter()
                .any(|f| signature.is_candidate(f) && signature.file_matches(f))
            {
                return Some(dir.clone());
            }
            if depth < MAX_DEPTH {
                next.extend(dirs);
            }
        }
        level = next;
    }
    None
}

fn sorted_children(dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return (files, dirs);
    };
    for entry in entries.flatten() {
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        if kind.is_dir() {
            dirs.push(entry.path());
        } else if kind.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();
    (files, dirs)
}
