/// Best-score persistence.
///
/// ## File format:
///   Key-value lines, `best=<n>`. Unknown keys are ignored.
///
/// Stored as `best.dat` in the save directory: the executable's directory
/// when writable, otherwise `~/.local/share/pinch2048`, otherwise the CWD.
/// A missing or unreadable file reads as a best score of 0.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const BEST_FILE: &str = "best.dat";

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("could not write best score to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the best score lives between sessions.
pub trait BestScoreStore {
    fn load(&self) -> u32;
    fn store(&mut self, best: u32) -> Result<(), SaveError>;
}

pub struct FileScoreStore {
    path: PathBuf,
}

impl FileScoreStore {
    pub fn new(path: PathBuf) -> Self {
        FileScoreStore { path }
    }

    /// Store in the default save directory.
    pub fn in_save_dir() -> Self {
        FileScoreStore::new(save_dir().join(BEST_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BestScoreStore for FileScoreStore {
    fn load(&self) -> u32 {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_best(&content).unwrap_or_else(|| {
                warn!("ignoring malformed {}", self.path.display());
                0
            }),
            Err(e) => {
                debug!("no best score at {} ({e})", self.path.display());
                0
            }
        }
    }

    fn store(&mut self, best: u32) -> Result<(), SaveError> {
        std::fs::write(&self.path, serialize(best))
            .map_err(|source| SaveError::Write { path: self.path.clone(), source })
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryScoreStore {
    pub best: u32,
}

#[cfg(test)]
impl BestScoreStore for MemoryScoreStore {
    fn load(&self) -> u32 {
        self.best
    }

    fn store(&mut self, best: u32) -> Result<(), SaveError> {
        self.best = best;
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

fn save_dir() -> PathBuf {
    // 1. Try exe directory (works for local/portable installs)
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks to save next to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // Check if writable (system installs won't be)
            let test_path = parent.join(".write_test_pinch2048");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home (~/.local/share/pinch2048)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/pinch2048");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn serialize(best: u32) -> String {
    format!("best={}\n", best)
}

fn parse_best(content: &str) -> Option<u32> {
    content.lines()
        .find_map(|line| line.trim().strip_prefix("best="))
        .and_then(|v| v.trim().parse().ok())
}
