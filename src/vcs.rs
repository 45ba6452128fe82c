//! Working-tree cleanliness checks.
//!
//! A directory candidate is only eligible when `git status --porcelain` run
//! inside it reports nothing. The status query is run with the directory as
//! the child's working directory; the sweeper's own working directory is
//! never changed.

use std::path::Path;
use std::process::Command;

/// Outcome of a cleanliness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsStatus {
    /// Not a directory; cleanliness does not apply
    NotApplicable,
    /// Working tree with no modified, added or untracked entries
    Clean,
    /// Working tree with pending changes
    Dirty,
    /// Status could not be determined (not a repository, git missing, permission)
    Unknown(String),
}

impl VcsStatus {
    /// Whether this status prevents the candidate from being moved.
    /// Unknown state is never treated as safe.
    pub fn blocks_removal(&self) -> bool {
        matches!(self, Self::Dirty | Self::Unknown(_))
    }
}

/// Something that can report the working-tree status of a directory
pub trait StatusChecker {
    fn status(&self, dir: &Path) -> VcsStatus;
}

/// Runs `git status --porcelain` in the candidate directory
#[derive(Debug, Clone)]
pub struct GitStatusChecker {
    program: String,
}

impl Default for GitStatusChecker {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl StatusChecker for GitStatusChecker {
    fn status(&self, dir: &Path) -> VcsStatus {
        let output = Command::new(&self.program)
            .arg("status")
            .arg("--porcelain")
            .current_dir(dir)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.trim().is_empty() {
                    VcsStatus::Clean
                } else {
                    VcsStatus::Dirty
                }
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = stderr.lines().next().unwrap_or("").trim();
                if reason.is_empty() {
                    VcsStatus::Unknown(format!("git status exited with {}", output.status))
                } else {
                    VcsStatus::Unknown(reason.to_string())
                }
            }
            Err(err) => VcsStatus::Unknown(err.to_string()),
        }
    }
}

/// Cleanliness of a candidate: directories are checked, everything else is
/// not applicable.
pub fn check_candidate(checker: &dyn StatusChecker, path: &Path, is_dir: bool) -> VcsStatus {
    if !is_dir {
        return VcsStatus::NotApplicable;
    }
    checker.status(path)
}
