//! Timestamp-based rebuild decision.
//!
//! The check is all-or-nothing: either the artifact is newer than every
//! source and declared dependency and the whole build is skipped, or the
//! whole build runs. Flag and macro changes are invisible here; see
//! [`crate::fingerprint`] for the opt-in check that covers them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Why a rebuild is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// A forced rebuild was requested.
    Forced,
    /// The artifact does not exist.
    ArtifactMissing,
    /// A source or dependency does not exist.
    DependencyMissing(PathBuf),
    /// A source or dependency is at least as new as the artifact.
    DependencyNewer(PathBuf),
    /// The recorded flag fingerprint differs from the current one.
    FlagsChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => f.write_str("forced rebuild"),
            Self::ArtifactMissing => f.write_str("artifact does not exist"),
            Self::DependencyMissing(p) => write!(f, "{} does not exist", p.display()),
            Self::DependencyNewer(p) => write!(f, "{} is newer than the artifact", p.display()),
            Self::FlagsChanged => f.write_str("compile or link settings changed"),
        }
    }
}

/// The binary rebuild decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// The artifact is newer than every input; nothing to do.
    Fresh,
    /// A rebuild is required.
    Stale(StaleReason),
}

impl Staleness {
    /// Returns `true` if a rebuild is required.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Decides whether `artifact` must be rebuilt from `dependencies`.
///
/// Stale if `force` is set, if the artifact is missing, if any dependency is
/// missing, or if any dependency's modification time is not strictly older
/// than the artifact's. Dependencies are checked in order and the first
/// offending one is reported.
pub fn check_staleness(dependencies: &[&Path], artifact: &Path, force: bool) -> Staleness {
    if force {
        return Staleness::Stale(StaleReason::Forced);
    }
    let Some(artifact_time) = modified(artifact) else {
        return Staleness::Stale(StaleReason::ArtifactMissing);
    };
    for dep in dependencies {
        match modified(dep) {
            None => return Staleness::Stale(StaleReason::DependencyMissing(dep.to_path_buf())),
            Some(t) if t >= artifact_time => {
                return Staleness::Stale(StaleReason::DependencyNewer(dep.to_path_buf()));
            }
            Some(_) => {}
        }
    }
    Staleness::Fresh
}
