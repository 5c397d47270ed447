//! Error types for build orchestration.

use std::path::PathBuf;
use std::time::Duration;

/// Result alias used throughout the build pipeline.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that terminate a build invocation.
///
/// Every error is fail-fast: the build stops at the stage where it occurred
/// and no artifact is produced. Compile and assemble failures carry the
/// offending source path, link failures carry the artifact path.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The build target is malformed. Detected before any toolchain runs.
    #[error("invalid build configuration: {0}")]
    Configuration(String),

    /// A compiler or assembler exited with a non-zero status.
    #[error("compilation of {path} failed ({tool} exited with {status})")]
    Compile {
        /// The source file that failed to compile.
        path: PathBuf,
        /// The executable that was invoked.
        tool: String,
        /// Human-readable exit status.
        status: String,
    },

    /// The linker exited with a non-zero status.
    #[error("linking {artifact} failed ({tool} exited with {status})")]
    Link {
        /// The artifact that was being produced.
        artifact: PathBuf,
        /// The executable that was invoked.
        tool: String,
        /// Human-readable exit status.
        status: String,
    },

    /// A toolchain executable could not be found or started.
    #[error("could not launch `{program}`: {source} (is the toolchain installed?)")]
    ProcessLaunch {
        /// The executable that could not be started.
        program: String,
        /// The underlying launch error.
        source: std::io::Error,
    },

    /// A toolchain process ran longer than the configured limit and was killed.
    #[error("`{program}` timed out after {after:?} while processing {path}")]
    Timeout {
        /// The executable that was killed.
        program: String,
        /// The source or artifact being processed.
        path: PathBuf,
        /// The limit that was exceeded.
        after: Duration,
    },

    /// A filesystem operation performed by the orchestrator failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The worker pool for parallel compilation could not be created.
    #[error("failed to start compile workers: {0}")]
    WorkerPool(String),
}

impl BuildError {
    /// Creates a configuration error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the source or artifact path this error is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Compile { path, .. } | Self::Timeout { path, .. } | Self::Io { path, .. } => {
                Some(path)
            }
            Self::Link { artifact, .. } => Some(artifact),
            Self::Configuration(_) | Self::ProcessLaunch { .. } | Self::WorkerPool(_) => None,
        }
    }
}
