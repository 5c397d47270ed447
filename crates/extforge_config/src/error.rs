//! Errors raised while reading `extforge.toml` and turning it into a target.

use extforge_core::BuildError;

/// Failure to load, validate or resolve a project file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The project file could not be read.
    #[error("cannot read project file: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed TOML, a wrong value type, or an unknown table key.
    #[error("invalid project file: {0}")]
    ParseError(String),

    /// A mandatory key is absent.
    #[error("`{0}` is required")]
    MissingField(String),

    /// A value parsed but is out of range or malformed.
    #[error("bad value: {0}")]
    ValidationError(String),

    /// The resolved target was rejected by `BuildTarget::new`.
    #[error(transparent)]
    Target(#[from] BuildError),
}
