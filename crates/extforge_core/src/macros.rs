//! Preprocessor macro definitions and effective macro resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::platform::PlatformProfile;
use crate::source::SourceType;

/// A single preprocessor macro instruction passed to a compiler or assembler.
///
/// Collections of macros are ordered and may contain duplicates. The
/// orchestrator never deduplicates them; the toolchain observes the last
/// writer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroDef {
    /// `-DNAME` or `-DNAME=VALUE`.
    Define {
        /// Macro name.
        name: String,
        /// Optional replacement value.
        value: Option<String>,
    },
    /// `-UNAME`.
    Undefine {
        /// Macro name.
        name: String,
    },
}

impl MacroDef {
    /// Creates a valueless definition (`-DNAME`).
    pub fn flag(name: impl Into<String>) -> Self {
        Self::Define {
            name: name.into(),
            value: None,
        }
    }

    /// Creates a definition with a value (`-DNAME=VALUE`).
    pub fn define(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Creates an undefine marker (`-UNAME`).
    pub fn undef(name: impl Into<String>) -> Self {
        Self::Undefine { name: name.into() }
    }

    /// Returns the macro name.
    pub fn name(&self) -> &str {
        match self {
            Self::Define { name, .. } | Self::Undefine { name } => name,
        }
    }
}

impl fmt::Display for MacroDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Define { name, value: None } => write!(f, "{name}"),
            Self::Define {
                name,
                value: Some(value),
            } => write!(f, "{name}={value}"),
            Self::Undefine { name } => write!(f, "-U{name}"),
        }
    }
}

/// Parses `NAME`, `NAME=VALUE`, `-UNAME` or `!NAME`.
impl FromStr for MacroDef {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let undef = s.strip_prefix("-U").or_else(|| s.strip_prefix('!'));
        if let Some(name) = undef {
            let name = name.trim();
            validate_name(name, s)?;
            return Ok(Self::undef(name));
        }

        let s = s.strip_prefix("-D").unwrap_or(s);
        match s.split_once('=') {
            Some((name, value)) => {
                let name = name.trim();
                validate_name(name, s)?;
                Ok(Self::define(name, value))
            }
            None => {
                validate_name(s, s)?;
                Ok(Self::flag(s))
            }
        }
    }
}

fn validate_name(name: &str, original: &str) -> Result<(), BuildError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(BuildError::config(format!(
            "invalid macro definition '{original}'"
        )));
    }
    Ok(())
}

/// Computes the effective macro list for one source file.
///
/// The result is the ordered concatenation of the global macros, the
/// platform's base macros, the platform's type-specific macros for
/// `source_type`, and the file's own overrides. Later entries never erase
/// earlier ones. [`SourceType::Other`] sources get no type-specific macros.
pub fn effective_macros(
    global: &[MacroDef],
    profile: &PlatformProfile,
    source_type: SourceType,
    per_file: &[MacroDef],
) -> Vec<MacroDef> {
    let type_macros = profile.type_macros.for_type(source_type);
    let mut out =
        Vec::with_capacity(global.len() + profile.macros.len() + type_macros.len() + per_file.len());
    out.extend_from_slice(global);
    out.extend_from_slice(&profile.macros);
    out.extend_from_slice(type_macros);
    out.extend_from_slice(per_file);
    out
}
