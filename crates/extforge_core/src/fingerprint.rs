//! Opt-in record of the resolved compile and link settings.
//!
//! Timestamps alone cannot see a changed macro or flag. When flag tracking
//! is enabled, an XXH3-128 hash of every resolved invocation setting is
//! stored next to the objects after a successful build, and a mismatch on
//! the next run forces a rebuild.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};
use crate::link::{link_language, LinkLanguage};
use crate::macros::{effective_macros, MacroDef};
use crate::platform::{Arch, PlatformKey};
use crate::target::BuildTarget;

/// Hash of a target's resolved settings, as 32 hex digits.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    hash: String,
}

#[derive(Serialize)]
struct SourceSettings<'a> {
    path: &'a Path,
    macros: Vec<MacroDef>,
    args: Vec<String>,
}

#[derive(Serialize)]
struct Settings<'a> {
    name: &'a str,
    platform: PlatformKey,
    arch: Arch,
    asm_format: &'static str,
    sources: Vec<SourceSettings<'a>>,
    include_dirs: &'a [PathBuf],
    asm_include_dirs: &'a [PathBuf],
    extra_objects: &'a [PathBuf],
    libraries: Vec<String>,
    library_dirs: &'a [PathBuf],
    runtime_library_dirs: &'a [PathBuf],
    link_args: Vec<String>,
    language: LinkLanguage,
    debug: bool,
}

impl Fingerprint {
    /// Hashes everything that shapes the toolchain invocations for `target`.
    pub fn compute(target: &BuildTarget, debug: bool) -> BuildResult<Self> {
        let profile = target.profile();
        let sources = target
            .sources()
            .iter()
            .map(|s| SourceSettings {
                path: s.path(),
                macros: effective_macros(
                    target.macros(),
                    profile,
                    s.kind(),
                    target.file_macros(s.path()),
                ),
                args: target.compile_args_for(s.kind()),
            })
            .collect();
        let settings = Settings {
            name: target.name(),
            platform: profile.key,
            arch: profile.arch,
            asm_format: profile.asm_format(),
            sources,
            include_dirs: target.include_dirs(),
            asm_include_dirs: target.asm_include_dirs(),
            extra_objects: target.extra_objects(),
            libraries: target.libraries(),
            library_dirs: target.library_dirs(),
            runtime_library_dirs: target.runtime_library_dirs(),
            link_args: target.link_args(),
            language: link_language(target),
            debug,
        };
        let bytes = serde_json::to_vec(&settings)
            .map_err(|e| BuildError::config(format!("cannot fingerprint build settings: {e}")))?;
        let hash = xxhash_rust::xxh3::xxh3_128(&bytes);
        Ok(Self {
            hash: format!("{hash:032x}"),
        })
    }

    /// Where the fingerprint for an extension is recorded.
    pub fn record_path(build_temp: &Path, name: &str) -> PathBuf {
        build_temp.join(format!("{name}.fingerprint.json"))
    }

    /// Reads a recorded fingerprint. A missing or unreadable record yields
    /// `None`, which callers treat as "settings unknown".
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(fp) => Some(fp),
            Err(e) => {
                log::warn!("ignoring corrupt fingerprint {}: {e}", path.display());
                None
            }
        }
    }

    /// Records the fingerprint, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> BuildResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::config(format!("cannot encode fingerprint: {e}")))?;
        std::fs::write(path, json).map_err(|e| BuildError::io(path, e))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}..)", &self.hash[..self.hash.len().min(8)])
    }
}
