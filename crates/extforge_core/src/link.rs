//! Link stage: objects to one shared library.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compile::CompiledObject;
use crate::error::{BuildError, BuildResult};
use crate::source::Buckets;
use crate::target::BuildTarget;
use crate::toolchain::{LinkRequest, Toolchain};

/// Language whose link semantics (runtime libraries, driver) are used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkLanguage {
    /// Plain C.
    #[serde(rename = "c")]
    C,
    /// Objective-C.
    #[serde(rename = "objc")]
    ObjC,
    /// C++; pulls in the C++ runtime.
    #[serde(rename = "c++", alias = "cpp")]
    Cpp,
}

impl LinkLanguage {
    /// Picks the highest-level language present: C++, then Objective-C,
    /// then C.
    pub fn detect(buckets: &Buckets) -> Self {
        if !buckets.cpp.is_empty() {
            Self::Cpp
        } else if !buckets.objc.is_empty() {
            Self::ObjC
        } else {
            Self::C
        }
    }

    /// Configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::ObjC => "objc",
            Self::Cpp => "c++",
        }
    }
}

impl fmt::Display for LinkLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkLanguage {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Self::C),
            "objc" | "objective-c" => Ok(Self::ObjC),
            "c++" | "cpp" | "cxx" => Ok(Self::Cpp),
            other => Err(BuildError::config(format!(
                "unknown link language '{other}' (expected c, c++ or objc)"
            ))),
        }
    }
}

/// The language a target links with: its override, or the detected one.
pub fn link_language(target: &BuildTarget) -> LinkLanguage {
    target
        .language()
        .unwrap_or_else(|| LinkLanguage::detect(&target.buckets()))
}

/// Temporary path the linker writes to before the artifact is moved into
/// place: `<dir>/.<file>.partial`.
pub fn partial_path(output: &Path) -> PathBuf {
    let file = output
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{file}.partial"))
}

/// Links compiled objects into the target's artifact.
pub struct LinkDriver<'a> {
    toolchain: &'a dyn Toolchain,
    debug: bool,
}

impl<'a> LinkDriver<'a> {
    /// Creates a driver over `toolchain`.
    pub fn new(toolchain: &'a dyn Toolchain, debug: bool) -> Self {
        Self { toolchain, debug }
    }

    /// Objects in link order: compiled objects, then the target's extra
    /// objects.
    pub fn link_objects(target: &BuildTarget, objects: &[CompiledObject]) -> Vec<PathBuf> {
        objects
            .iter()
            .map(|o| o.path.clone())
            .chain(target.extra_objects().iter().cloned())
            .collect()
    }

    /// Invokes the linker and moves its output to the target's artifact path.
    ///
    /// On failure the partial output is removed; an existing artifact from a
    /// previous build is left as it was.
    pub fn run(&self, target: &BuildTarget, objects: &[CompiledObject]) -> BuildResult<PathBuf> {
        let output = target.output();
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        }

        let partial = partial_path(output);
        let link_objects = Self::link_objects(target, objects);
        let libraries = target.libraries();
        let args = target.link_args();
        let request = LinkRequest {
            objects: &link_objects,
            output: &partial,
            artifact: output,
            libraries: &libraries,
            library_dirs: target.library_dirs(),
            runtime_library_dirs: target.runtime_library_dirs(),
            args: &args,
            language: link_language(target),
            platform: target.profile().key,
            debug: self.debug,
        };

        log::info!(
            "linking {} objects into {}",
            link_objects.len(),
            output.display()
        );
        match self.toolchain.link(&request) {
            Ok(_) => {
                std::fs::rename(&partial, output).map_err(|e| BuildError::io(output, e))?;
                Ok(output.to_path_buf())
            }
            Err(err) => {
                // Nothing to remove if the linker never created the file.
                let _ = std::fs::remove_file(&partial);
                Err(err)
            }
        }
    }
}
