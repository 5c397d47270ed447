//! The toolchain capability used by the drivers.
//!
//! Drivers build requests and hand them to a [`Toolchain`]; they never spawn
//! processes themselves. [`ProcessToolchain`] is the real implementation,
//! invoking GNU-style or MSVC compilers, NASM, and the matching linker. Tests
//! substitute an in-memory fake.

pub mod command;
mod process;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};
use crate::link::LinkLanguage;
use crate::macros::MacroDef;
use crate::platform::PlatformKey;
use crate::source::{SourceFile, SourceType};
use crate::target::BuildTarget;

use process::ProcessFailure;

/// One compiler invocation: a single source to a single object.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// The source to compile.
    pub source: &'a SourceFile,
    /// Where the object file must be written.
    pub object: &'a Path,
    /// Include search paths.
    pub include_dirs: &'a [PathBuf],
    /// Effective macros, in order.
    pub macros: &'a [MacroDef],
    /// Extra arguments appended after the source and output.
    pub args: &'a [String],
    /// Emit debug symbols.
    pub debug: bool,
}

/// One assembler invocation.
#[derive(Debug, Clone, Copy)]
pub struct AssembleRequest<'a> {
    /// The assembly source.
    pub source: &'a SourceFile,
    /// Where the object file must be written.
    pub object: &'a Path,
    /// Assembler include search paths.
    pub include_dirs: &'a [PathBuf],
    /// Effective macros, in order.
    pub macros: &'a [MacroDef],
    /// Extra assembler arguments.
    pub args: &'a [String],
    /// Object format, e.g. `elf64` or `win32`.
    pub format: &'a str,
}

/// The final shared-library link.
#[derive(Debug, Clone, Copy)]
pub struct LinkRequest<'a> {
    /// Objects in link order.
    pub objects: &'a [PathBuf],
    /// Where the linker must write its output.
    pub output: &'a Path,
    /// Final artifact path `output` is renamed to; names the install name
    /// on darwin and the import library under MSVC.
    pub artifact: &'a Path,
    /// Libraries (bare names).
    pub libraries: &'a [String],
    /// Library search directories.
    pub library_dirs: &'a [PathBuf],
    /// Runtime library search directories.
    pub runtime_library_dirs: &'a [PathBuf],
    /// Extra linker arguments.
    pub args: &'a [String],
    /// Language selecting the link front-end.
    pub language: LinkLanguage,
    /// Platform the artifact targets.
    pub platform: PlatformKey,
    /// Emit debug symbols.
    pub debug: bool,
}

/// A compiler/assembler/linker suite.
///
/// Implementations must be shareable across threads: parallel builds call
/// `compile` and `assemble` concurrently for distinct objects.
pub trait Toolchain: Sync {
    /// Compiles one C, C++, Objective-C or unclassified source. Returns the
    /// object path.
    fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<PathBuf>;

    /// Assembles one assembly source. Returns the object path.
    fn assemble(&self, request: &AssembleRequest<'_>) -> BuildResult<PathBuf>;

    /// Links objects into a shared library. Returns the output path.
    fn link(&self, request: &LinkRequest<'_>) -> BuildResult<PathBuf>;

    /// Rejects a target this toolchain cannot build. Called before any
    /// `compile`, `assemble` or `link`.
    fn validate(&self, _target: &BuildTarget) -> BuildResult<()> {
        Ok(())
    }
}

/// Command-line convention of a compiler family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainFlavor {
    /// gcc/clang style (`-c`, `-o`, `-I`, `-D`).
    Gnu,
    /// Microsoft `cl.exe`/`link.exe` style.
    Msvc,
}

impl ToolchainFlavor {
    /// The default flavor for a platform.
    pub fn for_platform(key: PlatformKey) -> Self {
        match key {
            PlatformKey::Win32 => Self::Msvc,
            PlatformKey::Darwin | PlatformKey::Posix => Self::Gnu,
        }
    }
}

impl FromStr for ToolchainFlavor {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gnu" => Ok(Self::Gnu),
            "msvc" => Ok(Self::Msvc),
            other => Err(BuildError::config(format!(
                "unknown toolchain flavor '{other}' (expected gnu or msvc)"
            ))),
        }
    }
}

/// Executable names or paths for each tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPrograms {
    /// C compiler (also used for unclassified sources).
    pub cc: String,
    /// C++ compiler.
    pub cxx: String,
    /// Objective-C compiler.
    pub objc: String,
    /// Assembler.
    pub asm: String,
    /// Standalone linker (MSVC only; GNU links through `cc`/`cxx`).
    pub linker: String,
}

impl ToolPrograms {
    /// Default executables for a flavor.
    pub fn defaults(flavor: ToolchainFlavor) -> Self {
        match flavor {
            ToolchainFlavor::Gnu => Self {
                cc: "cc".to_string(),
                cxx: "c++".to_string(),
                objc: "cc".to_string(),
                asm: "nasm".to_string(),
                linker: "cc".to_string(),
            },
            ToolchainFlavor::Msvc => Self {
                cc: "cl.exe".to_string(),
                cxx: "cl.exe".to_string(),
                objc: "cl.exe".to_string(),
                asm: "nasm".to_string(),
                linker: "link.exe".to_string(),
            },
        }
    }

    fn compiler_for(&self, kind: SourceType) -> &str {
        match kind {
            SourceType::Cpp => &self.cxx,
            SourceType::ObjC => &self.objc,
            SourceType::Asm => &self.asm,
            SourceType::C | SourceType::Other => &self.cc,
        }
    }
}

/// A toolchain that runs real executables, one blocking process at a time
/// per calling thread.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    flavor: ToolchainFlavor,
    programs: ToolPrograms,
    timeout: Option<Duration>,
}

impl ProcessToolchain {
    /// Creates a toolchain with explicit settings.
    pub fn new(flavor: ToolchainFlavor, programs: ToolPrograms) -> Self {
        Self {
            flavor,
            programs,
            timeout: None,
        }
    }

    /// The default toolchain for a platform.
    pub fn for_platform(key: PlatformKey) -> Self {
        let flavor = ToolchainFlavor::for_platform(key);
        Self::new(flavor, ToolPrograms::defaults(flavor))
    }

    /// Kills any single toolchain process that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command-line flavor.
    pub fn flavor(&self) -> ToolchainFlavor {
        self.flavor
    }

    /// The configured executables.
    pub fn programs(&self) -> &ToolPrograms {
        &self.programs
    }

    fn spawn(&self, program: &str, args: &[OsString], subject: &Path) -> Result<(), Failure> {
        process::run(program, args, self.timeout).map_err(|failure| match failure {
            ProcessFailure::Launch(source) => Failure::Fatal(BuildError::ProcessLaunch {
                program: program.to_string(),
                source,
            }),
            ProcessFailure::Timeout(after) => Failure::Fatal(BuildError::Timeout {
                program: program.to_string(),
                path: subject.to_path_buf(),
                after,
            }),
            ProcessFailure::Exit(status) => Failure::Exit(status),
        })
    }
}

fn unsupported_by_msvc(source: &SourceFile) -> BuildError {
    BuildError::config(format!(
        "{} sources are not supported by the MSVC toolchain ({})",
        source.kind(),
        source.path().display()
    ))
}

/// Intermediate failure: either already a final error, or an exit status
/// that the caller turns into a compile or link error.
enum Failure {
    Fatal(BuildError),
    Exit(String),
}

impl Toolchain for ProcessToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<PathBuf> {
        let kind = request.source.kind();
        let program = self.programs.compiler_for(kind);
        let args = match self.flavor {
            ToolchainFlavor::Gnu => command::gnu_compile(request),
            ToolchainFlavor::Msvc => {
                command::msvc_compile(request).ok_or_else(|| unsupported_by_msvc(request.source))?
            }
        };
        let source = request.source.path();
        match self.spawn(program, &args, source) {
            Ok(()) => Ok(request.object.to_path_buf()),
            Err(Failure::Fatal(err)) => Err(err),
            Err(Failure::Exit(status)) => Err(BuildError::Compile {
                path: source.to_path_buf(),
                tool: program.to_string(),
                status,
            }),
        }
    }

    fn assemble(&self, request: &AssembleRequest<'_>) -> BuildResult<PathBuf> {
        let program = &self.programs.asm;
        let args = command::nasm_assemble(request);
        let source = request.source.path();
        match self.spawn(program, &args, source) {
            Ok(()) => Ok(request.object.to_path_buf()),
            Err(Failure::Fatal(err)) => Err(err),
            Err(Failure::Exit(status)) => Err(BuildError::Compile {
                path: source.to_path_buf(),
                tool: program.to_string(),
                status,
            }),
        }
    }

    fn validate(&self, target: &BuildTarget) -> BuildResult<()> {
        if self.flavor == ToolchainFlavor::Msvc {
            if let Some(source) = target.buckets().objc.first() {
                return Err(unsupported_by_msvc(source));
            }
        }
        Ok(())
    }

    fn link(&self, request: &LinkRequest<'_>) -> BuildResult<PathBuf> {
        let (program, args) = match self.flavor {
            ToolchainFlavor::Gnu => (
                command::gnu_link_driver(request.language, &self.programs.cc, &self.programs.cxx),
                command::gnu_link(request),
            ),
            ToolchainFlavor::Msvc => {
                if !request.runtime_library_dirs.is_empty() {
                    log::warn!("runtime library directories are not supported by link.exe; ignoring");
                }
                (self.programs.linker.as_str(), command::msvc_link(request))
            }
        };
        match self.spawn(program, &args, request.output) {
            Ok(()) => Ok(request.output.to_path_buf()),
            Err(Failure::Fatal(err)) => Err(err),
            Err(Failure::Exit(status)) => Err(BuildError::Link {
                artifact: request.output.to_path_buf(),
                tool: program.to_string(),
                status,
            }),
        }
    }
}
