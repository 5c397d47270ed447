//! Static per-platform toolchain tables.
//!
//! A [`PlatformProfile`] carries everything that varies by operating system
//! and architecture: base macros, per-type compile flags, assembler object
//! format, link libraries and the artifact naming convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::macros::MacroDef;
use crate::source::SourceType;

/// The closed set of supported target platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKey {
    /// macOS.
    Darwin,
    /// Linux and other unix systems.
    Posix,
    /// Windows with the MSVC toolchain.
    Win32,
}

impl PlatformKey {
    /// All recognized platform keys.
    pub const ALL: [PlatformKey; 3] = [Self::Darwin, Self::Posix, Self::Win32];

    /// Detects the platform of the running host.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(windows) {
            Self::Win32
        } else {
            Self::Posix
        }
    }

    /// The canonical lowercase key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Posix => "posix",
            Self::Win32 => "win32",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKey {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "darwin" => Ok(Self::Darwin),
            "posix" => Ok(Self::Posix),
            "win32" => Ok(Self::Win32),
            other => Err(BuildError::config(format!(
                "unknown platform '{other}' (expected darwin, posix or win32)"
            ))),
        }
    }
}

/// Target architecture. Selects the assembler object format and the
/// architecture-specific source lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
    /// 32-bit x86.
    #[serde(rename = "x86")]
    X86,
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Arch {
    /// All supported architectures.
    pub const ALL: [Arch; 2] = [Self::X86, Self::X86_64];

    /// Detects the architecture of the running host from its pointer width.
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::X86_64
        } else {
            Self::X86
        }
    }

    /// The canonical key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }

    /// Returns `true` for 64-bit architectures.
    pub fn is_64bit(self) -> bool {
        matches!(self, Self::X86_64)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86" | "i386" | "i686" => Ok(Self::X86),
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            other => Err(BuildError::config(format!(
                "unknown architecture '{other}' (expected x86 or x86_64)"
            ))),
        }
    }
}

/// Extra compiler arguments, split by source type.
///
/// `generic` applies to every compiled source (including [`SourceType::Other`])
/// and precedes the type-specific list on the command line. The assembler
/// receives only `asm`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileArgs {
    /// Arguments for every compiled source.
    pub generic: Vec<String>,
    /// C-only arguments.
    pub c: Vec<String>,
    /// C++-only arguments.
    pub cpp: Vec<String>,
    /// Objective-C-only arguments.
    pub objc: Vec<String>,
    /// Assembler arguments.
    pub asm: Vec<String>,
}

impl CompileArgs {
    /// Returns the type-specific arguments for `kind` (empty for `Other`).
    pub fn for_type(&self, kind: SourceType) -> &[String] {
        match kind {
            SourceType::C => &self.c,
            SourceType::Cpp => &self.cpp,
            SourceType::ObjC => &self.objc,
            SourceType::Asm => &self.asm,
            SourceType::Other => &[],
        }
    }
}

/// Macros applied only to one source type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMacros {
    /// C-only macros.
    pub c: Vec<MacroDef>,
    /// C++-only macros.
    pub cpp: Vec<MacroDef>,
    /// Objective-C-only macros.
    pub objc: Vec<MacroDef>,
    /// Assembler-only macros.
    pub asm: Vec<MacroDef>,
}

impl TypeMacros {
    /// Returns the macros for `kind` (empty for `Other`).
    pub fn for_type(&self, kind: SourceType) -> &[MacroDef] {
        match kind {
            SourceType::C => &self.c,
            SourceType::Cpp => &self.cpp,
            SourceType::ObjC => &self.objc,
            SourceType::Asm => &self.asm,
            SourceType::Other => &[],
        }
    }
}

/// The per-platform flag, macro and library table.
///
/// Read-only for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    /// Platform key.
    pub key: PlatformKey,
    /// Target architecture.
    pub arch: Arch,
    /// Macros applied to every source after the target's global macros.
    pub macros: Vec<MacroDef>,
    /// Type-specific macros, applied after `macros`.
    pub type_macros: TypeMacros,
    /// Extra compile arguments.
    pub compile_args: CompileArgs,
    /// Extra linker arguments, appended after the target's own.
    pub extra_link_args: Vec<String>,
    /// Libraries to link against (bare names, no `-l` or `.lib`).
    pub libraries: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl PlatformProfile {
    /// Returns the built-in table for `key` on `arch`.
    pub fn builtin(key: PlatformKey, arch: Arch) -> Self {
        let x86_64 = arch.is_64bit();
        let unix_generic = strings(&[
            "-fPIC",
            "-msse2",
            "-msse3",
            "-msse4",
            "-funsafe-math-optimizations",
        ]);
        let unix_c = strings(&["-std=c99", "-Ofast", "-flto"]);
        let unix_cpp = strings(&["-std=c++14", "-lstdc++fs", "-Ofast", "-flto", "-fopenmp"]);

        let object_macro = match key {
            PlatformKey::Darwin => "MACHO",
            PlatformKey::Posix => "ELF",
            PlatformKey::Win32 if x86_64 => "WIN64",
            PlatformKey::Win32 => "WIN32",
        };
        let mut asm_macros = vec![MacroDef::flag(object_macro)];
        if x86_64 {
            asm_macros.push(MacroDef::flag("__x86_64__"));
        }
        asm_macros.push(MacroDef::flag("PIC"));
        asm_macros.push(MacroDef::flag("TURBO"));

        let type_macros = TypeMacros {
            asm: asm_macros,
            ..TypeMacros::default()
        };
        let asm_args = strings(&["-Ox"]);

        match key {
            PlatformKey::Darwin | PlatformKey::Posix => {
                let posix = key == PlatformKey::Posix;
                Self {
                    key,
                    arch,
                    macros: vec![
                        MacroDef::define("HAVE_SSE42", "0"),
                        MacroDef::define("HAVE_PTHREAD", "0"),
                    ],
                    type_macros,
                    compile_args: CompileArgs {
                        generic: unix_generic,
                        c: unix_c,
                        cpp: unix_cpp,
                        objc: Vec::new(),
                        asm: asm_args,
                    },
                    extra_link_args: if posix {
                        strings(&["-static-libstdc++", "-static-libgcc", "-flto"])
                    } else {
                        Vec::new()
                    },
                    libraries: if posix {
                        strings(&["rt", "m", "stdc++fs", "gomp"])
                    } else {
                        Vec::new()
                    },
                }
            }
            PlatformKey::Win32 => Self {
                key,
                arch,
                macros: vec![MacroDef::define("HAVE_SSE42", "0")],
                type_macros,
                compile_args: CompileArgs {
                    generic: strings(&["/MT", "/fp:fast", "/GL", "/GR-"]),
                    asm: asm_args,
                    ..CompileArgs::default()
                },
                extra_link_args: Vec::new(),
                libraries: strings(&["ole32", "shell32"]),
            },
        }
    }

    /// Returns the built-in table for the running host.
    pub fn host() -> Self {
        Self::builtin(PlatformKey::host(), Arch::host())
    }

    /// The assembler output format passed as `-f <format>`.
    pub fn asm_format(&self) -> &'static str {
        match (self.key, self.arch) {
            (PlatformKey::Darwin, Arch::X86_64) => "macho64",
            (PlatformKey::Darwin, Arch::X86) => "macho32",
            (PlatformKey::Posix, Arch::X86_64) => "elf64",
            (PlatformKey::Posix, Arch::X86) => "elf32",
            (PlatformKey::Win32, Arch::X86_64) => "win64",
            (PlatformKey::Win32, Arch::X86) => "win32",
        }
    }

    /// Suffix of the shared library produced by the link step.
    pub fn shared_library_suffix(&self) -> &'static str {
        match self.key {
            PlatformKey::Darwin => ".dylib",
            PlatformKey::Posix => ".so",
            PlatformKey::Win32 => ".dll",
        }
    }

    /// Suffix of object files written into the build directory.
    pub fn object_suffix(&self) -> &'static str {
        match self.key {
            PlatformKey::Win32 => "obj",
            PlatformKey::Darwin | PlatformKey::Posix => "o",
        }
    }

    /// Returns the artifact file name for an extension called `name`.
    pub fn artifact_file_name(&self, name: &str) -> String {
        format!("{name}{}", self.shared_library_suffix())
    }
}
