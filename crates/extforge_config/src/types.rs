//! Configuration types deserialized from `extforge.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use extforge_core::{CompileArgs, LinkLanguage, ToolchainFlavor};

/// The top-level project configuration parsed from `extforge.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// The extension being built.
    pub extension: ExtensionConfig,
    /// Per-file macro groups, applied in declaration order.
    #[serde(default)]
    pub file_macros: Vec<FileMacros>,
    /// Architecture-specific additions, keyed by `x86` or `x86_64`.
    #[serde(default)]
    pub arch: BTreeMap<String, ArchConfig>,
    /// Replacements for the built-in platform tables, keyed by platform.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformOverride>,
    /// Toolchain executables and conventions.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Build directory and rebuild behavior.
    #[serde(default)]
    pub build: BuildConfig,
}

/// The `[extension]` table: one shared library built from a flat source list.
#[derive(Debug, Deserialize)]
pub struct ExtensionConfig {
    /// Extension name; the artifact is `<name><platform suffix>`.
    #[serde(default)]
    pub name: String,
    /// Ordered source files, relative to the project directory.
    pub sources: Option<Vec<String>>,
    /// Headers and other files whose timestamps trigger a rebuild.
    #[serde(default)]
    pub depends: Vec<String>,
    /// C/C++/Objective-C include directories.
    #[serde(default)]
    pub include_dirs: Vec<String>,
    /// Assembler include directories.
    #[serde(default)]
    pub asm_include_dirs: Vec<String>,
    /// Global macro definitions (`NAME` or `NAME=VALUE`).
    #[serde(default)]
    pub define: Vec<String>,
    /// Global macros to undefine, applied after `define`.
    #[serde(default)]
    pub undef: Vec<String>,
    /// Extra arguments for every compiled source.
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    /// Type-specific extra compile arguments.
    #[serde(default)]
    pub compile_args: CompileArgs,
    /// Pre-built objects appended to the link line.
    #[serde(default)]
    pub extra_objects: Vec<String>,
    /// Extra linker arguments.
    #[serde(default)]
    pub extra_link_args: Vec<String>,
    /// Extra libraries (bare names).
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Library search directories.
    #[serde(default)]
    pub library_dirs: Vec<String>,
    /// Runtime library search directories.
    #[serde(default)]
    pub runtime_library_dirs: Vec<String>,
    /// Link language override (`c`, `c++` or `objc`).
    #[serde(default)]
    pub language: Option<LinkLanguage>,
    /// Artifact directory, relative to the project directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Prefix stripped from source paths when naming object files.
    #[serde(default)]
    pub source_root: String,
}

fn default_output_dir() -> String {
    "build".to_string()
}

/// A `[[file_macros]]` group: the same overrides for every listed file.
#[derive(Debug, Deserialize)]
pub struct FileMacros {
    /// Source files the group applies to (a string or a list).
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub files: Vec<String>,
    /// Definitions appended after the platform and type macros.
    #[serde(default)]
    pub define: Vec<String>,
    /// Undefines, applied after `define`.
    #[serde(default)]
    pub undef: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Additions used only when building for one architecture.
#[derive(Debug, Default, Deserialize)]
pub struct ArchConfig {
    /// Sources appended after `extension.sources`.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Assembler include directories appended after the extension's.
    #[serde(default)]
    pub asm_include_dirs: Vec<String>,
    /// Macro definitions appended after the extension's global macros.
    #[serde(default)]
    pub define: Vec<String>,
}

/// Field-wise replacement of a built-in platform table.
///
/// Every field that is present replaces the built-in value entirely.
#[derive(Debug, Default, Deserialize)]
pub struct PlatformOverride {
    /// Link libraries.
    pub libraries: Option<Vec<String>>,
    /// Extra linker arguments.
    pub extra_link_args: Option<Vec<String>>,
    /// Base macros.
    pub define: Option<Vec<String>>,
    /// Extra compile arguments by source type.
    pub compile_args: Option<CompileArgs>,
    /// Type-specific macros.
    pub type_define: Option<TypeDefines>,
}

/// Type-specific macro lists in textual form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TypeDefines {
    /// C-only macros.
    pub c: Vec<String>,
    /// C++-only macros.
    pub cpp: Vec<String>,
    /// Objective-C-only macros.
    pub objc: Vec<String>,
    /// Assembler-only macros.
    pub asm: Vec<String>,
}

/// The `[toolchain]` table. Unset entries fall back to the flavor's defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ToolchainConfig {
    /// C compiler.
    pub cc: Option<String>,
    /// C++ compiler.
    pub cxx: Option<String>,
    /// Objective-C compiler.
    pub objc: Option<String>,
    /// Assembler.
    pub asm: Option<String>,
    /// Standalone linker (MSVC flavor).
    pub linker: Option<String>,
    /// Command-line convention; defaults by platform.
    pub flavor: Option<ToolchainFlavor>,
    /// Per-process time limit in seconds.
    pub timeout_secs: Option<u64>,
}

/// The `[build]` table.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Object directory, relative to the project directory.
    pub build_temp: String,
    /// Maximum concurrent toolchain processes.
    pub jobs: usize,
    /// Emit debug symbols.
    pub debug: bool,
    /// Always rebuild.
    pub force: bool,
    /// Rebuild when resolved flags or macros change.
    pub track_flags: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_temp: "build/temp".to_string(),
            jobs: 1,
            debug: false,
            force: false,
            track_flags: false,
        }
    }
}
