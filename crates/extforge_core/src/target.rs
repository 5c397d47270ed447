//! The build target: one artifact from one flat list of sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, BuildResult};
use crate::link::LinkLanguage;
use crate::macros::MacroDef;
use crate::platform::{CompileArgs, PlatformProfile};
use crate::source::{classify, Buckets, SourceFile, SourceType};

/// Every recognized target option, as supplied by configuration.
///
/// Validated into a [`BuildTarget`] by [`BuildTarget::new`]. Architecture
/// selection has already happened by the time a spec is built: `sources` is
/// the concrete list for one architecture.
#[derive(Debug, Clone, Default)]
pub struct TargetSpec {
    /// Extension name; the artifact file name is derived from it.
    pub name: String,
    /// Ordered source paths.
    pub sources: Vec<PathBuf>,
    /// Extra files (headers etc.) whose timestamps trigger a rebuild.
    pub depends: Vec<PathBuf>,
    /// C/C++/ObjC include search paths.
    pub include_dirs: Vec<PathBuf>,
    /// Assembler include search paths.
    pub asm_include_dirs: Vec<PathBuf>,
    /// Global macros, applied first to every source.
    pub macros: Vec<MacroDef>,
    /// Per-file macro overrides, keyed by source path.
    pub file_macros: BTreeMap<PathBuf, Vec<MacroDef>>,
    /// Target-level compile arguments, appended after the platform's.
    pub compile_args: CompileArgs,
    /// Pre-built objects appended to the link line.
    pub extra_objects: Vec<PathBuf>,
    /// Target-level link arguments, placed before the platform's.
    pub extra_link_args: Vec<String>,
    /// Target-level libraries, placed before the platform's.
    pub libraries: Vec<String>,
    /// Library search directories.
    pub library_dirs: Vec<PathBuf>,
    /// Runtime library search directories (rpath).
    pub runtime_library_dirs: Vec<PathBuf>,
    /// Link language override; detected from the sources when `None`.
    pub language: Option<LinkLanguage>,
    /// Directory the artifact is written to.
    pub output_dir: PathBuf,
    /// Prefix stripped from source paths when naming object files.
    pub source_root: PathBuf,
}

/// A validated, read-only build target.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    name: String,
    sources: Vec<SourceFile>,
    depends: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    asm_include_dirs: Vec<PathBuf>,
    macros: Vec<MacroDef>,
    file_macros: BTreeMap<PathBuf, Vec<MacroDef>>,
    compile_args: CompileArgs,
    extra_objects: Vec<PathBuf>,
    extra_link_args: Vec<String>,
    libraries: Vec<String>,
    library_dirs: Vec<PathBuf>,
    runtime_library_dirs: Vec<PathBuf>,
    language: Option<LinkLanguage>,
    output: PathBuf,
    source_root: PathBuf,
    profile: PlatformProfile,
}

impl BuildTarget {
    /// Validates a spec against a platform profile.
    ///
    /// Fails with [`BuildError::Configuration`] if the name or source list is
    /// empty. Per-file macros for paths that are not sources are kept but
    /// logged, since they can never apply.
    pub fn new(spec: TargetSpec, profile: PlatformProfile) -> BuildResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(BuildError::config("extension name must not be empty"));
        }
        if spec.sources.is_empty() {
            return Err(BuildError::config(format!(
                "extension '{}': 'sources' must be a non-empty list of source file names",
                spec.name
            )));
        }

        let sources: Vec<SourceFile> = spec.sources.into_iter().map(SourceFile::new).collect();
        for path in spec.file_macros.keys() {
            if !sources.iter().any(|s| s.path() == path) {
                log::warn!(
                    "extension '{}': macros for '{}' ignored, file is not a source",
                    spec.name,
                    path.display()
                );
            }
        }

        let output = spec
            .output_dir
            .join(profile.artifact_file_name(&spec.name));

        Ok(Self {
            name: spec.name,
            sources,
            depends: spec.depends,
            include_dirs: spec.include_dirs,
            asm_include_dirs: spec.asm_include_dirs,
            macros: spec.macros,
            file_macros: spec.file_macros,
            compile_args: spec.compile_args,
            extra_objects: spec.extra_objects,
            extra_link_args: spec.extra_link_args,
            libraries: spec.libraries,
            library_dirs: spec.library_dirs,
            runtime_library_dirs: spec.runtime_library_dirs,
            language: spec.language,
            output,
            source_root: spec.source_root,
            profile,
        })
    }

    /// Extension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sources in declaration order.
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Sources partitioned into type buckets.
    pub fn buckets(&self) -> Buckets {
        classify(&self.sources)
    }

    /// Declared non-source dependencies.
    pub fn depends(&self) -> &[PathBuf] {
        &self.depends
    }

    /// Sources followed by declared dependencies, in order.
    pub fn dependency_set(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .map(SourceFile::path)
            .chain(self.depends.iter().map(PathBuf::as_path))
            .collect()
    }

    /// C/C++/ObjC include directories.
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Assembler include directories.
    pub fn asm_include_dirs(&self) -> &[PathBuf] {
        &self.asm_include_dirs
    }

    /// Global macros.
    pub fn macros(&self) -> &[MacroDef] {
        &self.macros
    }

    /// All per-file overrides.
    pub fn all_file_macros(&self) -> &BTreeMap<PathBuf, Vec<MacroDef>> {
        &self.file_macros
    }

    /// Per-file overrides for one source (empty if none).
    pub fn file_macros(&self, path: &Path) -> &[MacroDef] {
        self.file_macros.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Full argument list for a source type: platform generic, target generic,
    /// platform type-specific, target type-specific. Assembly gets only the
    /// type-specific lists.
    pub fn compile_args_for(&self, kind: SourceType) -> Vec<String> {
        let platform = &self.profile.compile_args;
        let mut args = Vec::new();
        if kind != SourceType::Asm {
            args.extend_from_slice(&platform.generic);
            args.extend_from_slice(&self.compile_args.generic);
        }
        args.extend_from_slice(platform.for_type(kind));
        args.extend_from_slice(self.compile_args.for_type(kind));
        args
    }

    /// Pre-built objects for the link line.
    pub fn extra_objects(&self) -> &[PathBuf] {
        &self.extra_objects
    }

    /// Target link arguments followed by the platform's.
    pub fn link_args(&self) -> Vec<String> {
        let mut args = self.extra_link_args.clone();
        args.extend_from_slice(&self.profile.extra_link_args);
        args
    }

    /// Target libraries followed by the platform's.
    pub fn libraries(&self) -> Vec<String> {
        let mut libs = self.libraries.clone();
        libs.extend_from_slice(&self.profile.libraries);
        libs
    }

    /// Library search directories.
    pub fn library_dirs(&self) -> &[PathBuf] {
        &self.library_dirs
    }

    /// Runtime library search directories.
    pub fn runtime_library_dirs(&self) -> &[PathBuf] {
        &self.runtime_library_dirs
    }

    /// Link language override, if any.
    pub fn language(&self) -> Option<LinkLanguage> {
        self.language
    }

    /// Final artifact path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Prefix stripped from source paths when naming objects.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// The platform profile this target builds for.
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, PlatformKey};

    fn posix() -> PlatformProfile {
        PlatformProfile::builtin(PlatformKey::Posix, Arch::X86_64)
    }

    fn spec(sources: &[&str]) -> TargetSpec {
        TargetSpec {
            name: "_ext".to_string(),
            sources: sources.iter().map(PathBuf::from).collect(),
            output_dir: PathBuf::from("build"),
            ..TargetSpec::default()
        }
    }

    #[test]
    fn empty_sources_is_configuration_error() {
        let err = BuildTarget::new(spec(&[]), posix()).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        assert!(err.to_string().contains("sources"));
    }

    #[test]
    fn empty_name_is_configuration_error() {
        let mut s = spec(&["a.c"]);
        s.name = "  ".to_string();
        assert!(matches!(
            BuildTarget::new(s, posix()),
            Err(BuildError::Configuration(_))
        ));
    }

    #[test]
    fn output_uses_platform_suffix() {
        let t = BuildTarget::new(spec(&["a.c"]), posix()).unwrap();
        assert_eq!(t.output(), Path::new("build/_ext.so"));

        let win = PlatformProfile::builtin(PlatformKey::Win32, Arch::X86_64);
        let t = BuildTarget::new(spec(&["a.c"]), win).unwrap();
        assert_eq!(t.output(), Path::new("build/_ext.dll"));
    }

    #[test]
    fn dependency_set_is_sources_then_depends() {
        let mut s = spec(&["a.c", "b.cpp"]);
        s.depends = vec![PathBuf::from("include/a.h")];
        let t = BuildTarget::new(s, posix()).unwrap();
        assert_eq!(
            t.dependency_set(),
            [Path::new("a.c"), Path::new("b.cpp"), Path::new("include/a.h")]
        );
    }

    #[test]
    fn compile_args_order() {
        let mut s = spec(&["a.c"]);
        s.compile_args.generic = vec!["-Wall".to_string()];
        s.compile_args.c = vec!["-Wno-unused".to_string()];
        let t = BuildTarget::new(s, posix()).unwrap();
        let args = t.compile_args_for(SourceType::C);
        assert_eq!(args.first().map(String::as_str), Some("-fPIC"));
        let wall = args.iter().position(|a| a == "-Wall").unwrap();
        let std = args.iter().position(|a| a == "-std=c99").unwrap();
        assert!(wall < std);
        assert_eq!(args.last().map(String::as_str), Some("-Wno-unused"));
    }

    #[test]
    fn other_sources_get_generic_args_only() {
        let t = BuildTarget::new(spec(&["data.xyz"]), posix()).unwrap();
        assert_eq!(
            t.compile_args_for(SourceType::Other),
            posix().compile_args.generic
        );
    }

    #[test]
    fn asm_args_skip_generic() {
        let t = BuildTarget::new(spec(&["s.asm"]), posix()).unwrap();
        assert_eq!(t.compile_args_for(SourceType::Asm), ["-Ox"]);
    }

    #[test]
    fn libraries_and_link_args_put_target_first() {
        let mut s = spec(&["a.c"]);
        s.libraries = vec!["z".to_string()];
        s.extra_link_args = vec!["-Wl,--as-needed".to_string()];
        let t = BuildTarget::new(s, posix()).unwrap();
        assert_eq!(t.libraries(), ["z", "rt", "m", "stdc++fs", "gomp"]);
        assert_eq!(t.link_args()[0], "-Wl,--as-needed");
    }

    #[test]
    fn file_macros_lookup() {
        let mut s = spec(&["a.c", "b.c"]);
        s.file_macros
            .insert(PathBuf::from("a.c"), vec![MacroDef::define("TURBO", "0")]);
        let t = BuildTarget::new(s, posix()).unwrap();
        assert_eq!(t.file_macros(Path::new("a.c")).len(), 1);
        assert!(t.file_macros(Path::new("b.c")).is_empty());
    }
}
