//! Compile stage: one object per C, C++, Objective-C or unclassified source.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::build::BuildOptions;
use crate::error::{BuildError, BuildResult};
use crate::executor::Executor;
use crate::macros::effective_macros;
use crate::source::{SourceFile, SourceType};
use crate::target::BuildTarget;
use crate::toolchain::{CompileRequest, Toolchain};

/// An object file and the source it was (or will be) built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledObject {
    /// Object file path inside the build directory.
    pub path: PathBuf,
    /// The originating source.
    pub source: SourceFile,
}

/// Deterministic object path for `source`.
///
/// The source path is made relative to `source_root` when possible; root and
/// drive components are dropped and `..` becomes `__` so the object always
/// lands inside `build_temp`. The extension is replaced by `suffix`.
pub fn object_path(build_temp: &Path, source_root: &Path, source: &Path, suffix: &str) -> PathBuf {
    let relative = source.strip_prefix(source_root).unwrap_or(source);
    let mut path = build_temp.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::ParentDir => path.push("__"),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    path.set_extension(suffix);
    path
}

/// Plans every object of `target` in build order: compiled buckets (C, C++,
/// Objective-C, Other) followed by assembly.
///
/// Fails with [`BuildError::Configuration`] when two sources would write the
/// same object file.
pub fn plan_objects(target: &BuildTarget, build_temp: &Path) -> BuildResult<Vec<CompiledObject>> {
    let buckets = target.buckets();
    let suffix = target.profile().object_suffix();
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut planned = Vec::with_capacity(buckets.len());
    for source in buckets.compiled().chain(&buckets.asm) {
        let path = object_path(build_temp, target.source_root(), source.path(), suffix);
        if let Some(previous) = seen.insert(path.clone(), source.path()) {
            return Err(BuildError::config(format!(
                "{} and {} would both compile to {}",
                previous.display(),
                source.path().display(),
                path.display()
            )));
        }
        planned.push(CompiledObject {
            path,
            source: source.clone(),
        });
    }
    Ok(planned)
}

/// Creates the directory an object will be written to.
pub(crate) fn ensure_parent(object: &Path) -> BuildResult<()> {
    match object.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Compiles the C, C++, Objective-C and Other buckets of a target.
pub struct CompileDriver<'a> {
    toolchain: &'a dyn Toolchain,
    options: &'a BuildOptions,
}

impl<'a> CompileDriver<'a> {
    /// Creates a driver over `toolchain`.
    pub fn new(toolchain: &'a dyn Toolchain, options: &'a BuildOptions) -> Self {
        Self { toolchain, options }
    }

    /// Compiles the non-assembly entries of `planned`, once each, in order.
    ///
    /// `planned` is the output of [`plan_objects`], so object paths are
    /// already known to be distinct.
    pub fn run(
        &self,
        target: &BuildTarget,
        planned: &[CompiledObject],
    ) -> BuildResult<Vec<CompiledObject>> {
        let planned: Vec<&CompiledObject> = planned
            .iter()
            .filter(|o| o.source.kind() != SourceType::Asm)
            .collect();
        let executor = Executor::new(self.options.jobs)?;
        executor.run_all(&planned, |object: &&CompiledObject| {
            self.compile_one(target, object)
        })
    }

    fn compile_one(&self, target: &BuildTarget, planned: &CompiledObject) -> BuildResult<CompiledObject> {
        let source = &planned.source;
        let kind = source.kind();
        ensure_parent(&planned.path)?;

        let macros = effective_macros(
            target.macros(),
            target.profile(),
            kind,
            target.file_macros(source.path()),
        );
        let args = target.compile_args_for(kind);
        let request = CompileRequest {
            source,
            object: &planned.path,
            include_dirs: target.include_dirs(),
            macros: &macros,
            args: &args,
            debug: self.options.debug,
        };

        log::info!("compiling {} ({kind})", source.path().display());
        let path = self.toolchain.compile(&request)?;
        Ok(CompiledObject {
            path,
            source: source.clone(),
        })
    }
}
