//! Assemble stage: one object per assembly source through an external
//! assembler.
//!
//! The assembly bucket arrives already narrowed to the target architecture;
//! this driver only resolves assembler include paths, macros and the object
//! format for the platform.

use crate::build::BuildOptions;
use crate::compile::{ensure_parent, CompiledObject};
use crate::error::BuildResult;
use crate::executor::Executor;
use crate::macros::effective_macros;
use crate::source::SourceType;
use crate::target::BuildTarget;
use crate::toolchain::{AssembleRequest, Toolchain};

/// Assembles the assembly bucket of a target.
pub struct AssemblerDriver<'a> {
    toolchain: &'a dyn Toolchain,
    options: &'a BuildOptions,
}

impl<'a> AssemblerDriver<'a> {
    /// Creates a driver over `toolchain`.
    pub fn new(toolchain: &'a dyn Toolchain, options: &'a BuildOptions) -> Self {
        Self { toolchain, options }
    }

    /// Assembles the assembly entries of `planned`, once each, in order.
    ///
    /// `planned` comes from [`plan_objects`](crate::compile::plan_objects);
    /// entries for other source types are skipped.
    pub fn run(
        &self,
        target: &BuildTarget,
        planned: &[CompiledObject],
    ) -> BuildResult<Vec<CompiledObject>> {
        let planned: Vec<&CompiledObject> = planned
            .iter()
            .filter(|o| o.source.kind() == SourceType::Asm)
            .collect();
        if planned.is_empty() {
            return Ok(Vec::new());
        }

        let args = target.compile_args_for(SourceType::Asm);
        let format = target.profile().asm_format();
        let executor = Executor::new(self.options.jobs)?;
        executor.run_all(&planned, |object: &&CompiledObject| {
            let source = &object.source;
            ensure_parent(&object.path)?;
            let macros = effective_macros(
                target.macros(),
                target.profile(),
                SourceType::Asm,
                target.file_macros(source.path()),
            );
            let request = AssembleRequest {
                source,
                object: &object.path,
                include_dirs: target.asm_include_dirs(),
                macros: &macros,
                args: &args,
                format,
            };
            log::info!("assembling {} ({format})", source.path().display());
            let path = self.toolchain.assemble(&request)?;
            Ok(CompiledObject {
                path,
                source: source.clone(),
            })
        })
    }
}
