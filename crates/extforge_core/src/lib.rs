//! Build orchestration for native extension modules.
//!
//! Given a [`BuildTarget`] assembled from heterogeneous C, C++, Objective-C and
//! assembly sources, this crate decides whether a rebuild is needed, compiles
//! each source with its resolved macro and flag set, assembles machine-code
//! sources through an external assembler, and links everything into a single
//! shared library.
//!
//! # Usage
//!
//! ```no_run
//! use extforge_core::{
//!     Arch, BuildOptions, BuildStrategy, BuildTarget, PlatformKey, PlatformProfile,
//!     ProcessToolchain, TargetSpec,
//! };
//!
//! let profile = PlatformProfile::builtin(PlatformKey::Posix, Arch::X86_64);
//! let target = BuildTarget::new(TargetSpec {
//!     name: "_native".to_string(),
//!     sources: vec!["src/a.c".into(), "src/b.cpp".into()],
//!     output_dir: "build".into(),
//!     ..TargetSpec::default()
//! }, profile).unwrap();
//!
//! let toolchain = ProcessToolchain::for_platform(PlatformKey::Posix);
//! let outcome = BuildStrategy::new(&toolchain, BuildOptions::new("build/temp"))
//!     .build(&target)
//!     .unwrap();
//! println!("{}", outcome.artifact().display());
//! ```

#![warn(missing_docs)]

pub mod assemble;
pub mod build;
pub mod compile;
pub mod error;
mod executor;
pub mod fingerprint;
pub mod link;
pub mod macros;
pub mod platform;
pub mod source;
pub mod staleness;
pub mod target;
pub mod toolchain;

pub use assemble::AssemblerDriver;
pub use build::{BuildOptions, BuildOutcome, BuildPlan, BuildStage, BuildStrategy};
pub use compile::{object_path, plan_objects, CompileDriver, CompiledObject};
pub use error::{BuildError, BuildResult};
pub use fingerprint::Fingerprint;
pub use link::{link_language, LinkDriver, LinkLanguage};
pub use macros::{effective_macros, MacroDef};
pub use platform::{Arch, CompileArgs, PlatformKey, PlatformProfile, TypeMacros};
pub use source::{classify, Buckets, SourceFile, SourceType};
pub use staleness::{check_staleness, StaleReason, Staleness};
pub use target::{BuildTarget, TargetSpec};
pub use toolchain::{
    AssembleRequest, CompileRequest, LinkRequest, ProcessToolchain, ToolPrograms, Toolchain,
    ToolchainFlavor,
};
