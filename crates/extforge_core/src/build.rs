//! The build strategy: staleness check, compile, assemble, link.
//!
//! [`BuildStrategy`] is an explicit value composed from a [`Toolchain`] and
//! [`BuildOptions`]; nothing about the build mechanism is global.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::assemble::AssemblerDriver;
use crate::compile::{plan_objects, CompileDriver, CompiledObject};
use crate::error::{BuildError, BuildResult};
use crate::fingerprint::Fingerprint;
use crate::link::{link_language, LinkDriver, LinkLanguage};
use crate::source::Buckets;
use crate::staleness::{check_staleness, StaleReason, Staleness};
use crate::target::BuildTarget;
use crate::toolchain::Toolchain;

/// Per-invocation build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Directory receiving object files (and the flag fingerprint).
    pub build_temp: PathBuf,
    /// Rebuild regardless of timestamps.
    pub force: bool,
    /// Emit debug symbols.
    pub debug: bool,
    /// Maximum concurrent toolchain processes; `1` runs sequentially.
    pub jobs: usize,
    /// Also rebuild when the resolved settings changed since the last build.
    pub track_flags: bool,
}

impl BuildOptions {
    /// Sequential, non-forced, release build into `build_temp`.
    pub fn new(build_temp: impl Into<PathBuf>) -> Self {
        Self {
            build_temp: build_temp.into(),
            force: false,
            debug: false,
            jobs: 1,
            track_flags: false,
        }
    }

    /// Sets the force-rebuild flag.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the debug-symbols flag.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the job count; `0` is treated as `1`.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Enables or disables the settings fingerprint.
    pub fn track_flags(mut self, track: bool) -> Self {
        self.track_flags = track;
        self
    }
}

/// Where a build invocation currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStage {
    /// Nothing decided yet.
    Unchecked,
    /// Partitioning sources and planning objects.
    Classifying,
    /// Running the C/C++/Objective-C compilers.
    Compiling,
    /// Running the assembler.
    Assembling,
    /// Running the linker.
    Linking,
    /// Finished, either built or skipped.
    Done,
    /// Terminal failure.
    Failed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchecked => "unchecked",
            Self::Classifying => "classifying",
            Self::Compiling => "compiling",
            Self::Assembling => "assembling",
            Self::Linking => "linking",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of a successful build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The artifact was newer than every input; nothing ran.
    UpToDate(PathBuf),
    /// Everything was rebuilt.
    Built {
        /// The produced artifact.
        artifact: PathBuf,
        /// Object files passed to the linker, in link order.
        objects: Vec<PathBuf>,
    },
}

impl BuildOutcome {
    /// The artifact path, in either case.
    pub fn artifact(&self) -> &Path {
        match self {
            Self::UpToDate(path) => path,
            Self::Built { artifact, .. } => artifact,
        }
    }

    /// Returns `true` if toolchain processes ran.
    pub fn was_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

/// What a build would do, computed without running any toolchain.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Sources by type.
    pub buckets: Buckets,
    /// The rebuild decision.
    pub staleness: Staleness,
    /// Objects in link order (extra objects not included).
    pub objects: Vec<CompiledObject>,
    /// The link front-end language.
    pub language: LinkLanguage,
    /// Final artifact path.
    pub artifact: PathBuf,
}

/// Injectable build mechanism for one target.
pub struct BuildStrategy<'a> {
    toolchain: &'a dyn Toolchain,
    options: BuildOptions,
}

impl<'a> BuildStrategy<'a> {
    /// Composes a strategy from a toolchain and options.
    pub fn new(toolchain: &'a dyn Toolchain, options: BuildOptions) -> Self {
        Self { toolchain, options }
    }

    /// The options this strategy builds with.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Decides whether `target` needs a rebuild.
    ///
    /// Timestamps decide first. With flag tracking enabled, a target that is
    /// fresh by timestamp is still stale when no fingerprint was recorded or
    /// the recorded one differs.
    pub fn staleness(&self, target: &BuildTarget) -> BuildResult<Staleness> {
        let by_time = check_staleness(&target.dependency_set(), target.output(), self.options.force);
        if by_time.is_stale() || !self.options.track_flags {
            return Ok(by_time);
        }
        let current = Fingerprint::compute(target, self.options.debug)?;
        let record = Fingerprint::record_path(&self.options.build_temp, target.name());
        match Fingerprint::load(&record) {
            Some(recorded) if recorded == current => Ok(Staleness::Fresh),
            _ => Ok(Staleness::Stale(StaleReason::FlagsChanged)),
        }
    }

    /// Computes the build plan without invoking the toolchain.
    pub fn plan(&self, target: &BuildTarget) -> BuildResult<BuildPlan> {
        Ok(BuildPlan {
            buckets: target.buckets(),
            staleness: self.staleness(target)?,
            objects: plan_objects(target, &self.options.build_temp)?,
            language: link_language(target),
            artifact: target.output().to_path_buf(),
        })
    }

    /// Builds `target`, or returns its existing artifact if it is up to date.
    ///
    /// Stages run in order: compile, assemble, link. The first error aborts
    /// the build; the linker never runs unless every object was produced.
    pub fn build(&self, target: &BuildTarget) -> BuildResult<BuildOutcome> {
        let mut stage = BuildStage::Unchecked;
        let staleness = match self.staleness(target) {
            Ok(s) => s,
            Err(err) => {
                enter(&mut stage, BuildStage::Failed);
                return Err(err);
            }
        };

        let reason = match staleness {
            Staleness::Fresh => {
                log::info!("skipping '{}' extension (up-to-date)", target.name());
                enter(&mut stage, BuildStage::Done);
                return Ok(BuildOutcome::UpToDate(target.output().to_path_buf()));
            }
            Staleness::Stale(reason) => reason,
        };

        log::info!("building '{}' extension ({reason})", target.name());
        match self.run_stages(target, &mut stage) {
            Ok(outcome) => {
                enter(&mut stage, BuildStage::Done);
                Ok(outcome)
            }
            Err(err) => {
                log::debug!("build of '{}' failed while {stage}: {err}", target.name());
                enter(&mut stage, BuildStage::Failed);
                Err(err)
            }
        }
    }

    fn run_stages(&self, target: &BuildTarget, stage: &mut BuildStage) -> BuildResult<BuildOutcome> {
        enter(stage, BuildStage::Classifying);
        let buckets = target.buckets();
        log::debug!(
            "sources: {} c, {} c++, {} objc, {} asm, {} other",
            buckets.c.len(),
            buckets.cpp.len(),
            buckets.objc.len(),
            buckets.asm.len(),
            buckets.other.len()
        );
        let planned = plan_objects(target, &self.options.build_temp)?;
        self.toolchain.validate(target)?;
        let temp = &self.options.build_temp;
        std::fs::create_dir_all(temp).map_err(|e| BuildError::io(temp, e))?;

        enter(stage, BuildStage::Compiling);
        let mut objects = CompileDriver::new(self.toolchain, &self.options).run(target, &planned)?;

        enter(stage, BuildStage::Assembling);
        objects.extend(AssemblerDriver::new(self.toolchain, &self.options).run(target, &planned)?);

        enter(stage, BuildStage::Linking);
        let artifact = LinkDriver::new(self.toolchain, self.options.debug).run(target, &objects)?;

        if self.options.track_flags {
            let fingerprint = Fingerprint::compute(target, self.options.debug)?;
            fingerprint.save(&Fingerprint::record_path(temp, target.name()))?;
        }

        Ok(BuildOutcome::Built {
            artifact,
            objects: LinkDriver::link_objects(target, &objects),
        })
    }
}

fn enter(stage: &mut BuildStage, next: BuildStage) {
    log::debug!("stage {stage} -> {next}");
    *stage = next;
}
