//! `extforge build`: compile, assemble and link the extension.

use std::time::Instant;

use extforge_core::{BuildOptions, BuildOutcome, BuildStrategy};

use crate::pipeline::{load_project, resolve};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `extforge build` command.
///
/// Returns exit code 0 when the artifact is built or already up to date, 1 on
/// a build failure.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let resolved = resolve(&project, &args.target)?;
    let target = &resolved.target;
    let options = apply_overrides(resolved.options, args);

    if !global.quiet {
        eprintln!(
            "   Building {} ({}/{}, {} sources)",
            target.name(),
            target.profile().key,
            target.profile().arch,
            target.sources().len()
        );
    }

    let started = Instant::now();
    let strategy = BuildStrategy::new(&resolved.toolchain, options);
    match strategy.build(target) {
        Ok(BuildOutcome::UpToDate(artifact)) => {
            if !global.quiet {
                eprintln!("  Up to date {}", artifact.display());
            }
            Ok(0)
        }
        Ok(BuildOutcome::Built { artifact, objects }) => {
            if !global.quiet {
                eprintln!(
                    "    Finished {} ({} objects) in {:.2}s",
                    artifact.display(),
                    objects.len(),
                    started.elapsed().as_secs_f64()
                );
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(1)
        }
    }
}

/// Command-line flags override the `[build]` table; they can only turn
/// behavior on.
fn apply_overrides(options: BuildOptions, args: &BuildArgs) -> BuildOptions {
    let jobs = args.jobs.unwrap_or(options.jobs);
    let force = options.force || args.force;
    let debug = options.debug || args.debug;
    let track = options.track_flags || args.track_flags;
    options.force(force).debug(debug).jobs(jobs).track_flags(track)
}
