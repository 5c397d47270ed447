//! `extforge clean`: remove build outputs.

use std::path::Path;

use crate::pipeline::{load_project, resolve};
use crate::{CleanArgs, GlobalArgs};

/// Runs the `extforge clean` command.
///
/// Removes the object directory; with `--all`, also the artifact for the
/// selected platform.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let resolved = resolve(&project, &args.target)?;

    let removed_temp = remove_dir(&resolved.options.build_temp)?;
    let removed_artifact = if args.all {
        remove_file(resolved.target.output())?
    } else {
        false
    };

    if !global.quiet {
        if removed_temp {
            eprintln!("    Removed {}", resolved.options.build_temp.display());
        }
        if removed_artifact {
            eprintln!("    Removed {}", resolved.target.output().display());
        }
        if !removed_temp && !removed_artifact {
            eprintln!("    Nothing to clean");
        }
    }
    Ok(0)
}

/// Removes a directory tree; `Ok(false)` if it did not exist.
fn remove_dir(dir: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("failed to remove {}: {e}", dir.display()).into()),
    }
}

/// Removes a file; `Ok(false)` if it did not exist.
fn remove_file(path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("failed to remove {}: {e}", path.display()).into()),
    }
}
