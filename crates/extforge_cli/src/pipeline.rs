//! Shared helpers for CLI commands: logging setup, project discovery and
//! target resolution.

use std::path::{Path, PathBuf};

use extforge_config::{find_project_root, ProjectConfig, ResolvedBuild, CONFIG_FILE};

use crate::{GlobalArgs, TargetArgs};

/// Initializes `env_logger` from the verbosity flags. `RUST_LOG` still wins
/// when set.
pub fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        log::LevelFilter::Error
    } else if global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();
}

/// A loaded project: its root directory and parsed configuration.
pub struct Project {
    /// Directory relative paths in the configuration are resolved against.
    pub dir: PathBuf,
    /// The validated configuration.
    pub config: ProjectConfig,
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `extforge.toml`.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_dir() {
            Ok(p.join(CONFIG_FILE))
        } else {
            Ok(p)
        }
    } else {
        let cwd = std::env::current_dir()?;
        let root = find_project_root(&cwd).ok_or_else(|| {
            format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                cwd.display()
            )
        })?;
        Ok(root.join(CONFIG_FILE))
    }
}

/// Loads the project configuration selected by the global args.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let path = resolve_config_path(global)?;
    let config = extforge_config::load_config_file(&path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    let dir = project_dir_of(&path);
    log::debug!("project root {}", dir.display());
    Ok(Project { dir, config })
}

fn project_dir_of(config_file: &Path) -> PathBuf {
    match config_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolves the project for the selected platform and architecture.
pub fn resolve(
    project: &Project,
    target: &TargetArgs,
) -> Result<ResolvedBuild, Box<dyn std::error::Error>> {
    Ok(extforge_config::resolve_target(
        &project.config,
        &project.dir,
        target.platform(),
        target.arch(),
    )?)
}
