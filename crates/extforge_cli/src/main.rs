//! extforge CLI: builds a native extension described by `extforge.toml`.
//!
//! Provides `extforge build` to compile, assemble and link the extension,
//! `extforge plan` to show what a build would do, `extforge clean` to remove
//! build outputs, and `extforge platforms` to print the resolved platform table.

#![warn(missing_docs)]

mod build;
mod clean;
mod pipeline;
mod plan;
mod platforms;

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use extforge_core::{Arch, PlatformKey};

/// extforge: native extension build orchestrator.
#[derive(Parser, Debug)]
#[command(name = "extforge", version, about = "Native extension build orchestrator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output, including every toolchain command.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an `extforge.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the extension if any input changed.
    Build(BuildArgs),
    /// Show classification, staleness and object paths without building.
    Plan(PlanArgs),
    /// Remove the object directory (and the artifact with `--all`).
    Clean(CleanArgs),
    /// Print the resolved platform table.
    Platforms(TargetArgs),
}

/// Platform and architecture selection shared by several commands.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Target platform (darwin, posix, win32). Defaults to the host.
    #[arg(long)]
    pub platform: Option<PlatformKey>,

    /// Target architecture (x86, x86_64). Defaults to the host.
    #[arg(long)]
    pub arch: Option<Arch>,
}

impl TargetArgs {
    /// The selected platform, or the host's.
    pub fn platform(&self) -> PlatformKey {
        self.platform.unwrap_or_else(PlatformKey::host)
    }

    /// The selected architecture, or the host's.
    pub fn arch(&self) -> Arch {
        self.arch.unwrap_or_else(Arch::host)
    }
}

/// Arguments for the `extforge build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Platform and architecture.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Rebuild even if the artifact is up to date.
    #[arg(short, long)]
    pub force: bool,

    /// Emit debug symbols.
    #[arg(short, long)]
    pub debug: bool,

    /// Number of concurrent toolchain processes.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Also rebuild when compile or link settings changed.
    #[arg(long)]
    pub track_flags: bool,
}

/// Arguments for the `extforge plan` subcommand.
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Platform and architecture.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `extforge clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Platform and architecture whose artifact `--all` removes.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Also remove the built artifact.
    #[arg(long)]
    pub all: bool,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file or project directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    pipeline::init_logging(&global);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Plan(ref args) => plan::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
        Command::Platforms(ref args) => platforms::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
