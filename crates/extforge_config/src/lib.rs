//! Parsing and validation of `extforge.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], then resolves it for one platform and architecture into a
//! concrete build target, build options and toolchain.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{find_project_root, load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use resolve::{platform_profile, resolve_target, ResolvedBuild};
pub use types::*;
