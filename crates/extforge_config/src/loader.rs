//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use extforge_core::{Arch, MacroDef, PlatformKey};
use std::path::{Path, PathBuf};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "extforge.toml";

/// Loads and validates an `extforge.toml` configuration from a project directory.
///
/// Reads `<project_dir>/extforge.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `extforge.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Walks up from `start` to the nearest directory containing `extforge.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Parses a `define` list followed by an `undef` list into ordered macros.
pub(crate) fn parse_macros(
    define: &[String],
    undef: &[String],
    context: &str,
) -> Result<Vec<MacroDef>, ConfigError> {
    let invalid = |text: &str| {
        ConfigError::ValidationError(format!("{context}: invalid macro '{text}'"))
    };
    let mut macros = Vec::with_capacity(define.len() + undef.len());
    for text in define {
        macros.push(text.parse::<MacroDef>().map_err(|_| invalid(text))?);
    }
    for text in undef {
        match text.parse::<MacroDef>().map_err(|_| invalid(text))? {
            MacroDef::Define { name, value: None } => macros.push(MacroDef::undef(name)),
            m @ MacroDef::Undefine { .. } => macros.push(m),
            MacroDef::Define { .. } => return Err(invalid(text)),
        }
    }
    Ok(macros)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    let ext = &config.extension;
    if ext.name.trim().is_empty() {
        return Err(ConfigError::MissingField("extension.name".to_string()));
    }
    match &ext.sources {
        None => return Err(ConfigError::MissingField("extension.sources".to_string())),
        Some(sources) if sources.is_empty() => {
            return Err(ConfigError::ValidationError(
                "extension.sources must list at least one source file".to_string(),
            ))
        }
        Some(_) => {}
    }
    parse_macros(&ext.define, &ext.undef, "extension")?;

    for (i, group) in config.file_macros.iter().enumerate() {
        let context = format!("file_macros[{i}]");
        if group.files.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{context}: 'files' must not be empty"
            )));
        }
        parse_macros(&group.define, &group.undef, &context)?;
    }

    for (key, arch) in &config.arch {
        if !Arch::ALL.iter().any(|a| a.as_str() == key) {
            return Err(ConfigError::ParseError(format!(
                "unknown architecture '{key}' in [arch] (expected x86 or x86_64)"
            )));
        }
        parse_macros(&arch.define, &[], &format!("arch.{key}"))?;
    }

    for (key, platform) in &config.platforms {
        if !PlatformKey::ALL.iter().any(|p| p.as_str() == key) {
            return Err(ConfigError::ParseError(format!(
                "unknown platform '{key}' in [platforms] (expected darwin, posix or win32)"
            )));
        }
        let context = format!("platforms.{key}");
        if let Some(define) = &platform.define {
            parse_macros(define, &[], &context)?;
        }
        if let Some(td) = &platform.type_define {
            for list in [&td.c, &td.cpp, &td.objc, &td.asm] {
                parse_macros(list, &[], &context)?;
            }
        }
    }

    if config.build.jobs == 0 {
        return Err(ConfigError::ValidationError(
            "build.jobs must be at least 1".to_string(),
        ));
    }
    if config.toolchain.timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "toolchain.timeout_secs must be positive".to_string(),
        ));
    }
    Ok(())
}
