//! `extforge platforms`: print the resolved platform table.
//!
//! Inside a project the `[platforms]` overrides are applied; elsewhere the
//! built-in table is shown. An unreadable or invalid project file is an error.

use extforge_core::{PlatformKey, PlatformProfile, SourceType};

use crate::pipeline::{load_project, resolve_config_path};
use crate::{GlobalArgs, TargetArgs};

/// Runs the `extforge platforms` command.
///
/// Prints every platform for the selected architecture, or only the one
/// named by `--platform`.
pub fn run(args: &TargetArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = match resolve_config_path(global) {
        Ok(path) if path.is_file() => Some(load_project(global)?),
        Ok(path) => {
            log::debug!("no project at {}; showing built-in platform table", path.display());
            None
        }
        Err(e) => {
            log::debug!("showing built-in platform table: {e}");
            None
        }
    };
    let arch = args.arch();
    let keys: Vec<PlatformKey> = match args.platform {
        Some(key) => vec![key],
        None => PlatformKey::ALL.to_vec(),
    };

    for key in keys {
        let profile = match &project {
            Some(p) => extforge_config::platform_profile(&p.config, key, arch)?,
            None => PlatformProfile::builtin(key, arch),
        };
        print!("{}", render(&profile));
    }
    Ok(0)
}

fn join<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    }
}

fn render(profile: &PlatformProfile) -> String {
    let mut out = format!("[{} {}]\n", profile.key, profile.arch);
    out.push_str(&format!("  macros        {}\n", join(&profile.macros)));
    for kind in [SourceType::C, SourceType::Cpp, SourceType::ObjC, SourceType::Asm] {
        let macros = profile.type_macros.for_type(kind);
        if !macros.is_empty() {
            out.push_str(&format!("  macros.{:<6} {}\n", kind.label(), join(macros)));
        }
    }
    out.push_str(&format!("  args          {}\n", join(&profile.compile_args.generic)));
    for kind in [SourceType::C, SourceType::Cpp, SourceType::ObjC, SourceType::Asm] {
        let args = profile.compile_args.for_type(kind);
        if !args.is_empty() {
            out.push_str(&format!("  args.{:<8} {}\n", kind.label(), join(args)));
        }
    }
    out.push_str(&format!("  libraries     {}\n", join(&profile.libraries)));
    out.push_str(&format!("  link args     {}\n", join(&profile.extra_link_args)));
    out.push_str(&format!(
        "  output        *{} (objects .{}, asm -f {})\n",
        profile.shared_library_suffix(),
        profile.object_suffix(),
        profile.asm_format()
    ));
    out
}
