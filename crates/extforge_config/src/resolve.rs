//! Target resolution: one concrete build for a platform and architecture.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use extforge_core::{
    Arch, BuildOptions, BuildTarget, CompileArgs, MacroDef, PlatformKey, PlatformProfile,
    ProcessToolchain, TargetSpec, ToolPrograms, ToolchainFlavor, TypeMacros,
};

use crate::error::ConfigError;
use crate::loader::parse_macros;
use crate::types::ProjectConfig;

/// Everything needed to run one build, resolved from a project configuration.
#[derive(Debug)]
pub struct ResolvedBuild {
    /// The validated target, with architecture-specific additions applied.
    pub target: BuildTarget,
    /// Defaults from the `[build]` table; the CLI may override them.
    pub options: BuildOptions,
    /// The toolchain configured for the platform.
    pub toolchain: ProcessToolchain,
}

/// Returns the built-in profile for `platform` with any `[platforms]` override
/// applied field by field.
pub fn platform_profile(
    config: &ProjectConfig,
    platform: PlatformKey,
    arch: Arch,
) -> Result<PlatformProfile, ConfigError> {
    let mut profile = PlatformProfile::builtin(platform, arch);
    let Some(over) = config.platforms.get(platform.as_str()) else {
        return Ok(profile);
    };
    let context = format!("platforms.{platform}");

    if let Some(libraries) = &over.libraries {
        profile.libraries = libraries.clone();
    }
    if let Some(args) = &over.extra_link_args {
        profile.extra_link_args = args.clone();
    }
    if let Some(define) = &over.define {
        profile.macros = parse_macros(define, &[], &context)?;
    }
    if let Some(args) = &over.compile_args {
        profile.compile_args = args.clone();
    }
    if let Some(td) = &over.type_define {
        profile.type_macros = TypeMacros {
            c: parse_macros(&td.c, &[], &context)?,
            cpp: parse_macros(&td.cpp, &[], &context)?,
            objc: parse_macros(&td.objc, &[], &context)?,
            asm: parse_macros(&td.asm, &[], &context)?,
        };
    }
    Ok(profile)
}

fn join_all(base: &Path, items: &[String]) -> Vec<PathBuf> {
    items.iter().map(|p| base.join(p)).collect()
}

/// Resolves the configuration for one platform and architecture.
///
/// Relative paths are joined onto `project_dir`. The `[arch.<arch>]` lists are
/// appended once here, so the drivers only ever see the concrete source list.
/// Per-file macro groups are expanded in declaration order; a file named by
/// several groups receives each group's macros in turn.
pub fn resolve_target(
    config: &ProjectConfig,
    project_dir: &Path,
    platform: PlatformKey,
    arch: Arch,
) -> Result<ResolvedBuild, ConfigError> {
    let ext = &config.extension;
    let arch_cfg = config.arch.get(arch.as_str());

    let mut sources = ext.sources.clone().unwrap_or_default();
    let mut asm_include_dirs = ext.asm_include_dirs.clone();
    let mut macros = parse_macros(&ext.define, &ext.undef, "extension")?;
    if let Some(a) = arch_cfg {
        sources.extend(a.sources.iter().cloned());
        asm_include_dirs.extend(a.asm_include_dirs.iter().cloned());
        macros.extend(parse_macros(&a.define, &[], &format!("arch.{arch}"))?);
    }

    let mut file_macros: BTreeMap<PathBuf, Vec<MacroDef>> = BTreeMap::new();
    for (i, group) in config.file_macros.iter().enumerate() {
        let group_macros = parse_macros(&group.define, &group.undef, &format!("file_macros[{i}]"))?;
        for file in &group.files {
            file_macros
                .entry(project_dir.join(file))
                .or_default()
                .extend(group_macros.iter().cloned());
        }
    }

    let mut generic = ext.extra_compile_args.clone();
    generic.extend(ext.compile_args.generic.iter().cloned());
    let compile_args = CompileArgs {
        generic,
        ..ext.compile_args.clone()
    };

    let spec = TargetSpec {
        name: ext.name.clone(),
        sources: join_all(project_dir, &sources),
        depends: join_all(project_dir, &ext.depends),
        include_dirs: join_all(project_dir, &ext.include_dirs),
        asm_include_dirs: join_all(project_dir, &asm_include_dirs),
        macros,
        file_macros,
        compile_args,
        extra_objects: join_all(project_dir, &ext.extra_objects),
        extra_link_args: ext.extra_link_args.clone(),
        libraries: ext.libraries.clone(),
        library_dirs: join_all(project_dir, &ext.library_dirs),
        runtime_library_dirs: join_all(project_dir, &ext.runtime_library_dirs),
        language: ext.language,
        output_dir: project_dir.join(&ext.output_dir),
        source_root: project_dir.join(&ext.source_root),
    };
    let target = BuildTarget::new(spec, platform_profile(config, platform, arch)?)?;

    let build = &config.build;
    let options = BuildOptions::new(project_dir.join(&build.build_temp))
        .force(build.force)
        .debug(build.debug)
        .jobs(build.jobs)
        .track_flags(build.track_flags);

    let tc = &config.toolchain;
    let flavor = tc.flavor.unwrap_or_else(|| ToolchainFlavor::for_platform(platform));
    let mut programs = ToolPrograms::defaults(flavor);
    let overrides = [
        (&mut programs.cc, &tc.cc),
        (&mut programs.cxx, &tc.cxx),
        (&mut programs.objc, &tc.objc),
        (&mut programs.asm, &tc.asm),
        (&mut programs.linker, &tc.linker),
    ];
    for (slot, value) in overrides {
        if let Some(v) = value {
            *slot = v.clone();
        }
    }
    let toolchain = ProcessToolchain::new(flavor, programs)
        .with_timeout(tc.timeout_secs.map(Duration::from_secs));

    log::debug!(
        "resolved '{}' for {platform}/{arch}: {} sources",
        target.name(),
        target.sources().len()
    );

    Ok(ResolvedBuild {
        target,
        options,
        toolchain,
    })
}
