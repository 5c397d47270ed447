//! Full builds driven through a recording in-memory toolchain.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use extforge_core::{
    Arch, AssembleRequest, BuildError, BuildOptions, BuildOutcome, BuildResult, BuildStrategy,
    BuildTarget, CompileRequest, LinkLanguage, LinkRequest, MacroDef, PlatformKey,
    PlatformProfile, ProcessToolchain, StaleReason, Staleness, TargetSpec, ToolPrograms,
    Toolchain, ToolchainFlavor,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Compile {
        source: PathBuf,
        object: PathBuf,
        macros: Vec<MacroDef>,
    },
    Assemble {
        source: PathBuf,
        object: PathBuf,
        format: String,
    },
    Link {
        objects: Vec<PathBuf>,
        libraries: Vec<String>,
        args: Vec<String>,
        language: LinkLanguage,
    },
}

#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<Call>>,
    fail_source: Option<PathBuf>,
    fail_asm: bool,
    fail_link: bool,
}

impl FakeToolchain {
    fn failing_on(source: impl Into<PathBuf>) -> Self {
        Self {
            fail_source: Some(source.into()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Toolchain for FakeToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> BuildResult<PathBuf> {
        self.record(Call::Compile {
            source: request.source.path().to_path_buf(),
            object: request.object.to_path_buf(),
            macros: request.macros.to_vec(),
        });
        if self.fail_source.as_deref() == Some(request.source.path()) {
            return Err(BuildError::Compile {
                path: request.source.path().to_path_buf(),
                tool: "fake-cc".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        std::fs::write(request.object, b"obj").unwrap();
        Ok(request.object.to_path_buf())
    }

    fn assemble(&self, request: &AssembleRequest<'_>) -> BuildResult<PathBuf> {
        self.record(Call::Assemble {
            source: request.source.path().to_path_buf(),
            object: request.object.to_path_buf(),
            format: request.format.to_string(),
        });
        if self.fail_asm {
            return Err(BuildError::Compile {
                path: request.source.path().to_path_buf(),
                tool: "fake-nasm".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        std::fs::write(request.object, b"obj").unwrap();
        Ok(request.object.to_path_buf())
    }

    fn link(&self, request: &LinkRequest<'_>) -> BuildResult<PathBuf> {
        self.record(Call::Link {
            objects: request.objects.to_vec(),
            libraries: request.libraries.to_vec(),
            args: request.args.to_vec(),
            language: request.language,
        });
        std::fs::write(request.output, b"lib").unwrap();
        if self.fail_link {
            return Err(BuildError::Link {
                artifact: request.output.to_path_buf(),
                tool: "fake-ld".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(request.output.to_path_buf())
    }
}

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// Creates the given source files with modification times in the past.
    fn new(files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let past = SystemTime::now() - Duration::from_secs(120);
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            File::create(&path).unwrap().set_modified(past).unwrap();
        }
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn spec(&self, sources: &[&str]) -> TargetSpec {
        TargetSpec {
            name: "_ext".to_string(),
            sources: sources.iter().map(|s| self.root().join(s)).collect(),
            output_dir: self.root().join("build"),
            source_root: self.root().to_path_buf(),
            ..TargetSpec::default()
        }
    }

    fn target(&self, sources: &[&str], key: PlatformKey) -> BuildTarget {
        BuildTarget::new(self.spec(sources), PlatformProfile::builtin(key, Arch::X86_64)).unwrap()
    }

    fn temp(&self) -> PathBuf {
        self.root().join("build/temp")
    }

    fn options(&self) -> BuildOptions {
        BuildOptions::new(self.temp())
    }
}

#[test]
fn posix_build_compiles_assembles_and_links() {
    let project = Project::new(&["a.c", "b.cpp", "c.asm"]);
    let target = project.target(&["a.c", "b.cpp", "c.asm"], PlatformKey::Posix);
    let buckets = target.buckets();
    assert_eq!(buckets.c.len(), 1);
    assert_eq!(buckets.cpp.len(), 1);
    assert_eq!(buckets.asm.len(), 1);
    assert!(buckets.objc.is_empty() && buckets.other.is_empty());

    let tc = FakeToolchain::default();
    let outcome = BuildStrategy::new(&tc, project.options()).build(&target).unwrap();

    let temp = project.temp();
    let root = project.root();
    let calls = tc.calls();
    assert_eq!(calls.len(), 4);
    assert!(matches!(&calls[0], Call::Compile { source, object, .. }
        if source == &root.join("a.c") && object == &temp.join("a.o")));
    assert!(matches!(&calls[1], Call::Compile { source, object, .. }
        if source == &root.join("b.cpp") && object == &temp.join("b.o")));
    assert_eq!(
        calls[2],
        Call::Assemble {
            source: root.join("c.asm"),
            object: temp.join("c.o"),
            format: "elf64".to_string(),
        }
    );
    assert_eq!(
        calls[3],
        Call::Link {
            objects: vec![temp.join("a.o"), temp.join("b.o"), temp.join("c.o")],
            libraries: vec!["rt".into(), "m".into(), "stdc++fs".into(), "gomp".into()],
            args: vec!["-static-libstdc++".into(), "-static-libgcc".into(), "-flto".into()],
            language: LinkLanguage::Cpp,
        }
    );

    let artifact = root.join("build/_ext.so");
    assert_eq!(outcome.artifact(), artifact);
    assert!(artifact.exists());
    assert!(!root.join("build/._ext.so.partial").exists());
}

#[test]
fn unchanged_rerun_invokes_nothing() {
    let project = Project::new(&["a.c", "b.cpp", "c.asm"]);
    let target = project.target(&["a.c", "b.cpp", "c.asm"], PlatformKey::Posix);

    let first = FakeToolchain::default();
    let built = BuildStrategy::new(&first, project.options()).build(&target).unwrap();
    assert!(built.was_built());

    let second = FakeToolchain::default();
    let rerun = BuildStrategy::new(&second, project.options()).build(&target).unwrap();
    assert!(second.calls().is_empty());
    assert_eq!(rerun, BuildOutcome::UpToDate(built.artifact().to_path_buf()));
}

#[test]
fn force_rebuilds_everything() {
    let project = Project::new(&["a.c", "b.cpp", "c.asm"]);
    let target = project.target(&["a.c", "b.cpp", "c.asm"], PlatformKey::Posix);
    BuildStrategy::new(&FakeToolchain::default(), project.options())
        .build(&target)
        .unwrap();

    let tc = FakeToolchain::default();
    let outcome = BuildStrategy::new(&tc, project.options().force(true))
        .build(&target)
        .unwrap();
    assert!(outcome.was_built());
    assert_eq!(tc.calls().len(), 4);
}

#[test]
fn touched_dependency_triggers_rebuild() {
    let project = Project::new(&["a.c", "include/a.h"]);
    let mut spec = project.spec(&["a.c"]);
    spec.depends = vec![project.root().join("include/a.h")];
    let target = BuildTarget::new(spec, PlatformProfile::builtin(PlatformKey::Posix, Arch::X86_64))
        .unwrap();
    BuildStrategy::new(&FakeToolchain::default(), project.options())
        .build(&target)
        .unwrap();

    let later = SystemTime::now() + Duration::from_secs(60);
    File::options()
        .write(true)
        .open(project.root().join("include/a.h"))
        .unwrap()
        .set_modified(later)
        .unwrap();

    let toolchain = FakeToolchain::default();
    let strategy = BuildStrategy::new(&toolchain, project.options());
    assert_eq!(
        strategy.staleness(&target).unwrap(),
        Staleness::Stale(StaleReason::DependencyNewer(project.root().join("include/a.h")))
    );
}

#[test]
fn failing_compile_halts_before_remaining_sources_and_link() {
    let project = Project::new(&["a.c", "b.c", "c.c", "d.cpp"]);
    let target = project.target(&["a.c", "b.c", "c.c", "d.cpp"], PlatformKey::Posix);
    let tc = FakeToolchain::failing_on(project.root().join("b.c"));

    let err = BuildStrategy::new(&tc, project.options()).build(&target).unwrap_err();

    assert_eq!(err.path(), Some(project.root().join("b.c").as_path()));
    let calls = tc.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls.iter().any(|c| matches!(c, Call::Link { .. })));
    assert!(!project.root().join("build/_ext.so").exists());
}

#[test]
fn failing_assemble_halts_before_link() {
    let project = Project::new(&["a.c", "s.asm", "t.asm"]);
    let target = project.target(&["a.c", "s.asm", "t.asm"], PlatformKey::Posix);
    let tc = FakeToolchain {
        fail_asm: true,
        ..FakeToolchain::default()
    };

    let err = BuildStrategy::new(&tc, project.options()).build(&target).unwrap_err();

    assert_eq!(err.path(), Some(project.root().join("s.asm").as_path()));
    let calls = tc.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], Call::Compile { .. }));
    assert!(matches!(calls[1], Call::Assemble { .. }));
    assert!(!project.root().join("build/_ext.so").exists());
}

#[test]
fn failing_link_leaves_no_artifact() {
    let project = Project::new(&["a.c"]);
    let target = project.target(&["a.c"], PlatformKey::Posix);
    let tc = FakeToolchain {
        fail_link: true,
        ..FakeToolchain::default()
    };

    let err = BuildStrategy::new(&tc, project.options()).build(&target).unwrap_err();

    assert!(matches!(err, BuildError::Link { .. }));
    assert!(!project.root().join("build/_ext.so").exists());
    assert!(!project.root().join("build/._ext.so.partial").exists());
    assert!(project.temp().join("a.o").exists(), "objects are kept after a link failure");
}

#[test]
fn failing_link_keeps_previous_artifact() {
    let project = Project::new(&["a.c"]);
    let target = project.target(&["a.c"], PlatformKey::Posix);
    let artifact = project.root().join("build/_ext.so");
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(&artifact, b"previous build").unwrap();
    let tc = FakeToolchain {
        fail_link: true,
        ..FakeToolchain::default()
    };

    let err = BuildStrategy::new(&tc, project.options().force(true))
        .build(&target)
        .unwrap_err();

    assert!(matches!(err, BuildError::Link { .. }));
    assert_eq!(std::fs::read(&artifact).unwrap(), b"previous build");
    assert!(!project.root().join("build/._ext.so.partial").exists());
}

#[test]
fn msvc_rejects_objc_before_any_compile() {
    let project = Project::new(&["a.c", "v.m"]);
    let target = project.target(&["a.c", "v.m"], PlatformKey::Win32);
    let mut programs = ToolPrograms::defaults(ToolchainFlavor::Msvc);
    programs.cc = "extforge-missing-cl".to_string();
    programs.objc = "extforge-missing-cl".to_string();
    let tc = ProcessToolchain::new(ToolchainFlavor::Msvc, programs);

    let err = BuildStrategy::new(&tc, project.options()).build(&target).unwrap_err();

    // A compile of a.c would have surfaced as a launch failure first.
    match err {
        BuildError::Configuration(message) => assert!(message.contains("v.m")),
        other => panic!("expected a configuration error, got {other:?}"),
    }
    assert!(!project.temp().exists());
}

#[test]
fn colliding_objects_fail_before_any_invocation() {
    let project = Project::new(&["x.c", "x.cpp"]);
    let target = project.target(&["x.c", "x.cpp"], PlatformKey::Posix);
    let tc = FakeToolchain::default();

    let err = BuildStrategy::new(&tc, project.options()).build(&target).unwrap_err();

    assert!(matches!(err, BuildError::Configuration(_)));
    assert!(tc.calls().is_empty());
}

#[test]
fn macro_order_is_global_platform_type_file() {
    let project = Project::new(&["a.c"]);
    let mut profile = PlatformProfile::builtin(PlatformKey::Darwin, Arch::X86_64);
    profile.macros = vec![MacroDef::flag("A"), MacroDef::flag("B")];
    profile.type_macros.c = vec![MacroDef::flag("C")];
    let mut spec = project.spec(&["a.c"]);
    spec.file_macros
        .insert(project.root().join("a.c"), vec![MacroDef::flag("X"), MacroDef::flag("A")]);
    let target = BuildTarget::new(spec, profile).unwrap();

    let tc = FakeToolchain::default();
    BuildStrategy::new(&tc, project.options()).build(&target).unwrap();

    match &tc.calls()[0] {
        Call::Compile { macros, .. } => assert_eq!(
            macros,
            &[
                MacroDef::flag("A"),
                MacroDef::flag("B"),
                MacroDef::flag("C"),
                MacroDef::flag("X"),
                MacroDef::flag("A"),
            ]
        ),
        other => panic!("expected compile, got {other:?}"),
    }
}

#[test]
fn extra_objects_follow_compiled_objects() {
    let project = Project::new(&["a.c", "s.asm"]);
    let mut spec = project.spec(&["s.asm", "a.c"]);
    spec.extra_objects = vec![PathBuf::from("/opt/prebuilt/z.a")];
    let target = BuildTarget::new(spec, PlatformProfile::builtin(PlatformKey::Win32, Arch::X86))
        .unwrap();

    let tc = FakeToolchain::default();
    let outcome = BuildStrategy::new(&tc, project.options()).build(&target).unwrap();

    let temp = project.temp();
    let expected = vec![
        temp.join("a.obj"),
        temp.join("s.obj"),
        PathBuf::from("/opt/prebuilt/z.a"),
    ];
    assert_eq!(
        outcome,
        BuildOutcome::Built {
            artifact: project.root().join("build/_ext.dll"),
            objects: expected.clone(),
        }
    );
    let calls = tc.calls();
    assert!(matches!(&calls[1], Call::Assemble { format, .. } if format == "win32"));
    assert!(matches!(&calls[2], Call::Link { objects, language, .. }
        if objects == &expected && *language == LinkLanguage::C));
}

#[test]
fn parallel_build_produces_ordered_link_line() {
    let names: Vec<String> = (0..12).map(|i| format!("src/f{i:02}.c")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let project = Project::new(&refs);
    let target = project.target(&refs, PlatformKey::Posix);

    let tc = FakeToolchain::default();
    let outcome = BuildStrategy::new(&tc, project.options().jobs(4))
        .build(&target)
        .unwrap();

    let expected: Vec<PathBuf> = (0..12)
        .map(|i| project.temp().join(format!("src/f{i:02}.o")))
        .collect();
    match outcome {
        BuildOutcome::Built { objects, .. } => assert_eq!(objects, expected),
        other => panic!("expected a build, got {other:?}"),
    }
    let calls = tc.calls();
    assert_eq!(calls.len(), 13);
    assert!(matches!(calls.last(), Some(Call::Link { .. })));
}

#[test]
fn parallel_failure_skips_link() {
    let names: Vec<String> = (0..8).map(|i| format!("f{i}.c")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let project = Project::new(&refs);
    let target = project.target(&refs, PlatformKey::Posix);
    let tc = FakeToolchain::failing_on(project.root().join("f3.c"));

    let err = BuildStrategy::new(&tc, project.options().jobs(3))
        .build(&target)
        .unwrap_err();

    assert!(matches!(err, BuildError::Compile { .. }));
    assert!(!tc.calls().iter().any(|c| matches!(c, Call::Link { .. })));
}

#[test]
fn flag_changes_need_tracking_to_trigger_rebuild() {
    let project = Project::new(&["a.c"]);
    let build = |macros: Vec<MacroDef>, track: bool| {
        let mut spec = project.spec(&["a.c"]);
        spec.macros = macros;
        let target =
            BuildTarget::new(spec, PlatformProfile::builtin(PlatformKey::Posix, Arch::X86_64))
                .unwrap();
        let staleness =
            BuildStrategy::new(&FakeToolchain::default(), project.options().track_flags(track))
                .staleness(&target)
                .unwrap();
        (target, staleness)
    };

    let (target, _) = build(vec![], true);
    BuildStrategy::new(&FakeToolchain::default(), project.options().track_flags(true))
        .build(&target)
        .unwrap();

    let (_, same) = build(vec![], true);
    assert_eq!(same, Staleness::Fresh);

    let (_, untracked) = build(vec![MacroDef::flag("NEW")], false);
    assert_eq!(untracked, Staleness::Fresh);

    let (_, tracked) = build(vec![MacroDef::flag("NEW")], true);
    assert_eq!(tracked, Staleness::Stale(StaleReason::FlagsChanged));
}

#[test]
fn plan_reports_without_invoking() {
    let project = Project::new(&["a.c", "v.m"]);
    let target = project.target(&["a.c", "v.m"], PlatformKey::Darwin);
    let tc = FakeToolchain::default();

    let plan = BuildStrategy::new(&tc, project.options()).plan(&target).unwrap();

    assert!(tc.calls().is_empty());
    assert_eq!(plan.language, LinkLanguage::ObjC);
    assert_eq!(plan.staleness, Staleness::Stale(StaleReason::ArtifactMissing));
    assert_eq!(plan.artifact, project.root().join("build/_ext.dylib"));
    assert_eq!(plan.objects.len(), 2);
}
