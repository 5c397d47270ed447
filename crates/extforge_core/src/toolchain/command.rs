//! Argument-vector construction for each toolchain convention.
//!
//! These are pure functions of their requests so that command lines can be
//! checked without spawning anything.

use std::ffi::OsString;
use std::path::{Path, MAIN_SEPARATOR};

use crate::link::LinkLanguage;
use crate::macros::MacroDef;
use crate::platform::PlatformKey;
use crate::source::SourceType;

use super::{AssembleRequest, CompileRequest, LinkRequest};

fn joined(prefix: &str, rest: impl AsRef<std::ffi::OsStr>) -> OsString {
    let mut s = OsString::from(prefix);
    s.push(rest.as_ref());
    s
}

/// `-DNAME`, `-DNAME=VALUE`, `-UNAME` (also understood by NASM).
fn dash_macro(m: &MacroDef) -> OsString {
    match m {
        MacroDef::Define { name, value: None } => OsString::from(format!("-D{name}")),
        MacroDef::Define {
            name,
            value: Some(v),
        } => OsString::from(format!("-D{name}={v}")),
        MacroDef::Undefine { name } => OsString::from(format!("-U{name}")),
    }
}

fn slash_macro(m: &MacroDef) -> OsString {
    match m {
        MacroDef::Define { name, value: None } => OsString::from(format!("/D{name}")),
        MacroDef::Define {
            name,
            value: Some(v),
        } => OsString::from(format!("/D{name}={v}")),
        MacroDef::Undefine { name } => OsString::from(format!("/U{name}")),
    }
}

/// GNU-style compile: `-D.. -I.. -c [-g] src -o obj args..`.
pub fn gnu_compile(req: &CompileRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = req.macros.iter().map(dash_macro).collect();
    args.extend(req.include_dirs.iter().map(|d| joined("-I", d)));
    args.push("-c".into());
    if req.debug {
        args.push("-g".into());
    }
    args.push(req.source.path().into());
    args.push("-o".into());
    args.push(req.object.into());
    args.extend(req.args.iter().map(OsString::from));
    args
}

/// MSVC `cl.exe` compile. Returns `None` for source types `cl` cannot build.
pub fn msvc_compile(req: &CompileRequest<'_>) -> Option<Vec<OsString>> {
    let mut args: Vec<OsString> = vec!["/nologo".into(), "/c".into()];
    let opt: &[&str] = if req.debug {
        &["/Od", "/W3", "/Zi", "/D_DEBUG"]
    } else {
        &["/Ox", "/W3", "/DNDEBUG"]
    };
    args.extend(opt.iter().map(OsString::from));
    args.extend(req.macros.iter().map(slash_macro));
    args.extend(req.include_dirs.iter().map(|d| joined("/I", d)));
    let source = req.source.path();
    match req.source.kind() {
        SourceType::C => args.push(joined("/Tc", source)),
        SourceType::Cpp => args.push(joined("/Tp", source)),
        SourceType::Other => args.push(source.into()),
        SourceType::ObjC | SourceType::Asm => return None,
    }
    args.push(joined("/Fo", req.object));
    args.extend(req.args.iter().map(OsString::from));
    Some(args)
}

/// NASM include directories must end with a separator.
fn nasm_include(dir: &Path) -> OsString {
    let mut s = dir.as_os_str().to_os_string();
    let text = dir.to_string_lossy();
    if !text.ends_with('/') && !text.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR.to_string());
    }
    joined("-I", s)
}

/// NASM assemble: `args.. -f fmt -D.. -I../ -o obj src`.
pub fn nasm_assemble(req: &AssembleRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = req.args.iter().map(OsString::from).collect();
    args.push("-f".into());
    args.push(req.format.into());
    args.extend(req.macros.iter().map(dash_macro));
    args.extend(req.include_dirs.iter().map(|d| nasm_include(d)));
    args.push("-o".into());
    args.push(req.object.into());
    args.push(req.source.path().into());
    args
}

/// GNU-style shared link through the compiler driver.
pub fn gnu_link(req: &LinkRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if req.debug {
        args.push("-g".into());
    }
    match req.platform {
        PlatformKey::Darwin => {
            args.push("-dynamiclib".into());
            args.push("-undefined".into());
            args.push("dynamic_lookup".into());
            args.push(joined("-Wl,-install_name,", req.artifact));
        }
        PlatformKey::Posix | PlatformKey::Win32 => args.push("-shared".into()),
    }
    args.extend(req.objects.iter().map(OsString::from));
    args.extend(req.library_dirs.iter().map(|d| joined("-L", d)));
    args.extend(
        req.runtime_library_dirs
            .iter()
            .map(|d| joined("-Wl,-rpath,", d)),
    );
    args.extend(req.libraries.iter().map(|l| OsString::from(format!("-l{l}"))));
    args.push("-o".into());
    args.push(req.output.into());
    args.extend(req.args.iter().map(OsString::from));
    args
}

/// MSVC `link.exe` DLL link. Runtime library dirs have no equivalent.
pub fn msvc_link(req: &LinkRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["/nologo".into(), "/DLL".into(), "/INCREMENTAL:NO".into()];
    if req.debug {
        args.push("/DEBUG".into());
    }
    args.extend(req.objects.iter().map(OsString::from));
    args.extend(req.library_dirs.iter().map(|d| joined("/LIBPATH:", d)));
    args.extend(req.libraries.iter().map(|l| {
        if l.to_ascii_lowercase().ends_with(".lib") {
            OsString::from(l)
        } else {
            OsString::from(format!("{l}.lib"))
        }
    }));
    args.push(joined("/OUT:", req.output));
    args.push(joined("/IMPLIB:", &req.artifact.with_extension("lib")));
    args.extend(req.args.iter().map(OsString::from));
    args
}

/// Picks the GNU link driver: the C++ driver for C++ links, else the C one.
pub fn gnu_link_driver<'p>(language: LinkLanguage, cc: &'p str, cxx: &'p str) -> &'p str {
    match language {
        LinkLanguage::Cpp => cxx,
        LinkLanguage::C | LinkLanguage::ObjC => cc,
    }
}

/// Converts an argument vector to strings, for assertions and reports.
pub fn to_strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFile;
    use std::path::PathBuf;

    fn compile_req<'a>(
        source: &'a SourceFile,
        macros: &'a [MacroDef],
        includes: &'a [PathBuf],
        args: &'a [String],
        debug: bool,
    ) -> CompileRequest<'a> {
        CompileRequest {
            source,
            object: Path::new("build/temp/a.o"),
            include_dirs: includes,
            macros,
            args,
            debug,
        }
    }

    #[test]
    fn gnu_compile_layout() {
        let src = SourceFile::new("src/a.c");
        let macros = [MacroDef::define("HAVE_SSE42", "0"), MacroDef::undef("NDEBUG")];
        let includes = [PathBuf::from("include")];
        let extra = ["-std=c99".to_string()];
        let args = to_strings(&gnu_compile(&compile_req(&src, &macros, &includes, &extra, true)));
        assert_eq!(
            args,
            [
                "-DHAVE_SSE42=0",
                "-UNDEBUG",
                "-Iinclude",
                "-c",
                "-g",
                "src/a.c",
                "-o",
                "build/temp/a.o",
                "-std=c99"
            ]
        );
    }

    #[test]
    fn msvc_compile_selects_language_switch() {
        let c = SourceFile::new("a.c");
        let cpp = SourceFile::new("b.cpp");
        let args = to_strings(&msvc_compile(&compile_req(&c, &[], &[], &[], false)).unwrap());
        assert!(args.contains(&"/Tca.c".to_string()));
        assert!(args.contains(&"/DNDEBUG".to_string()));
        let args = to_strings(&msvc_compile(&compile_req(&cpp, &[], &[], &[], true)).unwrap());
        assert!(args.contains(&"/Tpb.cpp".to_string()));
        assert!(args.contains(&"/Zi".to_string()));
        assert!(args.contains(&"/Fobuild/temp/a.o".to_string()));
    }

    #[test]
    fn msvc_rejects_objc() {
        let m = SourceFile::new("view.m");
        assert!(msvc_compile(&compile_req(&m, &[], &[], &[], false)).is_none());
    }

    #[test]
    fn nasm_layout() {
        let src = SourceFile::new("simd/jsimdcpu.asm");
        let macros = [MacroDef::flag("ELF"), MacroDef::define("TURBO", "0")];
        let includes = [PathBuf::from("simd/nasm"), PathBuf::from("simd/x86_64/")];
        let extra = ["-Ox".to_string()];
        let req = AssembleRequest {
            source: &src,
            object: Path::new("t/jsimdcpu.o"),
            include_dirs: &includes,
            macros: &macros,
            args: &extra,
            format: "elf64",
        };
        let args = to_strings(&nasm_assemble(&req));
        let sep = MAIN_SEPARATOR;
        assert_eq!(
            args,
            [
                "-Ox".to_string(),
                "-f".to_string(),
                "elf64".to_string(),
                "-DELF".to_string(),
                "-DTURBO=0".to_string(),
                format!("-Isimd/nasm{sep}"),
                "-Isimd/x86_64/".to_string(),
                "-o".to_string(),
                "t/jsimdcpu.o".to_string(),
                "simd/jsimdcpu.asm".to_string(),
            ]
        );
    }

    fn link_req<'a>(
        objects: &'a [PathBuf],
        libraries: &'a [String],
        args: &'a [String],
        rpath: &'a [PathBuf],
        platform: PlatformKey,
    ) -> LinkRequest<'a> {
        LinkRequest {
            objects,
            output: Path::new("build/.ext.so.partial"),
            artifact: Path::new("build/ext.so"),
            libraries,
            library_dirs: &[],
            runtime_library_dirs: rpath,
            args,
            language: LinkLanguage::Cpp,
            platform,
            debug: false,
        }
    }

    #[test]
    fn gnu_link_layout() {
        let objects = [PathBuf::from("a.o"), PathBuf::from("b.o")];
        let libs = ["rt".to_string(), "m".to_string()];
        let extra = ["-flto".to_string()];
        let rpath = [PathBuf::from("/opt/lib")];
        let args = to_strings(&gnu_link(&link_req(
            &objects,
            &libs,
            &extra,
            &rpath,
            PlatformKey::Posix,
        )));
        assert_eq!(
            args,
            [
                "-shared",
                "a.o",
                "b.o",
                "-Wl,-rpath,/opt/lib",
                "-lrt",
                "-lm",
                "-o",
                "build/.ext.so.partial",
                "-flto"
            ]
        );
    }

    #[test]
    fn darwin_link_uses_dynamic_lookup() {
        let objects = [PathBuf::from("a.o")];
        let args = to_strings(&gnu_link(&link_req(&objects, &[], &[], &[], PlatformKey::Darwin)));
        assert_eq!(&args[..3], ["-dynamiclib", "-undefined", "dynamic_lookup"]);
        assert_eq!(args[3], "-Wl,-install_name,build/ext.so");
        assert!(!args[3].contains("partial"));
    }

    #[test]
    fn msvc_link_appends_lib_suffix() {
        let objects = [PathBuf::from("a.obj")];
        let libs = ["ole32".to_string(), "custom.lib".to_string()];
        let args = to_strings(&msvc_link(&link_req(&objects, &libs, &[], &[], PlatformKey::Win32)));
        assert!(args.contains(&"ole32.lib".to_string()));
        assert!(args.contains(&"custom.lib".to_string()));
        assert!(args.contains(&"/DLL".to_string()));
        assert!(args.contains(&"/OUT:build/.ext.so.partial".to_string()));
        assert!(args.contains(&"/IMPLIB:build/ext.lib".to_string()));
    }

    #[test]
    fn link_driver_follows_language() {
        assert_eq!(gnu_link_driver(LinkLanguage::Cpp, "cc", "c++"), "c++");
        assert_eq!(gnu_link_driver(LinkLanguage::C, "cc", "c++"), "cc");
        assert_eq!(gnu_link_driver(LinkLanguage::ObjC, "cc", "c++"), "cc");
    }
}
