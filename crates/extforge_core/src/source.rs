//! Source files and extension-based classification into toolchain buckets.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The toolchain bucket a source file belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// C (`.c`).
    C,
    /// C++ (`.cpp`, `.cxx`, `.cc`).
    Cpp,
    /// Objective-C (`.m`).
    ObjC,
    /// Assembly (`.asm`, `.s`, `.S`).
    Asm,
    /// Anything unmatched; compiled with generic flags only.
    Other,
}

impl SourceType {
    /// Classifies a path by its extension, case-insensitively.
    ///
    /// Never opens the file. Unknown or missing extensions map to
    /// [`SourceType::Other`].
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Other;
        };
        match ext.to_ascii_lowercase().as_str() {
            "c" => Self::C,
            "cpp" | "cxx" | "cc" => Self::Cpp,
            "m" => Self::ObjC,
            "asm" | "s" => Self::Asm,
            _ => Self::Other,
        }
    }

    /// Short lowercase label used in logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "c++",
            Self::ObjC => "objc",
            Self::Asm => "asm",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A source path paired with the type derived from it at construction.
///
/// The type is computed once and never reclassified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    path: PathBuf,
    kind: SourceType,
}

impl SourceFile {
    /// Creates a source file, classifying it by extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = SourceType::from_path(&path);
        Self { path, kind }
    }

    /// Returns the source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the source type.
    pub fn kind(&self) -> SourceType {
        self.kind
    }
}

/// Sources partitioned by type, each bucket in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Buckets {
    /// C sources.
    pub c: Vec<SourceFile>,
    /// C++ sources.
    pub cpp: Vec<SourceFile>,
    /// Objective-C sources.
    pub objc: Vec<SourceFile>,
    /// Assembly sources.
    pub asm: Vec<SourceFile>,
    /// Unmatched sources.
    pub other: Vec<SourceFile>,
}

impl Buckets {
    /// Returns the bucket for the given type.
    pub fn get(&self, kind: SourceType) -> &[SourceFile] {
        match kind {
            SourceType::C => &self.c,
            SourceType::Cpp => &self.cpp,
            SourceType::ObjC => &self.objc,
            SourceType::Asm => &self.asm,
            SourceType::Other => &self.other,
        }
    }

    /// Iterates the sources handled by the compile driver, in compile order:
    /// C, C++, Objective-C, then Other.
    pub fn compiled(&self) -> impl Iterator<Item = &SourceFile> {
        self.c
            .iter()
            .chain(&self.cpp)
            .chain(&self.objc)
            .chain(&self.other)
    }

    /// Total number of sources across all buckets.
    pub fn len(&self) -> usize {
        self.c.len() + self.cpp.len() + self.objc.len() + self.asm.len() + self.other.len()
    }

    /// Returns `true` if every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions sources into the five type buckets, preserving relative order.
pub fn classify(sources: &[SourceFile]) -> Buckets {
    let mut buckets = Buckets::default();
    for source in sources {
        let bucket = match source.kind() {
            SourceType::C => &mut buckets.c,
            SourceType::Cpp => &mut buckets.cpp,
            SourceType::ObjC => &mut buckets.objc,
            SourceType::Asm => &mut buckets.asm,
            SourceType::Other => &mut buckets.other,
        };
        bucket.push(source.clone());
    }
    buckets
}
