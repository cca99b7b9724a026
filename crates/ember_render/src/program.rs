//! Shader programs and their keys.

use std::fmt;
use std::path::PathBuf;

use crate::device::ShaderModuleId;
use crate::state::ShaderStage;

/// Variant name used when the caller does not specify one.
pub const DEFAULT_VARIANT: &str = "Default";

/// Identity of a shader program: `(name, variant)`, compared ordinally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    name: String,
    variant: String,
}

impl ProgramKey {
    /// Creates a key; an empty variant maps to [`DEFAULT_VARIANT`].
    pub fn new(name: impl Into<String>, variant: impl Into<String>) -> Self {
        let variant = variant.into();
        Self {
            name: name.into(),
            variant: if variant.is_empty() {
                DEFAULT_VARIANT.to_owned()
            } else {
                variant
            },
        }
    }

    /// Key for the default variant of `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_VARIANT)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.variant)
    }
}

impl From<&str> for ProgramKey {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<(&str, &str)> for ProgramKey {
    fn from((name, variant): (&str, &str)) -> Self {
        Self::new(name, variant)
    }
}

/// Where a program's vertex and fragment code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// Two files, relative paths resolved against the configured shader directory.
    Files { vertex: PathBuf, fragment: PathBuf },
    /// Two in-memory bytecode buffers.
    Bytecode { vertex: Vec<u8>, fragment: Vec<u8> },
}

impl ShaderSource {
    pub fn files(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self::Files {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn bytecode(vertex: impl Into<Vec<u8>>, fragment: impl Into<Vec<u8>>) -> Self {
        Self::Bytecode {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_file_backed(&self) -> bool {
        matches!(self, Self::Files { .. })
    }
}

/// A compiled stage owned by a [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub module: ShaderModuleId,
}

/// One installation of a shader program inside the cache.
///
/// Programs are immutable once published: a reload installs a new
/// `ShaderProgram` with a higher generation instead of mutating this one, so a
/// holder of an `Arc<ShaderProgram>` always sees a complete stage set.
#[derive(Debug)]
pub struct ShaderProgram {
    key: ProgramKey,
    stages: Vec<CompiledStage>,
    source: ShaderSource,
    content_hash: u64,
    generation: u64,
}

impl ShaderProgram {
    pub(crate) fn new(
        key: ProgramKey,
        stages: Vec<CompiledStage>,
        source: ShaderSource,
        content_hash: u64,
        generation: u64,
    ) -> Self {
        Self {
            key,
            stages,
            source,
            content_hash,
            generation,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &ProgramKey {
        &self.key
    }

    /// Compiled stages in pipeline order (vertex first).
    #[inline]
    #[must_use]
    pub fn stages(&self) -> &[CompiledStage] {
        &self.stages
    }

    #[must_use]
    pub fn stage(&self, stage: ShaderStage) -> Option<ShaderModuleId> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.module)
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// xxh3 hash over the vertex and fragment bytecode.
    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    /// Installation counter; strictly increases on every (re)registration.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
