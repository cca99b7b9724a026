//! Pass descriptors and the composite pipeline cache key.
//!
//! A [`PassDescriptor`] is what render code asks for. The cache resolves its
//! optional output override against the device's default output and turns it
//! into a [`PipelineKey`], which carries every input that affects pipeline
//! identity:
//!
//! | Field              | Compared by                                        |
//! |--------------------|----------------------------------------------------|
//! | `program`          | `(name, variant)`                                  |
//! | rasterizer state   | topology, cull mode, front face                    |
//! | depth state        | test flag, write flag, compare function            |
//! | `blend`            | full color + alpha equations                       |
//! | `vertex_layouts`   | structure (element name/semantic/format, step rate) |
//! | `resource_layouts` | identity of each layout object, in order           |
//! | `output`           | color formats, depth format, sample count          |

use std::hash::{Hash, Hasher};

use crate::device::OutputDescription;
use crate::layout::{ResourceLayout, VertexLayoutDescription};
use crate::program::ProgramKey;
use crate::state::{BlendState, CompareFunction, CullMode, FrontFace, PrimitiveTopology};

// ─── Pass Descriptor ──────────────────────────────────────────────────────────

/// Caller-side description of the render state a pass needs.
///
/// Defaults: triangle list, back-face culling, counter-clockwise front faces,
/// depth test and write enabled with `LessEqual`, no blending, no vertex or
/// resource layouts, device default output.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub program: ProgramKey,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
    pub vertex_layouts: Vec<VertexLayoutDescription>,
    pub resource_layouts: Vec<ResourceLayout>,
    /// Render-target override; `None` means the device's current swapchain output.
    pub output: Option<OutputDescription>,
}

impl PassDescriptor {
    pub fn new(program: impl Into<ProgramKey>) -> Self {
        Self {
            program: program.into(),
            topology: PrimitiveTopology::default(),
            cull_mode: CullMode::default(),
            front_face: FrontFace::default(),
            depth_test: true,
            depth_write: true,
            depth_compare: CompareFunction::default(),
            blend: None,
            vertex_layouts: Vec::new(),
            resource_layouts: Vec::new(),
            output: None,
        }
    }

    #[must_use]
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    #[must_use]
    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    #[must_use]
    pub fn with_front_face(mut self, front_face: FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    #[must_use]
    pub fn with_depth_compare(mut self, compare: CompareFunction) -> Self {
        self.depth_compare = compare;
        self
    }

    #[must_use]
    pub fn with_blend(mut self, blend: Option<BlendState>) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_vertex_layout(mut self, layout: VertexLayoutDescription) -> Self {
        self.vertex_layouts.push(layout);
        self
    }

    #[must_use]
    pub fn with_resource_layout(mut self, layout: ResourceLayout) -> Self {
        self.resource_layouts.push(layout);
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputDescription) -> Self {
        self.output = Some(output);
        self
    }
}

// ─── Pipeline Key ─────────────────────────────────────────────────────────────

/// Composite cache key. Equal keys share one pipeline; any differing field
/// yields a separate cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramKey,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
    pub vertex_layouts: Vec<VertexLayoutDescription>,
    pub resource_layouts: Vec<ResourceLayout>,
    pub output: OutputDescription,
}

impl PipelineKey {
    /// Builds the key for `pass`, using `default_output` when the pass has no
    /// output override.
    #[must_use]
    pub fn from_pass(pass: &PassDescriptor, default_output: OutputDescription) -> Self {
        Self {
            program: pass.program.clone(),
            topology: pass.topology,
            cull_mode: pass.cull_mode,
            front_face: pass.front_face,
            depth_test: pass.depth_test,
            depth_write: pass.depth_write,
            depth_compare: pass.depth_compare,
            blend: pass.blend,
            vertex_layouts: pass.vertex_layouts.clone(),
            resource_layouts: pass.resource_layouts.clone(),
            output: pass.output.clone().unwrap_or(default_output),
        }
    }
}

/// Compute a `u64` hash of any `Hash`-able value using `FxHasher`.
#[inline]
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}
