//! Graphics device contract.
//!
//! The cache does not talk to a graphics API directly. It compiles bytecode
//! into stages and builds pipelines through the device, asks it for the
//! default output, and destroys the objects it created through it. Devices
//! hand out copyable ids and keep the real objects on their side.

use std::fmt::Debug;

use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::layout::{ResourceLayout, VertexLayoutDescription};
use crate::state::{
    BlendState, CompareFunction, CullMode, FrontFace, PrimitiveTopology, ShaderStage,
    TextureFormat,
};

// ─── Object Ids ───────────────────────────────────────────────────────────────

/// Handle to a compiled shader stage owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub u64);

/// Handle to a render pipeline owned by the device.
///
/// Two calls that return equal ids refer to the same pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub u64);

// ─── Descriptors ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDescriptor<'a> {
    pub label: &'a str,
    pub stage: ShaderStage,
    pub entry_point: &'a str,
    pub bytecode: &'a [u8],
}

/// Render-target formats a pipeline writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputDescription {
    pub color_formats: SmallVec<[TextureFormat; 2]>,
    pub depth_format: Option<TextureFormat>,
    pub sample_count: u32,
}

impl OutputDescription {
    #[must_use]
    pub fn new(color: TextureFormat, depth: Option<TextureFormat>) -> Self {
        Self {
            color_formats: smallvec![color],
            depth_format: depth,
            sample_count: 1,
        }
    }

    #[must_use]
    pub fn with_color_target(mut self, format: TextureFormat) -> Self {
        self.color_formats.push(format);
        self
    }

    #[must_use]
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }
}

impl Default for OutputDescription {
    /// A typical sRGB swapchain with a 32-bit float depth buffer.
    fn default() -> Self {
        Self::new(TextureFormat::Bgra8UnormSrgb, Some(TextureFormat::Depth32Float))
    }
}

/// Everything the device needs to build one graphics pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RenderPipelineDescriptor<'a> {
    pub label: &'a str,
    pub vertex_module: ShaderModuleId,
    pub vertex_entry_point: &'a str,
    pub fragment_module: ShaderModuleId,
    pub fragment_entry_point: &'a str,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
    pub vertex_layouts: &'a [VertexLayoutDescription],
    pub resource_layouts: &'a [ResourceLayout],
    pub output: &'a OutputDescription,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DeviceError {
    /// The shader compiler rejected the bytecode.
    #[error("{details}")]
    Compilation { details: String },

    /// The pipeline state is inconsistent with the program or output.
    #[error("incompatible pipeline state: {0}")]
    IncompatibleState(String),

    /// An id did not refer to a live device object.
    #[error("unknown {kind} id {id}")]
    UnknownObject { kind: &'static str, id: u64 },

    #[error("backend error: {0}")]
    Backend(String),
}

// ─── Device Trait ─────────────────────────────────────────────────────────────

pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Compiles one shader stage from bytecode.
    ///
    /// ## Errors
    /// * `DeviceError::Compilation` - with the compiler's diagnostic text.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor<'_>,
    ) -> Result<ShaderModuleId, DeviceError>;

    /// Releases a compiled stage.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), DeviceError>;

    /// Builds a render pipeline from compiled stages and fixed-function state.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor<'_>,
    ) -> Result<RenderPipelineId, DeviceError>;

    /// Releases a render pipeline.
    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), DeviceError>;

    /// Output used when a pass does not override it (the current swapchain).
    fn default_output(&self) -> OutputDescription;
}
