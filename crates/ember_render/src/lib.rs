//! Ember Render
//!
//! Shader program registry and graphics pipeline cache.
//!
//! - [`device`]: the [`GraphicsDevice`] contract the cache builds on
//! - [`state`], [`layout`]: hashable render-state and layout descriptions
//! - [`program`]: program keys, sources and installed programs
//! - [`pipeline_key`]: pass descriptors and the composite pipeline key
//! - [`cache`]: the thread-safe [`ShaderPipelineCache`]
//! - [`headless`]: a GPU-less device for tools and tests

pub mod cache;
pub mod device;
pub mod headless;
pub mod layout;
pub mod pipeline_key;
pub mod program;
pub mod state;

#[cfg(feature = "wgpu")]
pub mod conversions;

pub use cache::ShaderPipelineCache;
pub use device::{
    DeviceError, GraphicsDevice, OutputDescription, RenderPipelineDescriptor, RenderPipelineId,
    ShaderModuleDescriptor, ShaderModuleId,
};
pub use headless::HeadlessDevice;
pub use layout::{
    ResourceKind, ResourceLayout, ResourceLayoutDescriptor, ResourceLayoutEntry, ResourceLayoutId,
    StageVisibility, VertexElement, VertexLayoutDescription, VertexSemantic,
};
pub use pipeline_key::{PassDescriptor, PipelineKey};
pub use program::{CompiledStage, DEFAULT_VARIANT, ProgramKey, ShaderProgram, ShaderSource};
pub use state::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, CompareFunction, CullMode, FrontFace,
    PrimitiveTopology, ShaderStage, TextureFormat, VertexFormat,
};
