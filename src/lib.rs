#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Ember Engine
//!
//! Umbrella crate over the Ember subsystems:
//! - [`EmberError`], [`EngineSettings`]: errors and settings from `ember_core`
//! - [`render`]: shader program registry and pipeline cache
//! - [`scene`]: object hierarchy, cloning and prefabs

pub use ember_render as render;
pub use ember_scene as scene;

pub use ember_core::{EmberError, EngineSettings, Result};
pub use ember_render::{
    GraphicsDevice, HeadlessDevice, PassDescriptor, ProgramKey, ShaderPipelineCache, ShaderProgram,
    ShaderSource,
};
pub use ember_scene::{
    Component, ComponentRegistry, ComponentType, GameObject, JsonSceneSerializer, ObjectHandle,
    PrefabAsset, PrefabSystem, Scene, SceneCloner, SceneSerializer, Transform,
};

pub use glam;

pub mod prelude {
    pub use ember_core::{EmberError, EngineSettings, Result};
    pub use ember_render::{
        BlendState, CullMode, GraphicsDevice, HeadlessDevice, OutputDescription, PassDescriptor,
        PrimitiveTopology, ProgramKey, ShaderPipelineCache, ShaderSource, TextureFormat,
    };
    pub use ember_scene::{
        BinaryState, ByteReader, ByteWriter, ComponentRegistry, ComponentType, GameObject,
        JsonSceneSerializer, ObjectHandle, PrefabAsset, PrefabSystem, Scene, SceneCloner,
        SceneSerializer, Transform,
    };
    pub use glam::{Quat, Vec3};
}
