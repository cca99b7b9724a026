//! Ember Scene
//!
//! Object hierarchy, deep cloning and prefabs:
//! - [`scene`], [`object`], [`transform`]: the arena-backed object tree
//! - [`component`], [`components`], [`codec`]: dynamic components, their
//!   registry and binary state
//! - [`clone`]: atomic deep copies of subtrees within or across scenes
//! - [`serializer`]: the JSON scene format
//! - [`prefab`]: reusable serialized subtrees

pub mod clone;
pub mod codec;
pub mod component;
pub mod components;
pub mod object;
pub mod prefab;
pub mod scene;
pub mod serializer;
pub mod transform;

slotmap::new_key_type! {
    /// Stable handle to a [`GameObject`] inside one [`Scene`].
    pub struct ObjectHandle;
}

pub use clone::{SceneCloner, SnapshotNode, SubtreeSnapshot};
pub use codec::{ByteReader, ByteWriter};
pub use component::{BinaryState, Component, ComponentRegistry, ComponentType};
pub use components::{CullingState, MeshRenderer, PointLight};
pub use object::{DEFAULT_TAG, GameObject};
pub use prefab::{PrefabAsset, PrefabSystem};
pub use scene::{ObjectBuilder, Scene};
pub use serializer::{
    ComponentRecord, JsonSceneSerializer, ObjectRecord, SCENE_FORMAT_VERSION, SceneDocument,
    SceneSerializer,
};
pub use transform::Transform;
