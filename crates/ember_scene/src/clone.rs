//! Deep cloning of object trees.
//!
//! Cloning runs in two phases. The source subtree is first captured into a
//! [`SubtreeSnapshot`], cloning every component through the registry. Only
//! when that succeeds is the snapshot materialized into the destination, so a
//! failure (e.g. an unregistered component type) leaves the destination scene
//! untouched.
//!
//! Snapshots are flat pre-order lists with parent indices. Capturing,
//! materializing and dropping them never recurses, so tree depth is bounded
//! only by memory.

use ember_core::{EmberError, Result};
use rustc_hash::FxHashMap;

use crate::ObjectHandle;
use crate::component::{Component, ComponentRegistry};
use crate::object::GameObject;
use crate::scene::Scene;
use crate::transform::Transform;

/// Detached copy of one object inside a [`SubtreeSnapshot`].
#[derive(Debug)]
pub struct SnapshotNode {
    pub name: String,
    pub tag: String,
    pub layer: u32,
    pub active: bool,
    pub transform: Transform,
    pub components: Vec<Box<dyn Component>>,
    /// Index of the parent node; `None` only for the snapshot root.
    parent: Option<usize>,
}

impl SnapshotNode {
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }
}

/// Detached copy of an object and its descendants, in pre-order.
///
/// A parent always precedes its children and siblings keep their order.
#[derive(Debug)]
pub struct SubtreeSnapshot {
    nodes: Vec<SnapshotNode>,
}

impl SubtreeSnapshot {
    /// Number of objects in the snapshot, root included.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn nodes(&self) -> &[SnapshotNode] {
        &self.nodes
    }

    /// Inserts the snapshot into `scene`, under `parent` or as a new root.
    /// Returns the handle of the inserted root.
    pub fn materialize(self, scene: &mut Scene, parent: Option<ObjectHandle>) -> Result<ObjectHandle> {
        if let Some(parent) = parent
            && !scene.contains(parent)
        {
            return Err(EmberError::ObjectNotFound(format!("{parent:?} in scene '{}'", scene.name)));
        }

        let mut handles: Vec<ObjectHandle> = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.into_iter().enumerate() {
            let SnapshotNode {
                name,
                tag,
                layer,
                active,
                transform,
                components,
                parent: node_parent,
            } = node;

            let mut object = GameObject::new(name)
                .with_tag(tag)
                .with_layer(layer)
                .with_transform(transform);
            object.active = active;
            for component in components {
                object.add_boxed_component(component);
            }

            let target = match node_parent {
                Some(p) => Some(*handles.get(p).ok_or_else(|| {
                    EmberError::InvalidHierarchy(format!("snapshot node {index} references later node {p}"))
                })?),
                None => parent,
            };
            let handle = match target {
                Some(target) => scene.add_child(target, object)?,
                None => scene.add_object(object),
            };
            handles.push(handle);
        }

        handles
            .first()
            .copied()
            .ok_or_else(|| EmberError::InvalidHierarchy("empty snapshot".into()))
    }
}

/// Clones object trees within or across scenes.
#[derive(Debug, Clone, Copy)]
pub struct SceneCloner<'r> {
    registry: &'r ComponentRegistry,
}

impl<'r> SceneCloner<'r> {
    #[must_use]
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Captures `root` and its descendants with independent component state.
    ///
    /// Components without a state codec are captured in their default state.
    pub fn snapshot(&self, scene: &Scene, root: ObjectHandle) -> Result<SubtreeSnapshot> {
        if !scene.contains(root) {
            return Err(EmberError::ObjectNotFound(format!("{root:?} in scene '{}'", scene.name)));
        }

        let order = scene.subtree(root);
        let mut index_of: FxHashMap<ObjectHandle, usize> = FxHashMap::default();
        let mut nodes = Vec::with_capacity(order.len());

        for handle in order {
            let Some(object) = scene.get(handle) else {
                continue;
            };
            let components = object
                .components()
                .iter()
                .map(|component| self.registry.clone_component(&**component))
                .collect::<Result<Vec<_>>>()?;

            let parent = if handle == root {
                None
            } else {
                object.parent().and_then(|p| index_of.get(&p).copied())
            };
            index_of.insert(handle, nodes.len());
            nodes.push(SnapshotNode {
                name: object.name.clone(),
                tag: object.tag.clone(),
                layer: object.layer,
                active: object.active,
                transform: object.transform,
                components,
                parent,
            });
        }

        Ok(SubtreeSnapshot { nodes })
    }

    /// Deep-clones `root` from `src` into `dst` as a new root object.
    ///
    /// ## Errors
    /// * `ObjectNotFound` - `root` is not in `src`.
    /// * `ComponentNotRegistered` - a component type has no factory.
    /// * `Codec` - a component's state did not round-trip.
    pub fn clone_tree(&self, src: &Scene, root: ObjectHandle, dst: &mut Scene) -> Result<ObjectHandle> {
        let snapshot = self.snapshot(src, root)?;
        let count = snapshot.object_count();
        let handle = snapshot.materialize(dst, None)?;
        log::debug!(
            "Cloned {count} objects from scene '{}' into scene '{}'",
            src.name,
            dst.name
        );
        Ok(handle)
    }

    /// Deep-clones `root` inside `scene` as a new root object.
    pub fn duplicate(&self, scene: &mut Scene, root: ObjectHandle) -> Result<ObjectHandle> {
        let snapshot = self.snapshot(scene, root)?;
        snapshot.materialize(scene, None)
    }
}
