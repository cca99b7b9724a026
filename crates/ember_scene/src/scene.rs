use std::sync::atomic::{AtomicU32, Ordering};

use ember_core::{EmberError, Result};
use glam::Affine3A;
use slotmap::SlotMap;

use crate::ObjectHandle;
use crate::object::GameObject;
use crate::transform::Transform;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Arena-backed tree of [`GameObject`]s.
///
/// Objects live in a slot map and are addressed by [`ObjectHandle`]. Objects
/// without a parent are roots; root order is insertion order.
#[derive(Debug)]
pub struct Scene {
    id: u32,
    pub name: String,
    objects: SlotMap<ObjectHandle, GameObject>,
    root_objects: Vec<ObjectHandle>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene")
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            objects: SlotMap::with_key(),
            root_objects: Vec::new(),
        }
    }

    /// Process-unique id of this scene instance.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Starts building an object.
    pub fn build_object(&'_ mut self, name: &str) -> ObjectBuilder<'_> {
        ObjectBuilder::new(self, name)
    }

    /// Creates an empty root object.
    pub fn create_object(&mut self, name: &str) -> ObjectHandle {
        self.add_object(GameObject::new(name))
    }

    /// Inserts `object` as a new root.
    pub fn add_object(&mut self, mut object: GameObject) -> ObjectHandle {
        object.parent = None;
        object.children.clear();
        let handle = self.objects.insert(object);
        self.root_objects.push(handle);
        handle
    }

    /// Inserts `object` as the last child of `parent`.
    pub fn add_child(&mut self, parent: ObjectHandle, mut object: GameObject) -> Result<ObjectHandle> {
        if !self.objects.contains_key(parent) {
            return Err(missing(parent));
        }
        object.parent = Some(parent);
        object.children.clear();
        let handle = self.objects.insert(object);
        if let Some(p) = self.objects.get_mut(parent) {
            p.children.push(handle);
        }
        Ok(handle)
    }

    /// Creates an empty object as the last child of `parent`.
    pub fn create_child(&mut self, parent: ObjectHandle, name: &str) -> Result<ObjectHandle> {
        self.add_child(parent, GameObject::new(name))
    }

    /// Removes an object and its whole subtree.
    ///
    /// Returns the number of removed objects (0 for a stale handle).
    pub fn remove_object(&mut self, handle: ObjectHandle) -> usize {
        if !self.objects.contains_key(handle) {
            return 0;
        }
        self.unlink(handle);

        let mut removed = 0;
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(object) = self.objects.remove(current) {
                stack.extend(object.children);
                removed += 1;
            }
        }
        removed
    }

    /// Re-parents `child` as the last child of `parent`.
    ///
    /// Attaching an object to itself or to one of its descendants is rejected
    /// and leaves the tree unchanged.
    pub fn attach(&mut self, child: ObjectHandle, parent: ObjectHandle) -> Result<()> {
        if !self.objects.contains_key(child) {
            return Err(missing(child));
        }
        if !self.objects.contains_key(parent) {
            return Err(missing(parent));
        }
        if child == parent || self.is_ancestor(child, parent) {
            log::warn!("Cannot attach an object below itself");
            return Err(EmberError::InvalidHierarchy(format!(
                "{parent:?} is inside the subtree of {child:?}"
            )));
        }

        self.unlink(child);
        if let Some(p) = self.objects.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.objects.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Turns `handle` into a root, keeping its subtree. Roots stay where they are.
    pub fn detach(&mut self, handle: ObjectHandle) -> Result<()> {
        let Some(object) = self.objects.get(handle) else {
            return Err(missing(handle));
        };
        if object.parent.is_none() {
            return Ok(());
        }
        self.unlink(handle);
        if let Some(object) = self.objects.get_mut(handle) {
            object.parent = None;
        }
        self.root_objects.push(handle);
        Ok(())
    }

    /// Removes `handle` from its parent's child list or from the root list.
    fn unlink(&mut self, handle: ObjectHandle) {
        let parent = self.objects.get(handle).and_then(GameObject::parent);
        let siblings = match parent {
            Some(p) => self.objects.get_mut(p).map(|p| &mut p.children),
            None => Some(&mut self.root_objects),
        };
        if let Some(list) = siblings
            && let Some(pos) = list.iter().position(|&h| h == handle)
        {
            list.remove(pos);
        }
    }

    /// Whether `ancestor` is a strict ancestor of `handle`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: ObjectHandle, handle: ObjectHandle) -> bool {
        let mut current = self.objects.get(handle).and_then(GameObject::parent);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.objects.get(h).and_then(GameObject::parent);
        }
        false
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn get(&self, handle: ObjectHandle) -> Option<&GameObject> {
        self.objects.get(handle)
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut GameObject> {
        self.objects.get_mut(handle)
    }

    #[must_use]
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn root_objects(&self) -> &[ObjectHandle] {
        &self.root_objects
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &GameObject)> {
        self.objects.iter()
    }

    /// First object named `name`, searching roots depth-first in order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<ObjectHandle> {
        self.root_objects
            .iter()
            .flat_map(|&root| self.subtree(root))
            .find(|&h| self.objects.get(h).is_some_and(|o| o.name == name))
    }

    /// Handles of `root` and all its descendants in pre-order (parent before
    /// children, children in order). Empty for a stale handle.
    #[must_use]
    pub fn subtree(&self, root: ObjectHandle) -> Vec<ObjectHandle> {
        let mut out = Vec::new();
        if !self.objects.contains_key(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(object) = self.objects.get(current) {
                stack.extend(object.children.iter().rev());
            }
        }
        out
    }

    /// Local-to-world matrix of `handle`, composed up the parent chain.
    #[must_use]
    pub fn world_matrix(&self, handle: ObjectHandle) -> Option<Affine3A> {
        let object = self.objects.get(handle)?;
        let mut matrix = object.transform.local_matrix();
        let mut current = object.parent;
        while let Some(h) = current {
            let parent = self.objects.get(h)?;
            matrix = parent.transform.local_matrix() * matrix;
            current = parent.parent;
        }
        Some(matrix)
    }
}

fn missing(handle: ObjectHandle) -> EmberError {
    EmberError::ObjectNotFound(format!("{handle:?}"))
}

// ============================================================================
// Object Builder
// ============================================================================

pub struct ObjectBuilder<'a> {
    scene: &'a mut Scene,
    object: GameObject,
    parent: Option<ObjectHandle>,
}

impl<'a> ObjectBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            object: GameObject::new(name),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.object.transform = transform;
        self
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.object.transform.position = glam::Vec3::new(x, y, z);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.object.tag = tag.to_owned();
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.object.layer = layer;
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.object.active = false;
        self
    }

    #[must_use]
    pub fn with_component<T: crate::ComponentType>(mut self, component: T) -> Self {
        self.object.add_component(component);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ObjectHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Inserts the object; a stale parent handle is an `ObjectNotFound` error.
    pub fn build(self) -> Result<ObjectHandle> {
        match self.parent {
            Some(parent) => self.scene.add_child(parent, self.object),
            None => Ok(self.scene.add_object(self.object)),
        }
    }
}
