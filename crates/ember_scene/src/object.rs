use std::fmt;

use crate::ObjectHandle;
use crate::component::{Component, ComponentType};
use crate::transform::Transform;

/// Tag given to objects that were not tagged explicitly.
pub const DEFAULT_TAG: &str = "Untagged";

/// A node of the scene tree.
///
/// # Hierarchy
///
/// `parent` and `children` are maintained by [`Scene`](crate::Scene) and are
/// read-only here; use [`Scene::attach`](crate::Scene::attach) and
/// [`Scene::detach`](crate::Scene::detach) to restructure the tree. Child
/// order is significant and is preserved by cloning and serialization.
pub struct GameObject {
    pub name: String,
    pub tag: String,
    pub layer: u32,
    pub active: bool,
    /// Local transform relative to the parent.
    pub transform: Transform,

    components: Vec<Box<dyn Component>>,

    pub(crate) parent: Option<ObjectHandle>,
    pub(crate) children: Vec<ObjectHandle>,
}

impl GameObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: DEFAULT_TAG.to_owned(),
            layer: 0,
            active: true,
            transform: Transform::IDENTITY,
            components: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_component<T: ComponentType>(mut self, component: T) -> Self {
        self.add_component(component);
        self
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ObjectHandle] {
        &self.children
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Appends a component. Several components of the same type are allowed.
    pub fn add_component<T: ComponentType>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    /// Appends an already boxed component (e.g. one created by a registry).
    pub fn add_boxed_component(&mut self, component: Box<dyn Component>) {
        self.components.push(component);
    }

    /// Components in attachment order.
    #[must_use]
    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    /// First component of type `T`.
    #[must_use]
    pub fn component<T: ComponentType>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| c.downcast_ref::<T>())
    }

    #[must_use]
    pub fn component_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        self.components.iter_mut().find_map(|c| c.downcast_mut::<T>())
    }

    /// Removes and returns the first component of type `T`.
    pub fn remove_component<T: ComponentType>(&mut self) -> Option<Box<dyn Component>> {
        let index = self.components.iter().position(|c| c.is::<T>())?;
        Some(self.components.remove(index))
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let component_names: Vec<&str> = self.components.iter().map(|c| c.type_name()).collect();
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("layer", &self.layer)
            .field("active", &self.active)
            .field("transform", &self.transform)
            .field("components", &component_names)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MeshRenderer, PointLight};

    #[test]
    fn components_keep_attachment_order() {
        let mut object = GameObject::new("lamp")
            .with_component(MeshRenderer::new("lamp.mesh", "brass"))
            .with_component(PointLight::default());
        object.add_component(MeshRenderer::new("shade.mesh", "cloth"));

        let names: Vec<&str> = object.components().iter().map(|c| c.type_name()).collect();
        assert_eq!(names, ["MeshRenderer", "PointLight", "MeshRenderer"]);
        assert_eq!(object.component::<MeshRenderer>().unwrap().mesh, "lamp.mesh");

        object.component_mut::<PointLight>().unwrap().intensity = 3.0;
        assert!(object.remove_component::<PointLight>().is_some());
        assert!(object.component::<PointLight>().is_none());
        assert_eq!(object.tag, DEFAULT_TAG);
    }
}
