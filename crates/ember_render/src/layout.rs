//! Vertex and resource layouts.
//!
//! The two layout families participate differently in pipeline identity:
//!
//! - [`VertexLayoutDescription`] is plain data and is compared **structurally**
//!   (element name, semantic, format and the instance step rate, in order).
//! - [`ResourceLayout`] is compared by **identity**. Every call to
//!   [`ResourceLayout::new`] mints a fresh [`ResourceLayoutId`], so two layouts
//!   with equal entries created separately never share a pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::state::VertexFormat;

// ─── Vertex Layouts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    TextureCoordinate,
    Color,
    BlendIndices,
    BlendWeights,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexElement {
    pub name: String,
    pub semantic: VertexSemantic,
    pub format: VertexFormat,
}

impl VertexElement {
    pub fn new(name: impl Into<String>, semantic: VertexSemantic, format: VertexFormat) -> Self {
        Self {
            name: name.into(),
            semantic,
            format,
        }
    }
}

/// One vertex buffer binding: an ordered element list plus the instance step
/// rate (`0` means per-vertex data).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayoutDescription {
    pub elements: Vec<VertexElement>,
    pub instance_step_rate: u32,
}

impl VertexLayoutDescription {
    #[must_use]
    pub fn new(elements: Vec<VertexElement>) -> Self {
        Self {
            elements,
            instance_step_rate: 0,
        }
    }

    #[must_use]
    pub fn with_instance_step_rate(mut self, rate: u32) -> Self {
        self.instance_step_rate = rate;
        self
    }

    /// Tightly packed stride of one vertex in bytes.
    #[must_use]
    pub fn stride(&self) -> u64 {
        self.elements.iter().map(|e| e.format.size()).sum()
    }

    #[inline]
    #[must_use]
    pub fn is_per_instance(&self) -> bool {
        self.instance_step_rate > 0
    }
}

// ─── Resource Layouts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    StorageBuffer,
    Texture,
    Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageVisibility {
    Vertex,
    Fragment,
    VertexFragment,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLayoutEntry {
    pub name: String,
    pub binding: u32,
    pub kind: ResourceKind,
    pub visibility: StageVisibility,
}

impl ResourceLayoutEntry {
    pub fn new(
        name: impl Into<String>,
        binding: u32,
        kind: ResourceKind,
        visibility: StageVisibility,
    ) -> Self {
        Self {
            name: name.into(),
            binding,
            kind,
            visibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceLayoutDescriptor {
    pub label: String,
    pub entries: Vec<ResourceLayoutEntry>,
}

static NEXT_LAYOUT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a [`ResourceLayout`] object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLayoutId(u64);

impl ResourceLayoutId {
    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A shareable resource (bind group) layout.
///
/// Cloning shares the same identity; equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    id: ResourceLayoutId,
    descriptor: Arc<ResourceLayoutDescriptor>,
}

impl ResourceLayout {
    #[must_use]
    pub fn new(descriptor: ResourceLayoutDescriptor) -> Self {
        Self {
            id: ResourceLayoutId(NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed)),
            descriptor: Arc::new(descriptor),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceLayoutId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    #[must_use]
    pub fn entries(&self) -> &[ResourceLayoutEntry] {
        &self.descriptor.entries
    }
}

impl PartialEq for ResourceLayout {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceLayout {}

impl std::hash::Hash for ResourceLayout {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_layout() -> ResourceLayoutDescriptor {
        ResourceLayoutDescriptor {
            label: "camera".into(),
            entries: vec![ResourceLayoutEntry::new(
                "view_proj",
                0,
                ResourceKind::UniformBuffer,
                StageVisibility::Vertex,
            )],
        }
    }

    #[test]
    fn resource_layouts_compare_by_identity() {
        let a = ResourceLayout::new(camera_layout());
        let b = ResourceLayout::new(camera_layout());
        assert_eq!(a.entries(), b.entries());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn vertex_layouts_compare_structurally() {
        let make = || {
            VertexLayoutDescription::new(vec![
                VertexElement::new("position", VertexSemantic::Position, VertexFormat::Float32x3),
                VertexElement::new("uv", VertexSemantic::TextureCoordinate, VertexFormat::Float32x2),
            ])
        };
        assert_eq!(make(), make());
        assert_eq!(make().stride(), 20);
        assert_ne!(make(), make().with_instance_step_rate(1));
    }
}
