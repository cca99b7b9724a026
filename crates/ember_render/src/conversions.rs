//! Lossless conversions of the render-state mirrors into `wgpu` types.
//!
//! A `wgpu`-backed [`GraphicsDevice`](crate::device::GraphicsDevice) uses these
//! to translate a [`RenderPipelineDescriptor`](crate::device::RenderPipelineDescriptor)
//! into the native descriptor.

use crate::layout::{StageVisibility, VertexLayoutDescription};
use crate::state::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, CompareFunction, CullMode, FrontFace,
    PrimitiveTopology, ShaderStage, TextureFormat, VertexFormat,
};

impl From<PrimitiveTopology> for wgpu::PrimitiveTopology {
    fn from(t: PrimitiveTopology) -> Self {
        match t {
            PrimitiveTopology::PointList => Self::PointList,
            PrimitiveTopology::LineList => Self::LineList,
            PrimitiveTopology::LineStrip => Self::LineStrip,
            PrimitiveTopology::TriangleList => Self::TriangleList,
            PrimitiveTopology::TriangleStrip => Self::TriangleStrip,
        }
    }
}

impl CullMode {
    /// `wgpu` expresses "no culling" as `None`.
    #[must_use]
    pub fn to_wgpu_face(self) -> Option<wgpu::Face> {
        match self {
            Self::None => None,
            Self::Front => Some(wgpu::Face::Front),
            Self::Back => Some(wgpu::Face::Back),
        }
    }
}

impl From<FrontFace> for wgpu::FrontFace {
    fn from(f: FrontFace) -> Self {
        match f {
            FrontFace::Ccw => Self::Ccw,
            FrontFace::Cw => Self::Cw,
        }
    }
}

impl From<CompareFunction> for wgpu::CompareFunction {
    fn from(c: CompareFunction) -> Self {
        match c {
            CompareFunction::Never => Self::Never,
            CompareFunction::Less => Self::Less,
            CompareFunction::Equal => Self::Equal,
            CompareFunction::LessEqual => Self::LessEqual,
            CompareFunction::Greater => Self::Greater,
            CompareFunction::NotEqual => Self::NotEqual,
            CompareFunction::GreaterEqual => Self::GreaterEqual,
            CompareFunction::Always => Self::Always,
        }
    }
}

impl From<BlendFactor> for wgpu::BlendFactor {
    fn from(f: BlendFactor) -> Self {
        match f {
            BlendFactor::Zero => Self::Zero,
            BlendFactor::One => Self::One,
            BlendFactor::Src => Self::Src,
            BlendFactor::OneMinusSrc => Self::OneMinusSrc,
            BlendFactor::SrcAlpha => Self::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => Self::OneMinusSrcAlpha,
            BlendFactor::Dst => Self::Dst,
            BlendFactor::OneMinusDst => Self::OneMinusDst,
            BlendFactor::DstAlpha => Self::DstAlpha,
            BlendFactor::OneMinusDstAlpha => Self::OneMinusDstAlpha,
        }
    }
}

impl From<BlendOperation> for wgpu::BlendOperation {
    fn from(op: BlendOperation) -> Self {
        match op {
            BlendOperation::Add => Self::Add,
            BlendOperation::Subtract => Self::Subtract,
            BlendOperation::ReverseSubtract => Self::ReverseSubtract,
            BlendOperation::Min => Self::Min,
            BlendOperation::Max => Self::Max,
        }
    }
}

impl From<BlendComponent> for wgpu::BlendComponent {
    fn from(b: BlendComponent) -> Self {
        Self {
            src_factor: b.src_factor.into(),
            dst_factor: b.dst_factor.into(),
            operation: b.operation.into(),
        }
    }
}

impl From<BlendState> for wgpu::BlendState {
    fn from(b: BlendState) -> Self {
        Self {
            color: b.color.into(),
            alpha: b.alpha.into(),
        }
    }
}

impl From<TextureFormat> for wgpu::TextureFormat {
    fn from(f: TextureFormat) -> Self {
        match f {
            TextureFormat::R32Float => Self::R32Float,
            TextureFormat::Rgba8Unorm => Self::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => Self::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => Self::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => Self::Bgra8UnormSrgb,
            TextureFormat::Rgba16Float => Self::Rgba16Float,
            TextureFormat::Rgba32Float => Self::Rgba32Float,
            TextureFormat::Depth24Plus => Self::Depth24Plus,
            TextureFormat::Depth24PlusStencil8 => Self::Depth24PlusStencil8,
            TextureFormat::Depth32Float => Self::Depth32Float,
        }
    }
}

impl From<VertexFormat> for wgpu::VertexFormat {
    fn from(f: VertexFormat) -> Self {
        match f {
            VertexFormat::Float32 => Self::Float32,
            VertexFormat::Float32x2 => Self::Float32x2,
            VertexFormat::Float32x3 => Self::Float32x3,
            VertexFormat::Float32x4 => Self::Float32x4,
            VertexFormat::Uint32 => Self::Uint32,
            VertexFormat::Uint32x2 => Self::Uint32x2,
            VertexFormat::Uint32x4 => Self::Uint32x4,
            VertexFormat::Sint32 => Self::Sint32,
            VertexFormat::Unorm8x4 => Self::Unorm8x4,
            VertexFormat::Uint16x4 => Self::Uint16x4,
        }
    }
}

impl From<ShaderStage> for wgpu::ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
        }
    }
}

impl From<StageVisibility> for wgpu::ShaderStages {
    fn from(v: StageVisibility) -> Self {
        match v {
            StageVisibility::Vertex => Self::VERTEX,
            StageVisibility::Fragment => Self::FRAGMENT,
            StageVisibility::VertexFragment => Self::VERTEX_FRAGMENT,
        }
    }
}

impl VertexLayoutDescription {
    /// Step mode of this buffer; any non-zero instance step rate is per-instance.
    #[must_use]
    pub fn wgpu_step_mode(&self) -> wgpu::VertexStepMode {
        if self.is_per_instance() {
            wgpu::VertexStepMode::Instance
        } else {
            wgpu::VertexStepMode::Vertex
        }
    }

    /// Tightly packed attributes with sequential shader locations starting at
    /// `first_location`.
    #[must_use]
    pub fn wgpu_attributes(&self, first_location: u32) -> Vec<wgpu::VertexAttribute> {
        let mut offset = 0;
        self.elements
            .iter()
            .zip(first_location..)
            .map(|(element, shader_location)| {
                let attribute = wgpu::VertexAttribute {
                    format: element.format.into(),
                    offset,
                    shader_location,
                };
                offset += element.format.size();
                attribute
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{VertexElement, VertexSemantic};

    #[test]
    fn blend_presets_match_wgpu() {
        assert_eq!(
            wgpu::BlendState::from(BlendState::ALPHA_BLENDING),
            wgpu::BlendState::ALPHA_BLENDING
        );
        assert_eq!(
            wgpu::BlendState::from(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
        );
        assert_eq!(wgpu::BlendState::from(BlendState::REPLACE), wgpu::BlendState::REPLACE);
    }

    #[test]
    fn vertex_attributes_are_packed() {
        let layout = VertexLayoutDescription::new(vec![
            VertexElement::new("position", VertexSemantic::Position, VertexFormat::Float32x3),
            VertexElement::new("normal", VertexSemantic::Normal, VertexFormat::Float32x3),
            VertexElement::new("uv", VertexSemantic::TextureCoordinate, VertexFormat::Float32x2),
        ]);
        let attributes = layout.wgpu_attributes(0);
        let offsets: Vec<u64> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
        assert_eq!(attributes[2].shader_location, 2);
        assert_eq!(layout.wgpu_step_mode(), wgpu::VertexStepMode::Vertex);
        assert_eq!(CullMode::None.to_wgpu_face(), None);
    }
}
