//! Built-in component types.

use ember_core::Result;
use glam::Vec3;

use crate::codec::{ByteReader, ByteWriter};
use crate::component::{BinaryState, ComponentType};

/// Draws a mesh asset with a material. Assets are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRenderer {
    pub mesh: String,
    pub material: String,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self {
            mesh: String::new(),
            material: String::new(),
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

impl MeshRenderer {
    pub fn new(mesh: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            material: material.into(),
            ..Self::default()
        }
    }
}

impl ComponentType for MeshRenderer {
    const TYPE_NAME: &'static str = "MeshRenderer";
}

impl BinaryState for MeshRenderer {
    fn write_state(&self, writer: &mut ByteWriter) {
        writer.write_str(&self.mesh);
        writer.write_str(&self.material);
        writer.write_bool(self.cast_shadows);
        writer.write_bool(self.receive_shadows);
    }

    fn read_state(&mut self, reader: &mut ByteReader<'_>) -> Result<()> {
        self.mesh = reader.read_string()?;
        self.material = reader.read_string()?;
        self.cast_shadows = reader.read_bool()?;
        self.receive_shadows = reader.read_bool()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
        }
    }
}

impl ComponentType for PointLight {
    const TYPE_NAME: &'static str = "PointLight";
}

impl BinaryState for PointLight {
    fn write_state(&self, writer: &mut ByteWriter) {
        writer.write_vec3(self.color);
        writer.write_f32(self.intensity);
        writer.write_f32(self.range);
    }

    fn read_state(&mut self, reader: &mut ByteReader<'_>) -> Result<()> {
        self.color = reader.read_vec3()?;
        self.intensity = reader.read_f32()?;
        self.range = reader.read_f32()?;
        Ok(())
    }
}

/// Per-frame visibility bookkeeping. Recomputed by the renderer, so it has no
/// state codec and clones start fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CullingState {
    pub visible: bool,
    pub frames_hidden: u32,
}

impl ComponentType for CullingState {
    const TYPE_NAME: &'static str = "CullingState";
}
