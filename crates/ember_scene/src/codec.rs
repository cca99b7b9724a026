//! Binary state codec.
//!
//! Little-endian, unpadded, no framing beyond what the component writes.
//! Strings and byte blobs are prefixed with a `u32` length. Readers are strict:
//! truncated input, trailing bytes, non-0/1 bools and invalid UTF-8 are all
//! [`EmberError::Codec`] failures.

use bytemuck::Pod;
use ember_core::{EmberError, Result};
use glam::{Quat, Vec2, Vec3, Vec4};

#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the raw bytes of a plain-old-data value.
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.buf.extend_from_slice(bytemuck::bytes_of(value));
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_vec2(&mut self, value: Vec2) {
        self.write_floats(&value.to_array());
    }

    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_floats(&value.to_array());
    }

    pub fn write_vec4(&mut self, value: Vec4) {
        self.write_floats(&value.to_array());
    }

    pub fn write_quat(&mut self, value: Quat) {
        self.write_floats(&value.to_array());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    fn write_floats(&mut self, values: &[f32]) {
        for &v in values {
            self.write_f32(v);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(EmberError::Codec(format!(
                "unexpected end of data at offset {}: need {len} bytes, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a plain-old-data value written by [`ByteWriter::write_pod`].
    pub fn read_pod<T: Pod>(&mut self) -> Result<T> {
        let bytes = self.take(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(EmberError::Codec(format!(
                "invalid bool byte {other:#04x} at offset {}",
                self.pos - 1
            ))),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take_array().map(u64::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    fn read_floats<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.read_f32()?;
        }
        Ok(out)
    }

    pub fn read_vec2(&mut self) -> Result<Vec2> {
        self.read_floats().map(Vec2::from_array)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        self.read_floats().map(Vec3::from_array)
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        self.read_floats().map(Vec4::from_array)
    }

    pub fn read_quat(&mut self) -> Result<Quat> {
        self.read_floats().map(Quat::from_array)
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| EmberError::Codec(format!("invalid UTF-8 string at offset {start}: {e}")))
    }

    /// Fails if any input is left unread.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            left => Err(EmberError::Codec(format!(
                "{left} trailing bytes after offset {}",
                self.pos
            ))),
        }
    }
}
