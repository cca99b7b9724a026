//! GPU-less graphics device.
//!
//! [`HeadlessDevice`] implements [`GraphicsDevice`] without touching a graphics
//! API. It validates what a real driver would reject, hands out ids, and keeps
//! a ledger of live objects so tests and tools can check that every object the
//! cache created is released exactly once.
//!
//! Accepted bytecode:
//! - SPIR-V: little-endian magic `0x07230203`, word aligned, at least a header.
//! - UTF-8 shader source that mentions the stage's entry point.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::device::{
    DeviceError, GraphicsDevice, OutputDescription, RenderPipelineDescriptor, RenderPipelineId,
    ShaderModuleDescriptor, ShaderModuleId,
};
use crate::layout::ResourceLayoutId;
use crate::state::ShaderStage;

const SPIRV_MAGIC: u32 = 0x0723_0203;
/// Five header words.
const SPIRV_HEADER_BYTES: usize = 20;
const SUPPORTED_SAMPLE_COUNTS: [u32; 4] = [1, 2, 4, 8];

#[derive(Debug)]
pub struct HeadlessDevice {
    output: RwLock<OutputDescription>,
    modules: RwLock<FxHashMap<ShaderModuleId, ShaderStage>>,
    pipelines: RwLock<FxHashSet<RenderPipelineId>>,

    next_id: AtomicU64,
    modules_created: AtomicUsize,
    pipelines_created: AtomicUsize,
    fail_destroy: AtomicBool,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::with_output(OutputDescription::default())
    }

    #[must_use]
    pub fn with_output(output: OutputDescription) -> Self {
        Self {
            output: RwLock::new(output),
            modules: RwLock::new(FxHashMap::default()),
            pipelines: RwLock::new(FxHashSet::default()),
            next_id: AtomicU64::new(1),
            modules_created: AtomicUsize::new(0),
            pipelines_created: AtomicUsize::new(0),
            fail_destroy: AtomicBool::new(false),
        }
    }

    /// Replaces the default output, as a swapchain reconfiguration would.
    pub fn set_output(&self, output: OutputDescription) {
        *self.output.write() = output;
    }

    /// When set, every destroy call fails and the object stays alive.
    pub fn set_fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::Relaxed);
    }

    #[must_use]
    pub fn live_shader_modules(&self) -> usize {
        self.modules.read().len()
    }

    #[must_use]
    pub fn live_pipelines(&self) -> usize {
        self.pipelines.read().len()
    }

    #[must_use]
    pub fn is_pipeline_alive(&self, id: RenderPipelineId) -> bool {
        self.pipelines.read().contains(&id)
    }

    /// Total shader modules ever created.
    #[must_use]
    pub fn shader_modules_created(&self) -> usize {
        self.modules_created.load(Ordering::Relaxed)
    }

    /// Total pipelines ever created.
    #[must_use]
    pub fn pipelines_created(&self) -> usize {
        self.pipelines_created.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check_destroy(&self) -> Result<(), DeviceError> {
        if self.fail_destroy.load(Ordering::Relaxed) {
            Err(DeviceError::Backend("injected destroy failure".into()))
        } else {
            Ok(())
        }
    }

    fn validate_module(&self, descriptor: &ShaderModuleDescriptor<'_>) -> Result<(), DeviceError> {
        let fail = |details: String| Err(DeviceError::Compilation { details });
        let bytes = descriptor.bytecode;

        if bytes.is_empty() {
            return fail(format!("{}: empty bytecode", descriptor.label));
        }

        if let Some(magic) = bytes.first_chunk::<4>()
            && u32::from_le_bytes(*magic) == SPIRV_MAGIC
        {
            if bytes.len() % 4 != 0 {
                return fail(format!(
                    "{}: SPIR-V length {} is not a multiple of 4",
                    descriptor.label,
                    bytes.len()
                ));
            }
            if bytes.len() < SPIRV_HEADER_BYTES {
                return fail(format!("{}: truncated SPIR-V header", descriptor.label));
            }
            return Ok(());
        }

        let Ok(text) = std::str::from_utf8(bytes) else {
            return fail(format!(
                "{}: bytecode is neither SPIR-V nor UTF-8 shader source",
                descriptor.label
            ));
        };
        if !text.contains(descriptor.entry_point) {
            return fail(format!(
                "{}: entry point `{}` not found",
                descriptor.label, descriptor.entry_point
            ));
        }
        Ok(())
    }

    fn validate_pipeline(&self, descriptor: &RenderPipelineDescriptor<'_>) -> Result<(), DeviceError> {
        let incompatible = |msg: String| Err(DeviceError::IncompatibleState(msg));
        let output = descriptor.output;

        if output.color_formats.is_empty() {
            return incompatible("at least one color target is required".into());
        }
        if let Some(format) = output.color_formats.iter().find(|f| f.is_depth()) {
            return incompatible(format!("{format:?} cannot be used as a color target"));
        }
        match output.depth_format {
            Some(format) if !format.is_depth() => {
                return incompatible(format!("{format:?} is not a depth format"));
            }
            None if descriptor.depth_test || descriptor.depth_write => {
                return incompatible("depth test/write requires a depth target".into());
            }
            _ => {}
        }
        if !SUPPORTED_SAMPLE_COUNTS.contains(&output.sample_count) {
            return incompatible(format!("unsupported sample count {}", output.sample_count));
        }

        {
            let modules = self.modules.read();
            for (id, expected) in [
                (descriptor.vertex_module, ShaderStage::Vertex),
                (descriptor.fragment_module, ShaderStage::Fragment),
            ] {
                match modules.get(&id) {
                    None => {
                        return Err(DeviceError::UnknownObject {
                            kind: "shader module",
                            id: id.0,
                        });
                    }
                    Some(&stage) if stage != expected => {
                        return incompatible(format!(
                            "module {} is a {stage} stage, expected {expected}",
                            id.0
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        let mut seen_layouts: FxHashSet<ResourceLayoutId> = FxHashSet::default();
        for layout in descriptor.resource_layouts {
            if !seen_layouts.insert(layout.id()) {
                return incompatible(format!("resource layout '{}' bound twice", layout.label()));
            }
            let mut bindings = FxHashSet::default();
            for entry in layout.entries() {
                if !bindings.insert(entry.binding) {
                    return incompatible(format!(
                        "resource layout '{}' has overlapping binding {}",
                        layout.label(),
                        entry.binding
                    ));
                }
            }
        }
        Ok(())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor<'_>,
    ) -> Result<ShaderModuleId, DeviceError> {
        self.validate_module(descriptor)?;
        let id = ShaderModuleId(self.next_id());
        self.modules.write().insert(id, descriptor.stage);
        self.modules_created.fetch_add(1, Ordering::Relaxed);
        log::trace!("headless: created shader module {} ({})", id.0, descriptor.label);
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), DeviceError> {
        self.check_destroy()?;
        match self.modules.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(DeviceError::UnknownObject {
                kind: "shader module",
                id: id.0,
            }),
        }
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor<'_>,
    ) -> Result<RenderPipelineId, DeviceError> {
        self.validate_pipeline(descriptor)?;
        let id = RenderPipelineId(self.next_id());
        self.pipelines.write().insert(id);
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
        log::trace!("headless: created render pipeline {} ({})", id.0, descriptor.label);
        Ok(id)
    }

    fn destroy_render_pipeline(&self, id: RenderPipelineId) -> Result<(), DeviceError> {
        self.check_destroy()?;
        if self.pipelines.write().remove(&id) {
            Ok(())
        } else {
            Err(DeviceError::UnknownObject {
                kind: "render pipeline",
                id: id.0,
            })
        }
    }

    fn default_output(&self) -> OutputDescription {
        self.output.read().clone()
    }
}
