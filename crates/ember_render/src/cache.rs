//! Shader Pipeline Cache
//!
//! Central owner of every shader program and render pipeline created through
//! a [`GraphicsDevice`]. Callers receive `Arc<ShaderProgram>` handles and
//! copyable [`RenderPipelineId`]s; the objects themselves are released by the
//! cache on invalidation or disposal.
//!
//! # Storage
//!
//! - **Programs**: `ProgramKey → Arc<ShaderProgram>`. A (re)registration
//!   publishes a new immutable program with a fresh generation, then releases
//!   the stages of the program it replaced.
//! - **Pipelines**: `PipelineKey → RenderPipelineId`. Every entry refers to
//!   exactly one program key; (re)registering that key evicts the entry.
//!
//! # Concurrency
//!
//! Both maps sit behind `parking_lot::RwLock`. Hits only take the pipeline read
//! lock. Misses build outside any lock and then publish under the pipeline
//! write lock:
//!
//! 1. If another thread stored the key first, the surplus pipeline is destroyed
//!    and the stored one is returned.
//! 2. If the program was re-registered while building (generation changed),
//!    the pipeline is destroyed and the build is retried against the current
//!    program.
//!
//! Lock order is `pipelines` → `programs` (read). Registration never holds the
//! program lock while taking the pipeline lock.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ember_core::{EmberError, EngineSettings, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

use crate::device::{
    DeviceError, GraphicsDevice, RenderPipelineDescriptor, RenderPipelineId,
    ShaderModuleDescriptor, ShaderModuleId,
};
use crate::pipeline_key::{PassDescriptor, PipelineKey, fx_hash_key};
use crate::program::{CompiledStage, ProgramKey, ShaderProgram, ShaderSource};
use crate::state::ShaderStage;

/// Thread-safe registry of shader programs and the pipelines derived from them.
#[derive(Debug)]
pub struct ShaderPipelineCache {
    device: Arc<dyn GraphicsDevice>,
    settings: EngineSettings,

    programs: RwLock<FxHashMap<ProgramKey, Arc<ShaderProgram>>>,
    pipelines: RwLock<FxHashMap<PipelineKey, RenderPipelineId>>,

    next_generation: AtomicU64,
    disposed: AtomicBool,
}

impl ShaderPipelineCache {
    #[must_use]
    pub fn new(device: Arc<dyn GraphicsDevice>, settings: &EngineSettings) -> Self {
        let mut pipelines = FxHashMap::default();
        pipelines.reserve(settings.pipeline_capacity_hint);
        Self {
            device,
            settings: settings.clone(),
            programs: RwLock::new(FxHashMap::default()),
            pipelines: RwLock::new(pipelines),
            next_generation: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ── Program Registry ─────────────────────────────────────────────────────

    /// Compiles both stages of `source` and installs them under
    /// `(name, variant)`, replacing any previous program with that key.
    ///
    /// The previous program's stages are released only after the new program
    /// is published, and every pipeline built from the key is evicted.
    ///
    /// ## Errors
    /// * `ResourceNotFound` - a shader file does not exist.
    /// * `ShaderCompile` - the device rejected a stage.
    /// * `CacheDisposed` - the cache was disposed.
    pub fn register_program(
        &self,
        name: &str,
        variant: &str,
        source: ShaderSource,
    ) -> Result<Arc<ShaderProgram>> {
        self.install(ProgramKey::new(name, variant), source)
    }

    /// Replaces the stages of a program, or registers it if the key is new.
    ///
    /// The returned handle is a new `ShaderProgram`; handles obtained before
    /// the reload keep describing the old installation.
    pub fn reload_program(
        &self,
        name: &str,
        variant: &str,
        source: ShaderSource,
    ) -> Result<Arc<ShaderProgram>> {
        let key = ProgramKey::new(name, variant);
        if self.try_get_program(&key).is_none() {
            log::debug!("Reload of unknown program {key}, registering it");
        }
        self.install(key, source)
    }

    /// Looks a program up without compiling anything.
    #[must_use]
    pub fn try_get_program(&self, key: &ProgramKey) -> Option<Arc<ShaderProgram>> {
        self.programs.read().get(key).cloned()
    }

    /// Re-reads the shader files of a file-backed program and reloads it.
    ///
    /// Bytecode-backed programs have nothing to re-read; they are left
    /// untouched and `Ok(None)` is returned.
    pub fn reload_from_disk(&self, key: &ProgramKey) -> Result<Option<Arc<ShaderProgram>>> {
        let program = self
            .try_get_program(key)
            .ok_or_else(|| EmberError::ProgramNotRegistered(key.to_string()))?;

        if !program.source().is_file_backed() {
            log::warn!("Program {key} was registered from bytecode, nothing to reload from disk");
            return Ok(None);
        }
        self.install(key.clone(), program.source().clone()).map(Some)
    }

    /// Reloads every file-backed program from disk.
    ///
    /// All programs are attempted; the first failure is returned after the
    /// rest were processed. Returns the number of reloaded programs.
    pub fn reload_all_from_disk(&self) -> Result<usize> {
        let file_backed: Vec<(ProgramKey, ShaderSource)> = self
            .programs
            .read()
            .iter()
            .filter(|(_, program)| program.source().is_file_backed())
            .map(|(key, program)| (key.clone(), program.source().clone()))
            .collect();

        let mut reloaded = 0;
        let mut first_error = None;
        for (key, source) in file_backed {
            match self.install(key.clone(), source) {
                Ok(_) => reloaded += 1,
                Err(err) => {
                    log::error!("Failed to reload program {key} from disk: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(reloaded),
        }
    }

    // ── Pipelines ────────────────────────────────────────────────────────────

    /// Returns the pipeline for `pass`, building it on first use.
    ///
    /// When the pass has no output override, the device's current default
    /// output is part of the key.
    ///
    /// ## Errors
    /// * `ProgramNotRegistered` - the pass names an unknown program.
    /// * `PipelineCreation` - the device rejected the pipeline state.
    /// * `CacheDisposed` - the cache was disposed.
    pub fn get_or_create_pipeline(&self, pass: &PassDescriptor) -> Result<RenderPipelineId> {
        let key = PipelineKey::from_pass(pass, self.device.default_output());

        loop {
            self.ensure_live()?;
            if let Some(&id) = self.pipelines.read().get(&key) {
                return Ok(id);
            }

            let program = self
                .try_get_program(&key.program)
                .ok_or_else(|| EmberError::ProgramNotRegistered(key.program.to_string()))?;

            let label = format!("{}#{:016x}", key.program, fx_hash_key(&key));
            let id = match self.build_pipeline(&label, &key, &program) {
                Ok(id) => id,
                Err(err) if self.generation_of(&key.program) != Some(program.generation()) => {
                    log::debug!("Pipeline {label} failed against a replaced program, retrying: {err}");
                    continue;
                }
                Err(err) => return Err(EmberError::pipeline_creation(label, err)),
            };

            let mut pipelines = self.pipelines.write();
            if let Some(&winner) = pipelines.get(&key) {
                drop(pipelines);
                log::trace!("Pipeline {label} was stored concurrently, releasing duplicate");
                self.release_pipeline(id);
                return Ok(winner);
            }
            if self.is_disposed() {
                drop(pipelines);
                self.release_pipeline(id);
                return Err(EmberError::CacheDisposed);
            }
            if self.generation_of(&key.program) != Some(program.generation()) {
                drop(pipelines);
                log::debug!("Program {} changed while building {label}, rebuilding", key.program);
                self.release_pipeline(id);
                continue;
            }
            pipelines.insert(key, id);
            log::debug!("Created pipeline {label}");
            return Ok(id);
        }
    }

    /// Evicts and destroys every pipeline built from `key`.
    /// Returns how many pipelines were evicted.
    pub fn invalidate_pipelines(&self, key: &ProgramKey) -> usize {
        let evicted: Vec<RenderPipelineId> = self
            .pipelines
            .write()
            .extract_if(|pipeline_key, _| pipeline_key.program == *key)
            .map(|(_, id)| id)
            .collect();

        for &id in &evicted {
            self.release_pipeline(id);
        }
        evicted.len()
    }

    /// Evicts and destroys every cached pipeline (e.g. after the swapchain
    /// format changed). Programs are kept.
    pub fn clear_pipelines(&self) {
        let evicted: Vec<RenderPipelineId> =
            self.pipelines.write().drain().map(|(_, id)| id).collect();
        for id in evicted {
            self.release_pipeline(id);
        }
    }

    // ── Statistics ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs.read().len()
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.read().len()
    }

    #[must_use]
    pub fn pipeline_count_for(&self, key: &ProgramKey) -> usize {
        self.pipelines
            .read()
            .keys()
            .filter(|pipeline_key| pipeline_key.program == *key)
            .count()
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Releases every pipeline, then every program. Safe to call repeatedly.
    ///
    /// Device failures while releasing are logged and teardown continues.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let pipelines: Vec<RenderPipelineId> =
            self.pipelines.write().drain().map(|(_, id)| id).collect();
        for &id in &pipelines {
            self.release_pipeline(id);
        }

        let programs: Vec<Arc<ShaderProgram>> =
            self.programs.write().drain().map(|(_, program)| program).collect();
        for program in &programs {
            self.release_stages(program);
        }

        log::info!(
            "Shader pipeline cache disposed ({} pipelines, {} programs)",
            pipelines.len(),
            programs.len()
        );
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(EmberError::CacheDisposed)
        } else {
            Ok(())
        }
    }

    fn generation_of(&self, key: &ProgramKey) -> Option<u64> {
        self.programs.read().get(key).map(|program| program.generation())
    }

    fn install(&self, key: ProgramKey, source: ShaderSource) -> Result<Arc<ShaderProgram>> {
        self.ensure_live()?;

        let (vertex_code, fragment_code) = self.read_source(&source)?;
        let vertex = self.compile_stage(&key, ShaderStage::Vertex, &vertex_code)?;
        let fragment = match self.compile_stage(&key, ShaderStage::Fragment, &fragment_code) {
            Ok(module) => module,
            Err(err) => {
                self.release_module(vertex);
                return Err(err);
            }
        };

        let content_hash = xxh3_64_with_seed(&fragment_code, xxh3_64(&vertex_code));
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let program = Arc::new(ShaderProgram::new(
            key.clone(),
            vec![
                CompiledStage {
                    stage: ShaderStage::Vertex,
                    module: vertex,
                },
                CompiledStage {
                    stage: ShaderStage::Fragment,
                    module: fragment,
                },
            ],
            source,
            content_hash,
            generation,
        ));

        let previous = {
            let mut programs = self.programs.write();
            if self.is_disposed() {
                drop(programs);
                self.release_stages(&program);
                return Err(EmberError::CacheDisposed);
            }
            programs.insert(key.clone(), Arc::clone(&program))
        };

        let evicted = self.invalidate_pipelines(&key);
        if let Some(previous) = &previous {
            self.release_stages(previous);
        }

        log::info!(
            "Installed shader program {key} (generation {generation}, hash {content_hash:016x}, {evicted} pipelines evicted)"
        );
        Ok(program)
    }

    fn read_source<'a>(&self, source: &'a ShaderSource) -> Result<(Cow<'a, [u8]>, Cow<'a, [u8]>)> {
        match source {
            ShaderSource::Files { vertex, fragment } => Ok((
                Cow::Owned(self.read_shader_file(vertex)?),
                Cow::Owned(self.read_shader_file(fragment)?),
            )),
            ShaderSource::Bytecode { vertex, fragment } => {
                Ok((Cow::Borrowed(vertex.as_slice()), Cow::Borrowed(fragment.as_slice())))
            }
        }
    }

    fn read_shader_file(&self, path: &Path) -> Result<Vec<u8>> {
        let resolved = self.settings.resolve_shader_path(path);
        match std::fs::read(&resolved) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(EmberError::ResourceNotFound { path: resolved })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn compile_stage(
        &self,
        key: &ProgramKey,
        stage: ShaderStage,
        bytecode: &[u8],
    ) -> Result<ShaderModuleId> {
        let label = format!("{key}/{stage}");
        self.device
            .create_shader_module(&ShaderModuleDescriptor {
                label: &label,
                stage,
                entry_point: stage.entry_point(),
                bytecode,
            })
            .map_err(|err| EmberError::ShaderCompile {
                program: key.to_string(),
                stage: stage.to_string(),
                details: err.to_string(),
            })
    }

    fn build_pipeline(
        &self,
        label: &str,
        key: &PipelineKey,
        program: &ShaderProgram,
    ) -> std::result::Result<RenderPipelineId, DeviceError> {
        let missing = |stage: ShaderStage| {
            DeviceError::IncompatibleState(format!("program {} has no {stage} stage", key.program))
        };
        let vertex_module = program
            .stage(ShaderStage::Vertex)
            .ok_or_else(|| missing(ShaderStage::Vertex))?;
        let fragment_module = program
            .stage(ShaderStage::Fragment)
            .ok_or_else(|| missing(ShaderStage::Fragment))?;

        self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label,
            vertex_module,
            vertex_entry_point: ShaderStage::Vertex.entry_point(),
            fragment_module,
            fragment_entry_point: ShaderStage::Fragment.entry_point(),
            topology: key.topology,
            cull_mode: key.cull_mode,
            front_face: key.front_face,
            depth_test: key.depth_test,
            depth_write: key.depth_write,
            depth_compare: key.depth_compare,
            blend: key.blend,
            vertex_layouts: &key.vertex_layouts,
            resource_layouts: &key.resource_layouts,
            output: &key.output,
        })
    }

    fn release_pipeline(&self, id: RenderPipelineId) {
        if let Err(err) = self.device.destroy_render_pipeline(id) {
            log::error!("Failed to destroy render pipeline {}: {err}", id.0);
        }
    }

    fn release_module(&self, id: ShaderModuleId) {
        if let Err(err) = self.device.destroy_shader_module(id) {
            log::error!("Failed to destroy shader module {}: {err}", id.0);
        }
    }

    fn release_stages(&self, program: &ShaderProgram) {
        for stage in program.stages() {
            self.release_module(stage.module);
        }
    }
}

impl Drop for ShaderPipelineCache {
    fn drop(&mut self) {
        self.dispose();
    }
}
