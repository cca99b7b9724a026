//! Shader Program Registry Tests
//!
//! Tests for:
//! - Registration from files resolved against `shader_dir`
//! - Error reporting: missing files, compile failures
//! - Reloading from disk, single program and all programs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ember::prelude::*;
use ember::render::DEFAULT_VARIANT;
use tempfile::TempDir;

const VS: &str = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
const FS: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
const FS_ALT: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(0.25); }";

struct Fixture {
    dir: TempDir,
    device: Arc<HeadlessDevice>,
    cache: ShaderPipelineCache,
}

impl Fixture {
    fn new() -> Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir()?;
        let settings = EngineSettings {
            shader_dir: dir.path().to_path_buf(),
            ..EngineSettings::default()
        };
        let device = Arc::new(HeadlessDevice::new());
        let cache = ShaderPipelineCache::new(device.clone(), &settings);
        Ok(Self { dir, device, cache })
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        fs::write(self.dir.path().join(name), contents)?;
        Ok(())
    }

    fn register_files(&self, name: &str, vertex: &str, fragment: &str) -> ember::Result<Arc<ember::ShaderProgram>> {
        self.cache
            .register_program(name, DEFAULT_VARIANT, ShaderSource::files(vertex, fragment))
    }
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn relative_paths_resolve_against_shader_dir() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("lit.vert.wgsl", VS)?;
    fx.write("lit.frag.wgsl", FS)?;

    let program = fx.register_files("lit", "lit.vert.wgsl", "lit.frag.wgsl")?;

    assert_eq!(program.key(), &ProgramKey::named("lit"));
    assert!(program.source().is_file_backed());
    assert_eq!(program.stages().len(), 2);
    assert_eq!(fx.device.live_shader_modules(), 2);
    Ok(())
}

#[test]
fn absolute_paths_are_used_as_is() -> Result<()> {
    let fx = Fixture::new()?;
    let elsewhere = tempfile::tempdir()?;
    let vertex = elsewhere.path().join("a.vert");
    let fragment = elsewhere.path().join("a.frag");
    fs::write(&vertex, VS)?;
    fs::write(&fragment, FS)?;

    fx.cache
        .register_program("abs", DEFAULT_VARIANT, ShaderSource::files(vertex, fragment))?;
    assert_eq!(fx.cache.program_count(), 1);
    Ok(())
}

#[test]
fn missing_file_is_resource_not_found() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("lit.vert.wgsl", VS)?;

    let err = fx
        .register_files("lit", "lit.vert.wgsl", "nope.frag.wgsl")
        .unwrap_err();

    match err {
        EmberError::ResourceNotFound { path } => {
            assert_eq!(path, fx.dir.path().join("nope.frag.wgsl"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.cache.program_count(), 0);
    assert_eq!(fx.device.live_shader_modules(), 0);
    Ok(())
}

#[test]
fn compile_failure_names_program_and_stage() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("bad.vert.wgsl", "@vertex fn main() {}")?;
    fx.write("bad.frag.wgsl", FS)?;

    let err = fx
        .register_files("bad", "bad.vert.wgsl", "bad.frag.wgsl")
        .unwrap_err();

    assert!(matches!(
        &err,
        EmberError::ShaderCompile { program, stage, .. }
            if program.contains("bad") && stage == "vertex"
    ));
    assert_eq!(fx.device.live_shader_modules(), 0);
    Ok(())
}

#[test]
fn failed_reload_keeps_the_previous_program() -> Result<()> {
    let fx = Fixture::new()?;
    let installed = fx
        .cache
        .register_program("lit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))?;
    let pipeline = fx.cache.get_or_create_pipeline(&PassDescriptor::new("lit"))?;

    let result = fx
        .cache
        .reload_program("lit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, "garbage"));
    assert!(result.is_err());

    let current = fx.cache.try_get_program(&ProgramKey::named("lit")).unwrap();
    assert_eq!(current.generation(), installed.generation());
    assert_eq!(fx.cache.get_or_create_pipeline(&PassDescriptor::new("lit"))?, pipeline);
    Ok(())
}

// ============================================================================
// Reload From Disk
// ============================================================================

#[test]
fn reload_from_disk_picks_up_edits() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("lit.vert.wgsl", VS)?;
    fx.write("lit.frag.wgsl", FS)?;
    let before = fx.register_files("lit", "lit.vert.wgsl", "lit.frag.wgsl")?;
    fx.cache.get_or_create_pipeline(&PassDescriptor::new("lit"))?;

    fx.write("lit.frag.wgsl", FS_ALT)?;
    let after = fx
        .cache
        .reload_from_disk(&ProgramKey::named("lit"))?
        .expect("file-backed program reloads");

    assert_ne!(after.content_hash(), before.content_hash());
    assert_eq!(fx.cache.pipeline_count(), 0);
    assert_eq!(fx.device.live_shader_modules(), 2);
    Ok(())
}

#[test]
fn bytecode_programs_are_skipped_by_disk_reload() -> Result<()> {
    let fx = Fixture::new()?;
    let installed = fx
        .cache
        .register_program("inline", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))?;

    assert!(fx.cache.reload_from_disk(&ProgramKey::named("inline"))?.is_none());
    let current = fx.cache.try_get_program(&ProgramKey::named("inline")).unwrap();
    assert_eq!(current.generation(), installed.generation());

    assert!(matches!(
        fx.cache.reload_from_disk(&ProgramKey::named("unknown")),
        Err(EmberError::ProgramNotRegistered(_))
    ));
    Ok(())
}

#[test]
fn reload_all_from_disk_reports_first_failure_after_trying_all() -> Result<()> {
    let fx = Fixture::new()?;
    for name in ["a", "b"] {
        fx.write(&format!("{name}.vert"), VS)?;
        fx.write(&format!("{name}.frag"), FS)?;
        fx.register_files(name, &format!("{name}.vert"), &format!("{name}.frag"))?;
    }
    fx.cache
        .register_program("inline", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))?;

    assert_eq!(fx.cache.reload_all_from_disk()?, 2);

    fs::remove_file(fx.dir.path().join("a.frag"))?;
    let b_before = fx.cache.try_get_program(&ProgramKey::named("b")).unwrap();
    let err = fx.cache.reload_all_from_disk().unwrap_err();

    assert!(matches!(err, EmberError::ResourceNotFound { ref path } if path.ends_with(Path::new("a.frag"))));
    let b_after = fx.cache.try_get_program(&ProgramKey::named("b")).unwrap();
    assert!(b_after.generation() > b_before.generation());
    Ok(())
}
