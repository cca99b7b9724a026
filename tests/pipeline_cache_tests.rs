//! Shader Pipeline Cache Integration Tests
//!
//! Tests for:
//! - Pipeline deduplication by composite key
//! - Invalidation on program reload and output changes
//! - Concurrent misses converging on one pipeline
//! - Disposal: idempotence, release of every device object

use std::sync::{Arc, Barrier};
use std::thread;

use ember::prelude::*;
use ember::render::{BlendState, CompareFunction, DEFAULT_VARIANT, RenderPipelineId};

const VS: &[u8] = b"@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
const FS: &[u8] = b"@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
const FS_TINTED: &[u8] = b"@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(0.5); }";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (Arc<HeadlessDevice>, ShaderPipelineCache) {
    init_logger();
    let device = Arc::new(HeadlessDevice::new());
    let cache = ShaderPipelineCache::new(device.clone(), &EngineSettings::default());
    (device, cache)
}

fn register_lit(cache: &ShaderPipelineCache) {
    cache
        .register_program("lit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))
        .unwrap();
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn identical_passes_share_one_pipeline() {
    let (device, cache) = setup();
    register_lit(&cache);

    let pass = PassDescriptor::new("lit");
    let first = cache.get_or_create_pipeline(&pass).unwrap();
    let second = cache.get_or_create_pipeline(&pass.clone()).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.pipeline_count(), 1);
    assert_eq!(device.pipelines_created(), 1);
}

#[test]
fn any_state_difference_yields_a_distinct_pipeline() {
    let (device, cache) = setup();
    register_lit(&cache);

    let base = PassDescriptor::new("lit");
    let variants = [
        base.clone(),
        base.clone().with_cull_mode(CullMode::None),
        base.clone().with_topology(PrimitiveTopology::LineList),
        base.clone().with_depth(true, false),
        base.clone().with_depth_compare(CompareFunction::Greater),
        base.clone().with_blend(Some(BlendState::ALPHA_BLENDING)),
    ];

    let ids: Vec<RenderPipelineId> = variants
        .iter()
        .map(|pass| cache.get_or_create_pipeline(pass).unwrap())
        .collect();

    let mut unique = ids.clone();
    unique.sort_by_key(|id| id.0);
    unique.dedup();
    assert_eq!(unique.len(), variants.len());
    assert_eq!(device.live_pipelines(), variants.len());
}

#[test]
fn lit_default_pipeline_is_reused_until_reload() {
    let (device, cache) = setup();
    register_lit(&cache);
    let pass = PassDescriptor::new(ProgramKey::new("lit", "Default"));

    let before = cache.get_or_create_pipeline(&pass).unwrap();
    assert_eq!(cache.get_or_create_pipeline(&pass).unwrap(), before);

    let old_program = cache.try_get_program(&ProgramKey::named("lit")).unwrap();
    let new_program = cache
        .reload_program("lit", "Default", ShaderSource::bytecode(VS, FS_TINTED))
        .unwrap();
    assert_ne!(old_program.content_hash(), new_program.content_hash());
    assert!(new_program.generation() > old_program.generation());

    assert_eq!(cache.pipeline_count(), 0);
    assert!(!device.is_pipeline_alive(before));

    let after = cache.get_or_create_pipeline(&pass).unwrap();
    assert_ne!(after, before);
    assert_eq!(device.live_pipelines(), 1);
    // Old vertex + fragment were released, new ones are live.
    assert_eq!(device.live_shader_modules(), 2);
}

#[test]
fn reload_only_evicts_pipelines_of_that_program() {
    let (_device, cache) = setup();
    register_lit(&cache);
    cache
        .register_program("unlit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))
        .unwrap();

    let unlit = cache.get_or_create_pipeline(&PassDescriptor::new("unlit")).unwrap();
    cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();

    cache
        .reload_program("lit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS_TINTED))
        .unwrap();

    assert_eq!(cache.pipeline_count_for(&ProgramKey::named("lit")), 0);
    assert_eq!(cache.get_or_create_pipeline(&PassDescriptor::new("unlit")).unwrap(), unlit);
}

#[test]
fn variants_are_independent_programs() {
    let (_device, cache) = setup();
    register_lit(&cache);
    cache
        .register_program("lit", "Skinned", ShaderSource::bytecode(VS, FS_TINTED))
        .unwrap();

    let plain = cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();
    let skinned = cache
        .get_or_create_pipeline(&PassDescriptor::new(ProgramKey::new("lit", "Skinned")))
        .unwrap();

    assert_ne!(plain, skinned);
    assert_eq!(cache.program_count(), 2);
}

#[test]
fn unknown_program_is_reported() {
    let (device, cache) = setup();
    let err = cache
        .get_or_create_pipeline(&PassDescriptor::new("missing"))
        .unwrap_err();
    assert!(matches!(err, EmberError::ProgramNotRegistered(ref key) if key.contains("missing")));
    assert_eq!(device.pipelines_created(), 0);
}

#[test]
fn device_rejection_is_pipeline_creation_error() {
    init_logger();
    let device = Arc::new(HeadlessDevice::with_output(OutputDescription::new(
        TextureFormat::Bgra8UnormSrgb,
        None,
    )));
    let cache = ShaderPipelineCache::new(device.clone(), &EngineSettings::default());
    register_lit(&cache);

    // Depth test without a depth target.
    let err = cache
        .get_or_create_pipeline(&PassDescriptor::new("lit"))
        .unwrap_err();
    assert!(matches!(err, EmberError::PipelineCreation { .. }));
    assert_eq!(cache.pipeline_count(), 0);

    let ok = cache.get_or_create_pipeline(&PassDescriptor::new("lit").with_depth(false, false));
    assert!(ok.is_ok());
}

// ============================================================================
// Output Changes
// ============================================================================

#[test]
fn swapchain_format_change_selects_a_new_pipeline() {
    let (device, cache) = setup();
    register_lit(&cache);
    let pass = PassDescriptor::new("lit");

    let srgb = cache.get_or_create_pipeline(&pass).unwrap();
    device.set_output(OutputDescription::new(
        TextureFormat::Rgba16Float,
        Some(TextureFormat::Depth32Float),
    ));
    let hdr = cache.get_or_create_pipeline(&pass).unwrap();

    assert_ne!(srgb, hdr);
    assert_eq!(cache.pipeline_count(), 2);

    cache.clear_pipelines();
    assert_eq!(cache.pipeline_count(), 0);
    assert_eq!(device.live_pipelines(), 0);
    assert_eq!(cache.program_count(), 1);
}

#[test]
fn explicit_output_overrides_device_default() {
    let (device, cache) = setup();
    register_lit(&cache);
    let target = OutputDescription::new(TextureFormat::Rgba8Unorm, Some(TextureFormat::Depth24Plus))
        .with_sample_count(4);
    let pass = PassDescriptor::new("lit").with_output(target);

    let first = cache.get_or_create_pipeline(&pass).unwrap();
    device.set_output(OutputDescription::new(TextureFormat::Rgba16Float, None));
    assert_eq!(cache.get_or_create_pipeline(&pass).unwrap(), first);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_misses_converge_on_one_pipeline() {
    const THREADS: usize = 8;

    let (device, cache) = setup();
    register_lit(&cache);
    let cache = Arc::new(cache);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap()
            })
        })
        .collect();

    let ids: Vec<RenderPipelineId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(ids.iter().all(|&id| id == ids[0]));
    assert_eq!(cache.pipeline_count(), 1);
    // Losing builders released their duplicates.
    assert_eq!(device.live_pipelines(), 1);
    assert!(device.is_pipeline_alive(ids[0]));
}

#[test]
fn reloads_racing_lookups_never_leave_stale_pipelines() {
    let (device, cache) = setup();
    register_lit(&cache);
    let cache = Arc::new(cache);

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..200 {
                cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();
            }
        })
    };
    for i in 0..50 {
        let fragment = if i % 2 == 0 { FS_TINTED } else { FS };
        cache
            .reload_program("lit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, fragment))
            .unwrap();
    }
    reader.join().unwrap();

    let id = cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();
    assert_eq!(cache.pipeline_count(), 1);
    assert_eq!(device.live_pipelines(), 1);
    assert!(device.is_pipeline_alive(id));
    assert_eq!(device.live_shader_modules(), 2);
}

// ============================================================================
// Disposal
// ============================================================================

#[test]
fn dispose_releases_everything_once() {
    let (device, cache) = setup();
    register_lit(&cache);
    cache
        .register_program("unlit", DEFAULT_VARIANT, ShaderSource::bytecode(VS, FS))
        .unwrap();
    cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();
    cache.get_or_create_pipeline(&PassDescriptor::new("unlit")).unwrap();

    cache.dispose();
    assert!(cache.is_disposed());
    assert_eq!(device.live_pipelines(), 0);
    assert_eq!(device.live_shader_modules(), 0);

    cache.dispose();
    assert_eq!(cache.program_count(), 0);

    assert!(matches!(
        cache.get_or_create_pipeline(&PassDescriptor::new("lit")),
        Err(EmberError::CacheDisposed)
    ));
}

#[test]
fn dropping_the_cache_disposes_it() {
    let (device, cache) = setup();
    register_lit(&cache);
    cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();

    drop(cache);
    assert_eq!(device.live_pipelines(), 0);
    assert_eq!(device.live_shader_modules(), 0);
}

#[test]
fn destroy_failures_do_not_stop_teardown() {
    let (device, cache) = setup();
    register_lit(&cache);
    cache.get_or_create_pipeline(&PassDescriptor::new("lit")).unwrap();

    device.set_fail_destroy(true);
    cache.dispose();

    assert!(cache.is_disposed());
    assert_eq!(cache.pipeline_count(), 0);
    assert_eq!(cache.program_count(), 0);
    // The device refused, so its objects are still alive.
    assert_eq!(device.live_pipelines(), 1);
    assert_eq!(device.live_shader_modules(), 2);
}
