//! End-to-end scheduler behaviour: ordering, draining, reset and failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use glam::{UVec2, Vec3};

use rkterrain::core::TerrainError;
use rkterrain::generation::{
    ChunkRequest, ChunkStage, GenerationConfig, Grid2, Grid3, GridSize, HeightMap, NoiseVolume,
};
use rkterrain::meshing::MeshData;
use rkterrain::streaming::{DrainMode, GenerationScheduler, QueueKind, SchedulerConfig};
use rkterrain::terrain::{FalloffField, FalloffSnapshot, HeightCurve, NoiseSampler, NoiseSettings};

struct ConstantNoise(f32);

impl NoiseSampler for ConstantNoise {
    fn height_noise(&self, width: usize, depth: usize, _: f32, _: Vec3, _: &NoiseSettings) -> HeightMap {
        Grid2::filled(width, depth, self.0)
    }

    fn density_noise(&self, size: GridSize, _: f32, _: Vec3, _: &NoiseSettings) -> NoiseVolume {
        Grid3::filled(size, self.0)
    }
}

/// Blocks every height sample until the gate sender is dropped.
struct GatedNoise {
    gate: Receiver<()>,
    inner: ConstantNoise,
}

impl NoiseSampler for GatedNoise {
    fn height_noise(&self, width: usize, depth: usize, cube: f32, pos: Vec3, s: &NoiseSettings) -> HeightMap {
        let _ = self.gate.recv();
        self.inner.height_noise(width, depth, cube, pos, s)
    }

    fn density_noise(&self, size: GridSize, cube: f32, pos: Vec3, s: &NoiseSettings) -> NoiseVolume {
        self.inner.density_noise(size, cube, pos, s)
    }
}

fn flat_request() -> ChunkRequest {
    ChunkRequest {
        position: Vec3::ZERO,
        dimensions: Vec3::splat(3.0),
        grid_size: GridSize::new(4, 4, 4),
        cube_size: 1.0,
        surface_threshold: 0.5,
        noise: NoiseSettings::default(),
        height_curve: HeightCurve::constant(0.0),
        height_multiplier: 0.0,
    }
}

fn flat_scheduler(sampler: Arc<dyn NoiseSampler>) -> GenerationScheduler {
    let falloff = Arc::new(FalloffField::new());
    falloff.install(FalloffSnapshot::empty());
    GenerationScheduler::new(&SchedulerConfig { workers: 2 })
        .unwrap()
        .with_falloff(falloff)
        .with_noise_sampler(sampler)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn pump_until(scheduler: &GenerationScheduler, mut condition: impl FnMut() -> bool) -> bool {
    wait_for(|| {
        scheduler.drain_tick(false).unwrap();
        condition()
    })
}

fn gate() -> (Sender<()>, Receiver<()>) {
    bounded(0)
}

#[test]
fn test_flat_chunk_density() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    let counts = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&counts);

    scheduler
        .request_chunk(flat_request(), move |scheduler, data| {
            let (native, padded) = scheduler.build_density(&data)?;
            let solid = |g: &Grid3| g.values().iter().filter(|v| **v < 0.0).count();
            *slot.lock().unwrap() = Some((native.size(), solid(&native), padded.size(), solid(&padded)));
            Ok(())
        })
        .unwrap();

    assert!(pump_until(&scheduler, || counts.lock().unwrap().is_some()));
    let (native_size, native_solid, padded_size, padded_solid) = counts.lock().unwrap().unwrap();
    assert_eq!(native_size, GridSize::new(4, 4, 4));
    assert_eq!(native_solid, 48);
    assert_eq!(padded_size, GridSize::new(6, 4, 6));
    assert_eq!(padded_solid, 3 * 6 * 6);
}

#[test]
fn test_callbacks_run_on_consumer_thread_in_order() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    let consumer = thread::current().id();
    let events: Arc<Mutex<Vec<(&'static str, ThreadId)>>> = Arc::new(Mutex::new(Vec::new()));

    let chunk_events = Arc::clone(&events);
    let id = scheduler
        .request_chunk(flat_request(), move |scheduler, data| {
            chunk_events.lock().unwrap().push(("chunk", thread::current().id()));
            let (native, padded) = scheduler.build_density(&data)?;
            let mesh_events = Arc::clone(&chunk_events);
            scheduler.request_mesh(data.id, native, padded, data.request.cube_size, move |_, mesh| {
                assert!(!mesh.is_empty());
                mesh_events.lock().unwrap().push(("mesh", thread::current().id()));
                Ok(())
            })
        })
        .unwrap();

    assert!(pump_until(&scheduler, || events.lock().unwrap().len() == 2));
    let events = events.lock().unwrap();
    assert_eq!(events[0].0, "chunk");
    assert_eq!(events[1].0, "mesh");
    assert!(events.iter().all(|(_, thread)| *thread == consumer));
    assert_eq!(scheduler.stage(id), None);
    assert_eq!(scheduler.materialized_count(), 1);
}

#[test]
fn test_drain_one_then_all() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    let invoked = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let counter = Arc::clone(&invoked);
        scheduler
            .request_chunk(flat_request(), move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }

    assert!(wait_for(|| scheduler.pending(QueueKind::Chunk) == 3));
    assert_eq!(scheduler.drain(QueueKind::Chunk, DrainMode::One).unwrap(), 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending(QueueKind::Chunk), 2);

    assert_eq!(scheduler.drain(QueueKind::Chunk, DrainMode::All).unwrap(), 2);
    assert_eq!(invoked.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.drain(QueueKind::Chunk, DrainMode::All).unwrap(), 0);
}

#[test]
fn test_time_sliced_tick_takes_one_chunk() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    for _ in 0..2 {
        scheduler.request_chunk(flat_request(), |_, _| Ok(())).unwrap();
    }
    assert!(wait_for(|| scheduler.pending(QueueKind::Chunk) == 2));

    let stats = scheduler.drain_tick(true).unwrap();
    assert_eq!(stats.chunks, 1);
    assert_eq!(scheduler.pending(QueueKind::Chunk), 1);
}

#[test]
fn test_callback_error_propagates_from_drain() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    scheduler
        .request_chunk(flat_request(), |_, _| Err(TerrainError::Config("rejected".into())))
        .unwrap();
    assert!(wait_for(|| scheduler.pending(QueueKind::Chunk) == 1));
    assert!(matches!(
        scheduler.drain(QueueKind::Chunk, DrainMode::All),
        Err(TerrainError::Config(_))
    ));
}

#[test]
fn test_reset_discards_queued_completions() {
    let scheduler = flat_scheduler(Arc::new(ConstantNoise(0.6)));
    let invoked = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let counter = Arc::clone(&invoked);
        scheduler
            .request_chunk(flat_request(), move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }
    assert!(wait_for(|| scheduler.pending(QueueKind::Chunk) == 2 && scheduler.in_flight() == 0));

    assert_eq!(scheduler.reset(), 2);
    assert_eq!(scheduler.drain_tick(false).unwrap().chunks, 0);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert!(scheduler.is_idle());
}

#[test]
fn test_completion_after_reset_still_fires() {
    let (release, gate_rx) = gate();
    let scheduler = flat_scheduler(Arc::new(GatedNoise {
        gate: gate_rx,
        inner: ConstantNoise(0.6),
    }));
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    let id = scheduler
        .request_chunk(flat_request(), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    // The worker is blocked, so reset has nothing to discard
    assert_eq!(scheduler.in_flight(), 1);
    assert_eq!(scheduler.reset(), 0);
    assert_eq!(scheduler.drain_tick(false).unwrap().chunks, 0);
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.stage(id), Some(ChunkStage::Requested));

    drop(release);
    assert!(wait_for(|| scheduler.pending(QueueKind::Chunk) == 1));
    assert_eq!(scheduler.drain(QueueKind::Chunk, DrainMode::All).unwrap(), 1);
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.stage(id), Some(ChunkStage::NoiseReady));
}

#[test]
fn test_request_before_falloff_fails() {
    let scheduler = GenerationScheduler::new(&SchedulerConfig { workers: 1 })
        .unwrap()
        .with_falloff(Arc::new(FalloffField::new()));
    let result = scheduler.generate_chunk(flat_request(), |_, _| {});
    assert!(matches!(result, Err(TerrainError::FalloffNotInitialized)));
    assert!(scheduler.is_idle());
}

#[test]
fn test_generate_small_level() {
    let mut config = GenerationConfig::default();
    config.level_chunks = UVec2::new(2, 2);
    config.chunk_dimensions = Vec3::new(8.0, 8.0, 8.0);
    let layout = config.layout().unwrap();

    let falloff = Arc::new(FalloffField::new());
    falloff.initialize(&layout, &config.falloff);
    let scheduler = GenerationScheduler::new(&SchedulerConfig { workers: 2 })
        .unwrap()
        .with_falloff(falloff);

    let meshes: Arc<Mutex<Vec<MeshData>>> = Arc::new(Mutex::new(Vec::new()));
    let mut ids = Vec::new();
    for (i, j) in layout.chunks() {
        let sink = Arc::clone(&meshes);
        let id = scheduler
            .generate_chunk(config.chunk_request(&layout, i, j), move |_, mesh| {
                sink.lock().unwrap().push(mesh);
            })
            .unwrap();
        ids.push(id);
    }

    assert!(pump_until(&scheduler, || meshes.lock().unwrap().len() == 4 && scheduler.is_idle()));
    for mesh in meshes.lock().unwrap().iter() {
        assert!(!mesh.is_empty());
        assert_eq!(mesh.vertices.len(), mesh.normals.len());
        let half = 4.0 + 1e-4;
        assert!(mesh.vertices.iter().all(|v| v.x.abs() <= half && v.z.abs() <= half));
    }
    for id in ids {
        assert_eq!(scheduler.stage(id), None);
    }
    assert_eq!(scheduler.materialized_count(), 4);
    assert_eq!(scheduler.tracked(), 0);
}

#[test]
fn test_global_falloff_field() {
    let config = GenerationConfig {
        level_chunks: UVec2::new(1, 1),
        chunk_dimensions: Vec3::new(4.0, 4.0, 4.0),
        ..GenerationConfig::default()
    };
    let layout = config.layout().unwrap();
    FalloffField::global().initialize(&layout, &config.falloff);
    assert!(FalloffField::global().is_initialized());

    let scheduler = GenerationScheduler::new(&SchedulerConfig { workers: 1 }).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    scheduler
        .generate_chunk(config.chunk_request(&layout, 0, 0), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    assert!(pump_until(&scheduler, || done.load(Ordering::SeqCst) == 1));
}
