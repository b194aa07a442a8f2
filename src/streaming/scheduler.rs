//! Generation scheduler.
//!
//! Runs the noise and mesh stages on a rayon worker pool and hands their
//! results back through two completion queues. Density building and every
//! callback run on the consumer thread, the one that calls [`drain`] or
//! [`drain_tick`].
//!
//! Chunk flow:
//!
//! ```text
//! request_chunk ─► worker: noise ─► chunk queue ─► consumer: density ─► request_mesh
//!                                                                          │
//!      consumer: on_mesh ◄── mesh queue ◄── worker: mesh extraction ◄──────┘
//! ```
//!
//! [`drain`]: GenerationScheduler::drain
//! [`drain_tick`]: GenerationScheduler::drain_tick

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::core::{Result, TerrainError};
use crate::generation::chunk::{ChunkGenerationData, ChunkId, ChunkRequest, ChunkStage};
use crate::generation::density::build_density_pair;
use crate::generation::grid::DensityGrid;
use crate::meshing::{MarchingCubes, MeshData, MeshExtractor, check_padded};
use crate::streaming::queue::{CompletionEnvelope, CompletionQueue, DrainMode};
use crate::terrain::{FalloffField, FbmNoiseSampler, NoiseSampler};

/// Which completion queue to drain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    /// Finished noise stages
    Chunk,
    /// Finished mesh extractions
    Mesh,
}

/// Scheduler settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads; 0 uses the available parallelism
    pub workers: usize,
}

/// Callbacks invoked per queue in one [`GenerationScheduler::drain_tick`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub chunks: usize,
    pub meshes: usize,
}

/// Where the scheduler reads the level falloff from
enum FalloffSource {
    Global,
    Shared(Arc<FalloffField>),
}

impl FalloffSource {
    fn field(&self) -> &FalloffField {
        match self {
            FalloffSource::Global => FalloffField::global(),
            FalloffSource::Shared(field) => field.as_ref(),
        }
    }
}

type StageMap = Arc<Mutex<HashMap<ChunkId, ChunkStage>>>;

fn lock_stages(stages: &Mutex<HashMap<ChunkId, ChunkStage>>) -> MutexGuard<'_, HashMap<ChunkId, ChunkStage>> {
    stages.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One task on the worker pool.
///
/// Dropping the guard releases the in-flight slot, including when the task
/// panics. A task that never enqueued a completion also forgets its chunk,
/// since that chunk can no longer progress.
struct TaskGuard {
    chunk: ChunkId,
    in_flight: Arc<AtomicUsize>,
    stages: StageMap,
    enqueued: bool,
}

impl TaskGuard {
    fn new(chunk: ChunkId, in_flight: &Arc<AtomicUsize>, stages: &StageMap) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            chunk,
            in_flight: Arc::clone(in_flight),
            stages: Arc::clone(stages),
            enqueued: false,
        }
    }

    /// Record whether the completion reached its queue.
    fn sent(&mut self, enqueued: bool) -> bool {
        self.enqueued = enqueued;
        enqueued
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.enqueued {
            lock_stages(&self.stages).remove(&self.chunk);
            log::warn!("Chunk {} will not complete", self.chunk);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

type ChunkQueue = CompletionQueue<ChunkGenerationData, GenerationScheduler>;
type MeshQueue = CompletionQueue<MeshData, GenerationScheduler>;

/// Asynchronous chunk generation with consumer-thread completions.
pub struct GenerationScheduler {
    pool: ThreadPool,
    falloff: FalloffSource,
    noise: Arc<dyn NoiseSampler>,
    extractor: Arc<dyn MeshExtractor>,
    chunk_queue: ChunkQueue,
    mesh_queue: MeshQueue,
    stages: StageMap,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    materialized: AtomicUsize,
}

impl GenerationScheduler {
    /// Create a scheduler using the global falloff field, fBm noise and marching cubes.
    pub fn new(config: &SchedulerConfig) -> Result<Self> {
        let workers = if config.workers == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            config.workers
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("terrain-gen-{i}"))
            .panic_handler(|payload| {
                log::error!("Generation task panicked: {}", panic_message(payload.as_ref()));
            })
            .build()
            .map_err(|e| TerrainError::WorkerPool(e.to_string()))?;

        log::info!("Generation scheduler started with {workers} workers");

        Ok(Self {
            pool,
            falloff: FalloffSource::Global,
            noise: Arc::new(FbmNoiseSampler::new()),
            extractor: Arc::new(MarchingCubes::new()),
            chunk_queue: CompletionQueue::new(),
            mesh_queue: CompletionQueue::new(),
            stages: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            materialized: AtomicUsize::new(0),
        })
    }

    /// Read falloff from `field` instead of the process-wide one.
    pub fn with_falloff(mut self, field: Arc<FalloffField>) -> Self {
        self.falloff = FalloffSource::Shared(field);
        self
    }

    pub fn with_noise_sampler(mut self, sampler: Arc<dyn NoiseSampler>) -> Self {
        self.noise = sampler;
        self
    }

    pub fn with_mesh_extractor(mut self, extractor: Arc<dyn MeshExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn falloff(&self) -> &FalloffField {
        self.falloff.field()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Start the noise stage for `request`.
    ///
    /// `on_chunk_data` runs on the consumer thread during a later chunk-queue
    /// drain. Fails without spawning anything if the request is invalid or the
    /// falloff field has not been initialized.
    pub fn request_chunk<F>(&self, request: ChunkRequest, on_chunk_data: F) -> Result<ChunkId>
    where
        F: FnOnce(&GenerationScheduler, ChunkGenerationData) -> Result<()> + Send + 'static,
    {
        request.validate()?;
        if !self.falloff().is_initialized() {
            return Err(TerrainError::FalloffNotInitialized);
        }

        let id = ChunkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.set_stage(id, ChunkStage::Requested);
        log::debug!("Chunk {id} requested at {} ({})", request.position, request.grid_size);

        let noise = Arc::clone(&self.noise);
        let sender = self.chunk_queue.sender();
        let mut task = TaskGuard::new(id, &self.in_flight, &self.stages);

        self.pool.spawn(move || {
            let data = ChunkGenerationData::generate(id, request, noise.as_ref());
            let envelope = CompletionEnvelope::new(
                id,
                data,
                Box::new(move |scheduler: &GenerationScheduler, data| {
                    scheduler.set_stage(id, ChunkStage::NoiseReady);
                    on_chunk_data(scheduler, data)
                }),
            );
            if !task.sent(sender.send(envelope)) {
                log::warn!("Chunk {id} finished after its scheduler was dropped");
            }
        });

        Ok(id)
    }

    /// Build the native and padded density grids for noise-stage output.
    ///
    /// Runs on the calling thread against the current falloff snapshot.
    pub fn build_density(&self, data: &ChunkGenerationData) -> Result<(DensityGrid, DensityGrid)> {
        let falloff = self.falloff().snapshot()?;
        build_density_pair(data, &falloff)
    }

    /// Start mesh extraction for a chunk's density grids.
    ///
    /// `on_mesh` runs on the consumer thread during a later mesh-queue drain.
    /// If extraction fails or panics on the worker, the error is logged,
    /// `on_mesh` is never called and the chunk is no longer tracked.
    pub fn request_mesh<F>(
        &self,
        id: ChunkId,
        density: DensityGrid,
        padded: DensityGrid,
        cube_size: f32,
        on_mesh: F,
    ) -> Result<()>
    where
        F: FnOnce(&GenerationScheduler, MeshData) -> Result<()> + Send + 'static,
    {
        check_padded(&density, &padded)?;
        self.set_stage(id, ChunkStage::DensityReady);

        let extractor = Arc::clone(&self.extractor);
        let sender = self.mesh_queue.sender();
        let mut task = TaskGuard::new(id, &self.in_flight, &self.stages);

        self.pool.spawn(move || {
            match extractor.extract(&density, &padded, cube_size) {
                Ok(mesh) => {
                    let envelope = CompletionEnvelope::new(
                        id,
                        mesh,
                        Box::new(move |scheduler: &GenerationScheduler, mesh| {
                            scheduler.set_stage(id, ChunkStage::MeshReady);
                            on_mesh(scheduler, mesh)?;
                            scheduler.finish(id);
                            Ok(())
                        }),
                    );
                    if !task.sent(sender.send(envelope)) {
                        log::warn!("Mesh for chunk {id} finished after its scheduler was dropped");
                    }
                }
                Err(e) => log::error!("Mesh extraction failed for chunk {id}: {e}"),
            }
        });

        Ok(())
    }

    /// Run the whole pipeline for `request`; `on_mesh` receives the finished mesh.
    pub fn generate_chunk<F>(&self, request: ChunkRequest, on_mesh: F) -> Result<ChunkId>
    where
        F: FnOnce(ChunkId, MeshData) + Send + 'static,
    {
        self.request_chunk(request, move |scheduler, data| {
            let (density, padded) = scheduler.build_density(&data)?;
            let id = data.id;
            scheduler.request_mesh(id, density, padded, data.request.cube_size, move |_, mesh| {
                on_mesh(id, mesh);
                Ok(())
            })
        })
    }

    /// Invoke queued callbacks of one queue on the calling thread.
    ///
    /// Only envelopes present when the call starts are considered. A callback
    /// error stops the drain and is returned; later envelopes stay queued.
    pub fn drain(&self, queue: QueueKind, mode: DrainMode) -> Result<usize> {
        match queue {
            QueueKind::Chunk => self.chunk_queue.drain(self, mode),
            QueueKind::Mesh => self.mesh_queue.drain(self, mode),
        }
    }

    /// One consumer tick: one chunk completion when time-sliced (all otherwise),
    /// then every mesh completion.
    pub fn drain_tick(&self, time_sliced: bool) -> Result<DrainStats> {
        let mode = if time_sliced { DrainMode::One } else { DrainMode::All };
        let chunks = self.drain(QueueKind::Chunk, mode)?;
        let meshes = self.drain(QueueKind::Mesh, DrainMode::All)?;
        Ok(DrainStats { chunks, meshes })
    }

    /// Discard everything queued on both queues without invoking it, and stop
    /// tracking the chunks those completions belonged to.
    ///
    /// Work still running on a worker is not cancelled; its completion will be
    /// enqueued and invoked by a later drain. Call this only when no worker is
    /// in flight (see [`is_idle`](Self::is_idle)) to guarantee a clean slate.
    pub fn reset(&self) -> usize {
        let mut chunks = self.chunk_queue.clear();
        chunks.extend(self.mesh_queue.clear());
        {
            let mut stages = self.lock_stages();
            for id in &chunks {
                stages.remove(id);
            }
        }

        let discarded = chunks.len();
        let in_flight = self.in_flight();
        if discarded > 0 {
            log::warn!("Scheduler reset discarded {discarded} pending completions");
        }
        if in_flight > 0 {
            log::warn!("Scheduler reset with {in_flight} tasks still running");
        }
        discarded
    }

    pub fn pending(&self, queue: QueueKind) -> usize {
        match queue {
            QueueKind::Chunk => self.chunk_queue.len(),
            QueueKind::Mesh => self.mesh_queue.len(),
        }
    }

    /// Tasks currently running or waiting on the worker pool
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True when no task is running and nothing is queued
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.chunk_queue.is_empty() && self.mesh_queue.is_empty()
    }

    /// Current stage of a chunk still in the pipeline.
    ///
    /// `None` once the chunk has materialized, failed, or been discarded by
    /// [`reset`](Self::reset).
    pub fn stage(&self, id: ChunkId) -> Option<ChunkStage> {
        self.lock_stages().get(&id).copied()
    }

    /// Chunks tracked as somewhere in the pipeline
    pub fn tracked(&self) -> usize {
        self.lock_stages().len()
    }

    /// Chunks whose mesh callback has completed
    pub fn materialized_count(&self) -> usize {
        self.materialized.load(Ordering::SeqCst)
    }

    fn finish(&self, id: ChunkId) {
        match self.lock_stages().remove(&id) {
            Some(ChunkStage::MeshReady) => log::debug!("Chunk {id} is {:?}", ChunkStage::Materialized),
            prev => log::warn!("Chunk {id} moved from {prev:?} to {:?}", ChunkStage::Materialized),
        }
        self.materialized.fetch_add(1, Ordering::SeqCst);
    }

    fn set_stage(&self, id: ChunkId, stage: ChunkStage) {
        let previous = self.lock_stages().insert(id, stage);
        match previous {
            Some(prev) if prev.next() != Some(stage) => {
                log::warn!("Chunk {id} moved from {prev:?} to {stage:?}");
            }
            _ => log::debug!("Chunk {id} is {stage:?}"),
        }
    }

    fn lock_stages(&self) -> MutexGuard<'_, HashMap<ChunkId, ChunkStage>> {
        lock_stages(&self.stages)
    }
}
