//! Level generator binary - builds every chunk of a level end to end.
//!
//! Usage: cargo run --release --bin generate_level -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>    JSON generation config (default: built-in defaults)
//!   --chunks <N>       Level size in chunks along X and Z (overrides config)
//!   --seed <SEED>      Noise seed (overrides config)
//!   --workers <N>      Worker threads, 0 = all cores (overrides config)
//!   --tick-ms <MS>     Consumer tick length in milliseconds (default: 16)
//!   --no-time-slice    Drain every chunk completion each tick

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use glam::UVec2;

use rkterrain::core::Result;
use rkterrain::generation::{ChunkId, GenerationConfig};
use rkterrain::meshing::MeshData;
use rkterrain::streaming::{GenerationScheduler, SchedulerConfig};
use rkterrain::terrain::FalloffField;

fn main() -> ExitCode {
    rkterrain::core::logging::init_with_timestamps();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Level generation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => GenerationConfig::load(&PathBuf::from(path))?,
        None => GenerationConfig::default(),
    };
    if let Some(chunks) = parse_u32_arg(&args, "--chunks") {
        config.level_chunks = UVec2::splat(chunks);
    }
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.noise.seed = seed;
    }
    if let Some(workers) = parse_usize_arg(&args, "--workers") {
        config.workers = workers;
    }
    if args.iter().any(|a| a == "--no-time-slice") {
        config.time_sliced = false;
    }
    let tick = Duration::from_millis(parse_u64_arg(&args, "--tick-ms").unwrap_or(16));
    config.validate()?;

    let layout = config.layout()?;
    let total = layout.chunk_count();

    println!("=== Rkterrain Level Generator ===");
    println!("Level:  {} x {} chunks", layout.level_size.x, layout.level_size.y);
    println!("Chunk:  {} world units, grid {}", config.chunk_dimensions, config.grid_size()?);
    println!("Seed:   {}", config.noise.seed);
    println!("Slice:  {}", if config.time_sliced { "one chunk per tick" } else { "off" });
    println!();

    let falloff = FalloffField::global().initialize(&layout, &config.falloff);
    log::info!("Falloff field ready ({} samples)", falloff.len());

    let scheduler = GenerationScheduler::new(&SchedulerConfig {
        workers: config.workers,
    })?;

    let meshes: Arc<Mutex<Vec<(ChunkId, MeshData)>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let start = Instant::now();

    for (i, j) in layout.chunks() {
        let request = config.chunk_request(&layout, i, j);
        let sink = Arc::clone(&meshes);
        scheduler.generate_chunk(request, move |id, mesh| {
            log::debug!("Chunk {id} materialized: {} triangles", mesh.triangle_count());
            sink.lock().unwrap_or_else(PoisonError::into_inner).push((id, mesh));
        })?;
    }

    let mut ticks = 0u64;
    loop {
        let tick_start = Instant::now();
        scheduler.drain_tick(config.time_sliced)?;
        ticks += 1;

        let done = meshes.lock().unwrap_or_else(PoisonError::into_inner).len();
        if done == total {
            break;
        }
        if scheduler.is_idle() {
            log::error!("{} of {total} chunks failed to generate", total - done);
            break;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }

    let meshes = meshes.lock().unwrap_or_else(PoisonError::into_inner);
    let vertices: usize = meshes.iter().map(|(_, m)| m.vertices.len()).sum();
    let triangles: usize = meshes.iter().map(|(_, m)| m.triangle_count()).sum();

    println!("=== Done ===");
    println!("Chunks:    {}/{}", meshes.len(), total);
    println!("Vertices:  {vertices}");
    println!("Triangles: {triangles}");
    println!("Ticks:     {ticks}");
    println!("Time:      {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
