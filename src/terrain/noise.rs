//! Noise sampling for chunk generation.
//!
//! The pipeline treats noise as a pure function of its inputs: the same
//! settings and chunk position always produce the same grids, which keeps
//! chunk borders continuous.

use glam::{Vec2, Vec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::generation::coords::{column_world_pos, sample_world_pos};
use crate::generation::grid::{Grid2, Grid3, GridSize, HeightMap, NoiseVolume};

/// Smallest usable horizontal scale; smaller values are clamped to this.
const MIN_SCALE: f32 = 1e-4;

/// Seed offset that decorrelates the 3D density noise from the 2D height noise
const DENSITY_SEED_OFFSET: u32 = 7919;

/// Parameters controlling noise generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: u32,
    pub scale: f32,       // World units per noise period (larger = smoother)
    pub octaves: u32,     // FBM octaves (detail levels)
    pub persistence: f32, // FBM persistence (0.5 typical)
    pub lacunarity: f32,  // FBM lacunarity (2.0 typical)
    pub offset: Vec2,     // Shifts the sampled XZ window
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 40.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
        }
    }
}

impl NoiseSettings {
    fn fbm(&self, seed: u32) -> Fbm<Perlin> {
        let octaves = (self.octaves as usize).clamp(1, Fbm::<Perlin>::MAX_OCTAVES);
        Fbm::<Perlin>::new(seed)
            .set_octaves(octaves)
            .set_persistence(self.persistence as f64)
            .set_lacunarity(self.lacunarity as f64)
    }

    fn scale(&self) -> f64 {
        self.scale.max(MIN_SCALE) as f64
    }
}

/// Produces the raw noise grids for one chunk resolution.
pub trait NoiseSampler: Send + Sync {
    /// 2D height noise in `[0, 1]`, one sample per grid column.
    fn height_noise(
        &self,
        width: usize,
        depth: usize,
        cube_size: f32,
        chunk_pos: Vec3,
        settings: &NoiseSettings,
    ) -> HeightMap;

    /// 3D density noise in `[0, 1]`, one sample per grid cell.
    fn density_noise(
        &self,
        size: GridSize,
        cube_size: f32,
        chunk_pos: Vec3,
        settings: &NoiseSettings,
    ) -> NoiseVolume;
}

/// Fractal Brownian motion over Perlin noise, sampled at world positions.
#[derive(Clone, Copy, Debug, Default)]
pub struct FbmNoiseSampler;

impl FbmNoiseSampler {
    pub fn new() -> Self {
        Self
    }
}

/// Map noise output from [-1, 1] to [0, 1]
#[inline]
fn normalize(value: f64) -> f32 {
    ((value + 1.0) * 0.5).clamp(0.0, 1.0) as f32
}

impl NoiseSampler for FbmNoiseSampler {
    fn height_noise(
        &self,
        width: usize,
        depth: usize,
        cube_size: f32,
        chunk_pos: Vec3,
        settings: &NoiseSettings,
    ) -> HeightMap {
        let fbm = settings.fbm(settings.seed);
        let scale = settings.scale();
        Grid2::from_fn(width, depth, |x, z| {
            let p = column_world_pos(x, z, width, depth, cube_size, chunk_pos) + settings.offset;
            normalize(fbm.get([p.x as f64 / scale, p.y as f64 / scale]))
        })
    }

    fn density_noise(
        &self,
        size: GridSize,
        cube_size: f32,
        chunk_pos: Vec3,
        settings: &NoiseSettings,
    ) -> NoiseVolume {
        let fbm = settings.fbm(settings.seed.wrapping_add(DENSITY_SEED_OFFSET));
        let scale = settings.scale();
        Grid3::from_fn(size, |x, y, z| {
            let p = sample_world_pos(x, y, z, size, cube_size, chunk_pos);
            let nx = (p.x + settings.offset.x) as f64 / scale;
            let ny = p.y as f64 / scale;
            let nz = (p.z + settings.offset.y) as f64 / scale;
            normalize(fbm.get([nx, ny, nz]))
        })
    }
}
