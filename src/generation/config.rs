//! Level generation configuration, loadable from JSON.

use std::io;
use std::path::Path;

use glam::{UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::{Result, TerrainError};
use crate::generation::chunk::ChunkRequest;
use crate::generation::grid::GridSize;
use crate::generation::level::{LevelLayout, axis_samples};
use crate::terrain::{FalloffParams, HeightCurve, NoiseSettings};

/// Configuration for generating a whole level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of chunks along X and Z
    pub level_chunks: UVec2,
    /// World-space extent of one chunk (X, height, Z)
    pub chunk_dimensions: Vec3,
    /// World units per grid cell
    pub cube_size: f32,
    /// Minimum blended noise for a cell to become solid
    pub surface_threshold: f32,
    /// Scales the height curve output, in grid cells
    pub height_multiplier: f32,
    /// Maps blended column height to a signed surface offset
    pub height_curve: HeightCurve,
    pub noise: NoiseSettings,
    pub falloff: FalloffParams,
    /// Worker threads; 0 uses the available parallelism
    pub workers: usize,
    /// Drain at most one chunk completion per tick
    pub time_sliced: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            level_chunks: UVec2::new(4, 4),
            chunk_dimensions: Vec3::new(16.0, 16.0, 16.0),
            cube_size: 1.0,
            surface_threshold: 0.45,
            height_multiplier: 4.0,
            height_curve: HeightCurve::new(vec![(0.0, -1.0), (0.5, 0.0), (1.0, 1.0)]),
            noise: NoiseSettings::default(),
            falloff: FalloffParams::default(),
            workers: 0,
            time_sliced: true,
        }
    }
}

impl GenerationConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| TerrainError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let layout = self.layout()?;
        let height = axis_samples(self.chunk_dimensions.y, self.cube_size)?;
        layout.grid_size(height).validate()?;
        if !self.surface_threshold.is_finite() {
            return Err(TerrainError::Config(format!(
                "surface_threshold must be finite, got {}",
                self.surface_threshold
            )));
        }
        if !self.height_multiplier.is_finite() {
            return Err(TerrainError::Config(format!(
                "height_multiplier must be finite, got {}",
                self.height_multiplier
            )));
        }
        if self.noise.octaves == 0 {
            return Err(TerrainError::Config("noise octaves must be at least 1".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<LevelLayout> {
        LevelLayout::new(
            self.level_chunks,
            Vec2::new(self.chunk_dimensions.x, self.chunk_dimensions.z),
            self.cube_size,
        )
    }

    /// Grid samples along Y, or 0 when the height or cube size is invalid
    pub fn grid_height(&self) -> usize {
        axis_samples(self.chunk_dimensions.y, self.cube_size).unwrap_or(0)
    }

    /// Native grid size shared by every chunk of the level
    pub fn grid_size(&self) -> Result<GridSize> {
        Ok(self.layout()?.grid_size(self.grid_height()))
    }

    /// Request for chunk `(i, j)` of the level.
    pub fn chunk_request(&self, layout: &LevelLayout, i: u32, j: u32) -> ChunkRequest {
        ChunkRequest {
            position: layout.chunk_position(i, j),
            dimensions: self.chunk_dimensions,
            grid_size: layout.grid_size(self.grid_height()),
            cube_size: self.cube_size,
            surface_threshold: self.surface_threshold,
            noise: self.noise.clone(),
            height_curve: self.height_curve.clone(),
            height_multiplier: self.height_multiplier,
        }
    }
}
