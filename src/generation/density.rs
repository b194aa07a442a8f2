//! Density field construction.
//!
//! Combines height noise, 3D density noise, the level falloff and the height
//! response curve into the signed grid consumed by the mesh extractor.
//!
//! Columns are scanned in raster order (Z outer, X inner) on a single thread.
//! When a column's world point is missing from the falloff field, the last
//! falloff value seen in the scan is reused. This keeps padded border samples
//! that fall outside the level continuous with their neighbours, and only
//! holds while the scan order stays fixed.

use glam::Vec3;

use crate::core::Result;
use crate::generation::chunk::{ChunkData, ChunkGenerationData, ChunkRequest, validate_cube_size};
use crate::generation::coords::column_world_pos;
use crate::generation::grid::{DensityGrid, GridSize};
use crate::terrain::{FalloffSnapshot, HeightCurve};

/// Added to empty cells so they never sit exactly on the iso level.
pub const EMPTY_BIAS: f32 = 0.01;

/// Smallest magnitude stored for a solid cell, keeping it strictly negative.
pub const SOLID_FLOOR: f32 = f32::EPSILON;

/// Inverse of a linear interpolation, clamped to `[0, 1]`. Returns 0 for an empty range.
#[inline]
fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Surface cell index for a column: half the Y extent plus the rounded offset.
#[inline]
pub fn surface_height(offset: f32, y_size: usize) -> usize {
    let max = y_size.saturating_sub(1) as i64;
    let target = (y_size / 2) as i64 + offset.round_ties_even() as i64;
    target.clamp(0, max) as usize
}

/// Parameters shared by the native and padded builds of one chunk.
#[derive(Clone, Copy, Debug)]
pub struct DensityFieldBuilder<'a> {
    pub height_multiplier: f32,
    pub height_curve: &'a HeightCurve,
    pub falloff: &'a FalloffSnapshot,
    pub cube_size: f32,
    pub chunk_pos: Vec3,
    pub surface_threshold: f32,
}

impl<'a> DensityFieldBuilder<'a> {
    pub fn for_request(request: &'a ChunkRequest, falloff: &'a FalloffSnapshot) -> Self {
        Self {
            height_multiplier: request.height_multiplier,
            height_curve: &request.height_curve,
            falloff,
            cube_size: request.cube_size,
            chunk_pos: request.position,
            surface_threshold: request.surface_threshold,
        }
    }

    /// Build the density grid of `size` from `data`.
    pub fn build(&self, size: GridSize, data: &ChunkData) -> Result<DensityGrid> {
        size.validate()?;
        validate_cube_size(self.cube_size)?;
        data.check_size(size)?;

        let mut grid = DensityGrid::filled(size, 0.0);
        let top = size.y - 1;
        let mut last_falloff = 0.0;

        for z in 0..size.z {
            for x in 0..size.x {
                let point = column_world_pos(x, z, size.x, size.z, self.cube_size, self.chunk_pos);
                let falloff = match self.falloff.lookup(point) {
                    Some(value) => {
                        last_falloff = value;
                        value
                    }
                    None => last_falloff,
                };

                let height_value = (data.height_map.get(x, z) + falloff).clamp(0.0, 1.0);
                let offset = self.height_curve.evaluate(height_value) * self.height_multiplier;
                let surface = surface_height(offset, size.y);
                let column_weight = inverse_lerp(0.0, top as f32, surface as f32);

                for y in 0..size.y {
                    let noise = (data.density_noise.get(x, y, z) + falloff).clamp(0.0, 1.0);
                    let value = column_weight * (1.0 - noise);

                    let solid = y <= surface && noise >= self.surface_threshold && y < top;
                    let density = if solid {
                        -value.max(SOLID_FLOOR)
                    } else {
                        (value + EMPTY_BIAS).clamp(0.0, 1.0)
                    };
                    grid.set(x, y, z, density);
                }
            }
        }

        Ok(grid)
    }
}

/// Build the native and padded density grids for one chunk.
pub fn build_density_pair(
    data: &ChunkGenerationData,
    falloff: &FalloffSnapshot,
) -> Result<(DensityGrid, DensityGrid)> {
    let builder = DensityFieldBuilder::for_request(&data.request, falloff);
    let native = builder.build(data.request.grid_size, &data.chunk_data)?;
    let padded = builder.build(data.request.padded_grid_size(), &data.padded_data)?;
    Ok((native, padded))
}
