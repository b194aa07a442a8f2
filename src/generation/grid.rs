//! Flat scalar grids used by every pipeline stage.
//!
//! Axis order is explicit because padding is asymmetric: the normal grid is
//! two cells larger in X and Z but has the same Y extent.
//!
//! - [`Grid2`] stores `(x, z)` samples with X varying fastest: `x + width * z`.
//! - [`Grid3`] stores `(x, y, z)` samples with X fastest, then Y, then Z:
//!   `x + size.x * (y + size.y * z)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Result, TerrainError};

/// Number of grid points along each axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl GridSize {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Size of the normal-computation grid: one extra sample on each X/Z side.
    pub const fn padded(self) -> Self {
        Self {
            x: self.x + 2,
            y: self.y,
            z: self.z + 2,
        }
    }

    /// Total number of samples
    pub const fn volume(self) -> usize {
        self.x * self.y * self.z
    }

    /// Reject grids with a zero dimension.
    pub fn validate(self) -> Result<()> {
        if self.x == 0 || self.y == 0 || self.z == 0 {
            return Err(TerrainError::InvalidGridSize {
                x: self.x,
                y: self.y,
                z: self.z,
            });
        }
        Ok(())
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// 2D grid of scalars over the XZ plane
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2 {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl Grid2 {
    /// Create a grid filled with `value`
    pub fn filled(width: usize, depth: usize, value: f32) -> Self {
        Self {
            width,
            depth,
            values: vec![value; width * depth],
        }
    }

    /// Create a grid by evaluating `f(x, z)` for every sample, in storage order.
    pub fn from_fn(width: usize, depth: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(width * depth);
        for z in 0..depth {
            for x in 0..width {
                values.push(f(x, z));
            }
        }
        Self { width, depth, values }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.width && z < self.depth);
        x + self.width * z
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[self.index(x, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        let idx = self.index(x, z);
        self.values[idx] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// 3D grid of scalars
#[derive(Clone, Debug, PartialEq)]
pub struct Grid3 {
    size: GridSize,
    values: Vec<f32>,
}

impl Grid3 {
    /// Create a grid filled with `value`
    pub fn filled(size: GridSize, value: f32) -> Self {
        Self {
            size,
            values: vec![value; size.volume()],
        }
    }

    /// Create a grid by evaluating `f(x, y, z)` for every sample, in storage order.
    pub fn from_fn(size: GridSize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(size.volume());
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    values.push(f(x, y, z));
                }
            }
        }
        Self { size, values }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.size.x && y < self.size.y && z < self.size.z);
        x + self.size.x * (y + self.size.y * z)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let idx = self.index(x, y, z);
        self.values[idx] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// 2D height-noise samples for one chunk resolution
pub type HeightMap = Grid2;

/// 3D density-noise samples for one chunk resolution
pub type NoiseVolume = Grid3;

/// Signed scalar field handed to the mesh extractor.
///
/// Negative values are solid (below the surface), non-negative values are empty.
pub type DensityGrid = Grid3;
