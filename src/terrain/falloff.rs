//! Level-wide falloff lookup.
//!
//! The falloff field raises terrain towards the level boundary. It is built
//! once for the whole level before any chunk generates, then read concurrently
//! by every density build. Each (re)initialization produces a new immutable
//! [`FalloffSnapshot`] that replaces the previous one under a write lock; the
//! map is never cleared or refilled in place.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::{Result, TerrainError};
use crate::generation::coords::column_world_pos;
use crate::generation::level::LevelLayout;

/// Lookup keys quantize world coordinates to 1/1000 of a world unit.
const KEY_SCALE: f64 = 1000.0;

/// Quantized world-space XZ point.
///
/// Quantization runs in `f64` and stores `i64`, so every finite `f32`
/// coordinate gets its own key; only distances below 1/1000 unit collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FalloffKey {
    pub x: i64,
    pub z: i64,
}

impl FalloffKey {
    #[inline]
    pub fn from_point(point: Vec2) -> Self {
        Self {
            x: (point.x as f64 * KEY_SCALE).round() as i64,
            z: (point.y as f64 * KEY_SCALE).round() as i64,
        }
    }
}

/// Shape of the radial falloff curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalloffParams {
    /// Exponent of the curve; higher values give a sharper edge
    pub steepness: f32,
    /// Moves the transition point; higher values push it outward
    pub shift: f32,
}

impl Default for FalloffParams {
    fn default() -> Self {
        Self {
            steepness: 3.0,
            shift: 2.2,
        }
    }
}

impl FalloffParams {
    /// Falloff for a normalized distance `t` from the level center (0 = center, 1 = edge).
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let near = t.powf(self.steepness);
        let far = (self.shift - self.shift * t).max(0.0).powf(self.steepness);
        let denom = near + far;
        if denom <= f32::EPSILON {
            return 0.0;
        }
        near / denom
    }
}

/// Immutable falloff values for one level
#[derive(Clone, Debug, Default)]
pub struct FalloffSnapshot {
    values: HashMap<FalloffKey, f32>,
}

impl FalloffSnapshot {
    /// A snapshot with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from explicit `(point, value)` pairs.
    pub fn from_points(points: impl IntoIterator<Item = (Vec2, f32)>) -> Self {
        let values = points
            .into_iter()
            .map(|(p, v)| (FalloffKey::from_point(p), v))
            .collect();
        Self { values }
    }

    /// Compute falloff for every native sample column of every chunk in the level.
    ///
    /// Distances are normalized by half of the shorter level extent, so the
    /// falloff reaches 1 at the middle of the nearest level edge.
    pub fn generate(layout: &LevelLayout, params: &FalloffParams) -> Self {
        let (width, depth) = layout.grid_columns();
        let radius = (layout.extent().min_element() * 0.5).max(f32::EPSILON);
        let mut values = HashMap::with_capacity(layout.chunk_count() * width * depth);

        for (i, j) in layout.chunks() {
            let chunk_pos = layout.chunk_position(i, j);
            for z in 0..depth {
                for x in 0..width {
                    let p = column_world_pos(x, z, width, depth, layout.cube_size, chunk_pos);
                    let value = params.evaluate(p.length() / radius);
                    values.insert(FalloffKey::from_point(p), value);
                }
            }
        }

        Self { values }
    }

    /// Falloff at `point`, or `None` if the point was never sampled.
    #[inline]
    pub fn lookup(&self, point: Vec2) -> Option<f32> {
        self.values.get(&FalloffKey::from_point(point)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shared handle to the current falloff snapshot.
#[derive(Debug, Default)]
pub struct FalloffField {
    snapshot: RwLock<Option<Arc<FalloffSnapshot>>>,
}

static GLOBAL_FALLOFF: FalloffField = FalloffField::new();

impl FalloffField {
    pub const fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
        }
    }

    /// Process-wide field used by schedulers that are not given their own.
    pub fn global() -> &'static FalloffField {
        &GLOBAL_FALLOFF
    }

    /// Compute the falloff for a whole level and install it.
    pub fn initialize(&self, layout: &LevelLayout, params: &FalloffParams) -> Arc<FalloffSnapshot> {
        let snapshot = FalloffSnapshot::generate(layout, params);
        log::info!(
            "Falloff field initialized: {} samples for {}x{} chunks",
            snapshot.len(),
            layout.level_size.x,
            layout.level_size.y
        );
        self.install(snapshot)
    }

    /// Replace the current snapshot.
    pub fn install(&self, snapshot: FalloffSnapshot) -> Arc<FalloffSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Current snapshot, or [`TerrainError::FalloffNotInitialized`].
    pub fn snapshot(&self) -> Result<Arc<FalloffSnapshot>> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone().ok_or(TerrainError::FalloffNotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Falloff at `point`; `None` when uninitialized or when the point is absent.
    pub fn lookup(&self, point: Vec2) -> Option<f32> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|s| s.lookup(point))
    }

    /// Drop the current snapshot. Chunks dispatched afterwards fail until re-initialized.
    pub fn clear(&self) {
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}
