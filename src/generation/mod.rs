//! Chunk generation: grids, level layout, the per-chunk data model and the
//! density field builder.

pub mod chunk;
pub mod config;
pub mod coords;
pub mod density;
pub mod grid;
pub mod level;

pub use chunk::{ChunkData, ChunkGenerationData, ChunkId, ChunkRequest, ChunkStage};
pub use config::GenerationConfig;
pub use density::{DensityFieldBuilder, build_density_pair};
pub use grid::{DensityGrid, Grid2, Grid3, GridSize, HeightMap, NoiseVolume};
pub use level::LevelLayout;
