//! Rkterrain - chunked marching-cubes terrain generation
//!
//! A level is a grid of chunks. Each chunk runs through four stages:
//! noise sampling and mesh extraction on worker threads, density building
//! and completion callbacks on the consumer thread that drains the
//! [`streaming::GenerationScheduler`].

pub mod core;
pub mod generation;
pub mod meshing;
pub mod streaming;
pub mod terrain;
