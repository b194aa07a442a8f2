//! Core types shared by every stage of the pipeline

pub mod error;
pub mod logging;

pub use error::{Result, TerrainError};
