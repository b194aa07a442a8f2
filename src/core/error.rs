//! Error types for terrain generation

use thiserror::Error;

use crate::generation::grid::GridSize;

/// Main error type for the generation pipeline
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid grid size {x}x{y}x{z}: every dimension must be positive")]
    InvalidGridSize { x: usize, y: usize, z: usize },

    #[error("invalid cube size {0}: must be finite and greater than zero")]
    InvalidCubeSize(f32),

    #[error("invalid chunk extent {0}: must be finite, positive and span at most 4096 cells")]
    InvalidChunkSize(f32),

    #[error("falloff field has not been initialized")]
    FalloffNotInitialized,

    #[error("grid size mismatch: expected {expected}, got {actual}")]
    GridMismatch { expected: GridSize, actual: GridSize },

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl TerrainError {
    /// Whether the caller may retry the operation that produced this error.
    ///
    /// Only environment failures qualify; precondition violations fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, TerrainError::WorkerPool(_) | TerrainError::Io(_))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TerrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TerrainError::InvalidGridSize { x: 0, y: 4, z: 4 };
        assert_eq!(
            err.to_string(),
            "invalid grid size 0x4x4: every dimension must be positive"
        );

        let err = TerrainError::GridMismatch {
            expected: GridSize::new(6, 4, 6),
            actual: GridSize::new(4, 4, 4),
        };
        assert_eq!(err.to_string(), "grid size mismatch: expected 6x4x6, got 4x4x4");

        let err = TerrainError::InvalidChunkSize(f32::INFINITY);
        assert_eq!(
            err.to_string(),
            "invalid chunk extent inf: must be finite, positive and span at most 4096 cells"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(TerrainError::WorkerPool("spawn failed".into()).is_transient());
        assert!(!TerrainError::FalloffNotInitialized.is_transient());
        assert!(!TerrainError::InvalidCubeSize(-1.0).is_transient());
    }
}
