//! Platform layer error types.

use thiserror::Error;

/// Errors reported by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// A logical vector outside `1..=24`.
    #[error("invalid interrupt vector {0}")]
    InvalidVector(u32),
    /// The kernel could not start a worker thread.
    #[error("failed to spawn worker `{0}`")]
    SpawnFailed(&'static str),
}
