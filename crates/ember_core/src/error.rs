//! # Core Error Types
//!
//! Load failures never cross the cache boundary as panics: they are stored
//! in the cache entry next to a placeholder payload.

use thiserror::Error;

/// Errors produced while loading a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The asset source has no file at this path.
    #[error("asset not found: {path}")]
    NotFound {
        /// Path that was requested.
        path: String,
    },

    /// The asset exists but could not be read.
    #[error("failed to read {path}: {reason}")]
    Io {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error, rendered.
        reason: String,
    },

    /// The bytes were read but are not a valid payload.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A resource this one depends on failed to load.
    #[error("dependency {dependency} failed: {reason}")]
    Dependency {
        /// Display name of the dependency.
        dependency: String,
        /// Why the dependency failed.
        reason: String,
    },
}

impl LoadError {
    /// Shorthand for a [`LoadError::Decode`].
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors produced by the frame pipeline handshake.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// The other side of the pipeline was dropped.
    #[error("frame pipeline disconnected: the other end hung up")]
    Disconnected,

    /// No slot is free without blocking: the consumer is a full frame behind.
    #[error("no free frame slot: render thread is behind")]
    SlotBusy,
}
