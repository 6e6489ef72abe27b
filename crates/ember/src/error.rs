//! Engine error types.

use ember_core::PipelineError;
use ember_rendering::RenderThreadError;
use thiserror::Error;

/// Errors produced by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The frame pipeline to the render thread broke.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The render thread failed to start or stopped with an error.
    #[error(transparent)]
    RenderThread(#[from] RenderThreadError),

    /// An OS-level failure (worker threads, config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::Config("fixed_timestep must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: fixed_timestep must be positive"
        );

        let err: EngineError = PipelineError::Disconnected.into();
        assert_eq!(err.to_string(), PipelineError::Disconnected.to_string());
    }
}
