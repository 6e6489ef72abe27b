//! Rendering error types.

use thiserror::Error;

/// Errors reported by a [`RenderBackend`](crate::pipeline::RenderBackend).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The device could not be created or initialised.
    #[error("backend initialisation failed: {0}")]
    Initialization(String),

    /// The swapchain could not be recreated at the requested size.
    #[error("resize to {width}x{height} failed: {reason}")]
    Resize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Backend message.
        reason: String,
    },

    /// The device was lost mid-frame.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// Presenting the frame failed.
    #[error("present failed: {0}")]
    Present(String),
}

/// Errors surfaced when joining the render thread.
#[derive(Error, Debug)]
pub enum RenderThreadError {
    /// The OS refused to start the thread.
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The backend failed and the thread stopped.
    #[error("render backend failed: {0}")]
    Backend(#[from] BackendError),

    /// The render thread panicked.
    #[error("render thread panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BackendError::Resize {
            width: 0,
            height: 720,
            reason: "zero extent".into(),
        };
        assert_eq!(err.to_string(), "resize to 0x720 failed: zero extent");

        let err: RenderThreadError = BackendError::DeviceLost("TDR".into()).into();
        assert_eq!(err.to_string(), "render backend failed: device lost: TDR");
    }
}
