//! The graphics device boundary.
//!
//! Everything that touches a real GPU API lives behind [`RenderBackend`].
//! The render thread owns the backend and calls it in a fixed order:
//!
//! ```text
//!   initialize
//!   per frame: [resize] → [gpu_time] → shadow_pass × 4 → opaque_pass → [ui_pass] → present
//!   shutdown
//! ```

use std::time::Duration;

use crate::error::BackendError;

use super::frame::FrameData;

/// A graphics device driven by the render thread.
///
/// Pass methods receive the frame and the visible instance indices (into
/// `frame.instances`) and return the number of draw calls issued.
pub trait RenderBackend: Send + 'static {
    /// Creates device resources. Runs on the render thread before the
    /// first frame.
    ///
    /// # Errors
    ///
    /// [`BackendError::Initialization`] if the device cannot be created.
    fn initialize(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Recreates the swapchain at the new window size.
    ///
    /// # Errors
    ///
    /// [`BackendError::Resize`] if the swapchain cannot be recreated.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// GPU duration of a finished frame, if timestamp queries exist.
    fn gpu_time(&mut self, _frame: u64) -> Option<Duration> {
        None
    }

    /// Renders shadow cascade `cascade`.
    ///
    /// # Errors
    ///
    /// Any device failure.
    fn shadow_pass(
        &mut self,
        cascade: usize,
        frame: &FrameData,
        visible: &[usize],
    ) -> Result<u32, BackendError>;

    /// Renders the opaque geometry seen by the camera.
    ///
    /// # Errors
    ///
    /// Any device failure.
    fn opaque_pass(&mut self, frame: &FrameData, visible: &[usize]) -> Result<u32, BackendError>;

    /// Renders `frame.ui`.
    ///
    /// # Errors
    ///
    /// Any device failure.
    fn ui_pass(&mut self, frame: &FrameData) -> Result<u32, BackendError>;

    /// Presents the back buffer.
    ///
    /// # Errors
    ///
    /// [`BackendError::Present`] or [`BackendError::DeviceLost`].
    fn present(&mut self, vsync: bool) -> Result<(), BackendError>;

    /// Releases device resources. Runs once, after the last frame.
    fn shutdown(&mut self) {}
}
