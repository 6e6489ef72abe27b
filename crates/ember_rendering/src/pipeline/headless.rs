//! A backend with no device, for servers, tests and the headless demo.
//!
//! It draws nothing but counts what it would draw, and can record every
//! call it receives into a shared [`CallLog`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ember_core::Handle;
use parking_lot::Mutex;

use crate::error::BackendError;

use super::backend::RenderBackend;
use super::frame::FrameData;

/// One call received by a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `initialize`.
    Initialize,
    /// `resize`.
    Resize {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// `shadow_pass`.
    Shadow {
        /// `FrameData::frame_index`.
        frame: u64,
        /// Cascade index.
        cascade: usize,
        /// Visible instance indices.
        visible: Vec<usize>,
    },
    /// `opaque_pass`.
    Opaque {
        /// `FrameData::frame_index`.
        frame: u64,
        /// Visible instance indices.
        visible: Vec<usize>,
    },
    /// `ui_pass`.
    Ui {
        /// `FrameData::frame_index`.
        frame: u64,
        /// Number of UI commands.
        commands: usize,
    },
    /// `present`.
    Present {
        /// Vsync flag.
        vsync: bool,
    },
    /// `shutdown`.
    Shutdown,
}

/// Shared, cloneable record of backend calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<BackendCall>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: BackendCall) {
        self.0.lock().push(call);
    }

    /// Copy of every call so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns true if no call was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recorded presents.
    #[must_use]
    pub fn presents(&self) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|call| matches!(call, BackendCall::Present { .. }))
            .count()
    }
}

/// A device-less [`RenderBackend`].
#[derive(Debug)]
pub struct HeadlessBackend {
    size: [u32; 2],
    log: Option<CallLog>,
    frame_delay: Duration,
    fail_initialize: bool,
    fail_present_at: Option<u64>,
    presented: u64,
}

impl HeadlessBackend {
    /// A backend with a `width` x `height` swapchain.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width, height],
            log: None,
            frame_delay: Duration::ZERO,
            fail_initialize: false,
            fail_present_at: None,
            presented: 0,
        }
    }

    /// Records every call into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Sleeps this long in every present, simulating a slow GPU.
    #[must_use]
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Makes `initialize` fail.
    #[must_use]
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Makes the present of the `n`th frame (0-based) report a lost device.
    #[must_use]
    pub fn failing_present_at(mut self, n: u64) -> Self {
        self.fail_present_at = Some(n);
        self
    }

    /// Current swapchain size.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    fn record(&self, call: BackendCall) {
        if let Some(log) = &self.log {
            log.push(call);
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl RenderBackend for HeadlessBackend {
    fn initialize(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Initialize);
        if self.fail_initialize {
            return Err(BackendError::Initialization("no adapter".into()));
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.record(BackendCall::Resize { width, height });
        if width == 0 || height == 0 {
            return Err(BackendError::Resize {
                width,
                height,
                reason: "zero extent".into(),
            });
        }
        self.size = [width, height];
        Ok(())
    }

    fn shadow_pass(
        &mut self,
        cascade: usize,
        frame: &FrameData,
        visible: &[usize],
    ) -> Result<u32, BackendError> {
        self.record(BackendCall::Shadow {
            frame: frame.frame_index,
            cascade,
            visible: visible.to_vec(),
        });
        Ok(count(visible.len()))
    }

    fn opaque_pass(&mut self, frame: &FrameData, visible: &[usize]) -> Result<u32, BackendError> {
        self.record(BackendCall::Opaque {
            frame: frame.frame_index,
            visible: visible.to_vec(),
        });
        // One draw per mesh of each loaded model.
        let draws = visible
            .iter()
            .filter_map(|&i| frame.instances.get(i)?.model.as_ref())
            .filter_map(Handle::get)
            .map(|model| model.meshes().len())
            .sum();
        Ok(count(draws))
    }

    fn ui_pass(&mut self, frame: &FrameData) -> Result<u32, BackendError> {
        self.record(BackendCall::Ui {
            frame: frame.frame_index,
            commands: frame.ui.len(),
        });
        Ok(count(frame.ui.len()))
    }

    fn present(&mut self, vsync: bool) -> Result<(), BackendError> {
        self.record(BackendCall::Present { vsync });
        if self.fail_present_at == Some(self.presented) {
            return Err(BackendError::DeviceLost(format!(
                "simulated loss at frame {}",
                self.presented
            )));
        }
        if !self.frame_delay.is_zero() {
            thread::sleep(self.frame_delay);
        }
        self.presented += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record(BackendCall::Shutdown);
    }
}
