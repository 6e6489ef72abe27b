//! Frame timing, read back one frame late.
//!
//! GPU timestamp queries are not available until the GPU has finished the
//! frame, so each frame owns one of two slots and the render thread reads
//! the *previous* frame's slot while the current one is in flight.
//!
//! ```text
//!   frame n:   begin(n) ── passes ── end(n)
//!   frame n+1: collect_previous(n+1) → timing of n
//! ```

use std::time::{Duration, Instant};

/// Slots in the ring.
const SLOTS: usize = 2;

/// Timing of one finished frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// Frame number.
    pub frame: u64,
    /// CPU time from `begin` to `end`.
    pub cpu: Duration,
    /// GPU time, if the backend reported one.
    pub gpu: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default)]
struct TimingSlot {
    frame: Option<u64>,
    started: Option<Instant>,
    cpu: Option<Duration>,
    collected: bool,
}

/// Two timing slots indexed by frame number.
#[derive(Debug, Default)]
pub struct GpuTimingRing {
    slots: [TimingSlot; SLOTS],
    ended: u64,
}

impl GpuTimingRing {
    /// Creates an empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn slot_mut(&mut self, frame: u64) -> &mut TimingSlot {
        &mut self.slots[(frame % SLOTS as u64) as usize]
    }

    /// Starts timing `frame`, overwriting the slot of `frame - 2`.
    pub fn begin(&mut self, frame: u64) {
        *self.slot_mut(frame) = TimingSlot {
            frame: Some(frame),
            started: Some(Instant::now()),
            cpu: None,
            collected: false,
        };
    }

    /// Stops timing `frame`. Ignored if `frame` was never begun.
    pub fn end(&mut self, frame: u64) {
        let slot = self.slot_mut(frame);
        if slot.frame != Some(frame) || slot.cpu.is_some() {
            return;
        }
        if let Some(started) = slot.started {
            slot.cpu = Some(started.elapsed());
            self.ended += 1;
        }
    }

    /// Whether enough frames have ended for the ring to hold a readable
    /// previous frame.
    #[must_use]
    pub fn can_collect(&self) -> bool {
        self.ended >= SLOTS as u64
    }

    /// Takes the timing of `current - 1`, once.
    ///
    /// `gpu` is left `None`; the caller fills it from the backend.
    pub fn collect_previous(&mut self, current: u64) -> Option<FrameTiming> {
        let previous = current.checked_sub(1)?;
        let slot = self.slot_mut(previous);
        if slot.frame != Some(previous) || slot.collected {
            return None;
        }
        let cpu = slot.cpu?;
        slot.collected = true;
        Some(FrameTiming {
            frame: previous,
            cpu,
            gpu: None,
        })
    }

    /// Frames ended so far.
    #[must_use]
    pub fn frames_ended(&self) -> u64 {
        self.ended
    }
}
