//! # Frame Slots
//!
//! Two frame buffers with a per-slot access state.
//!
//! ## Safety Note
//!
//! Handing out `&mut T` from a shared structure requires unsafe code.
//! Every access is preceded by a compare-exchange on the slot's state, so
//! a slot can never be written and read at the same time even if the
//! semaphores were wired incorrectly: the losing side panics instead.

#![allow(unsafe_code)]
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐ begin_write ┌─────────┐  seal  ┌────────┐ begin_read ┌─────────┐
//!   │ Free │────────────►│ Writing │───────►│ Sealed │───────────►│ Reading │
//!   └──────┘             └─────────┘        └────────┘            └────┬────┘
//!      ▲                                                               │
//!      └─────────────────────────── release ───────────────────────────┘
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Access state of one frame slot.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody owns the slot.
    Free = 0,
    /// The simulation thread is copying a frame into it.
    Writing = 1,
    /// Fully written and handed off; waiting for the render thread.
    Sealed = 2,
    /// The render thread is reading it.
    Reading = 3,
}

impl SlotState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Writing,
            2 => Self::Sealed,
            3 => Self::Reading,
            _ => Self::Free,
        }
    }
}

/// Number of frame slots.
pub const SLOT_COUNT: usize = 2;

/// The two frame buffers.
pub(crate) struct FrameSlots<T> {
    buffers: [UnsafeCell<T>; SLOT_COUNT],
    states: [AtomicU8; SLOT_COUNT],
}

impl<T> FrameSlots<T> {
    pub(crate) fn new(a: T, b: T) -> Self {
        Self {
            buffers: [UnsafeCell::new(a), UnsafeCell::new(b)],
            states: [
                AtomicU8::new(SlotState::Free as u8),
                AtomicU8::new(SlotState::Free as u8),
            ],
        }
    }

    #[inline]
    pub(crate) fn state(&self, index: usize) -> SlotState {
        SlotState::from_u8(self.states[index].load(Ordering::Acquire))
    }

    /// Moves slot `index` from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not in `from`. That means two threads touched
    /// the same slot in the same phase.
    #[inline]
    fn transition(&self, index: usize, from: SlotState, to: SlotState) {
        if let Err(actual) = self.states[index].compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            panic!(
                "frame slot {index} moved to {to:?} while {:?} (expected {from:?})",
                SlotState::from_u8(actual)
            );
        }
    }

    /// Claims slot `index` for writing and returns it.
    ///
    /// The reference must be dropped before [`seal`](Self::seal).
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn begin_write(&self, index: usize) -> &mut T {
        self.transition(index, SlotState::Free, SlotState::Writing);
        // SAFETY: the CAS above succeeded, so this thread is the only one
        // that has moved the slot out of `Free`; readers require `Sealed`.
        unsafe { &mut *self.buffers[index].get() }
    }

    pub(crate) fn seal(&self, index: usize) {
        self.transition(index, SlotState::Writing, SlotState::Sealed);
    }

    /// Claims sealed slot `index` for reading and returns it.
    pub(crate) fn begin_read(&self, index: usize) -> &T {
        self.transition(index, SlotState::Sealed, SlotState::Reading);
        // SAFETY: the slot is `Reading`; the writer requires `Free`, which
        // only `release` restores.
        unsafe { &*self.buffers[index].get() }
    }

    pub(crate) fn release(&self, index: usize) {
        self.transition(index, SlotState::Reading, SlotState::Free);
    }
}

// SAFETY: each buffer is accessed by at most one thread at a time, enforced
// by the per-slot state; moving `T` across threads requires `T: Send`.
unsafe impl<T: Send> Sync for FrameSlots<T> {}

impl<T> fmt::Debug for FrameSlots<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSlots")
            .field("states", &[self.state(0), self.state(1)])
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let slots = FrameSlots::new(0u32, 0u32);
        *slots.begin_write(0) = 7;
        assert_eq!(slots.state(0), SlotState::Writing);
        slots.seal(0);
        assert_eq!(*slots.begin_read(0), 7);
        assert_eq!(slots.state(0), SlotState::Reading);
        slots.release(0);
        assert_eq!(slots.state(0), SlotState::Free);
        assert_eq!(slots.state(1), SlotState::Free);
    }

    #[test]
    #[should_panic(expected = "frame slot 0 moved to Writing while Reading")]
    fn test_write_while_reading_panics() {
        let slots = FrameSlots::new(0u32, 0u32);
        *slots.begin_write(0) = 1;
        slots.seal(0);
        let _ = slots.begin_read(0);
        let _ = slots.begin_write(0);
    }

    #[test]
    #[should_panic(expected = "while Free")]
    fn test_read_unsealed_panics() {
        let slots = FrameSlots::new(0u32, 0u32);
        let _ = slots.begin_read(1);
    }
}
