//! Simulation → render frame hand-off.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::double_buffer::{FrameSlots, SlotState, SLOT_COUNT};
use super::semaphore::{semaphore, Signal, Wait};
use crate::error::PipelineError;

/// State shared by both ends.
struct Shared<T> {
    slots: FrameSlots<T>,
    submitted: AtomicU64,
    consumed: AtomicU64,
}

/// Creates a pipeline whose slots start as `T::default()`.
#[must_use]
pub fn frame_pipeline<T: Default + Send>() -> (FrameProducer<T>, FrameConsumer<T>) {
    frame_pipeline_with(T::default(), T::default())
}

/// Creates a pipeline with explicit initial slot contents.
///
/// Pre-sized slots let [`FrameProducer::submit_with`] reuse allocations
/// from the first frame on.
#[must_use]
pub fn frame_pipeline_with<T: Send>(a: T, b: T) -> (FrameProducer<T>, FrameConsumer<T>) {
    let shared = Arc::new(Shared {
        slots: FrameSlots::new(a, b),
        submitted: AtomicU64::new(0),
        consumed: AtomicU64::new(0),
    });

    // main → graphics: one permit per sealed slot, none at start.
    let (sealed_signal, sealed_wait) = semaphore(SLOT_COUNT, 0);
    // graphics → main: one permit per free slot, all free at start.
    let (free_signal, free_wait) = semaphore(SLOT_COUNT, SLOT_COUNT);

    (
        FrameProducer {
            shared: Arc::clone(&shared),
            free: free_wait,
            sealed: sealed_signal,
            write_index: 0,
        },
        FrameConsumer {
            shared,
            sealed: sealed_wait,
            free: free_signal,
            read_index: 0,
        },
    )
}

/// Simulation side of the pipeline.
///
/// Writes slot `write_index % 2`. Blocks only when both slots are sealed or
/// being read, i.e. when the render thread is a full frame behind.
pub struct FrameProducer<T> {
    shared: Arc<Shared<T>>,
    free: Wait,
    sealed: Signal,
    write_index: u64,
}

impl<T: Send> FrameProducer<T> {
    /// Replaces the next slot's contents with `frame` and seals it.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Disconnected`] if the consumer is gone.
    pub fn submit(&mut self, frame: T) -> Result<u64, PipelineError> {
        self.submit_with(|slot| *slot = frame)
    }

    /// Fills the next slot in place and seals it. Returns the frame number.
    ///
    /// `fill` sees whatever the slot held two frames ago, so it can reuse
    /// its allocations (`clone_from`, `Vec::clear` + `extend`).
    ///
    /// # Errors
    ///
    /// [`PipelineError::Disconnected`] if the consumer is gone.
    pub fn submit_with<F: FnOnce(&mut T)>(&mut self, fill: F) -> Result<u64, PipelineError> {
        self.free.acquire()?;
        self.write_and_seal(fill)
    }

    /// Like [`submit_with`](Self::submit_with), but fails instead of blocking.
    ///
    /// # Errors
    ///
    /// [`PipelineError::SlotBusy`] if no slot is free right now,
    /// [`PipelineError::Disconnected`] if the consumer is gone.
    pub fn try_submit_with<F: FnOnce(&mut T)>(&mut self, fill: F) -> Result<u64, PipelineError> {
        if !self.free.try_acquire()? {
            return Err(PipelineError::SlotBusy);
        }
        self.write_and_seal(fill)
    }

    fn write_and_seal<F: FnOnce(&mut T)>(&mut self, fill: F) -> Result<u64, PipelineError> {
        let index = slot_index(self.write_index);
        fill(self.shared.slots.begin_write(index));
        self.shared.slots.seal(index);

        let frame = self.write_index;
        self.write_index += 1;
        self.shared.submitted.fetch_add(1, Ordering::AcqRel);
        self.sealed.release()?;
        Ok(frame)
    }

    /// Number of the next frame to be written.
    #[inline]
    #[must_use]
    pub fn write_index(&self) -> u64 {
        self.write_index
    }

    /// Slots free for writing without blocking.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.free.available()
    }

    /// Frames sealed so far.
    #[must_use]
    pub fn frames_submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::Acquire)
    }

    /// Frames the consumer has finished with.
    #[must_use]
    pub fn frames_consumed(&self) -> u64 {
        self.shared.consumed.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for FrameProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameProducer")
            .field("write_index", &self.write_index)
            .field("slots", &self.shared.slots)
            .finish_non_exhaustive()
    }
}

/// Render side of the pipeline.
pub struct FrameConsumer<T> {
    shared: Arc<Shared<T>>,
    sealed: Wait,
    free: Signal,
    read_index: u64,
}

impl<T: Send> FrameConsumer<T> {
    /// Blocks until a frame is sealed and returns exclusive read access.
    ///
    /// Returns `None` once the producer is gone and every sealed frame has
    /// been consumed.
    pub fn acquire_sealed_frame(&mut self) -> Option<SealedFrame<'_, T>> {
        self.sealed.acquire().ok()?;
        Some(self.begin_read())
    }

    /// Returns a sealed frame if one is ready right now.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Disconnected`] if the producer is gone and nothing
    /// is left to read.
    pub fn try_acquire_sealed_frame(&mut self) -> Result<Option<SealedFrame<'_, T>>, PipelineError> {
        if self.sealed.try_acquire()? {
            Ok(Some(self.begin_read()))
        } else {
            Ok(None)
        }
    }

    fn begin_read(&mut self) -> SealedFrame<'_, T> {
        let frame = self.read_index;
        let index = slot_index(frame);
        self.read_index += 1;
        let data = self.shared.slots.begin_read(index);
        SealedFrame {
            shared: &self.shared,
            free: &self.free,
            data,
            index,
            frame,
        }
    }

    /// Frames sealed so far.
    #[must_use]
    pub fn frames_submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::Acquire)
    }

    /// Frames this consumer has released.
    #[must_use]
    pub fn frames_consumed(&self) -> u64 {
        self.shared.consumed.load(Ordering::Acquire)
    }

    /// Current state of slot `index` (0 or 1).
    #[must_use]
    pub fn slot_state(&self, index: usize) -> SlotState {
        self.shared.slots.state(index % SLOT_COUNT)
    }
}

impl<T> fmt::Debug for FrameConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameConsumer")
            .field("read_index", &self.read_index)
            .field("slots", &self.shared.slots)
            .finish_non_exhaustive()
    }
}

/// Exclusive read access to one sealed frame.
///
/// Dropping it frees the slot and signals the producer.
pub struct SealedFrame<'a, T> {
    shared: &'a Shared<T>,
    free: &'a Signal,
    data: &'a T,
    index: usize,
    frame: u64,
}

impl<T> SealedFrame<'_, T> {
    /// Which of the two slots this frame occupies.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.index
    }

    /// Sequence number of this frame, starting at 0.
    #[must_use]
    pub fn frame_number(&self) -> u64 {
        self.frame
    }
}

impl<T> Deref for SealedFrame<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> Drop for SealedFrame<'_, T> {
    fn drop(&mut self) {
        self.shared.slots.release(self.index);
        self.shared.consumed.fetch_add(1, Ordering::AcqRel);
        // A gone producer no longer needs the permit.
        let _ = self.free.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for SealedFrame<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedFrame")
            .field("slot", &self.index)
            .field("frame", &self.frame)
            .field("data", self.data)
            .finish()
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn slot_index(frame: u64) -> usize {
    (frame % SLOT_COUNT as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_submit_then_acquire() {
        let (mut producer, mut consumer) = frame_pipeline::<u32>();
        assert_eq!(producer.submit(11), Ok(0));

        let frame = consumer.acquire_sealed_frame().unwrap();
        assert_eq!(*frame, 11);
        assert_eq!(frame.slot(), 0);
        assert_eq!(frame.frame_number(), 0);
        drop(frame);

        assert_eq!(consumer.frames_consumed(), 1);
        assert_eq!(consumer.slot_state(0), SlotState::Free);
    }

    #[test]
    fn test_producer_can_run_one_slot_ahead() {
        let (mut producer, mut consumer) = frame_pipeline::<u32>();
        producer.submit(1).unwrap();
        producer.submit(2).unwrap();
        assert_eq!(producer.free_slots(), 0);
        assert_eq!(producer.try_submit_with(|s| *s = 3), Err(PipelineError::SlotBusy));

        let first = consumer.acquire_sealed_frame().unwrap();
        assert_eq!(*first, 1);
        drop(first);

        assert_eq!(producer.try_submit_with(|s| *s = 3), Ok(2));
        assert_eq!(*consumer.acquire_sealed_frame().unwrap(), 2);
        assert_eq!(*consumer.acquire_sealed_frame().unwrap(), 3);
    }

    #[test]
    fn test_submit_with_sees_previous_contents() {
        let (mut producer, mut consumer) = frame_pipeline_with(vec![0u8; 4], vec![1u8; 4]);
        producer.submit_with(|v| v.push(9)).unwrap();
        assert_eq!(*consumer.acquire_sealed_frame().unwrap(), vec![0, 0, 0, 0, 9]);
    }

    #[test]
    fn test_try_acquire_empty() {
        let (_producer, mut consumer) = frame_pipeline::<u32>();
        assert!(consumer.try_acquire_sealed_frame().unwrap().is_none());
    }

    #[test]
    fn test_consumer_drains_after_producer_drop() {
        let (mut producer, mut consumer) = frame_pipeline::<u32>();
        producer.submit(5).unwrap();
        drop(producer);

        assert_eq!(consumer.acquire_sealed_frame().as_deref(), Some(&5));
        assert!(consumer.acquire_sealed_frame().is_none());
        assert!(matches!(
            consumer.try_acquire_sealed_frame(),
            Err(PipelineError::Disconnected)
        ));
    }

    #[test]
    fn test_submit_after_consumer_drop_fails() {
        let (mut producer, consumer) = frame_pipeline::<u32>();
        drop(consumer);
        assert_eq!(producer.submit(1), Err(PipelineError::Disconnected));
    }

    #[test]
    fn test_frames_arrive_in_order_across_threads() {
        let (mut producer, mut consumer) = frame_pipeline::<u64>();
        let render = thread::spawn(move || {
            let mut seen = Vec::new();
            while let Some(frame) = consumer.acquire_sealed_frame() {
                seen.push(*frame);
            }
            seen
        });

        for i in 0..500 {
            producer.submit(i).unwrap();
        }
        drop(producer);

        let seen = render.join().unwrap();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }
}
