//! Counting semaphore built on a bounded channel.
//!
//! Each buffered message is one permit. The two halves are owned by
//! different threads, so neither side ever takes a lock the other holds.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::error::PipelineError;

/// Creates a semaphore holding up to `capacity` permits, `initial` of them
/// available immediately.
///
/// # Panics
///
/// Panics if `initial > capacity`.
pub(crate) fn semaphore(capacity: usize, initial: usize) -> (Signal, Wait) {
    assert!(initial <= capacity, "semaphore prefilled past its capacity");
    let (tx, rx) = bounded(capacity);
    for _ in 0..initial {
        // Cannot fail: the receiver is alive and the channel has room.
        let _ = tx.try_send(());
    }
    (Signal { tx }, Wait { rx })
}

/// The releasing half.
#[derive(Debug)]
pub(crate) struct Signal {
    tx: Sender<()>,
}

impl Signal {
    /// Adds one permit.
    pub(crate) fn release(&self) -> Result<(), PipelineError> {
        self.tx.send(()).map_err(|_| PipelineError::Disconnected)
    }
}

/// The acquiring half.
#[derive(Debug)]
pub(crate) struct Wait {
    rx: Receiver<()>,
}

impl Wait {
    /// Blocks until a permit is available and takes it.
    ///
    /// Permits released before the other half was dropped are still handed
    /// out; only an empty, disconnected semaphore fails.
    pub(crate) fn acquire(&self) -> Result<(), PipelineError> {
        self.rx.recv().map_err(|_| PipelineError::Disconnected)
    }

    /// Takes a permit if one is available right now.
    pub(crate) fn try_acquire(&self) -> Result<bool, PipelineError> {
        match self.rx.try_recv() {
            Ok(()) => Ok(true),
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(PipelineError::Disconnected),
        }
    }

    /// Permits currently available.
    pub(crate) fn available(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_prefilled_permits() {
        let (_signal, wait) = semaphore(2, 2);
        assert_eq!(wait.available(), 2);
        assert_eq!(wait.try_acquire(), Ok(true));
        assert_eq!(wait.try_acquire(), Ok(true));
        assert_eq!(wait.try_acquire(), Ok(false));
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let (signal, wait) = semaphore(1, 0);
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signal.release().unwrap();
        });
        assert_eq!(wait.acquire(), Ok(()));
        releaser.join().unwrap();
    }

    #[test]
    fn test_disconnect_after_draining() {
        let (signal, wait) = semaphore(2, 1);
        drop(signal);
        assert_eq!(wait.acquire(), Ok(()));
        assert_eq!(wait.acquire(), Err(PipelineError::Disconnected));
        assert_eq!(wait.try_acquire(), Err(PipelineError::Disconnected));
    }

    #[test]
    fn test_release_without_waiter_fails() {
        let (signal, wait) = semaphore(1, 0);
        drop(wait);
        assert_eq!(signal.release(), Err(PipelineError::Disconnected));
    }
}
