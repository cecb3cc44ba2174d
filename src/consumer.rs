use crate::error::RingError;
use crate::flags::Flags;
use crate::ring::{Counters, RingInner};
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

/// The reading face of a [`RingBuffer`](crate::RingBuffer).
///
/// Exactly one `Consumer` exists per ring; like [`Producer`](crate::Producer)
/// it is neither `Clone` nor `Sync` so the single-consumer discipline holds
/// by construction.
///
/// On a non-blocking face an empty ring yields [`RingError::WouldBlock`];
/// on a blocking face the call parks until data arrives or the wait is
/// cancelled through [`RingBuffer::cancel`](crate::RingBuffer::cancel).
pub struct Consumer<T> {
    ring: Arc<RingInner<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> std::fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").finish_non_exhaustive()
    }
}

impl<T> Consumer<T> {
    pub(crate) fn new(ring: Arc<RingInner<T>>) -> Self {
        Self {
            ring,
            _not_sync: PhantomData,
        }
    }

    /// Removes and returns the oldest element.
    pub fn read_one(&self) -> Result<T, RingError> {
        self.ring.read_one()
    }

    /// Moves up to `out.len()` elements into `out`, in order.
    ///
    /// Returns the number transferred; previous contents of the written
    /// prefix are dropped in place.
    pub fn read_slice(&self, out: &mut [T]) -> Result<usize, RingError> {
        self.ring.read_slice(out)
    }

    /// Delivers up to `n` elements to a caller-supplied callback, oldest
    /// first.
    ///
    /// Each element is moved to the callback; returning `false` stops the
    /// delivery and the call reports [`RingError::Internal`]. Ownership of
    /// elements already handed over has irrevocably transferred, so the
    /// consumed counter advances past them either way - a handle is never
    /// delivered twice.
    pub fn read_via<F>(&self, drain: F, n: usize) -> Result<usize, RingError>
    where
        F: FnMut(T) -> bool,
    {
        self.ring.read_via(drain, n)
    }

    /// Returns the slot count of the underlying ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the blocking policy of the underlying ring.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.ring.flags()
    }

    /// Validated snapshot of the transfer counters.
    pub fn counters(&self) -> Result<Counters, RingError> {
        self.ring.counters()
    }
}
