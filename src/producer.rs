use crate::error::RingError;
use crate::flags::Flags;
use crate::ring::{Counters, RingInner};
use std::cell::Cell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;

/// The writing face of a [`RingBuffer`](crate::RingBuffer).
///
/// Exactly one `Producer` exists per ring, and it is deliberately neither
/// `Clone` nor `Sync`: a second thread on this face would break the
/// single-producer discipline the lock-free fast path relies on. Move it
/// into the one thread that writes.
///
/// All operations report the number of elements transferred. On a
/// non-blocking face a completely full ring yields
/// [`RingError::WouldBlock`] and bumps the drop counter; on a blocking face
/// the call parks until the consumer drains data or the wait is cancelled.
pub struct Producer<T> {
    ring: Arc<RingInner<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

impl<T> Producer<T> {
    pub(crate) fn new(ring: Arc<RingInner<T>>) -> Self {
        Self {
            ring,
            _not_sync: PhantomData,
        }
    }

    /// Transfers one element by move.
    pub fn write_one(&self, value: T) -> Result<usize, RingError> {
        self.ring.write_one(value)
    }

    /// Copies as many elements of `values` as fit, in order.
    ///
    /// Returns the number actually written, which may be less than
    /// `values.len()` when the ring is nearly full (a partially serviced
    /// request is not a drop).
    pub fn write_slice(&self, values: &[T]) -> Result<usize, RingError>
    where
        T: Clone,
    {
        self.ring.write_slice(values)
    }

    /// Moves as many elements as fit out of the front of `values`.
    ///
    /// Transferred elements are removed from the vector; the remainder is
    /// left in place for a later retry.
    pub fn write_drain(&self, values: &mut Vec<T>) -> Result<usize, RingError> {
        self.ring.write_drain(values)
    }

    /// Fills up to `n` slots through a caller-supplied callback.
    ///
    /// The callback is invoked once per slot in sequence order and must
    /// either initialize the slot and return `true`, or return `false` to
    /// abort. On abort nothing is published: slots the callback already
    /// initialized are dropped, the counters stay untouched, and the call
    /// reports [`RingError::Internal`].
    pub fn write_via<F>(&self, fill: F, n: usize) -> Result<usize, RingError>
    where
        F: FnMut(&mut MaybeUninit<T>) -> bool,
    {
        self.ring.write_via(fill, n)
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

    /// Validated snapshot of the transfer counters, for overflow visibility.
    pub fn counters(&self) -> Result<Counters, RingError> {
        self.ring.counters()
    }
}
