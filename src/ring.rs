use crate::consumer::Consumer;
use crate::error::{FaceClaimed, RingError};
use crate::flags::{Flags, Role};
use crate::invariants::{
    debug_assert_bounded_fill, debug_assert_initialized_read, debug_assert_monotonic,
};
use crate::producer::Producer;
use crate::semaphore::BinarySemaphore;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time snapshot of the monotonic transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Total elements ever published by the producer face.
    pub produced: u64,
    /// Total elements ever drained by the consumer face.
    pub consumed: u64,
    /// Non-blocking writes that found the ring completely full.
    ///
    /// Incremented once per failed call, not once per requested element:
    /// a coarse overflow indicator, not a sample count. Partially serviced
    /// writes do not touch it.
    pub dropped: u64,
}

impl Counters {
    /// Elements currently in flight between the faces.
    pub const fn fill(&self) -> u64 {
        self.produced - self.consumed
    }
}

/// Bounded SPSC ring buffer with per-face blocking policy.
///
/// `RingBuffer` itself is a cheaply-cloneable control handle: it carries the
/// lifecycle operations ([`counters`](Self::counters), [`reset`](Self::reset),
/// [`cancel`](Self::cancel)) that an orchestrator keeps for itself. The data
/// path goes through the two role-specific faces, [`Producer`] and
/// [`Consumer`], each of which can be claimed exactly once.
///
/// Transfer operations return the number of elements moved; contention,
/// cancellation and invariant violations surface as [`RingError`].
pub struct RingBuffer<T> {
    inner: Arc<RingInner<T>>,
}

impl<T> RingBuffer<T> {
    /// Creates a ring with `capacity` slots and the given blocking policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit a signed 64-bit count.
    pub fn new(capacity: usize, flags: Flags) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        assert!(
            (capacity as u128) < i64::MAX as u128,
            "capacity must fit a signed 64-bit count"
        );

        let mut storage = Vec::with_capacity(capacity);
        storage.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            inner: Arc::new(RingInner {
                produced: CacheAligned::new(AtomicU64::new(0)),
                dropped: AtomicU64::new(0),
                consumed: CacheAligned::new(AtomicU64::new(0)),
                capacity,
                flags,
                // A fresh ring has free space, so the writer side starts
                // ready; waiters re-check the counters after every wake.
                writer_sem: BinarySemaphore::new(true),
                reader_sem: BinarySemaphore::new(false),
                writer_cancelled: AtomicBool::new(false),
                reader_cancelled: AtomicBool::new(false),
                producer_claimed: AtomicBool::new(false),
                consumer_claimed: AtomicBool::new(false),
                storage: storage.into_boxed_slice(),
            }),
        }
    }

    /// Returns the slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the blocking policy the ring was built with.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.inner.flags
    }

    /// Claims the writing face. Each ring hands out exactly one.
    pub fn producer(&self) -> Result<Producer<T>, FaceClaimed> {
        if self.inner.producer_claimed.swap(true, Ordering::AcqRel) {
            return Err(FaceClaimed {
                role: Role::Producer,
            });
        }
        Ok(Producer::new(Arc::clone(&self.inner)))
    }

    /// Claims the reading face. Each ring hands out exactly one.
    pub fn consumer(&self) -> Result<Consumer<T>, FaceClaimed> {
        if self.inner.consumer_claimed.swap(true, Ordering::AcqRel) {
            return Err(FaceClaimed {
                role: Role::Consumer,
            });
        }
        Ok(Consumer::new(Arc::clone(&self.inner)))
    }

    /// Validated snapshot of the transfer counters.
    pub fn counters(&self) -> Result<Counters, RingError> {
        self.inner.counters()
    }

    /// Reinitializes the counters owned by `role`.
    ///
    /// `Producer`: `produced` is rewound to `consumed` and `dropped` is
    /// cleared. `Consumer`: `consumed` is advanced to `produced`. The caller
    /// must ensure no operation is in flight on the resetting side. Elements
    /// that were in flight at reset time are leaked rather than dropped:
    /// reclaiming them here could race a concurrent operation on the other
    /// face.
    pub fn reset(&self, role: Role) {
        self.inner.reset(role);
    }

    /// Wakes a single parked operation on `role`'s face and makes it return
    /// [`RingError::Cancelled`].
    ///
    /// Single-shot: the woken operation clears the flag. Has no effect on a
    /// face configured non-blocking. If nothing is parked, the next
    /// operation to park on that face consumes the cancellation instead.
    pub fn cancel(&self, role: Role) {
        self.inner.cancel(role);
    }
}

impl<T> Clone for RingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.inner.capacity)
            .field("flags", &self.inner.flags)
            .field("counters", &self.inner.counters())
            .finish()
    }
}

/// Shared state behind a ring buffer and its two faces.
pub(crate) struct RingInner<T> {
    // Producer-hot line: written by the producer thread only.
    produced: CacheAligned<AtomicU64>,
    dropped: AtomicU64,

    // Consumer-hot line: written by the consumer thread only.
    consumed: CacheAligned<AtomicU64>,

    // Cold state.
    capacity: usize,
    flags: Flags,
    writer_sem: BinarySemaphore,
    reader_sem: BinarySemaphore,
    writer_cancelled: AtomicBool,
    reader_cancelled: AtomicBool,
    producer_claimed: AtomicBool,
    consumer_claimed: AtomicBool,

    // Slot `k` of sequence number `seq` lives at `storage[seq % capacity]`.
    // Slots in `[consumed, produced)` are initialized; everything else is
    // semantically empty whatever bit pattern the cell still holds.
    storage: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: the counters are atomics with single-writer discipline, the
// semaphores are internally synchronized, and each storage slot is accessed
// by at most one thread at a time: the producer touches only slots in
// [produced, consumed + capacity), the consumer only [consumed, produced),
// and the ranges are disjoint by the fill invariant.
unsafe impl<T: Send> Send for RingInner<T> {}
unsafe impl<T: Send> Sync for RingInner<T> {}

impl<T> RingInner<T> {
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn flags(&self) -> Flags {
        self.flags
    }

    pub(crate) fn counters(&self) -> Result<Counters, RingError> {
        let (produced, consumed) = self.snapshot()?;
        Ok(Counters {
            produced,
            consumed,
            dropped: self.dropped.load(Ordering::Relaxed),
        })
    }

    /// Loads and validates both counters.
    ///
    /// The opposite face's counter is loaded with `Acquire` so that element
    /// stores published before it are visible, per the release/acquire
    /// publication scheme used on the transfer paths.
    fn snapshot(&self) -> Result<(u64, u64), RingError> {
        let produced = self.produced.load(Ordering::Acquire);
        let consumed = self.consumed.load(Ordering::Acquire);

        if produced < consumed {
            return Err(RingError::Internal);
        }
        if produced - consumed > self.capacity as u64 {
            return Err(RingError::Internal);
        }

        Ok((produced, consumed))
    }

    fn reset(&self, role: Role) {
        match role {
            Role::Producer => {
                let consumed = self.consumed.load(Ordering::Relaxed);
                self.produced.store(consumed, Ordering::Relaxed);
                self.dropped.store(0, Ordering::Relaxed);
            }
            Role::Consumer => {
                let produced = self.produced.load(Ordering::Relaxed);
                self.consumed.store(produced, Ordering::Relaxed);
            }
        }
    }

    fn cancel(&self, role: Role) {
        match role {
            Role::Producer => {
                if !self.flags.nonblocking_write() {
                    self.writer_cancelled.store(true, Ordering::Release);
                    self.writer_sem.post();
                }
            }
            Role::Consumer => {
                if !self.flags.nonblocking_read() {
                    self.reader_cancelled.store(true, Ordering::Release);
                    self.reader_sem.post();
                }
            }
        }
    }

    /// The physical index ranges covering `k` slots starting at `start`,
    /// split at the wrap point. Chaining the two ranges yields the slots in
    /// sequence order.
    fn runs(&self, start: u64, k: usize) -> (Range<usize>, Range<usize>) {
        let idx = (start % self.capacity as u64) as usize;
        let first = k.min(self.capacity - idx);
        (idx..idx + first, 0..k - first)
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        self.storage[index].get()
    }

    // -----------------------------------------------------------------
    // Producer path
    // -----------------------------------------------------------------

    /// Applies the write-side blocking policy and returns a validated
    /// `(produced, free)` pair with `free > 0`.
    fn acquire_free(&self) -> Result<(u64, usize), RingError> {
        if self.flags.nonblocking_write() {
            let (produced, consumed) = self.snapshot()?;
            let free = self.capacity - (produced - consumed) as usize;
            if free == 0 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(RingError::WouldBlock);
            }
            Ok((produced, free))
        } else {
            loop {
                let (produced, consumed) = self.snapshot()?;
                let free = self.capacity - (produced - consumed) as usize;
                if free > 0 {
                    return Ok((produced, free));
                }

                // Wait until the consumer drains something.
                self.writer_sem.wait();
                if self.writer_cancelled.swap(false, Ordering::AcqRel) {
                    return Err(RingError::Cancelled);
                }
            }
        }
    }

    /// Publishes `k` new elements and wakes a blocking reader.
    ///
    /// The `Release` store is what makes the element writes visible to the
    /// consumer's `Acquire` snapshot.
    fn publish_produced(&self, produced: u64, k: usize) {
        let new = produced + k as u64;
        debug_assert_monotonic!("produced", produced, new);
        self.produced.store(new, Ordering::Release);

        if !self.flags.nonblocking_read() {
            self.reader_sem.post();
        }
    }

    pub(crate) fn write_one(&self, value: T) -> Result<usize, RingError> {
        let (produced, _free) = self.acquire_free()?;
        let index = (produced % self.capacity as u64) as usize;
        unsafe { (*self.slot(index)).write(value) };
        self.publish_produced(produced, 1);
        Ok(1)
    }

    pub(crate) fn write_slice(&self, values: &[T]) -> Result<usize, RingError>
    where
        T: Clone,
    {
        if values.is_empty() {
            return Ok(0);
        }

        let (produced, free) = self.acquire_free()?;
        let k = values.len().min(free);
        debug_assert_bounded_fill!(k, self.capacity);

        let (head, tail) = self.runs(produced, k);
        for (index, value) in head.chain(tail).zip(values[..k].iter()) {
            unsafe { (*self.slot(index)).write(value.clone()) };
        }

        self.publish_produced(produced, k);
        Ok(k)
    }

    pub(crate) fn write_drain(&self, values: &mut Vec<T>) -> Result<usize, RingError> {
        if values.is_empty() {
            return Ok(0);
        }

        let (produced, free) = self.acquire_free()?;
        let k = values.len().min(free);

        let (head, tail) = self.runs(produced, k);
        for (index, value) in head.chain(tail).zip(values.drain(..k)) {
            unsafe { (*self.slot(index)).write(value) };
        }

        self.publish_produced(produced, k);
        Ok(k)
    }

    pub(crate) fn write_via<F>(&self, mut fill: F, n: usize) -> Result<usize, RingError>
    where
        F: FnMut(&mut MaybeUninit<T>) -> bool,
    {
        if n == 0 {
            return Ok(0);
        }

        let (produced, free) = self.acquire_free()?;
        let k = n.min(free);

        let (head, tail) = self.runs(produced, k);
        let mut filled = 0;
        for index in head.clone().chain(tail.clone()) {
            // Safety: the slot lies in the free region, which only the
            // producer thread touches.
            let slot = unsafe { &mut *self.slot(index) };
            if !fill(slot) {
                // The aborted transfer publishes nothing; reclaim whatever
                // the filler already initialized.
                for done in head.chain(tail).take(filled) {
                    unsafe { (*self.slot(done)).assume_init_drop() };
                }
                return Err(RingError::Internal);
            }
            filled += 1;
        }

        self.publish_produced(produced, k);
        Ok(k)
    }

    // -----------------------------------------------------------------
    // Consumer path
    // -----------------------------------------------------------------

    /// Applies the read-side blocking policy and returns a validated
    /// `(consumed, available)` pair with `available > 0`.
    fn acquire_available(&self) -> Result<(u64, usize), RingError> {
        if self.flags.nonblocking_read() {
            let (produced, consumed) = self.snapshot()?;
            let available = (produced - consumed) as usize;
            if available == 0 {
                return Err(RingError::WouldBlock);
            }
            Ok((consumed, available))
        } else {
            loop {
                let (produced, consumed) = self.snapshot()?;
                let available = (produced - consumed) as usize;
                if available > 0 {
                    return Ok((consumed, available));
                }

                // Wait until the producer publishes something.
                self.reader_sem.wait();
                if self.reader_cancelled.swap(false, Ordering::AcqRel) {
                    return Err(RingError::Cancelled);
                }
            }
        }
    }

    /// Publishes `k` drained slots and wakes a blocking writer.
    fn publish_consumed(&self, consumed: u64, k: usize) {
        let new = consumed + k as u64;
        debug_assert_monotonic!("consumed", consumed, new);
        self.consumed.store(new, Ordering::Release);

        if !self.flags.nonblocking_write() {
            self.writer_sem.post();
        }
    }

    pub(crate) fn read_one(&self) -> Result<T, RingError> {
        let (consumed, available) = self.acquire_available()?;
        debug_assert_initialized_read!(consumed, consumed, consumed + available as u64);
        let index = (consumed % self.capacity as u64) as usize;
        let value = unsafe { (*self.slot(index)).assume_init_read() };
        self.publish_consumed(consumed, 1);
        Ok(value)
    }

    pub(crate) fn read_slice(&self, out: &mut [T]) -> Result<usize, RingError> {
        if out.is_empty() {
            return Ok(0);
        }

        let (consumed, available) = self.acquire_available()?;
        let k = out.len().min(available);

        let (head, tail) = self.runs(consumed, k);
        for (slot, index) in out[..k].iter_mut().zip(head.chain(tail)) {
            *slot = unsafe { (*self.slot(index)).assume_init_read() };
        }

        self.publish_consumed(consumed, k);
        Ok(k)
    }

    pub(crate) fn read_via<F>(&self, mut drain: F, n: usize) -> Result<usize, RingError>
    where
        F: FnMut(T) -> bool,
    {
        if n == 0 {
            return Ok(0);
        }

        let (consumed, available) = self.acquire_available()?;
        let k = n.min(available);

        let (head, tail) = self.runs(consumed, k);
        let mut taken = 0;
        for index in head.chain(tail) {
            let value = unsafe { (*self.slot(index)).assume_init_read() };
            taken += 1;
            if !drain(value) {
                // Ownership of the delivered elements has already left the
                // ring; the counter must move past them or they would be
                // handed out twice.
                self.publish_consumed(consumed, taken);
                return Err(RingError::Internal);
            }
        }

        self.publish_consumed(consumed, k);
        Ok(k)
    }
}

impl<T> Drop for RingInner<T> {
    fn drop(&mut self) {
        let produced = self.produced.load(Ordering::Relaxed);
        let consumed = self.consumed.load(Ordering::Relaxed);
        let count = produced.wrapping_sub(consumed);

        // A corrupted counter pair is left alone rather than turned into a
        // wild drop loop.
        if count == 0 || count > self.capacity as u64 {
            return;
        }

        for offset in 0..count {
            let index = ((consumed + offset) % self.capacity as u64) as usize;
            unsafe { (*self.storage[index].get()).assume_init_drop() };
        }
    }
}

/// Pads its content to two cache lines so the producer- and consumer-hot
/// counters never share a line (adjacent-line prefetchers pull pairs).
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_one() {
        let ring = RingBuffer::<u32>::new(4, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
        let tx = ring.producer().unwrap();
        let rx = ring.consumer().unwrap();

        assert_eq!(tx.write_one(7).unwrap(), 1);
        assert_eq!(rx.read_one().unwrap(), 7);
        assert_eq!(rx.read_one(), Err(RingError::WouldBlock));
    }

    #[test]
    fn test_faces_claimed_once() {
        let ring = RingBuffer::<u32>::new(4, Flags::default());
        let _tx = ring.producer().unwrap();
        let _rx = ring.consumer().unwrap();

        assert_eq!(
            ring.producer().unwrap_err(),
            FaceClaimed {
                role: Role::Producer
            }
        );
        assert_eq!(
            ring.consumer().unwrap_err(),
            FaceClaimed {
                role: Role::Consumer
            }
        );
    }

    #[test]
    fn test_counters_track_transfers() {
        let ring = RingBuffer::<u32>::new(4, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
        let tx = ring.producer().unwrap();
        let rx = ring.consumer().unwrap();

        tx.write_slice(&[1, 2, 3]).unwrap();
        let mut out = [0u32; 2];
        rx.read_slice(&mut out).unwrap();

        let counters = ring.counters().unwrap();
        assert_eq!(counters.produced, 3);
        assert_eq!(counters.consumed, 2);
        assert_eq!(counters.dropped, 0);
        assert_eq!(counters.fill(), 1);
    }

    #[test]
    fn test_write_via_abort_publishes_nothing() {
        let ring = RingBuffer::<String>::new(4, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
        let tx = ring.producer().unwrap();

        let mut calls = 0;
        let result = tx.write_via(
            |slot| {
                calls += 1;
                if calls == 3 {
                    return false;
                }
                slot.write(format!("item-{calls}"));
                true
            },
            4,
        );

        assert_eq!(result, Err(RingError::Internal));
        assert_eq!(ring.counters().unwrap().produced, 0);
    }

    #[test]
    fn test_read_via_early_stop_consumes_delivered() {
        let ring = RingBuffer::<u32>::new(8, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
        let tx = ring.producer().unwrap();
        let rx = ring.consumer().unwrap();
        tx.write_slice(&[10, 20, 30, 40]).unwrap();

        let mut seen = Vec::new();
        let result = rx.read_via(
            |value| {
                seen.push(value);
                seen.len() < 2
            },
            4,
        );

        assert_eq!(result, Err(RingError::Internal));
        assert_eq!(seen, vec![10, 20]);
        // The two delivered elements are gone; the rest are intact.
        assert_eq!(rx.read_one().unwrap(), 30);
    }

    #[test]
    fn test_drop_reclaims_unread_elements() {
        use std::sync::atomic::AtomicUsize;

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Counted;
        impl Drop for Counted {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        {
            let ring = RingBuffer::<Counted>::new(4, Flags::RD_NONBLOCKING_WR_NONBLOCKING);
            let tx = ring.producer().unwrap();
            let rx = ring.consumer().unwrap();

            tx.write_one(Counted).unwrap();
            tx.write_one(Counted).unwrap();
            tx.write_one(Counted).unwrap();
            drop(rx.read_one().unwrap());
        }

        // One dropped by the reader, two reclaimed by the ring.
        assert_eq!(DROPS.load(Ordering::Relaxed), 3);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_rejected() {
        let _ = RingBuffer::<u32>::new(0, Flags::default());
    }
}
