use crate::Role;
use thiserror::Error;

/// Failure states of ring buffer operations.
///
/// Successful operations report the number of elements transferred; these
/// variants cover everything else. The discriminants are stable wire values
/// shared with ports of this queue in other languages (success is `0` or a
/// positive count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(i64)]
pub enum RingError {
    /// The counters were observed out of range, or a caller-supplied
    /// transfer callback aborted mid-transfer.
    #[error("ring buffer internal error")]
    Internal = -1,

    /// A non-blocking face found no free slot (write) or no data (read).
    #[error("operation would block")]
    WouldBlock = -2,

    /// A blocking operation was woken by [`cancel`](crate::RingBuffer::cancel).
    #[error("operation cancelled")]
    Cancelled = -3,
}

impl RingError {
    /// Stable status code for this error.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// True for transient contention that a retry can resolve.
    #[inline]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

/// Returned when a second producer or consumer face is requested from the
/// same ring buffer.
///
/// Each face may be claimed exactly once; this is what upholds the
/// single-producer/single-consumer discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{role:?} face already claimed")]
pub struct FaceClaimed {
    /// The face that was requested twice.
    pub role: Role,
}
