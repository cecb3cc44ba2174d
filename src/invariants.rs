//! Debug assertion macros for the ring buffer counter invariants.
//!
//! Active only in debug builds; release builds pay nothing.

/// Assert that the fill level never exceeds capacity.
///
/// Invariant: `0 <= produced - consumed <= capacity`
macro_rules! debug_assert_bounded_fill {
    ($fill:expr, $capacity:expr) => {
        debug_assert!(
            $fill <= $capacity,
            "fill {} exceeds capacity {}",
            $fill,
            $capacity
        )
    };
}

/// Assert that a counter only moves forward.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that a slot being read lies inside the initialized range.
///
/// Invariant: `storage[seq mod C]` holds a value iff `consumed <= seq < produced`
macro_rules! debug_assert_initialized_read {
    ($seq:expr, $consumed:expr, $produced:expr) => {
        debug_assert!(
            $seq >= $consumed && $seq < $produced,
            "reading slot at seq {} outside initialized range [{}, {})",
            $seq,
            $consumed,
            $produced
        )
    };
}

pub(crate) use debug_assert_bounded_fill;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
