//! Debug-only assertion macros for the invariants named in this crate's
//! design notes. Active only in debug builds (`debug_assert!` is a no-op
//! under `--release`), so there is zero runtime cost in production.

// =============================================================================
// INV-SEQ-01: Bounded Count
// =============================================================================

/// `0 <= (writer - reader) <= capacity` must hold for a ring buffer's
/// occupancy at any observation point.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-SEQ-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-INIT-01: Initialized Range Check
// =============================================================================

/// A slot may only be read by the consumer once its sequence stamp shows it
/// was written for this lap, i.e. `sequence == position + 1`.
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $dequeue_pos:expr, $sequence:expr) => {
        debug_assert!(
            $sequence == $pos.wrapping_add(1),
            "INV-INIT-01 violated: reading slot at position {} with stamp {}",
            $pos,
            $sequence
        )
    };
}

// =============================================================================
// INV-FIFO-01: Bounded FIFO Size Limit
// =============================================================================

/// `0 <= size <= limit` must hold whenever a limit is enabled.
macro_rules! debug_assert_within_limit {
    ($size:expr, $limit:expr) => {
        debug_assert!(
            $limit == 0 || $size <= $limit,
            "INV-FIFO-01 violated: size {} exceeds limit {}",
            $size,
            $limit
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_within_limit;
