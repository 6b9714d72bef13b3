//! Property-based tests for the quantified invariants: ring buffer
//! capacity/ordering and FIFO push/pop order.

use proptest::prelude::*;
use ringcore::{BlockingFifo, RingBuffer};

proptest! {
    /// Publishing up to capacity always succeeds; the next one always fails.
    #[test]
    fn ring_buffer_capacity_invariant(extra in 0usize..8) {
        let capacity_exp = 4u32; // capacity 16
        let ring: RingBuffer<u64> = RingBuffer::new(capacity_exp);
        let capacity = ring.capacity();
        for i in 0..capacity {
            prop_assert!(ring.publish(i as u64));
        }
        prop_assert!(!ring.publish(999));
        for _ in 0..extra {
            prop_assert!(!ring.publish(999));
        }
    }

    /// Whatever gets delivered to a single consume() call is a prefix of the
    /// publish sequence, in order.
    #[test]
    fn ring_buffer_delivers_published_prefix_in_order(n in 1usize..200) {
        let ring: RingBuffer<usize> = RingBuffer::new(8); // capacity 256
        for i in 0..n {
            prop_assert!(ring.publish(i));
        }
        ring.close();
        let mut seen = Vec::new();
        ring.consume(|v| seen.push(v));
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    /// pop/pop_n always return elements in push order, regardless of how
    /// they are chunked.
    #[test]
    fn fifo_pop_preserves_push_order(
        values in proptest::collection::vec(0i32..1000, 1..100),
        chunk in 1usize..10,
    ) {
        let q: BlockingFifo<i32> = BlockingFifo::unbounded();
        for &v in &values {
            q.push(v).unwrap();
        }
        let mut drained = Vec::new();
        while let Some(batch) = q.pop_n(chunk) {
            drained.extend(batch);
        }
        prop_assert_eq!(drained, values);
    }

    /// preserve() -> pop() -> rollback() restores the pre-pop head.
    #[test]
    fn preserve_rollback_round_trip(values in proptest::collection::vec(0i32..1000, 1..50)) {
        let q: BlockingFifo<i32> = BlockingFifo::unbounded();
        for &v in &values {
            q.push(v).unwrap();
        }
        let before = q.unwrap();
        let popped = q.preserve_and_pop();
        prop_assert_eq!(popped, Some(values[0]));
        q.rollback();
        prop_assert_eq!(q.unwrap(), before);
    }
}
