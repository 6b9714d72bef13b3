//! Fixed-capacity, power-of-two, lock-free ring buffer.
//!
//! Unlike a classic single-producer/single-consumer Disruptor, [`RingBuffer`]
//! accepts publishes from any number of producer threads concurrently: each
//! slot carries its own sequence stamp, and a producer claims a slot with a
//! compare-and-swap before writing into it. This keeps the per-producer
//! publication order (a thread's own `publish` calls land in the order it
//! made them) without requiring a dedicated ring per producer and without the
//! unsynchronized writer/reader bookkeeping a naive single-consumer port
//! would need to share across threads.
//!
//! The consumer side is still meant to be driven by exactly one thread at a
//! time (see [`RingBuffer::consume`]); nothing stops multiple callers from
//! calling it, but doing so is the caller's responsibility to avoid, same as
//! any bounded MPMC queue used with a single logical consumer.

use crate::invariants::{debug_assert_bounded_count, debug_assert_initialized_read};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Default capacity exponent: `2^16` slots, matching the source's default.
pub const DEFAULT_CAPACITY_EXP: u32 = 16;

const CONSUME_YIELD: Duration = Duration::from_micros(10);

struct Slot<T> {
    /// Sequence stamp: `i` when free for producer `i` to claim, `i + 1` once
    /// written, `i + capacity` once consumed and free again for lap `i + capacity`.
    sequence: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Lock-free ring buffer used as the primary path of [`crate`]'s logging
/// pipeline and any other producer/consumer hand-off that wants to avoid
/// blocking producers.
pub struct RingBuffer<T> {
    buffer: Box<[Slot<T>]>,
    mask: u64,
    capacity: u64,
    // Shared among all producers: the next sequence a producer will try to claim.
    enqueue_pos: CachePadded<AtomicU64>,
    // Touched only by the consumer thread.
    dequeue_pos: CachePadded<AtomicU64>,
    closed: AtomicBool,
}

// Safety: access to `buffer[i].value` is gated by the sequence-stamp
// protocol above: only the producer that wins the CAS for slot `i` writes
// it, and only the (single) consumer that observes `sequence == i + 1`
// reads it, after which it is never touched again until the next lap.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a buffer of `2^capacity_exp` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity_exp` is 0 or large enough to overflow `usize`.
    pub fn new(capacity_exp: u32) -> Self {
        assert!(capacity_exp >= 1, "ring buffer needs at least 2 slots");
        let capacity = 1usize << capacity_exp;
        let mut buffer = Vec::with_capacity(capacity);
        for i in 0..capacity {
            buffer.push(Slot {
                sequence: AtomicU64::new(i as u64),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            });
        }
        Self {
            buffer: buffer.into_boxed_slice(),
            mask: (capacity - 1) as u64,
            capacity: capacity as u64,
            enqueue_pos: CachePadded::new(AtomicU64::new(0)),
            dequeue_pos: CachePadded::new(AtomicU64::new(0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of slots in the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Attempts to store `entry`, returning ownership back on failure.
    ///
    /// Fails if the buffer is closed or full — the fullness predicate is
    /// `(writer + 1) - reader >= N`, checked implicitly by a slot's sequence
    /// stamp still belonging to the previous lap.
    pub fn try_publish(&self, entry: T) -> Result<(), T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(entry);
        }
        loop {
            let pos = self.enqueue_pos.load(Ordering::Relaxed);
            let slot = &self.buffer[(pos & self.mask) as usize];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as i64 - pos as i64;
            match diff.cmp(&0) {
                std::cmp::Ordering::Equal => {
                    if self
                        .enqueue_pos
                        .compare_exchange_weak(
                            pos,
                            pos.wrapping_add(1),
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        unsafe { (*slot.value.get()).write(entry) };
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    // Lost the race for this slot; `entry` was never moved, retry.
                }
                std::cmp::Ordering::Less => return Err(entry),
                std::cmp::Ordering::Greater => {
                    // Another producer has already advanced past this slot;
                    // reload enqueue_pos on the next iteration.
                }
            }
        }
    }

    /// `publish` as specified: returns `true` if stored, `false` if the
    /// buffer was full or closed. Drops `entry` on failure; use
    /// [`RingBuffer::try_publish`] to recover ownership instead.
    pub fn publish(&self, entry: T) -> bool {
        self.try_publish(entry).is_ok()
    }

    fn try_pop(&self) -> Option<T> {
        let pos = self.dequeue_pos.load(Ordering::Relaxed);
        let slot = &self.buffer[(pos & self.mask) as usize];
        let seq = slot.sequence.load(Ordering::Acquire);
        let diff = seq as i64 - (pos as i64 + 1);
        if diff != 0 {
            return None;
        }
        debug_assert_initialized_read!(pos, self.dequeue_pos.load(Ordering::Relaxed), seq);
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.sequence
            .store(pos.wrapping_add(self.capacity), Ordering::Release);
        self.dequeue_pos.store(pos.wrapping_add(1), Ordering::Relaxed);
        Some(value)
    }

    /// Runs `handler` over every record as it becomes available, yielding
    /// with a short sleep between empty polls, until [`RingBuffer::close`]
    /// has been called and the buffer has been fully drained.
    ///
    /// Meant to be driven by a single dedicated consumer thread for the
    /// lifetime of the buffer.
    pub fn consume<F: FnMut(T)>(&self, mut handler: F) {
        loop {
            match self.try_pop() {
                Some(value) => handler(value),
                None => {
                    if self.closed.load(Ordering::Acquire) && self.is_empty() {
                        return;
                    }
                    thread::sleep(CONSUME_YIELD);
                }
            }
        }
    }

    /// Idempotently signals shutdown. In-flight entries already published
    /// are still delivered to a running [`RingBuffer::consume`] call.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// `true` once `writer == reader`, i.e. every published entry has been
    /// consumed.
    pub fn is_empty(&self) -> bool {
        self.enqueue_pos.load(Ordering::Acquire) == self.dequeue_pos.load(Ordering::Acquire)
    }

    /// Best-effort snapshot of the number of entries currently held.
    pub fn len(&self) -> usize {
        let writer = self.enqueue_pos.load(Ordering::Acquire);
        let reader = self.dequeue_pos.load(Ordering::Acquire);
        let len = writer.wrapping_sub(reader);
        debug_assert_bounded_count!(len, self.capacity);
        len as usize
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_EXP)
    }
}
