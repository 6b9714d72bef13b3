//! The concurrency primitives shared by every service built on top of this
//! platform: a lock-free ring buffer, a bounded condition-variable FIFO with
//! preserve/rollback, and a batching worker pool built on that FIFO.
//!
//! None of this is a general-purpose pub/sub system or a durable queue —
//! everything here is in-memory and lost on crash. The ring buffer in
//! particular makes no promise of a single total order across producers,
//! only that each producer's own publications land in the order it made
//! them.

mod error;
mod fifo;
mod invariants;
mod ring;
mod worker_pool;

pub use error::{PoolError, QueueError};
pub use fifo::BlockingFifo;
pub use ring::{RingBuffer, DEFAULT_CAPACITY_EXP};
pub use worker_pool::{Task, WorkerPool, WorkerPoolOptions};
