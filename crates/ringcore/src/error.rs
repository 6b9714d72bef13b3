use thiserror::Error;

/// Failures from [`crate::BlockingFifo`] operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue size limit exceeded")]
    Full,
    #[error("operation timed out")]
    Timeout,
}

/// Failures from [`crate::WorkerPool`] lifecycle operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is canceled")]
    Canceled,
    #[error("worker pool is already canceled")]
    AlreadyCanceled,
}
