//! Fixed-size worker pool draining a [`BlockingFifo`] in batches, with
//! graceful, timeout-bounded cancellation.

use crate::error::PoolError;
use crate::fifo::BlockingFifo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// An opaque unit of work a worker thread runs to completion.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// How long a worker waits on an empty queue before re-checking
/// cancellation. Keeping this short is what lets [`WorkerPool::cancel`]
/// wake a worker parked on an empty queue without the queue needing to know
/// anything about cancellation.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Tunables for a [`WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolOptions {
    /// Maximum tasks drained from the queue per worker iteration. Must be
    /// at least 1.
    pub batch_size: usize,
    /// Deadline for draining remaining tasks after [`WorkerPool::cancel`]
    /// is called.
    pub stop_timeout: Duration,
}

impl Default for WorkerPoolOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            stop_timeout: Duration::from_secs(1),
        }
    }
}

impl WorkerPoolOptions {
    fn normalized(self) -> Self {
        Self {
            batch_size: self.batch_size.max(1),
            stop_timeout: if self.stop_timeout.is_zero() {
                Duration::from_secs(1)
            } else {
                self.stop_timeout
            },
        }
    }
}

struct Inner {
    queue: BlockingFifo<Task>,
    canceled: AtomicBool,
    started: AtomicBool,
    opts: WorkerPoolOptions,
    workers: Mutex<Vec<JoinHandle<()>>>,
    drain_once: Once,
}

/// A handle to a pool of worker threads draining a shared, bounded FIFO.
/// Cheap to clone — clones share the same underlying pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    pub fn new(opts: WorkerPoolOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: BlockingFifo::unbounded(),
                canceled: AtomicBool::new(false),
                started: AtomicBool::new(false),
                opts: opts.normalized(),
                workers: Mutex::new(Vec::new()),
                drain_once: Once::new(),
            }),
        }
    }

    /// Spawns `worker_count` worker threads. A no-op on any call after the
    /// first.
    pub fn start(&self, worker_count: usize) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.inner.workers.lock().unwrap();
        for _ in 0..worker_count {
            let pool = self.clone();
            workers.push(thread::spawn(move || pool.work()));
        }
    }

    fn work(&self) {
        loop {
            if self.inner.canceled.load(Ordering::Acquire) {
                self.inner.drain_once.call_once(|| self.drain());
                return;
            }
            if self.inner.queue.is_empty() {
                let _ = self.inner.queue.wait_till_not_empty(Some(IDLE_POLL));
                continue;
            }
            if let Some(tasks) = self.inner.queue.pop_n(self.inner.opts.batch_size) {
                for task in tasks {
                    task();
                }
            }
        }
    }

    fn drain(&self) {
        let deadline = Instant::now() + self.inner.opts.stop_timeout;
        loop {
            if Instant::now() >= deadline {
                return;
            }
            match self.inner.queue.pop_n(self.inner.opts.batch_size) {
                Some(tasks) => {
                    for task in tasks {
                        task();
                    }
                }
                None => return,
            }
        }
    }

    /// Enqueues `task`. Fails with [`PoolError::Canceled`] once the pool has
    /// been canceled.
    pub fn push(&self, task: Task) -> Result<(), PoolError> {
        if self.inner.canceled.load(Ordering::Acquire) {
            return Err(PoolError::Canceled);
        }
        self.inner
            .queue
            .push(task)
            .expect("worker pool queue is unbounded and never reports Full");
        Ok(())
    }

    /// Flips the pool to canceled, which wakes any worker idling on the
    /// empty queue within one [`IDLE_POLL`] tick, then blocks until every
    /// worker has finished draining and returned. Returns
    /// [`PoolError::AlreadyCanceled`] on a second call.
    pub fn cancel(&self) -> Result<(), PoolError> {
        if self.inner.canceled.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyCanceled);
        }
        let handles: Vec<_> = std::mem::take(&mut *self.inner.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn pushed_tasks_eventually_run() {
        let pool = WorkerPool::new(WorkerPoolOptions::default());
        pool.start(2);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let ran = Arc::clone(&ran);
            pool.push(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        pool.cancel().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn cancel_is_idempotent_erroring() {
        let pool = WorkerPool::new(WorkerPoolOptions::default());
        pool.start(1);
        assert_eq!(pool.cancel(), Ok(()));
        assert_eq!(pool.cancel(), Err(PoolError::AlreadyCanceled));
    }

    #[test]
    fn push_after_cancel_is_refused() {
        let pool = WorkerPool::new(WorkerPoolOptions::default());
        pool.start(1);
        pool.cancel().unwrap();
        assert_eq!(pool.push(Box::new(|| {})), Err(PoolError::Canceled));
    }

    #[test]
    fn cancel_wakes_a_worker_parked_on_an_empty_queue() {
        // Regression test: a worker idling in wait_till_not_empty must not
        // block cancel() from completing.
        let pool = WorkerPool::new(WorkerPoolOptions {
            batch_size: 1,
            stop_timeout: Duration::from_millis(200),
        });
        pool.start(3);
        thread::sleep(Duration::from_millis(150)); // let workers settle into the wait
        let started = Instant::now();
        pool.cancel().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn drain_runs_pending_tasks_after_cancel_fires_immediately() {
        // Tasks pushed just before cancel() should still run during the
        // drain phase, not be silently dropped.
        let pool = WorkerPool::new(WorkerPoolOptions {
            batch_size: 2,
            stop_timeout: Duration::from_millis(500),
        });
        pool.start(1);
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            pool.push(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        }
        pool.cancel().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }
}
