//! Bounded, condition-variable-backed FIFO with a single-slot preserve/
//! rollback undo buffer.

use crate::error::QueueError;
use crate::invariants::debug_assert_within_limit;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct State<T> {
    elems: VecDeque<T>,
    preserved: Option<T>,
}

/// A bounded FIFO queue any number of threads may push into and pop from,
/// with condition-variable signaling on the empty/non-empty edges and a
/// one-slot preserve/rollback undo buffer.
///
/// All mutation happens under a single mutex; waits use the mutex's
/// condition variables so a timed wait can never observe a timeout while
/// still holding the lock (the classic hazard with a hand-rolled
/// broadcast-then-poll handshake).
pub struct BlockingFifo<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    empty: Condvar,
    /// `0` disables the limit.
    limit: usize,
}

impl<T> BlockingFifo<T> {
    /// Creates an unbounded queue.
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Creates a queue bounded by `limit` elements. `limit == 0` disables
    /// the bound.
    pub fn new(limit: usize) -> Self {
        Self {
            state: Mutex::new(State {
                elems: VecDeque::new(),
                preserved: None,
            }),
            not_empty: Condvar::new(),
            empty: Condvar::new(),
            limit,
        }
    }

    /// Appends `v` to the tail. Fails with [`QueueError::Full`] if a limit
    /// is set and already reached. Broadcasts on the empty-to-non-empty
    /// transition.
    pub fn push(&self, v: T) -> Result<(), QueueError> {
        let mut guard = self.state.lock().unwrap();
        if self.limit > 0 && guard.elems.len() >= self.limit {
            return Err(QueueError::Full);
        }
        let was_empty = guard.elems.is_empty();
        guard.elems.push_back(v);
        debug_assert_within_limit!(guard.elems.len(), self.limit);
        drop(guard);
        if was_empty {
            self.not_empty.notify_all();
        }
        Ok(())
    }

    /// Removes and returns the head, or `None` if empty. Broadcasts on the
    /// non-empty-to-empty transition.
    pub fn pop(&self) -> Option<T> {
        let mut guard = self.state.lock().unwrap();
        let v = guard.elems.pop_front();
        let now_empty = guard.elems.is_empty();
        drop(guard);
        if v.is_some() && now_empty {
            self.empty.notify_all();
        }
        v
    }

    /// Removes and returns up to `n` elements from the head, in order.
    /// `n` is clamped to the current size. Returns `None` if the queue was
    /// already empty. The returned `Vec` owns its elements outright — it is
    /// never an alias into the queue's internal storage.
    pub fn pop_n(&self, n: usize) -> Option<Vec<T>> {
        let mut guard = self.state.lock().unwrap();
        if guard.elems.is_empty() {
            return None;
        }
        let n = n.min(guard.elems.len());
        let out: Vec<T> = guard.elems.drain(..n).collect();
        let now_empty = guard.elems.is_empty();
        drop(guard);
        if now_empty {
            self.empty.notify_all();
        }
        Some(out)
    }

    /// Returns a cloned copy of the head, or `None` if empty. Does not
    /// mutate the queue.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.state.lock().unwrap().elems.front().cloned()
    }

    /// Snapshots the head into the preserved slot, overwriting whatever was
    /// there. No-op if empty.
    pub fn preserve(&self)
    where
        T: Clone,
    {
        let mut guard = self.state.lock().unwrap();
        if let Some(head) = guard.elems.front() {
            guard.preserved = Some(head.clone());
        }
    }

    /// If a value is preserved, pushes it back at the head and clears the
    /// slot. No-op otherwise.
    pub fn rollback(&self) {
        let mut guard = self.state.lock().unwrap();
        if let Some(v) = guard.preserved.take() {
            let was_empty = guard.elems.is_empty();
            guard.elems.push_front(v);
            drop(guard);
            if was_empty {
                self.not_empty.notify_all();
            }
        }
    }

    /// Atomically preserves the head and pops it.
    pub fn preserve_and_pop(&self) -> Option<T>
    where
        T: Clone,
    {
        let mut guard = self.state.lock().unwrap();
        if let Some(head) = guard.elems.front() {
            guard.preserved = Some(head.clone());
        }
        let v = guard.elems.pop_front();
        let now_empty = guard.elems.is_empty();
        drop(guard);
        if v.is_some() && now_empty {
            self.empty.notify_all();
        }
        v
    }

    /// Current number of elements.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Blocks until the queue is empty, or `timeout` elapses. `None` waits
    /// indefinitely.
    pub fn wait_till_empty(&self, timeout: Option<Duration>) -> Result<(), QueueError> {
        self.wait_on(&self.empty, timeout, |s| s.elems.is_empty())
    }

    /// Blocks until the queue is non-empty, or `timeout` elapses. `None`
    /// waits indefinitely.
    pub fn wait_till_not_empty(&self, timeout: Option<Duration>) -> Result<(), QueueError> {
        self.wait_on(&self.not_empty, timeout, |s| !s.elems.is_empty())
    }

    fn wait_on(
        &self,
        cvar: &Condvar,
        timeout: Option<Duration>,
        predicate: impl Fn(&State<T>) -> bool,
    ) -> Result<(), QueueError> {
        let guard = self.state.lock().unwrap();
        if predicate(&guard) {
            return Ok(());
        }
        match timeout {
            None => {
                let _ = cvar.wait_while(guard, |s| !predicate(s)).unwrap();
                Ok(())
            }
            Some(d) => {
                let (_, result) = cvar.wait_timeout_while(guard, d, |s| !predicate(s)).unwrap();
                if result.timed_out() {
                    Err(QueueError::Timeout)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Returns a cloned copy of the current contents, head first. Does not
    /// mutate the queue.
    pub fn unwrap(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.lock().unwrap().elems.iter().cloned().collect()
    }

    /// Drains and returns the full contents, head first. Broadcasts on the
    /// non-empty-to-empty transition.
    pub fn unwrap_and_flush(&self) -> Vec<T> {
        let mut guard = self.state.lock().unwrap();
        let was_empty = guard.elems.is_empty();
        let out: Vec<T> = guard.elems.drain(..).collect();
        drop(guard);
        if !was_empty && !out.is_empty() {
            self.empty.notify_all();
        }
        out
    }
}
