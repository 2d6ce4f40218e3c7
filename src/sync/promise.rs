//! Write-once, multi-reader result slot.
//!
//! A [`Promise`] starts out pending and is settled exactly once, either with
//! a value ([`resolve`](Promise::resolve)) or an error
//! ([`reject`](Promise::reject)). Any number of threads may block in
//! [`wait`](Promise::wait); when the promise settles every waiter wakes and
//! receives a clone of the same outcome. Late arrivals get the outcome
//! immediately.
//!
//! The facade stores one promise per in-flight key: the caller that created
//! it runs the getter, everyone else waits on it.
//!
//! ## State Machine
//!
//! ```text
//!               resolve(v)
//!   Pending ──────────────────► Resolved(v)
//!      │  \      reject(e)
//!      │   ──────────────────► Rejected(e)
//!      │         abandon()
//!      └─────────────────────► Abandoned
//!
//!   Terminal states never change; later resolve/reject calls return false.
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use std::thread;
//!
//! use shardcache::sync::Promise;
//!
//! let promise: Promise<u32, String> = Promise::new();
//!
//! let waiter = {
//!     let promise = promise.clone();
//!     thread::spawn(move || promise.wait())
//! };
//!
//! assert!(promise.resolve(7));
//! assert!(!promise.reject("too late".into()));
//!
//! assert_eq!(waiter.join().unwrap(), Ok(7));
//! assert_eq!(promise.wait(), Ok(7));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
enum State<V, E> {
    Pending,
    Resolved(V),
    Rejected(E),
    Abandoned,
}

#[derive(Debug)]
struct Inner<V, E> {
    state: Mutex<Slot<V, E>>,
    settled: Condvar,
}

#[derive(Debug)]
struct Slot<V, E> {
    state: State<V, E>,
    waiters: usize,
}

/// Shared handle to a single-result future.
///
/// Cloning the handle is cheap; all clones observe the same outcome.
pub struct Promise<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Promise<V, E> {
    /// Creates a pending promise.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Slot {
                    state: State::Pending,
                    waiters: 0,
                }),
                settled: Condvar::new(),
            }),
        }
    }

    /// Settles the promise with `value`.
    ///
    /// Returns `false` if the promise was already settled; the stored outcome
    /// is left untouched.
    pub fn resolve(&self, value: V) -> bool {
        self.settle(State::Resolved(value))
    }

    /// Settles the promise with `error`.
    ///
    /// Returns `false` if the promise was already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(State::Rejected(error))
    }

    /// Marks a pending promise as abandoned: its producer went away without
    /// settling it. Waiters are woken and panic.
    pub fn abandon(&self) -> bool {
        self.settle(State::Abandoned)
    }

    /// Returns `true` while the promise has not been settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.state.lock().state, State::Pending)
    }

    /// Returns the number of threads currently blocked in `wait`.
    pub fn waiters(&self) -> usize {
        self.inner.state.lock().waiters
    }

    /// Returns `true` if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn settle(&self, outcome: State<V, E>) -> bool {
        let mut slot = self.inner.state.lock();
        if !matches!(slot.state, State::Pending) {
            return false;
        }
        slot.state = outcome;
        drop(slot);
        self.inner.settled.notify_all();
        true
    }
}

impl<V: Clone, E: Clone> Promise<V, E> {
    /// Blocks until the promise settles and returns its outcome.
    ///
    /// # Panics
    ///
    /// Panics if the promise was [abandoned](Self::abandon).
    pub fn wait(&self) -> Result<V, E> {
        let mut slot = self.inner.state.lock();
        if matches!(slot.state, State::Pending) {
            slot.waiters += 1;
            while matches!(slot.state, State::Pending) {
                self.inner.settled.wait(&mut slot);
            }
            slot.waiters -= 1;
        }
        match Self::outcome(&slot.state) {
            Some(outcome) => outcome,
            None => panic!("promise abandoned before it was settled"),
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Returns `None` if the promise is still pending when the timeout
    /// elapses.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use shardcache::sync::Promise;
    ///
    /// let promise: Promise<u8, ()> = Promise::new();
    /// assert_eq!(promise.wait_timeout(Duration::from_millis(5)), None);
    ///
    /// promise.resolve(1);
    /// assert_eq!(promise.wait_timeout(Duration::from_millis(5)), Some(Ok(1)));
    /// ```
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<V, E>> {
        let mut slot = self.inner.state.lock();
        if matches!(slot.state, State::Pending) {
            slot.waiters += 1;
            let _ = self
                .inner
                .settled
                .wait_while_for(&mut slot, |slot| matches!(slot.state, State::Pending), timeout);
            slot.waiters -= 1;
        }
        match slot.state {
            State::Pending => None,
            State::Abandoned => panic!("promise abandoned before it was settled"),
            ref state => Self::outcome(state),
        }
    }

    /// Returns the outcome without blocking, or `None` while pending.
    ///
    /// # Panics
    ///
    /// Panics if the promise was [abandoned](Self::abandon).
    pub fn try_get(&self) -> Option<Result<V, E>> {
        let slot = self.inner.state.lock();
        match slot.state {
            State::Pending => None,
            State::Abandoned => panic!("promise abandoned before it was settled"),
            ref state => Self::outcome(state),
        }
    }

    /// Returns the resolved value, if the promise resolved successfully.
    pub fn value(&self) -> Option<V> {
        match &self.inner.state.lock().state {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn outcome(state: &State<V, E>) -> Option<Result<V, E>> {
        match state {
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
            State::Pending | State::Abandoned => None,
        }
    }
}

impl<V, E> Clone for Promise<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> Default for Promise<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for Promise<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.state.lock();
        let state = match slot.state {
            State::Pending => "pending",
            State::Resolved(_) => "resolved",
            State::Rejected(_) => "rejected",
            State::Abandoned => "abandoned",
        };
        f.debug_struct("Promise")
            .field("state", &state)
            .field("waiters", &slot.waiters)
            .finish()
    }
}
