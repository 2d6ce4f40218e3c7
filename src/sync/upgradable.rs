//! Three-mode reader/writer lock with an upgradable read mode.
//!
//! [`UpgradableRwLock`] hands out shared reads, a single upgradable read, and
//! exclusive writes. The upgradable mode exists for check-then-insert
//! sequences: a shard checks for a key while plain readers keep running, and
//! only on a genuine miss upgrades to exclusive access. Because the
//! upgradable holder keeps its reservation across the upgrade, no other
//! upgradable reader or writer can slip in between the check and the insert.
//!
//! ## Compatibility
//!
//! ```text
//!   held \ requested │ shared   │ upgradable │ write
//!   ─────────────────┼──────────┼────────────┼──────
//!   none             │ grant    │ grant      │ grant
//!   shared(s)        │ grant    │ grant      │ block
//!   upgradable       │ grant    │ block      │ block
//!   write            │ block    │ block      │ block
//! ```
//!
//! While an upgrade is waiting for readers to drain, new shared readers are
//! held back so the upgrader cannot be starved.
//!
//! ## Upgrade Flow
//!
//! ```text
//!   upgradable_read() ──► UpgradableReadGuard ── upgrade() ──► UpgradedWriteGuard
//!         ▲                       │   ▲                               │
//!         │                  drop │   └────────── drop (downgrade) ───┘
//!         │                       ▼
//!         └──────────────── lock released
//! ```
//!
//! ## Implementation Notes
//!
//! All bookkeeping lives in one [`parking_lot::Mutex`] guarding a small state
//! record, with a single [`parking_lot::Condvar`] broadcast on every release.
//! The protected value sits in an `UnsafeCell`; guards hand out references
//! only while the state record proves the matching access mode is held.
//!
//! ## Example Usage
//!
//! ```
//! use shardcache::sync::UpgradableRwLock;
//!
//! let lock = UpgradableRwLock::new(vec![1, 2, 3]);
//!
//! let mut check = lock.upgradable_read();
//! if !check.contains(&4) {
//!     let mut write = check.upgrade();
//!     write.push(4);
//! } // downgraded back to upgradable read here
//! assert_eq!(check.len(), 4);
//! drop(check);
//!
//! assert_eq!(*lock.read(), vec![1, 2, 3, 4]);
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    upgradable: bool,
    upgrading: bool,
    writer: bool,
}

impl LockState {
    #[inline]
    fn can_read(&self) -> bool {
        !self.writer && !self.upgrading
    }

    #[inline]
    fn can_upgradable_read(&self) -> bool {
        !self.writer && !self.upgradable
    }

    #[inline]
    fn can_write(&self) -> bool {
        !self.writer && !self.upgradable && self.readers == 0
    }
}

/// Reader/writer lock supporting shared, upgradable and exclusive access.
pub struct UpgradableRwLock<T: ?Sized> {
    state: Mutex<LockState>,
    changed: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is serialised by `state` exactly like
// `std::sync::RwLock`: shared references only while no writer holds the
// lock, a unique reference only while the writer flag is set.
unsafe impl<T: ?Sized + Send> Send for UpgradableRwLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for UpgradableRwLock<T> {}

impl<T> UpgradableRwLock<T> {
    /// Creates an unlocked lock protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            changed: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> UpgradableRwLock<T> {
    /// Acquires shared read access, blocking while a writer holds the lock or
    /// an upgrade is pending.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        self.changed.wait_while(&mut state, |s| !s.can_read());
        state.readers += 1;
        ReadGuard { lock: self }
    }

    /// Attempts shared read access without blocking.
    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        let mut state = self.state.lock();
        if !state.can_read() {
            return None;
        }
        state.readers += 1;
        Some(ReadGuard { lock: self })
    }

    /// Acquires the upgradable read reservation.
    ///
    /// Compatible with any number of plain readers; excludes other
    /// upgradable readers and writers.
    pub fn upgradable_read(&self) -> UpgradableReadGuard<'_, T> {
        let mut state = self.state.lock();
        self.changed.wait_while(&mut state, |s| !s.can_upgradable_read());
        state.upgradable = true;
        UpgradableReadGuard { lock: self }
    }

    /// Attempts the upgradable read reservation without blocking.
    pub fn try_upgradable_read(&self) -> Option<UpgradableReadGuard<'_, T>> {
        let mut state = self.state.lock();
        if !state.can_upgradable_read() {
            return None;
        }
        state.upgradable = true;
        Some(UpgradableReadGuard { lock: self })
    }

    /// Acquires exclusive write access.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        self.changed.wait_while(&mut state, |s| !s.can_write());
        state.writer = true;
        WriteGuard { lock: self }
    }

    /// Attempts exclusive write access without blocking.
    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        let mut state = self.state.lock();
        if !state.can_write() {
            return None;
        }
        state.writer = true;
        Some(WriteGuard { lock: self })
    }

    /// Returns a mutable reference without locking; `&mut self` proves no
    /// guard is alive.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn release(&self, f: impl FnOnce(&mut LockState)) {
        let mut state = self.state.lock();
        f(&mut state);
        drop(state);
        self.changed.notify_all();
    }
}

impl<T: Default> Default for UpgradableRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for UpgradableRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("UpgradableRwLock")
            .field("readers", &state.readers)
            .field("upgradable", &state.upgradable)
            .field("upgrading", &state.upgrading)
            .field("writer", &state.writer)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Shared read access; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, T: ?Sized> {
    lock: &'a UpgradableRwLock<T>,
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: readers > 0 excludes writers.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release(|state| state.readers -= 1);
    }
}

/// Upgradable read reservation; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct UpgradableReadGuard<'a, T: ?Sized> {
    lock: &'a UpgradableRwLock<T>,
}

impl<'a, T: ?Sized> UpgradableReadGuard<'a, T> {
    /// Upgrades to exclusive access.
    ///
    /// Blocks until every plain reader has left. The reservation is never
    /// given up, so no other writer can run between the caller's check and
    /// its write. Dropping the returned guard downgrades back to this
    /// upgradable read.
    pub fn upgrade(&mut self) -> UpgradedWriteGuard<'_, 'a, T> {
        let lock = self.lock;
        let mut state = lock.state.lock();
        state.upgrading = true;
        lock.changed.wait_while(&mut state, |s| s.readers > 0);
        state.upgrading = false;
        state.writer = true;
        drop(state);
        UpgradedWriteGuard { guard: self }
    }

    /// Attempts the upgrade without blocking; fails while plain readers are
    /// active.
    pub fn try_upgrade(&mut self) -> Option<UpgradedWriteGuard<'_, 'a, T>> {
        let lock = self.lock;
        let mut state = lock.state.lock();
        if state.readers > 0 {
            return None;
        }
        state.writer = true;
        drop(state);
        Some(UpgradedWriteGuard { guard: self })
    }
}

impl<T: ?Sized> Deref for UpgradableReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the upgradable flag excludes writers other than our own
        // upgrade, which borrows this guard mutably.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for UpgradableReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release(|state| state.upgradable = false);
    }
}

/// Exclusive access obtained through [`UpgradableReadGuard::upgrade`].
#[must_use = "the lock is downgraded as soon as the guard is dropped"]
pub struct UpgradedWriteGuard<'g, 'a, T: ?Sized> {
    guard: &'g mut UpgradableReadGuard<'a, T>,
}

impl<T: ?Sized> Deref for UpgradedWriteGuard<'_, '_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: writer flag is set and owned by this guard.
        unsafe { &*self.guard.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for UpgradedWriteGuard<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: writer flag is set and owned by this guard.
        unsafe { &mut *self.guard.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for UpgradedWriteGuard<'_, '_, T> {
    fn drop(&mut self) {
        self.guard.lock.release(|state| state.writer = false);
    }
}

/// Plain exclusive access; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a, T: ?Sized> {
    lock: &'a UpgradableRwLock<T>,
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: writer flag is set and owned by this guard.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: writer flag is set and owned by this guard.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release(|state| state.writer = false);
    }
}
