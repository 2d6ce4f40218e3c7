//! Blocking synchronization primitives.
//!
//! - [`Promise`]: write-once result shared by every waiter.
//! - [`UpgradableRwLock`]: shared / upgradable / exclusive lock.

pub mod promise;
pub mod upgradable;

pub use promise::Promise;
pub use upgradable::{
    ReadGuard, UpgradableReadGuard, UpgradableRwLock, UpgradedWriteGuard, WriteGuard,
};
