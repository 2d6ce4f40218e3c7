pub use crate::builder::{CacheBuilder, CacheConfig, FailurePolicy};
pub use crate::cache::Cache;
pub use crate::ds::{RecencyHeap, ShardSelector};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::store::{Shard, ShardedStore, StoreMetrics};
pub use crate::sync::{Promise, UpgradableRwLock};
pub use crate::time::{Clock, ManualClock, SystemClock};
