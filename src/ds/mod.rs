pub mod recency_heap;
pub mod shard;

pub use recency_heap::RecencyHeap;
pub use shard::{Fnv1aHasher, ShardSelector};
