use shardcache::store::Shard;
use shardcache::time::ManualClock;
use std::time::Duration;

fn main() {
    let clock = ManualClock::new();
    let shard: Shard<u32, String, _> =
        Shard::with_clock(0, 2, Duration::from_secs(30), clock.clone());

    shard.put(1, "alpha".to_string());
    clock.advance(Duration::from_secs(1));
    shard.put(2, "beta".to_string());
    clock.advance(Duration::from_secs(1));

    if let Some(value) = shard.get(&1) {
        println!("hit 1: {value}");
    }
    clock.advance(Duration::from_secs(1));

    shard.put(3, "gamma".to_string());
    println!("contains 2? {}", shard.contains(&2));

    clock.advance(Duration::from_secs(30));
    println!("contains 1 after ttl? {}", shard.contains(&1));
}

// Expected output:
// hit 1: alpha
// contains 2? false
// contains 1 after ttl? false
//
// Explanation: capacity=2; get(&1) refreshes key 1, leaving key 2 the least
// recently accessed. Inserting key 3 evicts key 2. Thirty seconds later
// every entry has reached its TTL.
