#![no_main]

use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use shardcache::store::Shard;
use shardcache::time::ManualClock;

// Fuzz arbitrary shard operations with a manual clock
//
// Checks the capacity bound and map/heap agreement after every step.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let capacity = (data[0] as usize % 16) + 1;
    let clock = ManualClock::new();
    let shard: Shard<u8, u8, _> =
        Shard::with_clock(0, capacity, Duration::from_millis(50), clock.clone());

    for chunk in data[1..].chunks(2) {
        let op = chunk[0] % 6;
        let key = chunk.get(1).copied().unwrap_or(0) % 48;

        match op {
            0 => {
                let (_, existed) = shard.get_or_create(key, key);
                if !existed {
                    assert!(shard.contains(&key));
                }
            },
            1 => {
                shard.put(key, key.wrapping_add(1));
            },
            2 => {
                let _ = shard.get(&key);
            },
            3 => {
                shard.remove(&key);
                assert!(!shard.contains(&key));
            },
            4 => {
                clock.advance(Duration::from_millis(u64::from(key)));
            },
            _ => {
                shard.purge_expired();
            },
        }

        assert!(shard.len() <= capacity);
        shard.check_invariants().unwrap();
    }
});
