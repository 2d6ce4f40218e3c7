#![no_main]

use libfuzzer_sys::fuzz_target;
use shardcache::ds::ShardSelector;
use shardcache::ds::shard::fnv1a_32;

// Fuzz shard selection
//
// Tests determinism, range validity and agreement between byte and string
// routing for arbitrary shard counts.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let shard_count = (data[0] as usize % 64) + 1;
    let selector = ShardSelector::new(shard_count);
    assert_eq!(selector.shard_count(), shard_count);

    let bytes = &data[1..];
    let shard = selector.shard_for_bytes(bytes);
    assert!(shard < shard_count);
    assert_eq!(shard, fnv1a_32(bytes) as usize % shard_count);
    assert_eq!(shard, selector.shard_for_bytes(bytes));

    if let Ok(text) = std::str::from_utf8(bytes) {
        let by_key = selector.shard_for_key(text);
        assert!(by_key < shard_count);
        assert_eq!(by_key, selector.shard_for_key(&text.to_string()));
    }
});
