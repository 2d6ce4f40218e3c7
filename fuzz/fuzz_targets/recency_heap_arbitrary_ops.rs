#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use shardcache::ds::RecencyHeap;

// Fuzz arbitrary heap operations against a map model
//
// Each pair of bytes is (op, key); priorities come from a running counter
// so pops must come out in ascending order of the model's values.
fuzz_target!(|data: &[u8]| {
    let mut heap: RecencyHeap<u8, u32> = RecencyHeap::new();
    let mut model: HashMap<u8, u32> = HashMap::new();
    let mut tick = 0u32;

    for chunk in data.chunks(2) {
        let op = chunk[0] % 5;
        let key = chunk.get(1).copied().unwrap_or(0) % 32;
        tick += 1;

        match op {
            0 => {
                assert_eq!(heap.push(key, tick), model.insert(key, tick));
            },
            1 => {
                let expected = model.iter().map(|(_, p)| *p).min();
                match heap.pop() {
                    Some((k, p)) => {
                        assert_eq!(Some(p), expected);
                        assert_eq!(model.remove(&k), Some(p));
                    },
                    None => assert!(model.is_empty()),
                }
            },
            2 => {
                let present = model.contains_key(&key);
                assert_eq!(heap.update(&key, tick), present);
                if present {
                    model.insert(key, tick);
                }
            },
            3 => {
                assert_eq!(heap.remove(&key), model.remove(&key));
            },
            _ => {
                assert_eq!(heap.peek().map(|(_, p)| *p), model.values().min().copied());
            },
        }

        assert_eq!(heap.len(), model.len());
        heap.check_invariants().unwrap();
    }
});
