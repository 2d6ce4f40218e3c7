use shardcache::CacheBuilder;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn main() {
    let cache = Arc::new(
        CacheBuilder::new()
            .ttl(Duration::from_secs(60))
            .build(|user: &u32| Ok::<_, String>(format!("user:{user}"))),
    );
    let lookups = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let lookups = Arc::clone(&lookups);
            thread::spawn(move || {
                cache.get(&42, |user| {
                    lookups.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(format!("profile of {user}"))
                })
            })
        })
        .collect();

    for handle in handles {
        if let Ok(Ok(profile)) = handle.join() {
            println!("{profile}");
        }
    }
    println!("backend lookups: {}", lookups.load(Ordering::SeqCst));
}

// Expected output:
// profile of 42   (ten times)
// backend lookups: 1
//
// Explanation: the first thread to miss installs a pending promise and runs
// the getter; the other nine find the promise and block on it.
