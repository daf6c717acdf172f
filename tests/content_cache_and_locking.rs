// tests/content_cache_and_locking.rs
//
// Cross-module checks that don't need network: a cache hit short-circuits
// `fetch()` entirely when the expected hash is already on disk, and two
// tasks contending for the same tool lock serialize rather than racing.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tsuku::cache::ContentCache;
use tsuku::tooltree::ToolLock;

#[tokio::test]
async fn fetch_short_circuits_on_existing_verified_entry() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path().to_path_buf(), reqwest::Client::new());

    let data = b"already have this one";
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hex::encode(hasher.finalize());

    // Seed the cache directly, bypassing the network path entirely.
    cache.put(data, &hash).await.unwrap();

    // A bogus URL would fail if fetch() actually tried to download it;
    // the cache hit must return before any HTTP call happens.
    let path = cache.fetch("http://example.invalid/not-a-real-host", Some(&hash)).await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), data);
}

#[tokio::test]
async fn concurrent_installs_of_the_same_tool_serialize_on_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = Arc::new(dir.path().join("rg").join(".lock"));
    let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for id in 0..4 {
        let lock_path = Arc::clone(&lock_path);
        let order = Arc::clone(&order);
        handles.push(tokio::task::spawn_blocking(move || {
            let _lock = ToolLock::acquire(&lock_path).unwrap();
            // Hold the lock briefly so overlapping acquisitions would be
            // observable if serialization were broken.
            std::thread::sleep(std::time::Duration::from_millis(5));
            order.blocking_lock().push(id);
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let recorded = order.lock().await;
    assert_eq!(recorded.len(), 4);
    let mut sorted = recorded.clone();
    sorted.sort();
    assert_eq!(sorted, vec![0, 1, 2, 3]);
}
