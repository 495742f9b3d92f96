/// Route store contract tests
///
/// Run against the in-memory backend.
/// Run with: cargo test --test route_store_tests
use shard_router::{InMemoryRouteStore, RouteStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

#[tokio::test]
async fn test_load_missing_key_is_not_found() {
    let store = InMemoryRouteStore::new();
    assert_eq!(
        store.load("nope").await,
        Err(StoreError::NotFound { key: "nope".into() })
    );
    assert!(matches!(
        store.load_and_expire("nope", WEEK).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_set_nx_reads_back_the_winner() {
    let store = InMemoryRouteStore::new();

    let first = store.set_nx("k", "a", WEEK).await.unwrap();
    assert!(first.created);
    assert_eq!(first.current, "a");

    let second = store.set_nx("k", "b", WEEK).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.current, "a");
    assert_eq!(store.load("k").await.unwrap(), "a");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_set_nx_has_one_winner() {
    let store = Arc::new(InMemoryRouteStore::new());
    let mut handles = vec![];
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.set_nx("k", &format!("v{}", i), WEEK).await.unwrap()
        }));
    }

    let mut outcomes = vec![];
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
    let stored = store.load("k").await.unwrap();
    assert!(outcomes.iter().all(|o| o.current == stored));
}

#[tokio::test(start_paused = true)]
async fn test_load_and_expire_resets_remaining_ttl() {
    let store = InMemoryRouteStore::new();
    store.set("k", "a", WEEK).await.unwrap();

    tokio::time::advance(Duration::from_secs(3 * 24 * 3600)).await;
    assert_eq!(
        store.ttl("k").await,
        Some(Duration::from_secs(4 * 24 * 3600))
    );

    assert_eq!(store.load_and_expire("k", WEEK).await.unwrap(), "a");
    assert_eq!(store.ttl("k").await, Some(WEEK));
}

#[tokio::test(start_paused = true)]
async fn test_plain_load_does_not_slide_ttl() {
    let store = InMemoryRouteStore::new();
    store.set("k", "a", Duration::from_secs(10)).await.unwrap();
    tokio::time::advance(Duration::from_secs(4)).await;

    store.load("k").await.unwrap();
    assert_eq!(store.ttl("k").await, Some(Duration::from_secs(6)));
}

#[tokio::test(start_paused = true)]
async fn test_expire_gives_a_grace_period() {
    let store = InMemoryRouteStore::new();
    store.set("k", "a", WEEK).await.unwrap();

    store.expire("k", Duration::from_secs(30)).await.unwrap();
    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(store.load("k").await.unwrap(), "a");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(store.load("k").await.is_err());
}

#[tokio::test]
async fn test_del_if_same_only_removes_matching_value() {
    let store = InMemoryRouteStore::new();
    store.set("k", "a", WEEK).await.unwrap();

    assert_eq!(
        store.del_if_same("k", "b").await,
        Err(StoreError::ValueMismatch {
            key: "k".into(),
            expected: "b".into()
        })
    );
    assert_eq!(store.load("k").await.unwrap(), "a");

    store.del_if_same("k", "a").await.unwrap();
    assert!(store.load("k").await.is_err());

    assert!(matches!(
        store.del_if_same("k", "a").await,
        Err(StoreError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_get_set_swaps_and_del_removes() {
    let store = InMemoryRouteStore::new();
    assert_eq!(store.get_set("k", "a", WEEK).await.unwrap(), None);
    assert_eq!(store.get_set("k", "b", WEEK).await.unwrap().as_deref(), Some("a"));

    store.del("k").await.unwrap();
    store.del("k").await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_clones_share_entries() {
    let a = InMemoryRouteStore::new();
    let b = a.clone();
    a.set("k", "x", WEEK).await.unwrap();
    assert_eq!(b.load("k").await.unwrap(), "x");
}
