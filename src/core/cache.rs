use lru::LruCache;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

fn capacity(requested: usize) -> NonZeroUsize {
    NonZeroUsize::new(requested).unwrap_or(NonZeroUsize::MIN)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // 快取內容在 panic 後仍然一致，直接取回
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Size-bounded LRU map behind a mutex. Concurrent inserts for the same key
/// simply overwrite each other.
pub struct BoundedCache<K: Hash + Eq, V: Clone> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity(max_entries))),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        lock(&self.inner).get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        lock(&self.inner).put(key, value);
    }

    pub fn clear(&self) {
        lock(&self.inner).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memoises an async computation per key with at most one computation in
/// flight for a given key. Callers arriving while it runs wait for the same
/// result. Failed computations are not stored, the next caller retries.
pub struct SingleFlight<K: Hash + Eq, V: Clone> {
    cells: Mutex<LruCache<K, Arc<OnceCell<V>>>>,
}

impl<K: Hash + Eq, V: Clone> SingleFlight<K, V> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cells: Mutex::new(LruCache::new(capacity(max_entries))),
        }
    }

    /// Returns the value and whether this call was the one that computed it.
    pub async fn get_or_try_init<E, F, Fut>(&self, key: K, init: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut cells = lock(&self.cells);
            cells
                .get_or_insert(key, || Arc::new(OnceCell::new()))
                .clone()
        };

        let mut computed = false;
        let value = cell
            .get_or_try_init(|| {
                computed = true;
                init()
            })
            .await?;

        Ok((value.clone(), computed))
    }

    pub fn clear(&self) {
        lock(&self.cells).clear();
    }

    /// Keys with a completed value.
    pub fn settled(&self) -> usize {
        lock(&self.cells)
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_bounded_cache_evicts_least_recently_used() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        cache.insert("c".to_string(), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn test_zero_capacity_still_holds_one_entry() {
        let cache: BoundedCache<u8, u8> = BoundedCache::new(0);
        cache.insert(1, 1);
        assert_eq!(cache.get(&1), Some(1));
    }

    #[tokio::test]
    async fn test_single_flight_runs_once_for_concurrent_callers() {
        let memo: Arc<SingleFlight<String, u32>> = Arc::new(SingleFlight::new(8));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let memo = memo.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                memo.get_or_try_init("key".to_string(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<u32, String>(42)
                })
                .await
            }));
        }

        let mut computed = 0;
        for handle in handles {
            let (value, was_computed) = handle.await.unwrap().unwrap();
            assert_eq!(value, 42);
            if was_computed {
                computed += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(computed, 1);
        assert_eq!(memo.settled(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_does_not_store_failures() {
        let memo: SingleFlight<&'static str, u32> = SingleFlight::new(4);

        let first = memo
            .get_or_try_init("k", || async { Err::<u32, &str>("boom") })
            .await;
        assert!(first.is_err());
        assert_eq!(memo.settled(), 0);

        let (value, computed) = memo
            .get_or_try_init("k", || async { Ok::<u32, &str>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(computed);
    }
}
