use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Time source for expiring caches, so expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Map whose entries expire `ttl` after they were written.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, (V, Instant)>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Live value for `key`. An expired entry is dropped on read.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some((value, written)) if now.duration_since(*written) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|_, (_, written)| now.duration_since(*written) < self.ttl);
        entries.insert(key, (value, now));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries().remove(key).map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.insert("paris", Some("https://img/paris.jpg".to_string()));
        clock.advance(Duration::from_secs(59));
        assert_eq!(
            cache.get(&"paris"),
            Some(Some("https://img/paris.jpg".to_string()))
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"paris"), None);
    }

    #[test]
    fn test_misses_are_cached_too() {
        let cache: TtlCache<&str, Option<String>> = TtlCache::new(Duration::from_secs(60));
        cache.insert("nowhere", None);
        assert_eq!(cache.get(&"nowhere"), Some(None));
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "one");
        assert_eq!(cache.remove(&1), Some("one"));
        assert_eq!(cache.get(&1), None);
    }
}
