// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A small TTL cache.
//!
//! Entries expire lazily on access; there is no background sweeper. Values
//! are cloned out, so keep them cheap (strings, small options). Negative
//! results are cached the same as positive ones, which is exactly what the
//! profile-picture cache needs.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::time::Instant;

pub struct TtlCache<V> {
    ttl: Duration,
    entries: StdMutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: StdMutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), (Instant::now(), value));
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", "v".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn negative_values_are_cached_too() {
        let cache: TtlCache<Option<String>> = TtlCache::new(Duration::from_secs(60));
        cache.insert("no-picture", None);
        // A cached `None` is distinguishable from a cache miss.
        assert_eq!(cache.get("no-picture"), Some(None));
        assert_eq!(cache.get("never-seen"), None);
    }
}
