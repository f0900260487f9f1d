//! Small TTL cache for provider responses.
//!
//! Free-tier market APIs rate-limit aggressively; a short per-process
//! cache keeps repeat queries for the same asset from burning quota.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A thread-safe TTL cache keyed by (namespace, key).
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), (Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let k = (namespace.to_string(), key.to_string());
        match entries.get(&k) {
            Some((expires_at, value)) if Instant::now() < *expires_at => Some(value.clone()),
            Some(_) => {
                entries.remove(&k);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, namespace: &str, key: &str, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        // Keep the map bounded; a sweep on insert is enough at this scale.
        if entries.len() > 1_000 {
            let now = Instant::now();
            entries.retain(|_, (expires_at, _)| now < *expires_at);
        }

        entries.insert(
            (namespace.to_string(), key.to_string()),
            (Instant::now() + self.ttl, value),
        );
    }
}
