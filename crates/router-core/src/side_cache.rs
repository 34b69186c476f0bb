// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Short-TTL stash keyed by a local, collision-tolerant digest of message
//! content. Lets the pre-call hook hand metadata to the post-call hook
//! without depending on the host preserving custom fields through the
//! upstream call.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use router_config::SIDE_CACHE_TTL_SECS;

const KEY_PREFIX_CHARS: usize = 16;

/// Derive the stash key from the first `prefix_chars` characters of `text`.
pub fn key_from_prefix(text: &str, prefix_chars: usize) -> String {
    let prefix: String = text.chars().take(prefix_chars).collect();
    let digest = format!("{:x}", md5::compute(prefix.as_bytes()));
    digest[..KEY_PREFIX_CHARS].to_string()
}

struct Entry<T> {
    value: T,
    inserted_at: SystemTime,
}

pub struct SideCache<T: Clone> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> SideCache<T> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn stash(&self, key: String, value: T) {
        self.entries.write().unwrap().insert(
            key,
            Entry {
                value,
                inserted_at: SystemTime::now(),
            },
        );
    }

    pub fn take(&self, key: &str) -> Option<T> {
        let mut guard = self.entries.write().unwrap();
        match guard.get(key) {
            Some(entry)
                if entry
                    .inserted_at
                    .elapsed()
                    .map(|age| age <= self.ttl)
                    .unwrap_or(true) =>
            {
                Some(guard.remove(key).unwrap().value)
            }
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }
}

impl<T: Clone> Default for SideCache<T> {
    fn default() -> Self {
        Self::new(SIDE_CACHE_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_prefix_ignores_content_beyond_prefix() {
        let a = "hello world".to_string() + &"x".repeat(500);
        let b = "hello world".to_string() + &"y".repeat(500);
        assert_eq!(key_from_prefix(&a, 11), key_from_prefix(&b, 11));
    }

    #[test]
    fn stash_then_take_round_trips_and_consumes() {
        let cache: SideCache<String> = SideCache::new(300);
        cache.stash("k".into(), "metadata-blob".to_string());
        assert_eq!(cache.take("k"), Some("metadata-blob".to_string()));
        assert_eq!(cache.take("k"), None);
    }

    #[test]
    fn take_expired_entry_returns_none() {
        let cache: SideCache<String> = SideCache::new(0);
        cache.stash("k".into(), "val".to_string());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.take("k"), None);
    }
}
