// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Bounded TTL cache: `md5(prompt-prefix) -> complexity`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use router_config::{CLASSIFICATION_CACHE_TTL_SECS, MAX_CLASSIFICATION_CACHE_SIZE};

use crate::request::ComplexityTier;

const PROMPT_PREFIX_CHARS: usize = 500;

/// Digest used as the cache key: md5 of the first 500 characters of the
/// prompt, hex-encoded.
pub fn cache_key(prompt: &str) -> String {
    let prefix: String = prompt.chars().take(PROMPT_PREFIX_CHARS).collect();
    format!("{:x}", md5::compute(prefix.as_bytes()))
}

struct Entry {
    complexity: ComplexityTier,
    inserted_at: SystemTime,
}

pub struct ClassificationCache {
    entries: RwLock<HashMap<String, Entry>>,
    max_size: usize,
    ttl: Duration,
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(MAX_CLASSIFICATION_CACHE_SIZE, CLASSIFICATION_CACHE_TTL_SECS)
    }
}

impl ClassificationCache {
    pub fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_size,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn get(&self, key: &str) -> Option<ComplexityTier> {
        let mut guard = self.entries.write().unwrap();
        match guard.get(key) {
            Some(entry)
                if entry
                    .inserted_at
                    .elapsed()
                    .map(|age| age <= self.ttl)
                    .unwrap_or(true) =>
            {
                Some(entry.complexity)
            }
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert `complexity` under `key`, evicting the oldest entry first if
    /// the cache is already full.
    pub fn insert(&self, key: String, complexity: ComplexityTier) {
        let mut guard = self.entries.write().unwrap();
        if guard.len() >= self.max_size && !guard.contains_key(&key) {
            if let Some(oldest_key) = guard
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                guard.remove(&oldest_key);
            }
        }
        guard.insert(
            key,
            Entry {
                complexity,
                inserted_at: SystemTime::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
