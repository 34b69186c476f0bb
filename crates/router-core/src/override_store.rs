// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Session-bound forced classification that bypasses the classifier until
//! its TTL expires or it is explicitly cancelled.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use crate::request::ComplexityTier;

#[derive(Debug, Clone)]
pub struct Override {
    pub complexity: ComplexityTier,
    pub ttl_minutes: u64,
    pub expires_at: SystemTime,
}

pub struct OverrideStore {
    entries: RwLock<HashMap<String, Override>>,
    max_ttl_minutes: u64,
}

impl OverrideStore {
    pub fn new(max_ttl_minutes: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_ttl_minutes,
        }
    }

    /// Set an override for `session_id`. `ttl_minutes` is clamped to the
    /// store's configured maximum.
    pub fn set(&self, session_id: &str, complexity: ComplexityTier, ttl_minutes: u64) {
        let clamped = ttl_minutes.min(self.max_ttl_minutes);
        let entry = Override {
            complexity,
            ttl_minutes: clamped,
            expires_at: SystemTime::now() + Duration::from_secs(clamped * 60),
        };
        self.entries.write().unwrap().insert(session_id.to_string(), entry);
    }

    pub fn clear(&self, session_id: &str) {
        self.entries.write().unwrap().remove(session_id);
    }

    /// The live override for `session_id`, if any. Lazily purges an expired
    /// entry when encountered.
    pub fn active(&self, session_id: &str) -> Option<Override> {
        let mut guard = self.entries.write().unwrap();
        match guard.get(session_id) {
            Some(entry) if entry.expires_at > SystemTime::now() => Some(entry.clone()),
            Some(_) => {
                guard.remove(session_id);
                None
            }
            None => None,
        }
    }

    pub fn remaining_seconds(&self, session_id: &str) -> Option<u64> {
        let entry = self.active(session_id)?;
        entry
            .expires_at
            .duration_since(SystemTime::now())
            .ok()
            .map(|d| d.as_secs())
    }
}
