// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Session store: an in-memory map backed by a disk file per session,
//! mapping `session-id -> {repo, repo_root}`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RouterError;
use crate::request::RepoContext;

const SESSION_ID_INFIX: &str = "account__session_";

/// Extract the session id from a `metadata.user_id` value: the suffix
/// following the literal infix `account__session_`.
pub fn extract_session_id(user_id: &str) -> Option<String> {
    let idx = user_id.find(SESSION_ID_INFIX)?;
    let start = idx + SESSION_ID_INFIX.len();
    let suffix = &user_id[start..];
    if suffix.is_empty() {
        None
    } else {
        Some(suffix.to_string())
    }
}

/// Keep only `[A-Za-z0-9_.-]`; reject an empty result.
fn sanitize(session_id: &str) -> Option<String> {
    let filtered: String = session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .collect();
    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskRecord {
    repo: String,
    repo_root: String,
    timestamp: DateTime<Utc>,
}

struct MemoryEntry {
    ctx: RepoContext,
    inserted_at: SystemTime,
}

pub struct SessionStore {
    memory: RwLock<HashMap<String, MemoryEntry>>,
    disk_dir: PathBuf,
    memory_ttl: Duration,
    disk_ttl: Duration,
}

impl SessionStore {
    pub fn new(disk_dir: impl Into<PathBuf>, memory_ttl_secs: u64, disk_ttl_secs: u64) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            disk_dir: disk_dir.into(),
            memory_ttl: Duration::from_secs(memory_ttl_secs),
            disk_ttl: Duration::from_secs(disk_ttl_secs),
        }
    }

    fn disk_path(&self, sanitized: &str) -> PathBuf {
        self.disk_dir.join(format!("{sanitized}.json"))
    }

    /// Resolve `{repo, repo_root}` for a session id, consulting memory then
    /// the disk-backed fallback. Expired disk files are lazily removed.
    pub fn lookup(&self, session_id: &str) -> Option<RepoContext> {
        if let Some(entry) = self.memory.read().unwrap().get(session_id) {
            if entry
                .inserted_at
                .elapsed()
                .map(|age| age <= self.memory_ttl)
                .unwrap_or(true)
            {
                return Some(entry.ctx.clone());
            }
        }

        let sanitized = sanitize(session_id)?;
        let path = self.disk_path(&sanitized);
        let data = std::fs::read_to_string(&path).ok()?;
        let meta = std::fs::metadata(&path).ok()?;
        let mtime = meta.modified().ok()?;
        let expired = mtime.elapsed().map(|age| age > self.disk_ttl).unwrap_or(false);
        if expired {
            let _ = std::fs::remove_file(&path);
            return None;
        }

        let record: DiskRecord = match serde_json::from_str(&data) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %RouterError::SessionStoreIOError(e.to_string()), "malformed disk record");
                return None;
            }
        };
        let ctx = RepoContext {
            repo: record.repo,
            repo_root: record.repo_root,
        };
        self.memory.write().unwrap().insert(
            session_id.to_string(),
            MemoryEntry {
                ctx: ctx.clone(),
                inserted_at: SystemTime::now(),
            },
        );
        Some(ctx)
    }

    /// Write `ctx` to memory and disk. Disk failures are logged and
    /// swallowed; the session remains valid in memory for this process.
    pub fn write_through(&self, session_id: &str, ctx: &RepoContext) {
        self.memory.write().unwrap().insert(
            session_id.to_string(),
            MemoryEntry {
                ctx: ctx.clone(),
                inserted_at: SystemTime::now(),
            },
        );

        let Some(sanitized) = sanitize(session_id) else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(&self.disk_dir) {
            warn!(error = %RouterError::SessionStoreIOError(e.to_string()), "failed to create disk dir");
            return;
        }
        let record = DiskRecord {
            repo: ctx.repo.clone(),
            repo_root: ctx.repo_root.clone(),
            timestamp: Utc::now(),
        };
        let path = self.disk_path(&sanitized);
        match serde_json::to_string(&record) {
            Ok(body) => {
                if let Err(e) = std::fs::write(&path, body) {
                    warn!(
                        error = %RouterError::SessionStoreIOError(e.to_string()),
                        path = %path.display(),
                        "disk write failed"
                    );
                }
            }
            Err(e) => warn!(error = %RouterError::SessionStoreIOError(e.to_string()), "failed to serialize record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_suffix_after_infix() {
        assert_eq!(
            extract_session_id("account__session_abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn returns_none_without_infix() {
        assert_eq!(extract_session_id("plain-user-id"), None);
    }

    #[test]
    fn returns_none_for_empty_suffix() {
        assert_eq!(extract_session_id("account__session_"), None);
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize("abc/../xyz!"), Some("abc..xyz".to_string()));
    }

    #[test]
    fn sanitize_rejects_all_disallowed_input() {
        assert_eq!(sanitize("///!!!"), None);
    }

    #[test]
    fn write_through_then_lookup_round_trips_via_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path(), 3600, 3600);
        let ctx = RepoContext {
            repo: "acme".into(),
            repo_root: "/tmp/acme".into(),
        };
        store.write_through("sess-1", &ctx);
        assert_eq!(store.lookup("sess-1"), Some(ctx));
    }

    #[test]
    fn lookup_falls_back_to_disk_after_memory_miss() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RepoContext {
            repo: "acme".into(),
            repo_root: "/tmp/acme".into(),
        };
        {
            let store = SessionStore::new(dir.path(), 3600, 3600);
            store.write_through("sess-2", &ctx);
        }
        let fresh_store = SessionStore::new(dir.path(), 3600, 3600);
        assert_eq!(fresh_store.lookup("sess-2"), Some(ctx));
    }

    #[test]
    fn lookup_expired_disk_file_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RepoContext {
            repo: "acme".into(),
            repo_root: "/tmp/acme".into(),
        };
        let store = SessionStore::new(dir.path(), 0, 0);
        store.write_through("sess-3", &ctx);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.lookup("sess-3"), None);
        assert!(!dir.path().join("sess-3.json").exists());
    }

    #[test]
    fn lookup_unknown_session_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path(), 3600, 3600);
        assert_eq!(store.lookup("never-seen"), None);
    }
}
