// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

fn default_capture_dir() -> String {
    "/tmp/litellm_requests".to_string()
}

fn default_session_dir() -> String {
    "/tmp/claude_sessions".to_string()
}

fn default_repo_session_ttl() -> u64 {
    7200
}

fn default_session_ttl() -> u64 {
    10800
}

fn default_override_default_ttl() -> u64 {
    5
}

fn default_override_max_ttl() -> u64 {
    60
}

fn default_context_soft_limit() -> usize {
    180_000
}

fn default_context_hard_limit() -> usize {
    200_000
}

fn default_context_block_limit() -> usize {
    12_000
}

fn default_context_dup_min() -> usize {
    800
}

fn default_enforcement_overhead() -> usize {
    400
}

fn default_ledger_repos() -> Vec<String> {
    vec!["*".to_string()]
}

/// Ambient configuration for the routing proxy, read entirely from the
/// environment. There is no config file layer here — every field maps
/// directly onto one `LITELLM_*` variable, so the core can be embedded in a
/// host process without bringing a config-file format along with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// `LITELLM_CAPTURE_REQUESTS` — enable on-disk request snapshotting.
    #[serde(default)]
    pub capture_requests: bool,
    /// `LITELLM_CAPTURE_DIR`
    #[serde(default = "default_capture_dir")]
    pub capture_dir: String,
    /// `LITELLM_REPO_SESSION_TTL` — in-memory repo-context session TTL, seconds.
    #[serde(default = "default_repo_session_ttl")]
    pub repo_session_ttl_secs: u64,
    /// `LITELLM_SESSION_DIR`
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
    /// `LITELLM_SESSION_TTL` — on-disk session TTL, seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// `LITELLM_OVERRIDE_DEFAULT_TTL` — minutes.
    #[serde(default = "default_override_default_ttl")]
    pub override_default_ttl_minutes: u64,
    /// `LITELLM_OVERRIDE_MAX_TTL` — minutes.
    #[serde(default = "default_override_max_ttl")]
    pub override_max_ttl_minutes: u64,
    /// `LITELLM_CONTEXT_SOFT_LIMIT` — estimated tokens.
    #[serde(default = "default_context_soft_limit")]
    pub context_soft_limit: usize,
    /// `LITELLM_CONTEXT_HARD_LIMIT` — estimated tokens.
    #[serde(default = "default_context_hard_limit")]
    pub context_hard_limit: usize,
    /// `LITELLM_CONTEXT_BLOCK_LIMIT` — per-block estimated tokens.
    #[serde(default = "default_context_block_limit")]
    pub context_block_limit: usize,
    /// `LITELLM_CONTEXT_DUP_MIN` — minimum estimated tokens before a block
    /// is considered for duplicate detection.
    #[serde(default = "default_context_dup_min")]
    pub context_dup_min: usize,
    /// `LITELLM_ENFORCEMENT_OVERHEAD` — reserved tokens for the injected
    /// enforcement system message, added to the context estimate.
    #[serde(default = "default_enforcement_overhead")]
    pub enforcement_overhead: usize,
    /// `LITELLM_LEDGER_REPOS` — comma-separated repo names, or `*` for all.
    #[serde(default = "default_ledger_repos")]
    pub ledger_repos: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            capture_requests: false,
            capture_dir: default_capture_dir(),
            repo_session_ttl_secs: default_repo_session_ttl(),
            session_dir: default_session_dir(),
            session_ttl_secs: default_session_ttl(),
            override_default_ttl_minutes: default_override_default_ttl(),
            override_max_ttl_minutes: default_override_max_ttl(),
            context_soft_limit: default_context_soft_limit(),
            context_hard_limit: default_context_hard_limit(),
            context_block_limit: default_context_block_limit(),
            context_dup_min: default_context_dup_min(),
            enforcement_overhead: default_enforcement_overhead(),
            ledger_repos: default_ledger_repos(),
        }
    }
}

impl RouterConfig {
    /// A repo is subject to ledger-alert enforcement if `LITELLM_LEDGER_REPOS`
    /// is `*` or names it explicitly.
    pub fn ledger_applies_to(&self, repo: &str) -> bool {
        self.ledger_repos.iter().any(|r| r == "*" || r == repo)
    }
}

/// Fixed cache bounds that the original system treats as constants rather
/// than environment-tunable knobs.
pub const MAX_CLASSIFICATION_CACHE_SIZE: usize = 1000;
pub const CLASSIFICATION_CACHE_TTL_SECS: u64 = 3600;
pub const CAPTURE_DEDUP_HISTORY_MAX: usize = 2048;
pub const SIDE_CACHE_TTL_SECS: u64 = 300;
