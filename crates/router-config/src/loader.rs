// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
use std::str::FromStr;

use tracing::debug;

use crate::RouterConfig;

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match env_value(key) {
        Some(raw) => match raw.parse() {
            Ok(v) => {
                debug!(key, raw, "resolved env override");
                v
            }
            Err(_) => {
                debug!(key, raw, "failed to parse env override, using default");
                default
            }
        },
        None => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_value(key) {
        Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_repo_list(key: &str, default: Vec<String>) -> Vec<String> {
    match env_value(key) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default,
    }
}

/// Build a [`RouterConfig`] by reading every `LITELLM_*` variable directly
/// from the process environment. Unset or unparseable values fall back to
/// the documented default for that field.
pub fn load() -> RouterConfig {
    let defaults = RouterConfig::default();
    RouterConfig {
        capture_requests: env_bool("LITELLM_CAPTURE_REQUESTS", defaults.capture_requests),
        capture_dir: env_value("LITELLM_CAPTURE_DIR").unwrap_or(defaults.capture_dir),
        repo_session_ttl_secs: env_parsed(
            "LITELLM_REPO_SESSION_TTL",
            defaults.repo_session_ttl_secs,
        ),
        session_dir: env_value("LITELLM_SESSION_DIR").unwrap_or(defaults.session_dir),
        session_ttl_secs: env_parsed("LITELLM_SESSION_TTL", defaults.session_ttl_secs),
        override_default_ttl_minutes: env_parsed(
            "LITELLM_OVERRIDE_DEFAULT_TTL",
            defaults.override_default_ttl_minutes,
        ),
        override_max_ttl_minutes: env_parsed(
            "LITELLM_OVERRIDE_MAX_TTL",
            defaults.override_max_ttl_minutes,
        ),
        context_soft_limit: env_parsed("LITELLM_CONTEXT_SOFT_LIMIT", defaults.context_soft_limit),
        context_hard_limit: env_parsed("LITELLM_CONTEXT_HARD_LIMIT", defaults.context_hard_limit),
        context_block_limit: env_parsed(
            "LITELLM_CONTEXT_BLOCK_LIMIT",
            defaults.context_block_limit,
        ),
        context_dup_min: env_parsed("LITELLM_CONTEXT_DUP_MIN", defaults.context_dup_min),
        enforcement_overhead: env_parsed(
            "LITELLM_ENFORCEMENT_OVERHEAD",
            defaults.enforcement_overhead,
        ),
        ledger_repos: env_repo_list("LITELLM_LEDGER_REPOS", defaults.ledger_repos),
    }
}
