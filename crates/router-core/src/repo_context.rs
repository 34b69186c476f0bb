// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Resolves `{repo, repo_root}` for a request by strict precedence:
//! headers, then request metadata, then the `CLAUDE_METADATA` env var, then
//! a system-prompt marker, then a session-store lookup.

use std::path::Path;

use tracing::warn;

use crate::registry::RepoRegistry;
use crate::request::{RepoContext, Request};
use crate::session_store::{extract_session_id, SessionStore};

const CONTEXT_MARKER_PREFIX: &str = "<!-- LITELLM_CONTEXT";

/// `"<repo>::<real-token>"` decoding for the bearer token. Returns the
/// candidate repo name (if any) and the token the outgoing header should
/// actually carry.
fn decode_authorization(raw: &str) -> (Option<String>, String) {
    let Some((scheme, token)) = raw.split_once(' ') else {
        return (None, raw.to_string());
    };
    match token.split_once("::") {
        Some((repo, real_token)) => (
            Some(repo.to_string()),
            format!("{scheme} {real_token}"),
        ),
        None => (None, raw.to_string()),
    }
}

fn parse_context_marker(system: &str) -> (Option<String>, Option<String>) {
    let Some(start) = system.find(CONTEXT_MARKER_PREFIX) else {
        return (None, None);
    };
    let rest = &system[start..];
    let end = rest.find("-->").unwrap_or(rest.len());
    let marker = &rest[..end];

    let repo = extract_marker_field(marker, "repo=");
    let repo_root = extract_marker_field(marker, "repo_root=");
    (repo, repo_root)
}

fn extract_marker_field(marker: &str, key: &str) -> Option<String> {
    let idx = marker.find(key)?;
    let rest = &marker[idx + key.len()..];
    let value: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_claude_metadata_env() -> (Option<String>, Option<String>) {
    let Ok(raw) = std::env::var("CLAUDE_METADATA") else {
        return (None, None);
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return (None, None);
    };
    let repo = value.get("repo").and_then(|v| v.as_str()).map(str::to_string);
    let repo_root = value
        .get("repo_root")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    (repo, repo_root)
}

/// Resolve repo context for `req`, mutating its `Authorization` header in
/// place when it carries a smuggled repo prefix, and writing through to the
/// registry/session store once both fields are known.
pub fn resolve(
    req: &mut Request,
    registry: &RepoRegistry,
    sessions: &SessionStore,
) -> RepoContext {
    let mut repo: Option<String> = None;
    let mut repo_root: Option<String> = None;

    let mut auth_repo = None;
    if let Some(auth) = req.header("authorization").map(str::to_string) {
        let (candidate_repo, rewritten) = decode_authorization(&auth);
        auth_repo = candidate_repo;
        if let Some((key, _)) = req
            .headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == "authorization")
            .map(|(k, v)| (k.clone(), v.clone()))
        {
            req.headers.insert(key, rewritten);
        }
    }

    if let Some(v) = req.header("x-litellm-repo") {
        repo = Some(v.to_string());
    }
    if repo.is_none() {
        repo = auth_repo;
    }
    if let Some(v) = req.header("x-litellm-repo-root") {
        repo_root = Some(v.to_string());
    }

    if repo.is_none() {
        repo = req.metadata.repo.clone();
    }
    if repo_root.is_none() {
        repo_root = req.metadata.repo_root.clone();
    }

    if repo.is_none() || repo_root.is_none() {
        let (env_repo, env_root) = parse_claude_metadata_env();
        repo = repo.or(env_repo);
        repo_root = repo_root.or(env_root);
    }

    if repo.is_none() || repo_root.is_none() {
        if let Some(system) = &req.system {
            let (marker_repo, marker_root) = parse_context_marker(system);
            repo = repo.or(marker_repo);
            repo_root = repo_root.or(marker_root);
        }
    }

    let session_id = req
        .metadata
        .user_id
        .as_deref()
        .and_then(extract_session_id);

    if repo.is_none() || repo_root.is_none() {
        if let Some(sid) = &session_id {
            if let Some(ctx) = sessions.lookup(sid) {
                repo = repo.or(Some(ctx.repo));
                repo_root = repo_root.or(Some(ctx.repo_root));
            }
        }
    }

    let context = RepoContext {
        repo: repo.unwrap_or_default(),
        repo_root: repo_root.unwrap_or_default(),
    };

    if context.is_scoped() {
        if let Err(e) = registry.register(&context.repo, Path::new(&context.repo_root)) {
            warn!(error = %e, repo = %context.repo, "repo registry: implicit registration failed");
        }
        if let Some(sid) = &session_id {
            sessions.write_through(sid, &context);
        }
    }

    context
}
