// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Process-wide `repo-name -> repo-root` map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Default)]
pub struct RepoRegistry {
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that `path` exists and store the resolved absolute path.
    /// Idempotent: registering the same pair twice is a no-op.
    pub fn register(&self, repo: &str, path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            anyhow::bail!("repo root does not exist: {}", path.display());
        }
        let resolved = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        self.entries
            .write()
            .unwrap()
            .insert(repo.to_string(), resolved);
        Ok(())
    }

    pub fn resolve(&self, repo: &str) -> Option<PathBuf> {
        self.entries.read().unwrap().get(repo).cloned()
    }
}
