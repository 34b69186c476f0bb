// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Policy contract: the composed README + AGENTS text for a repo, and its
//! content hash, cached per `repo-root`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyContract {
    pub readme_text: String,
    pub agents_text: String,
    pub composed_text: String,
    pub hash: String,
}

fn read_optional(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn compose(readme_text: &str, agents_text: &str) -> String {
    format!(
        "# Repository Policy Contract\n\n## README\n\n{readme_text}\n\n## AGENTS\n\n{agents_text}\n"
    )
}

fn contract_hash(composed: &str) -> String {
    let digest = Sha256::digest(composed.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

impl PolicyContract {
    fn load(repo_root: &Path) -> Self {
        let readme_text = read_optional(&repo_root.join("README.md"));
        let agents_text = read_optional(&repo_root.join("AGENTS.md"));
        let composed_text = compose(&readme_text, &agents_text);
        let hash = contract_hash(&composed_text);
        Self {
            readme_text,
            agents_text,
            composed_text,
            hash,
        }
    }
}

#[derive(Default)]
pub struct ContractCache {
    entries: RwLock<HashMap<String, PolicyContract>>,
}

impl ContractCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached contract for `repo_root`, loading and caching it
    /// on first access. Missing README/AGENTS files produce empty strings,
    /// never an error.
    pub fn get_or_load(&self, repo_root: &Path) -> PolicyContract {
        let key = repo_root.to_string_lossy().to_string();
        if let Some(existing) = self.entries.read().unwrap().get(&key) {
            return existing.clone();
        }
        let contract = PolicyContract::load(repo_root);
        self.entries
            .write()
            .unwrap()
            .insert(key, contract.clone());
        contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_produce_empty_strings_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let contract = PolicyContract::load(dir.path());
        assert_eq!(contract.readme_text, "");
        assert_eq!(contract.agents_text, "");
        assert_eq!(contract.hash.len(), 16);
    }

    #[test]
    fn composed_text_embeds_both_files_under_named_headings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "readme body").unwrap();
        std::fs::write(dir.path().join("AGENTS.md"), "agents body").unwrap();
        let contract = PolicyContract::load(dir.path());
        assert!(contract.composed_text.contains("## README"));
        assert!(contract.composed_text.contains("readme body"));
        assert!(contract.composed_text.contains("## AGENTS"));
        assert!(contract.composed_text.contains("agents body"));
    }

    #[test]
    fn hash_is_sixteen_lowercase_hex_chars() {
        let contract = PolicyContract::load(tempfile::tempdir().unwrap().path());
        assert_eq!(contract.hash.len(), 16);
        assert!(contract.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn cache_returns_same_contract_on_second_access() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContractCache::new();
        let first = cache.get_or_load(dir.path());
        std::fs::write(dir.path().join("README.md"), "changed after first load").unwrap();
        let second = cache.get_or_load(dir.path());
        assert_eq!(first, second);
    }
}
