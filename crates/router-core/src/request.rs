// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Core entity types shared across the pipeline: the in-flight request, its
//! resolved repository scope, and the closed set of complexity tiers.

use std::collections::HashMap;

use router_model::{Message, Role};
use serde::{Deserialize, Serialize};

/// `SIMPLE | MODERATE | COMPLEX`, mapped to a concrete model name only at
/// the final rewrite step so caching/policy layers stay model-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityTier {
    pub fn parse_exact(s: &str) -> Option<Self> {
        match s.trim() {
            "SIMPLE" => Some(ComplexityTier::Simple),
            "MODERATE" => Some(ComplexityTier::Moderate),
            "COMPLEX" => Some(ComplexityTier::Complex),
            _ => None,
        }
    }

    /// First exact occurrence of a tier token anywhere in `text`.
    pub fn find_in(text: &str) -> Option<Self> {
        for (token, tier) in [
            ("COMPLEX", ComplexityTier::Complex),
            ("MODERATE", ComplexityTier::Moderate),
            ("SIMPLE", ComplexityTier::Simple),
        ] {
            if text.contains(token) {
                return Some(tier);
            }
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "SIMPLE",
            ComplexityTier::Moderate => "MODERATE",
            ComplexityTier::Complex => "COMPLEX",
        }
    }
}

/// Maps tiers to the concrete upstream model identifiers. The classifier
/// model is always the `cheap` tier's model.
#[derive(Debug, Clone)]
pub struct ModelTiers {
    pub cheap: String,
    pub mid: String,
    pub expensive: String,
}

impl ModelTiers {
    pub fn resolve(&self, tier: ComplexityTier) -> &str {
        match tier {
            ComplexityTier::Simple => &self.cheap,
            ComplexityTier::Moderate => &self.mid,
            ComplexityTier::Complex => &self.expensive,
        }
    }
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            cheap: "claude-haiku".to_string(),
            mid: "claude-sonnet".to_string(),
            expensive: "claude-opus".to_string(),
        }
    }
}

/// `{repo, repo_root}` resolved once per request. A request is "scoped"
/// only when both fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub repo: String,
    pub repo_root: String,
}

impl RepoContext {
    pub fn is_scoped(&self) -> bool {
        !self.repo.is_empty() && !self.repo_root.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub repo_root: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    /// Catch-all for fields the pipeline writes back (build_id, tier, etc).
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl RequestMetadata {
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.to_string(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Completion,
    Acompletion,
    AnthropicMessages,
    #[serde(other)]
    Other,
}

/// A synthetic chat-completion-shaped response the pipeline can attach to
/// short-circuit a request without calling upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticResponse {
    pub content: String,
    pub finish_reason: String,
}

impl SyntheticResponse {
    pub fn new(content: impl Into<String>, finish_reason: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: finish_reason.into(),
        }
    }
}

/// The in-flight request as it travels through the pipeline. Mirrors the
/// wire shape closely; `model`, `messages`, `system`, and `metadata` are the
/// fields the pipeline is permitted to mutate.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: String,
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub metadata: RequestMetadata,
    pub headers: HashMap<String, String>,
    pub call_type: CallType,
    pub synthetic_response: Option<SyntheticResponse>,
    pub skip_upstream: bool,
}

impl Request {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            metadata: RequestMetadata::default(),
            headers: HashMap::new(),
            call_type: CallType::Completion,
            synthetic_response: None,
            skip_upstream: false,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name)
            .map(|(_, v)| v.as_str())
    }

    /// The last `role=user` message's content, or empty string if none.
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    pub fn attach_synthetic(&mut self, response: SyntheticResponse) {
        self.synthetic_response = Some(response);
        self.skip_upstream = true;
    }
}
