// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Wire types for the single Anthropic-compatible chat-completion endpoint
//! this proxy fronts.
//!
//! Inbound messages may carry `content` as either a plain string or a list
//! of content blocks (the Anthropic content-block shape). Everything past
//! the pipeline's entry stage works with [`Message`], whose `content` is
//! already a flat string — nothing downstream branches on content shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Content as it arrives on the wire, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Blocks(Vec<serde_json::Value>),
}

impl RawContent {
    /// Flatten to a single string. Text blocks are joined with newlines;
    /// tool-result blocks contribute their own nested text/content.
    pub fn flatten(&self) -> String {
        match self {
            RawContent::Text(s) => s.clone(),
            RawContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(extract_block_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn extract_block_text(block: &serde_json::Value) -> Option<String> {
    if let Some(s) = block.get("text").and_then(|v| v.as_str()) {
        return Some(s.to_string());
    }
    match block.get("content") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let joined: Vec<String> = items.iter().filter_map(extract_block_text).collect();
            if joined.is_empty() {
                None
            } else {
                Some(joined.join("\n"))
            }
        }
        _ => None,
    }
}

/// A message exactly as it arrived on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: Role,
    pub content: RawContent,
}

/// The canonical, post-normalization message shape. `content` is always a
/// flat string by the time code outside the entry stage ever sees one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn from_raw(raw: &RawMessage) -> Self {
        Self {
            role: raw.role,
            content: raw.content.flatten(),
        }
    }
}

/// A request bound for the upstream chat-completion endpoint. Mirrors the
/// inbound request shape closely enough to round-trip fields the proxy
/// doesn't otherwise touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: None,
            temperature: None,
            metadata: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_plain_text() {
        let c = RawContent::Text("hello".into());
        assert_eq!(c.flatten(), "hello");
    }

    #[test]
    fn flatten_text_blocks_joined_with_newline() {
        let c = RawContent::Blocks(vec![
            serde_json::json!({"type": "text", "text": "first"}),
            serde_json::json!({"type": "text", "text": "second"}),
        ]);
        assert_eq!(c.flatten(), "first\nsecond");
    }

    #[test]
    fn flatten_tool_result_string_content() {
        let c = RawContent::Blocks(vec![
            serde_json::json!({"type": "tool_result", "content": "ok"}),
        ]);
        assert_eq!(c.flatten(), "ok");
    }

    #[test]
    fn flatten_tool_result_nested_array_content() {
        let c = RawContent::Blocks(vec![serde_json::json!({
            "type": "tool_result",
            "content": [{"type": "text", "text": "nested"}]
        })]);
        assert_eq!(c.flatten(), "nested");
    }

    #[test]
    fn flatten_block_with_no_extractable_text_is_dropped() {
        let c = RawContent::Blocks(vec![serde_json::json!({"type": "image"})]);
        assert_eq!(c.flatten(), "");
    }

    #[test]
    fn message_from_raw_normalizes_blocks() {
        let raw = RawMessage {
            role: Role::User,
            content: RawContent::Blocks(vec![serde_json::json!({"type": "text", "text": "hi"})]),
        };
        let m = Message::from_raw(&raw);
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "hi");
    }

    #[test]
    fn role_round_trips_through_json() {
        let v = serde_json::to_value(Role::Assistant).unwrap();
        assert_eq!(v, serde_json::json!("assistant"));
        let r: Role = serde_json::from_value(v).unwrap();
        assert_eq!(r, Role::Assistant);
    }
}
