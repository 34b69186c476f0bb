// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! The upstream chat-completion client the pipeline calls at two points:
//! once (cheaply, with a tiny prompt) to classify complexity, and once
//! (with the full, possibly-rewritten request) to serve the actual call.
//!
//! Streaming-response rewriting is out of scope here — the client always
//! returns a complete [`ChatCompletionResponse`].

use async_trait::async_trait;

use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, req: ChatCompletionRequest) -> anyhow::Result<ChatCompletionResponse>;
}

/// Real upstream driver speaking the Anthropic messages API.
pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, req: ChatCompletionRequest) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": req.model,
            "messages": req.messages,
            "system": req.system,
            "max_tokens": req.max_tokens.unwrap_or(1024),
            "temperature": req.temperature,
        });

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let value: serde_json::Value = resp.json().await?;
        parse_anthropic_response(&value, &req.model)
    }
}

fn parse_anthropic_response(
    value: &serde_json::Value,
    requested_model: &str,
) -> anyhow::Result<ChatCompletionResponse> {
    let content = value
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let model = value
        .get("model")
        .and_then(|m| m.as_str())
        .unwrap_or(requested_model)
        .to_string();

    let finish_reason = value
        .get("stop_reason")
        .and_then(|s| s.as_str())
        .unwrap_or("stop")
        .to_string();

    let usage = value
        .get("usage")
        .map(|u| crate::types::Usage {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
            output_tokens: u
                .get("output_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
        })
        .unwrap_or_default();

    Ok(ChatCompletionResponse {
        content,
        model,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_blocks_and_usage() {
        let value = serde_json::json!({
            "model": "claude-3-opus",
            "stop_reason": "end_turn",
            "content": [{"type": "text", "text": "hi there"}],
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });
        let resp = parse_anthropic_response(&value, "claude-3-opus").unwrap();
        assert_eq!(resp.content, "hi there");
        assert_eq!(resp.model, "claude-3-opus");
        assert_eq!(resp.finish_reason, "end_turn");
        assert_eq!(resp.usage.input_tokens, 12);
        assert_eq!(resp.usage.output_tokens, 4);
    }

    #[test]
    fn falls_back_to_requested_model_when_absent() {
        let value = serde_json::json!({"content": []});
        let resp = parse_anthropic_response(&value, "fallback-model").unwrap();
        assert_eq!(resp.model, "fallback-model");
        assert_eq!(resp.finish_reason, "stop");
        assert_eq!(resp.content, "");
    }
}
