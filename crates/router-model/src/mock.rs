// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::ChatClient;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, Usage};

/// Deterministic mock client for tests. Echoes the last user message back
/// as the assistant response.
#[derive(Default)]
pub struct MockChatClient;

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, req: ChatCompletionRequest) -> anyhow::Result<ChatCompletionResponse> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::types::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("[no input]")
            .to_string();

        Ok(ChatCompletionResponse {
            content: format!("MOCK: {reply}"),
            model: req.model,
            finish_reason: "stop".to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 10,
            },
        })
    }
}

/// A pre-scripted mock client. Each call to `complete` pops the next
/// response off the front of the queue, falling back to a fixed notice
/// once the queue is empty. Lets tests pin exact classifier/upstream
/// replies without network access.
pub struct ScriptedChatClient {
    scripts: Arc<Mutex<Vec<String>>>,
    /// The last request seen by this client, for assertions.
    pub last_request: Arc<Mutex<Option<ChatCompletionRequest>>>,
}

impl ScriptedChatClient {
    pub fn new(scripts: Vec<impl Into<String>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().map(Into::into).collect())),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: a client that always returns the same text.
    pub fn always(reply: impl Into<String>) -> Self {
        Self::new(vec![reply.into()])
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, req: ChatCompletionRequest) -> anyhow::Result<ChatCompletionResponse> {
        let model = req.model.clone();
        *self.last_request.lock().unwrap() = Some(req);

        let content = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.len() > 1 {
                scripts.remove(0)
            } else if let Some(last) = scripts.first() {
                last.clone()
            } else {
                "[no more scripts]".to_string()
            }
        };

        Ok(ChatCompletionResponse {
            content,
            model,
            finish_reason: "stop".to_string(),
            usage: Usage {
                input_tokens: 5,
                output_tokens: 5,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn req() -> ChatCompletionRequest {
        ChatCompletionRequest::new("mock-model", vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn mock_echoes_last_user_message() {
        let c = MockChatClient;
        let resp = c.complete(req()).await.unwrap();
        assert_eq!(resp.content, "MOCK: hi");
    }

    #[tokio::test]
    async fn scripted_returns_queued_reply() {
        let c = ScriptedChatClient::always("SIMPLE");
        let resp = c.complete(req()).await.unwrap();
        assert_eq!(resp.content, "SIMPLE");
    }

    #[tokio::test]
    async fn scripted_advances_through_queue() {
        let c = ScriptedChatClient::new(vec!["first", "second"]);
        let r1 = c.complete(req()).await.unwrap();
        let r2 = c.complete(req()).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }

    #[tokio::test]
    async fn scripted_records_last_request() {
        let c = ScriptedChatClient::always("ok");
        let _ = c.complete(req()).await.unwrap();
        let seen = c.last_request.lock().unwrap();
        assert_eq!(seen.as_ref().unwrap().model, "mock-model");
    }
}
