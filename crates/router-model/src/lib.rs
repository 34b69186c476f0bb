// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
pub mod client;
pub mod mock;
pub mod types;

pub use client::{ChatClient, HttpChatClient};
pub use mock::{MockChatClient, ScriptedChatClient};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, Message, RawContent, RawMessage, Role, Usage,
};
