// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Metadata assembly and the post-call telemetry span. Sinks are a
//! polymorphic capability so the pipeline never branches on backend
//! identity; a no-op sink is used when telemetry is disabled.

use std::collections::BTreeMap;

use tracing::{info, warn};

const VALUE_TRUNCATE_CHARS: usize = 200;
const SNIPPET_TRUNCATE_CHARS: usize = 500;

pub type Metadata = BTreeMap<String, String>;

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Accumulates sanitized, truncated string fields. Keys with no value are
/// simply never inserted, matching "null-valued keys are omitted".
#[derive(Default)]
pub struct MetadataBuilder {
    map: Metadata,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.map.insert(key.to_string(), truncate(&value.to_string(), VALUE_TRUNCATE_CHARS));
        self
    }

    pub fn set_opt(&mut self, key: &str, value: Option<impl ToString>) -> &mut Self {
        if let Some(v) = value {
            self.set(key, v);
        }
        self
    }

    pub fn build(self) -> Metadata {
        self.map
    }
}

/// All the fields the pre-call hook assembles and stashes for the
/// post-call hook to recover.
#[derive(Debug, Clone, Default)]
pub struct MetadataBundleInput {
    pub environment: String,
    pub complexity_classification: Option<String>,
    pub original_model_requested: String,
    pub routed_to_model: String,
    pub router: String,
    pub prompt_length: usize,
    pub repo: Option<String>,
    pub repo_root: Option<String>,
    pub gen_ai_system: String,
    pub gen_ai_operation: String,
    /// `"none"` for unscoped requests — always present, per the invariant
    /// that every emitted span names a contract hash.
    pub contract_hash: String,
    pub exhaustion_risk: String,
    pub policy_enforced: bool,
    pub request_id: String,
    pub ledger_alert: Option<String>,
    pub ledger_reminder_active: bool,
    pub complexity_override_active: bool,
    pub complexity_override_remaining_seconds: Option<u64>,
}

pub fn assemble_metadata(input: &MetadataBundleInput) -> Metadata {
    let mut b = MetadataBuilder::new();
    b.set("environment", &input.environment)
        .set_opt("complexity_classification", input.complexity_classification.clone())
        .set("original_model_requested", &input.original_model_requested)
        .set("routed_to_model", &input.routed_to_model)
        .set("router", &input.router)
        .set("prompt_length", input.prompt_length)
        .set_opt("repo", input.repo.clone())
        .set_opt("repo_root", input.repo_root.clone())
        .set("gen_ai_system", &input.gen_ai_system)
        .set("gen_ai_operation", &input.gen_ai_operation)
        .set("contract_hash", &input.contract_hash)
        .set("exhaustion_risk", &input.exhaustion_risk)
        .set("policy_enforced", input.policy_enforced)
        .set("request_id", &input.request_id)
        .set_opt("ledger_alert", input.ledger_alert.clone())
        .set("ledger_reminder_active", input.ledger_reminder_active)
        .set("complexity_override_active", input.complexity_override_active)
        .set_opt(
            "complexity_override_remaining_seconds",
            input.complexity_override_remaining_seconds,
        );
    b.build()
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// The fully-assembled telemetry record emitted after a successful upstream
/// call.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: &'static str,
    pub metadata: Metadata,
    pub usage: Usage,
    pub latency_ms: u64,
    pub prompt_snippet: String,
    pub completion_snippet: String,
}

impl CapturedSpan {
    pub fn new(
        metadata: Metadata,
        usage: Usage,
        latency_ms: u64,
        prompt: &str,
        completion: &str,
    ) -> Self {
        Self {
            name: "litellm.request",
            metadata,
            usage,
            latency_ms,
            prompt_snippet: truncate(prompt, SNIPPET_TRUNCATE_CHARS),
            completion_snippet: truncate(completion, SNIPPET_TRUNCATE_CHARS),
        }
    }
}

/// Polymorphic telemetry capability. The pipeline never branches on which
/// concrete sink is installed.
pub trait TelemetrySink: Send + Sync {
    fn emit_span(&self, span: &CapturedSpan);
}

/// Installed when no backend is configured or its library is absent.
#[derive(Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit_span(&self, _span: &CapturedSpan) {}
}

/// Emits spans through `tracing`, for environments that forward tracing
/// events to an exporter. Errors building the event are swallowed with a
/// warning, per the rule that telemetry never blocks the response.
#[derive(Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit_span(&self, span: &CapturedSpan) {
        if span.metadata.get("request_id").is_none() {
            warn!("telemetry span missing request_id");
        }
        info!(
            span_name = span.name,
            input_tokens = span.usage.input_tokens,
            output_tokens = span.usage.output_tokens,
            total_tokens = span.usage.total_tokens,
            latency_ms = span.latency_ms,
            metadata = ?span.metadata,
            "litellm.request"
        );
    }
}
