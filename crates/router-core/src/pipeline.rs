// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! The pipeline driver: sequences every stage in strict order for the
//! pre-call hook, and reassembles telemetry for the post-call hook.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use router_config::RouterConfig;
use router_model::{ChatClient, Role};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::classification_cache::ClassificationCache;
use crate::classifier::{self, ClassifyOutcome};
use crate::contract::ContractCache;
use crate::guard::{self, ExhaustionRisk};
use crate::override_store::OverrideStore;
use crate::policy;
use crate::registry::RepoRegistry;
use crate::request::{ModelTiers, Request, SyntheticResponse};
use crate::session_store::{extract_session_id, SessionStore};
use crate::side_cache::{key_from_prefix, SideCache};
use crate::telemetry::{assemble_metadata, CapturedSpan, Metadata, MetadataBundleInput, TelemetrySink, Usage};

const SIDE_CACHE_KEY_PREFIX_CHARS: usize = 200;

fn build_id() -> String {
    let digest = Sha256::digest(
        format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).as_bytes(),
    );
    format!("{digest:x}")[..12].to_string()
}

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Everything the pipeline needs, threaded through explicitly rather than
/// held as module-level globals. Tests construct a fresh instance per case.
pub struct PipelineState {
    pub config: RouterConfig,
    pub tiers: ModelTiers,
    pub registry: RepoRegistry,
    pub sessions: SessionStore,
    pub overrides: OverrideStore,
    pub classification_cache: ClassificationCache,
    pub contracts: ContractCache,
    pub side_cache: SideCache<Metadata>,
    pub classifier_client: Arc<dyn ChatClient>,
    pub telemetry: Arc<dyn TelemetrySink>,
    build_id: String,
}

impl PipelineState {
    pub fn new(
        config: RouterConfig,
        tiers: ModelTiers,
        classifier_client: Arc<dyn ChatClient>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let sessions = SessionStore::new(
            config.session_dir.clone(),
            config.repo_session_ttl_secs,
            config.session_ttl_secs,
        );
        let overrides = OverrideStore::new(config.override_max_ttl_minutes);
        let classification_cache = ClassificationCache::default();
        Self {
            config,
            tiers,
            registry: RepoRegistry::new(),
            sessions,
            overrides,
            classification_cache,
            contracts: ContractCache::new(),
            side_cache: SideCache::default(),
            classifier_client,
            telemetry,
            build_id: build_id(),
        }
    }

    /// Run every pre-call stage on `req` in order. After this returns, the
    /// caller checks `req.skip_upstream`: if set, forward
    /// `req.synthetic_response` to the client instead of calling upstream.
    pub async fn pre_call(&self, req: &mut Request) {
        // Stage 1
        if req.metadata.request_id.is_none() {
            req.metadata.request_id = Some(new_request_id());
        }
        req.metadata.set("build_id", self.build_id.clone());

        // Stage 2
        let repo_ctx = crate::repo_context::resolve(req, &self.registry, &self.sessions);

        // Stage 3: classifier recursion break. Checked first, above every
        // other stage, via a positive metadata tag rather than any
        // heuristic on model name or URL.
        if req.metadata.request_type.as_deref() == Some("classification") {
            return;
        }

        // Stage 4: bootstrap short-circuit.
        if req.metadata.request_type.as_deref() == Some("repo_bootstrap") {
            req.attach_synthetic(SyntheticResponse::new(
                format!("Repository context registered for {}.", repo_ctx.repo),
                "stop",
            ));
            return;
        }

        // Stage 5: context-exhaustion guard.
        let guard_outcome = guard::run(req, &self.config);
        if guard_outcome.exhaustion_risk == ExhaustionRisk::Fatal {
            req.metadata.set("exhaustion_risk", "fatal");
            req.attach_synthetic(SyntheticResponse::new(
                "This request exceeds proxy capacity even after automatic trimming; please summarize earlier files.",
                "context_exhaustion",
            ));
            return;
        }

        let session_id = req.metadata.user_id.as_deref().and_then(extract_session_id);

        let ledger_applies = self.config.ledger_applies_to(&repo_ctx.repo);
        let ledger_reminder_active = ledger_applies && guard_outcome.warrants_ledger_reminder();
        if ledger_reminder_active {
            req.metadata.set("ledger_alert", "context_guard");
        }

        let mut contract_hash = "none".to_string();

        // Stage 6 + 7: policy enforcement, scoped requests only.
        if repo_ctx.is_scoped() {
            let contract = self
                .contracts
                .get_or_load(std::path::Path::new(&repo_ctx.repo_root));
            contract_hash = contract.hash.clone();

            if let Some(violation) = policy::detect_violation(req.last_user_message()) {
                req.metadata.set("policy_enforced", true);
                req.attach_synthetic(SyntheticResponse::new(
                    format!(
                        "Request refused: {} (policy contract {}).",
                        violation.reason, contract.hash
                    ),
                    "policy_violation",
                ));
                return;
            }

            let ledger_reminder = if ledger_reminder_active {
                Some("Context guard intervened on this request; please summarize progress so far before continuing.")
            } else {
                None
            };
            let enforcement = policy::enforcement_message(&contract, ledger_reminder);
            req.system = Some(match req.system.take() {
                Some(existing) if !existing.is_empty() => {
                    format!("{enforcement}\n\n---\n\n{existing}")
                }
                _ => enforcement,
            });
            req.messages.retain(|m| !matches!(m.role, Role::System));
            req.metadata.set("policy_enforced", true);
        }

        // Stage 8: classification + model rewrite.
        let original_model = req.model.clone();
        let classify_outcome: ClassifyOutcome = classifier::classify(
            req.last_user_message(),
            session_id.as_deref(),
            &self.overrides,
            &self.classification_cache,
            self.config.override_default_ttl_minutes,
            self.config.override_max_ttl_minutes,
            self.classifier_client.as_ref(),
            &self.tiers.cheap,
        )
        .await;

        req.model = self.tiers.resolve(classify_outcome.tier).to_string();

        // Stage 9: metadata bundle + side-cache stash.
        let override_remaining = session_id
            .as_deref()
            .and_then(|sid| self.overrides.remaining_seconds(sid));

        let bundle = MetadataBundleInput {
            environment: if repo_ctx.is_scoped() {
                repo_ctx.repo.clone()
            } else {
                "unscoped".to_string()
            },
            complexity_classification: Some(classify_outcome.tier.as_str().to_string()),
            original_model_requested: original_model,
            routed_to_model: req.model.clone(),
            router: "complexity-router".to_string(),
            prompt_length: req.last_user_message().len(),
            repo: repo_ctx.is_scoped().then(|| repo_ctx.repo.clone()),
            repo_root: repo_ctx.is_scoped().then(|| repo_ctx.repo_root.clone()),
            gen_ai_system: "anthropic".to_string(),
            gen_ai_operation: "chat".to_string(),
            contract_hash,
            exhaustion_risk: guard_outcome.exhaustion_risk.as_str().to_string(),
            policy_enforced: repo_ctx.is_scoped(),
            request_id: req.metadata.request_id.clone().unwrap_or_default(),
            ledger_alert: ledger_reminder_active.then(|| "context_guard".to_string()),
            ledger_reminder_active,
            complexity_override_active: classify_outcome.override_applied,
            complexity_override_remaining_seconds: override_remaining,
        };
        let metadata = assemble_metadata(&bundle);

        let key = key_from_prefix(req.last_user_message(), SIDE_CACHE_KEY_PREFIX_CHARS);
        self.side_cache.stash(key, metadata);
    }

    /// Recompute the side-cache key from the same extraction rule, retrieve
    /// the stashed metadata, and emit one telemetry span.
    pub fn post_call(
        &self,
        last_user_message: &str,
        response_text: &str,
        input_tokens: u32,
        output_tokens: u32,
        total_tokens: Option<u32>,
        start: SystemTime,
    ) {
        let key = key_from_prefix(last_user_message, SIDE_CACHE_KEY_PREFIX_CHARS);
        let Some(metadata) = self.side_cache.take(&key) else {
            return;
        };

        let latency_ms = start
            .elapsed()
            .unwrap_or_default()
            .as_millis()
            .min(u128::from(u64::MAX)) as u64;

        let usage = Usage {
            input_tokens,
            output_tokens,
            total_tokens: total_tokens.unwrap_or(input_tokens + output_tokens),
        };

        let span = CapturedSpan::new(metadata, usage, latency_ms, last_user_message, response_text);
        self.telemetry.emit_span(&span);
    }
}

/// Current unix time in milliseconds — used only where callers need a
/// plain timestamp rather than a `SystemTime` to diff against.
pub fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_model::{Message, MockChatClient, ScriptedChatClient};
    use crate::request::ComplexityTier;
    use crate::telemetry::NoopSink;

    fn state_with_classifier(client: Arc<dyn ChatClient>) -> PipelineState {
        PipelineState::new(
            RouterConfig::default(),
            ModelTiers::default(),
            client,
            Arc::new(NoopSink),
        )
    }

    fn mock_state() -> PipelineState {
        state_with_classifier(Arc::new(MockChatClient))
    }

    fn mock_state_with_config(config: RouterConfig) -> PipelineState {
        PipelineState::new(config, ModelTiers::default(), Arc::new(MockChatClient), Arc::new(NoopSink))
    }

    #[tokio::test]
    async fn unscoped_trivial_request_routes_to_cheap_tier() {
        let state = mock_state();
        let mut req = Request::new("X", vec![Message::user("Hello!")]);
        state.pre_call(&mut req).await;

        assert!(!req.skip_upstream);
        assert_eq!(req.model, state.tiers.cheap);
        let key = key_from_prefix("Hello!", SIDE_CACHE_KEY_PREFIX_CHARS);
        let metadata = state.side_cache.take(&key).unwrap();
        assert_eq!(metadata.get("environment").unwrap(), "unscoped");
    }

    #[tokio::test]
    async fn classifier_recursion_request_passes_through_unchanged() {
        let state = mock_state();
        let mut req = Request::new("classifier-model", vec![Message::user("classify this")]);
        req.metadata.request_type = Some("classification".to_string());
        state.pre_call(&mut req).await;

        assert!(!req.skip_upstream);
        assert_eq!(req.model, "classifier-model");
    }

    #[tokio::test]
    async fn bootstrap_request_registers_without_upstream_call() {
        let state = mock_state();
        let dir = tempfile::tempdir().unwrap();
        let mut req = Request::new("X", vec![Message::user("bootstrap")]);
        req.metadata.request_type = Some("repo_bootstrap".to_string());
        req.metadata.repo = Some("acme".to_string());
        req.metadata.repo_root = Some(dir.path().to_string_lossy().to_string());
        state.pre_call(&mut req).await;

        assert!(req.skip_upstream);
        assert_eq!(req.synthetic_response.unwrap().finish_reason, "stop");
        assert_eq!(
            state.registry.resolve("acme").unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn scoped_override_routes_to_expensive_tier_and_skips_classifier_next_time() {
        let state = mock_state();
        let dir = tempfile::tempdir().unwrap();
        let mut req = Request::new("X", vec![Message::user("use opus for 10 minutes, please review this plan")]);
        req.headers.insert("x-litellm-repo".into(), "acme".into());
        req.headers
            .insert("x-litellm-repo-root".into(), dir.path().to_string_lossy().to_string());
        req.metadata.user_id = Some("account__session_sess-1".to_string());
        state.pre_call(&mut req).await;

        assert_eq!(req.model, state.tiers.expensive);
        let active = state.overrides.active("sess-1").unwrap();
        assert_eq!(active.complexity, ComplexityTier::Complex);
        assert_eq!(active.ttl_minutes, 10);

        let mut req2 = Request::new("X", vec![Message::user("ok, go ahead")]);
        req2.metadata.user_id = Some("account__session_sess-1".to_string());
        req2.metadata.repo = Some("acme".to_string());
        req2.metadata.repo_root = Some(dir.path().to_string_lossy().to_string());
        state.pre_call(&mut req2).await;
        assert_eq!(req2.model, state.tiers.expensive);
    }

    #[tokio::test]
    async fn documentation_policy_violation_yields_synthetic_refusal() {
        let state = mock_state();
        let dir = tempfile::tempdir().unwrap();
        let mut req = Request::new(
            "claude-x",
            vec![Message::user("please create a new markdown file under docs/design/")],
        );
        req.metadata.repo = Some("acme".to_string());
        req.metadata.repo_root = Some(dir.path().to_string_lossy().to_string());
        state.pre_call(&mut req).await;

        assert!(req.skip_upstream);
        let resp = req.synthetic_response.unwrap();
        assert_eq!(resp.finish_reason, "policy_violation");
        assert_eq!(req.model, "claude-x");
    }

    #[tokio::test]
    async fn scoped_request_strips_in_message_system_entries_and_injects_hash() {
        let state = mock_state();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "be nice").unwrap();
        let mut req = Request::new(
            "claude-x",
            vec![Message::system("old system"), Message::user("what's up")],
        );
        req.metadata.repo = Some("acme".to_string());
        req.metadata.repo_root = Some(dir.path().to_string_lossy().to_string());
        state.pre_call(&mut req).await;

        assert!(!req.messages.iter().any(|m| matches!(m.role, Role::System)));
        let system = req.system.unwrap();
        assert!(!system.is_empty());
        let contract = state.contracts.get_or_load(dir.path());
        assert!(system.contains(&contract.hash));
    }

    #[tokio::test]
    async fn context_trimming_preserves_last_user_message() {
        let state = mock_state();
        let mut messages: Vec<Message> = (0..400)
            .map(|i| Message::user(format!("{i}{}", "x".repeat(996))))
            .collect();
        let last = messages.pop().unwrap();
        messages.push(last.clone());
        let mut req = Request::new("X", messages);
        state.pre_call(&mut req).await;

        assert!(!req.skip_upstream);
        assert_eq!(req.messages.last().unwrap().content, last.content);
    }

    #[tokio::test]
    async fn context_fatal_request_is_refused() {
        let mut config = RouterConfig::default();
        config.context_block_limit = 10_000_000; // don't let per-block suppression eat the content
        let state = mock_state_with_config(config);
        let mut req = Request::new("X", vec![
            Message::user("A".repeat(900_000)),
            Message::user("B".repeat(900_000)),
            Message::user("C".repeat(900_000)),
        ]);
        state.pre_call(&mut req).await;

        assert!(req.skip_upstream);
        assert_eq!(req.synthetic_response.unwrap().finish_reason, "context_exhaustion");
    }

    #[tokio::test]
    async fn classifier_upstream_is_consulted_for_longer_messages() {
        let scripted = Arc::new(ScriptedChatClient::always("MODERATE"));
        let state = state_with_classifier(scripted.clone());
        let mut req = Request::new("X", vec![Message::user(
            "please refactor this module to use the new repository pattern",
        )]);
        state.pre_call(&mut req).await;
        assert_eq!(req.model, state.tiers.mid);
        assert!(scripted.last_request.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn post_call_emits_span_with_required_fields() {
        use std::sync::Mutex;

        struct CapturingSink {
            last: Mutex<Option<CapturedSpan>>,
        }
        impl TelemetrySink for CapturingSink {
            fn emit_span(&self, span: &CapturedSpan) {
                *self.last.lock().unwrap() = Some(span.clone());
            }
        }

        let sink = Arc::new(CapturingSink { last: Mutex::new(None) });
        let state = PipelineState::new(
            RouterConfig::default(),
            ModelTiers::default(),
            Arc::new(MockChatClient),
            sink.clone(),
        );
        let mut req = Request::new("X", vec![Message::user("Hello!")]);
        state.pre_call(&mut req).await;

        state.post_call("Hello!", "hi there", 10, 5, None, SystemTime::now());

        let span = sink.last.lock().unwrap().take().unwrap();
        for field in [
            "request_id",
            "routed_to_model",
            "original_model_requested",
            "complexity_classification",
            "contract_hash",
            "exhaustion_risk",
            "environment",
        ] {
            assert!(span.metadata.contains_key(field), "missing {field}");
        }
    }
}
