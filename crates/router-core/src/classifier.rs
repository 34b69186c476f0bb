// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Decides a request's complexity tier: override commands, active
//! overrides, a fast path for short messages, a classification cache, and
//! finally a real upstream call to the cheap-tier model.

use router_model::{ChatClient, ChatCompletionRequest, Message};
use tracing::warn;

use crate::classification_cache::{cache_key, ClassificationCache};
use crate::error::RouterError;
use crate::override_store::OverrideStore;
use crate::request::ComplexityTier;

const FAST_PATH_CHAR_THRESHOLD: usize = 20;
const CLASSIFIER_PROMPT_TRUNCATE_CHARS: usize = 2000;

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are a complexity classifier. Read the user's message and respond with \
exactly one word on the first line: SIMPLE, MODERATE, or COMPLEX. \
SIMPLE: a greeting, a short factual question, or a trivial edit. \
MODERATE: a focused task needing some reasoning or multi-step work. \
COMPLEX: open-ended design, large refactors, or multi-file reasoning. \
Bias toward SIMPLE when unsure. Judge content, not length.";

/// A parsed override command from a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideCommand {
    /// `ttl_minutes` is `None` when the message omitted a duration clause;
    /// the caller applies the default TTL in that case.
    Set { tier: ComplexityTier, ttl_minutes: Option<u64> },
    Cancel,
}

const SET_VERBS: &[&str] = &["use", "switch to", "force", "set"];
const MODEL_NAMES: &[(&str, ComplexityTier)] = &[
    ("opus", ComplexityTier::Complex),
    ("sonnet", ComplexityTier::Moderate),
    ("haiku", ComplexityTier::Simple),
];
const CANCEL_VERBS: &[&str] = &["cancel", "clear", "stop", "remove", "disable", "reset"];
const OVERRIDE_NOUNS: &[&str] = &["override", "routing", "complexity"];

/// Hand-written scanner over `(verb, model-name, optional 'for' + number +
/// unit)` rather than a regex, to keep the accepted grammar explicit.
pub fn parse_override_command(message: &str) -> Option<OverrideCommand> {
    let lower = message.to_lowercase();

    for verb in SET_VERBS {
        if let Some(after_verb) = find_after(&lower, verb) {
            for (name, tier) in MODEL_NAMES {
                if let Some(after_model) = find_after(after_verb, name) {
                    return Some(OverrideCommand::Set {
                        tier: *tier,
                        ttl_minutes: parse_duration_minutes(after_model),
                    });
                }
            }
        }
    }

    for verb in CANCEL_VERBS {
        if let Some(after_verb) = find_after(&lower, verb) {
            let window: String = after_verb.chars().take(40).collect();
            if OVERRIDE_NOUNS.iter().any(|noun| window.contains(noun)) {
                return Some(OverrideCommand::Cancel);
            }
        }
    }

    None
}

fn find_after<'a>(haystack: &'a str, needle: &str) -> Option<&'a str> {
    haystack.find(needle).map(|idx| &haystack[idx + needle.len()..])
}

/// Parse `for [the next] N (min|minutes|m)` immediately following the model
/// name. Returns `None` when no duration clause is present (caller applies
/// the default TTL in that case).
fn parse_duration_minutes(tail: &str) -> Option<u64> {
    let tail = tail.trim_start();
    let tail = tail.strip_prefix("for")?;
    let tail = tail.trim_start();
    let tail = tail.strip_prefix("the next").unwrap_or(tail).trim_start();

    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let n: u64 = digits.parse().ok()?;
    let rest = tail[digits.len()..].trim_start();
    if rest.starts_with("min") || rest.starts_with('m') {
        Some(n)
    } else {
        None
    }
}

pub struct ClassifyOutcome {
    pub tier: ComplexityTier,
    pub override_applied: bool,
    pub override_just_set: Option<(ComplexityTier, u64)>,
    pub override_cleared: bool,
}

/// Run the full classification decision chain for `session_id` given the
/// last user message. `session_id` may be absent for unscoped requests, in
/// which case overrides are skipped (there is nothing to key them on).
pub async fn classify(
    message: &str,
    session_id: Option<&str>,
    overrides: &OverrideStore,
    cache: &ClassificationCache,
    default_override_ttl_minutes: u64,
    max_override_ttl_minutes: u64,
    classifier_client: &dyn ChatClient,
    classifier_model: &str,
) -> ClassifyOutcome {
    if let Some(session_id) = session_id {
        match parse_override_command(message) {
            Some(OverrideCommand::Set { tier, ttl_minutes }) => {
                let ttl = ttl_minutes
                    .unwrap_or(default_override_ttl_minutes)
                    .min(max_override_ttl_minutes);
                overrides.set(session_id, tier, ttl);
                return ClassifyOutcome {
                    tier,
                    override_applied: true,
                    override_just_set: Some((tier, ttl)),
                    override_cleared: false,
                };
            }
            Some(OverrideCommand::Cancel) => {
                overrides.clear(session_id);
                // fall through: classify this message normally below.
                return classify_without_override_parse(
                    message,
                    session_id,
                    overrides,
                    cache,
                    classifier_client,
                    classifier_model,
                    true,
                )
                .await;
            }
            None => {}
        }

        if let Some(active) = overrides.active(session_id) {
            return ClassifyOutcome {
                tier: active.complexity,
                override_applied: true,
                override_just_set: None,
                override_cleared: false,
            };
        }
    }

    classify_without_override_parse(
        message,
        session_id.unwrap_or(""),
        overrides,
        cache,
        classifier_client,
        classifier_model,
        false,
    )
    .await
}

async fn classify_without_override_parse(
    message: &str,
    _session_id: &str,
    _overrides: &OverrideStore,
    cache: &ClassificationCache,
    classifier_client: &dyn ChatClient,
    classifier_model: &str,
    override_cleared: bool,
) -> ClassifyOutcome {
    let non_whitespace_chars = message.chars().filter(|c| !c.is_whitespace()).count();
    if non_whitespace_chars < FAST_PATH_CHAR_THRESHOLD {
        return ClassifyOutcome {
            tier: ComplexityTier::Simple,
            override_applied: false,
            override_just_set: None,
            override_cleared,
        };
    }

    let key = cache_key(message);
    if let Some(tier) = cache.get(&key) {
        return ClassifyOutcome {
            tier,
            override_applied: false,
            override_just_set: None,
            override_cleared,
        };
    }

    let tier = call_classifier(message, classifier_client, classifier_model).await;
    cache.insert(key, tier);
    ClassifyOutcome {
        tier,
        override_applied: false,
        override_just_set: None,
        override_cleared,
    }
}

async fn call_classifier(
    message: &str,
    client: &dyn ChatClient,
    classifier_model: &str,
) -> ComplexityTier {
    let truncated: String = message.chars().take(CLASSIFIER_PROMPT_TRUNCATE_CHARS).collect();

    let mut req = ChatCompletionRequest::new(classifier_model, vec![Message::user(truncated)]);
    req.system = Some(CLASSIFIER_SYSTEM_PROMPT.to_string());
    req.temperature = Some(0.0);
    req.max_tokens = Some(10);
    req.metadata = serde_json::json!({ "request_type": "classification" });

    match client.complete(req).await {
        Ok(resp) => {
            let first_line = resp.content.lines().next().unwrap_or("");
            ComplexityTier::parse_exact(first_line)
                .or_else(|| ComplexityTier::find_in(&resp.content))
                .unwrap_or(ComplexityTier::Simple)
        }
        Err(e) => {
            let err = RouterError::ClassifierFailure(e.to_string());
            warn!(error = %err, "defaulting to SIMPLE");
            ComplexityTier::Simple
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use router_model::MockChatClient;

    #[test]
    fn parses_set_command_with_explicit_duration() {
        let cmd = parse_override_command("please use opus for 10 minutes, thanks");
        assert_eq!(
            cmd,
            Some(OverrideCommand::Set { tier: ComplexityTier::Complex, ttl_minutes: Some(10) })
        );
    }

    #[test]
    fn parses_set_command_without_duration() {
        let cmd = parse_override_command("switch to haiku");
        assert_eq!(
            cmd,
            Some(OverrideCommand::Set { tier: ComplexityTier::Simple, ttl_minutes: None })
        );
    }

    #[test]
    fn parses_duration_with_the_next_phrasing() {
        let cmd = parse_override_command("force sonnet for the next 45 min");
        assert_eq!(
            cmd,
            Some(OverrideCommand::Set { tier: ComplexityTier::Moderate, ttl_minutes: Some(45) })
        );
    }

    #[test]
    fn parses_cancel_command() {
        let cmd = parse_override_command("please cancel the model override");
        assert_eq!(cmd, Some(OverrideCommand::Cancel));
    }

    #[test]
    fn plain_message_is_not_a_command() {
        assert_eq!(parse_override_command("what's the weather like"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let cmd = parse_override_command("USE OPUS");
        assert!(matches!(cmd, Some(OverrideCommand::Set { tier: ComplexityTier::Complex, .. })));
    }

    #[tokio::test]
    async fn fast_path_returns_simple_under_twenty_chars() {
        let overrides = OverrideStore::new(60);
        let cache = ClassificationCache::new(10, 3600);
        let client = MockChatClient;
        let outcome = classify(
            "hi there",
            None,
            &overrides,
            &cache,
            5,
            60,
            &client,
            "cheap-model",
        )
        .await;
        assert_eq!(outcome.tier, ComplexityTier::Simple);
    }

    #[tokio::test]
    async fn active_override_short_circuits_classification() {
        let overrides = OverrideStore::new(60);
        overrides.set("sess", ComplexityTier::Complex, 10);
        let cache = ClassificationCache::new(10, 3600);
        let client = MockChatClient;
        let outcome = classify(
            "a perfectly ordinary long message about something",
            Some("sess"),
            &overrides,
            &cache,
            5,
            60,
            &client,
            "cheap-model",
        )
        .await;
        assert_eq!(outcome.tier, ComplexityTier::Complex);
        assert!(outcome.override_applied);
    }

    #[tokio::test]
    async fn set_command_clamps_ttl_above_max() {
        let overrides = OverrideStore::new(60);
        let cache = ClassificationCache::new(10, 3600);
        let client = MockChatClient;
        let _ = classify(
            "force sonnet for the next 500 min",
            Some("sess"),
            &overrides,
            &cache,
            5,
            60,
            &client,
            "cheap-model",
        )
        .await;
        assert_eq!(overrides.active("sess").unwrap().ttl_minutes, 60);
    }

    #[tokio::test]
    async fn set_command_without_duration_uses_default_ttl() {
        let overrides = OverrideStore::new(60);
        let cache = ClassificationCache::new(10, 3600);
        let client = MockChatClient;
        let _ = classify(
            "switch to haiku",
            Some("sess"),
            &overrides,
            &cache,
            5,
            60,
            &client,
            "cheap-model",
        )
        .await;
        assert_eq!(overrides.active("sess").unwrap().ttl_minutes, 5);
    }

    #[tokio::test]
    async fn set_command_writes_override_store() {
        let overrides = OverrideStore::new(60);
        let cache = ClassificationCache::new(10, 3600);
        let client = MockChatClient;
        let _ = classify(
            "use opus for 15 minutes please",
            Some("sess"),
            &overrides,
            &cache,
            5,
            60,
            &client,
            "cheap-model",
        )
        .await;
        assert_eq!(overrides.active("sess").unwrap().complexity, ComplexityTier::Complex);
    }
}
