// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Context-exhaustion guard: estimates token usage, deduplicates and caps
//! oversized blocks, trims toward a soft limit, and refuses outright past a
//! hard limit.

use std::collections::HashSet;

use router_config::RouterConfig;
use router_model::Role;
use sha2::{Digest, Sha256};

use crate::request::Request;

const DUPLICATE_STUB: &str = "[[Duplicate context removed at proxy; reference earlier block]]";

fn estimate_tokens(text: &str) -> usize {
    (text.len() as f64 / 4.0).ceil().max(1.0) as usize
}

fn sha256_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionRisk {
    Low,
    Medium,
    High,
    Fatal,
}

impl ExhaustionRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhaustionRisk::Low => "low",
            ExhaustionRisk::Medium => "medium",
            ExhaustionRisk::High => "high",
            ExhaustionRisk::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardOutcome {
    pub context_tokens_estimated: usize,
    pub context_trimmed: bool,
    pub context_trimmed_count: usize,
    pub duplicate_blocks_detected: usize,
    pub large_blocks_suppressed: usize,
    pub exhaustion_risk: ExhaustionRisk,
}

impl GuardOutcome {
    /// Whether the context guard intervened meaningfully enough to warrant
    /// a ledger reminder being prepended to the enforcement message.
    pub fn warrants_ledger_reminder(&self) -> bool {
        self.context_trimmed
            || self.duplicate_blocks_detected > 0
            || self.large_blocks_suppressed > 0
            || matches!(self.exhaustion_risk, ExhaustionRisk::Medium | ExhaustionRisk::High)
    }
}

/// Run both guard passes over `req.messages`, mutating content in place.
pub fn run(req: &mut Request, cfg: &RouterConfig) -> GuardOutcome {
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    let mut large_suppressed = 0usize;
    let mut estimates = Vec::with_capacity(req.messages.len());

    for msg in req.messages.iter_mut() {
        let original = msg.content.clone();
        let original_estimate = estimate_tokens(&original);
        let mut text = original.clone();
        let mut est = original_estimate;

        if original_estimate > cfg.context_dup_min {
            let hash = sha256_hex(&original);
            if seen.contains(&hash) {
                text = DUPLICATE_STUB.to_string();
                est = estimate_tokens(&text);
                duplicates += 1;
            } else {
                seen.insert(hash);
            }
        }

        if text == original && original_estimate > cfg.context_block_limit {
            text = format!(
                "[[Content suppressed at proxy; original was approximately {original_estimate} tokens]]"
            );
            est = estimate_tokens(&text);
            large_suppressed += 1;
        }

        msg.content = text;
        estimates.push(est);
    }

    let mut total: usize = estimates.iter().sum::<usize>() + cfg.enforcement_overhead;
    let mut trimmed_count = 0usize;

    if total > cfg.context_soft_limit {
        let mut i = 0;
        while i < req.messages.len() && total > cfg.context_soft_limit {
            let last_user_idx = req.messages.iter().rposition(|m| matches!(m.role, Role::User));
            let is_system = matches!(req.messages[i].role, Role::System);
            let is_last_user = Some(i) == last_user_idx;
            if is_system || is_last_user {
                i += 1;
                continue;
            }
            total -= estimates[i];
            req.messages.remove(i);
            estimates.remove(i);
            trimmed_count += 1;
        }
    }

    let exhaustion_risk = if total > cfg.context_hard_limit {
        ExhaustionRisk::Fatal
    } else {
        let ratio = total as f64 / cfg.context_soft_limit as f64;
        if ratio >= 1.0 {
            ExhaustionRisk::High
        } else if ratio >= 0.8 {
            ExhaustionRisk::Medium
        } else {
            ExhaustionRisk::Low
        }
    };

    GuardOutcome {
        context_tokens_estimated: total,
        context_trimmed: trimmed_count > 0,
        context_trimmed_count: trimmed_count,
        duplicate_blocks_detected: duplicates,
        large_blocks_suppressed: large_suppressed,
        exhaustion_risk,
    }
}
