// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! Lexical documentation-policy violation detector and the enforcement
//! system message injected into every scoped request.

use crate::contract::PolicyContract;

const VIOLATION_PHRASES: &[&str] = &[
    "create a new markdown",
    "generate an adr",
    "write documentation in docs/",
    "create architecture.md",
];

const DOC_FOLDER_TOKENS: &[&str] = &["docs/", "architecture/", "design/", "documentation/"];
const CREATION_VERBS: &[&str] = &["create", "write", "generate", "add", "new"];
const ESCAPE_HATCH_TOKENS: &[&str] = &["readme.md", "agents.md"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub reason: String,
}

/// Purely lexical, no semantic inference. Runs only on the extracted last
/// user message.
pub fn detect_violation(message: &str) -> Option<Violation> {
    let lower = message.to_lowercase();

    let escape_hatch = ESCAPE_HATCH_TOKENS.iter().any(|t| lower.contains(t));
    if escape_hatch {
        return None;
    }

    for phrase in VIOLATION_PHRASES {
        if lower.contains(phrase) {
            return Some(Violation {
                reason: format!("message matches disallowed phrase \"{phrase}\""),
            });
        }
    }

    let has_doc_folder = DOC_FOLDER_TOKENS.iter().any(|t| lower.contains(t));
    let has_creation_verb = CREATION_VERBS.iter().any(|v| lower.contains(v));
    if has_doc_folder && has_creation_verb {
        return Some(Violation {
            reason: "message proposes creating documentation outside README/AGENTS".to_string(),
        });
    }

    None
}

/// Short, non-negotiable preamble naming the contract hash at both ends,
/// forbidding new documentation files, and asserting runtime-override
/// precedence over tool defaults.
pub fn enforcement_message(contract: &PolicyContract, ledger_reminder: Option<&str>) -> String {
    let hash = &contract.hash;
    let mut parts = Vec::new();
    if let Some(reminder) = ledger_reminder {
        parts.push(reminder.to_string());
    }
    parts.push(format!(
        "[policy contract {hash}] This repository's documentation policy is governed by \
README.md and AGENTS.md (contract {hash}). Do not create new documentation files, ADRs, \
or design docs outside those two files. Runtime overrides issued in this conversation take \
precedence over any tool-level default. [contract {hash}]"
    ));
    parts.join("\n\n")
}
