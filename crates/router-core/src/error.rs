// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
//! The closed set of error kinds the pipeline can encounter. Every variant
//! but [`RouterError::ConfigurationMissing`] is non-fatal: callers log it at
//! `warn` and continue with best-available state rather than propagate it to
//! the client. `PolicyViolation` and `ContextExhaustionFatal` are not really
//! errors from the caller's perspective — they are successful pipeline
//! outcomes (a synthetic refusal) — but are named here because they are the
//! counterpart decision points to the two infrastructure failure kinds.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// A required `LITELLM_*` environment variable was absent at startup.
    /// Fatal: the host should fail fast rather than run with a guessed
    /// default for something load-bearing.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The classifier upstream call errored, timed out, or returned
    /// unparseable output. Non-fatal: callers default to `SIMPLE`.
    #[error("classifier upstream failure: {0}")]
    ClassifierFailure(String),

    /// A lexical documentation-policy violation was detected. Not a
    /// failure — the pipeline produces a synthetic refusal and returns
    /// normally.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// Post-trim context estimate still exceeds the hard limit. Not a
    /// failure — the pipeline produces a synthetic refusal and returns
    /// normally.
    #[error("context exhaustion: estimated {estimated} tokens exceeds hard limit {hard_limit}")]
    ContextExhaustionFatal { estimated: usize, hard_limit: usize },

    /// Disk read or write for the session store failed. Non-fatal:
    /// callers proceed with memory-only context for the remainder of the
    /// process lifetime.
    #[error("session store IO error: {0}")]
    SessionStoreIOError(String),

    /// README.md/AGENTS.md could not be read. Non-fatal: treated as an
    /// empty contract section.
    #[error("contract load error: {0}")]
    ContractLoadError(String),

    /// Telemetry span construction or emission failed. Non-fatal: never
    /// blocks the response to the client.
    #[error("telemetry emit error: {0}")]
    TelemetryEmitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_format_with_their_context() {
        let err = RouterError::ContextExhaustionFatal { estimated: 250_000, hard_limit: 200_000 };
        assert!(err.to_string().contains("250000"));
        assert!(err.to_string().contains("200000"));
    }

    #[test]
    fn configuration_missing_names_the_variable() {
        let err = RouterError::ConfigurationMissing("LITELLM_SESSION_DIR".to_string());
        assert!(err.to_string().contains("LITELLM_SESSION_DIR"));
    }
}
