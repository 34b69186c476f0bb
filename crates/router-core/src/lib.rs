// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
pub mod classification_cache;
pub mod classifier;
pub mod contract;
pub mod error;
pub mod guard;
pub mod override_store;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod repo_context;
pub mod request;
pub mod session_store;
pub mod side_cache;
pub mod telemetry;

pub use classification_cache::ClassificationCache;
pub use classifier::{classify, parse_override_command, ClassifyOutcome, OverrideCommand};
pub use contract::{ContractCache, PolicyContract};
pub use error::RouterError;
pub use guard::{ExhaustionRisk, GuardOutcome};
pub use override_store::{Override, OverrideStore};
pub use pipeline::PipelineState;
pub use policy::{detect_violation, enforcement_message, Violation};
pub use registry::RepoRegistry;
pub use request::{
    CallType, ComplexityTier, ModelTiers, Request, RequestMetadata, RepoContext, SyntheticResponse,
};
pub use session_store::{extract_session_id, SessionStore};
pub use side_cache::{key_from_prefix, SideCache};
pub use telemetry::{
    assemble_metadata, CapturedSpan, Metadata, MetadataBuilder, MetadataBundleInput, NoopSink,
    TelemetrySink, TracingSink, Usage,
};
