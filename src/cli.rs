// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "llm-router-proxy",
    about = "Complexity-aware pre-call/post-call routing pipeline for LLM chat completions",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pre-call hook on a JSON request and print the (possibly
    /// rewritten) request, or the synthetic response if one was attached.
    ///
    /// Reads a chat-completion-shaped JSON document from `--file`, or stdin
    /// if omitted. Headers and metadata used for repo-context resolution are
    /// embedded in the document's own `headers`/`metadata` objects.
    PreCall {
        /// Path to the request JSON. Reads stdin if omitted.
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },

    /// Run both the pre-call hook and, unless a synthetic response was
    /// attached, a post-call hook against a scripted upstream reply —
    /// printing the final metadata bundle that would be sent to telemetry.
    Simulate {
        /// Path to the request JSON. Reads stdin if omitted.
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
        /// The upstream reply text to simulate for the post-call hook.
        #[arg(long, default_value = "Sure, I can help with that.")]
        reply: String,
    },

    /// Print the effective configuration (from `LITELLM_*` env vars) and exit.
    ShowConfig,
}
