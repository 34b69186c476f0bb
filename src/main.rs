// Copyright (c) 2024-2026 Contributors
//
// SPDX-License-Identifier: MIT
mod cli;

use std::collections::HashMap;
use std::io::Read as _;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use router_core::{PipelineState, Request, RequestMetadata};
use router_model::{MockChatClient, RawMessage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::ShowConfig => {
            let config = router_config::load();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::PreCall { file } => run_pre_call(file.as_deref()).await,
        Commands::Simulate { file, reply } => run_simulate(file.as_deref(), reply).await,
    }
}

/// The on-the-wire shape this harness accepts — closely mirrors what the
/// host (the proxy process embedding this core) would hand the pre-call
/// hook, before any normalization.
#[derive(Debug, Deserialize, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<RawMessage>,
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    metadata: RequestMetadata,
    #[serde(default)]
    headers: HashMap<String, String>,
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request JSON from stdin")?;
            Ok(buf)
        }
    }
}

fn build_request(raw: &str) -> anyhow::Result<Request> {
    let wire: WireRequest = serde_json::from_str(raw).context("parsing request JSON")?;
    let messages = wire.messages.iter().map(router_model::Message::from_raw).collect();
    let mut req = Request::new(wire.model, messages);
    req.system = wire.system;
    req.metadata = wire.metadata;
    req.headers = wire.headers;
    Ok(req)
}

fn default_pipeline() -> PipelineState {
    let config = router_config::load();
    let tiers = router_core::ModelTiers::default();
    PipelineState::new(
        config,
        tiers,
        Arc::new(MockChatClient),
        Arc::new(router_core::TracingSink),
    )
}

#[derive(Debug, Serialize)]
struct PreCallOutput {
    skip_upstream: bool,
    model: String,
    system: Option<String>,
    messages: Vec<router_model::Message>,
    synthetic_response: Option<router_core::SyntheticResponse>,
    metadata: serde_json::Value,
}

async fn run_pre_call(file: Option<&Path>) -> anyhow::Result<()> {
    let raw = read_input(file)?;
    let mut req = build_request(&raw)?;
    let state = default_pipeline();

    state.pre_call(&mut req).await;

    let output = PreCallOutput {
        skip_upstream: req.skip_upstream,
        model: req.model.clone(),
        system: req.system.clone(),
        messages: req.messages.clone(),
        synthetic_response: req.synthetic_response.clone(),
        metadata: serde_json::to_value(&req.metadata.extra)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_simulate(file: Option<&Path>, reply: &str) -> anyhow::Result<()> {
    let raw = read_input(file)?;
    let mut req = build_request(&raw)?;
    let state = default_pipeline();

    let start = SystemTime::now();
    let last_user_message = req.last_user_message().to_string();
    state.pre_call(&mut req).await;

    if req.skip_upstream {
        println!(
            "{}",
            serde_json::to_string_pretty(&req.synthetic_response)?
        );
        return Ok(());
    }

    println!("routed_to_model = {}", req.model);
    state.post_call(&last_user_message, reply, 12, 8, None, start);
    println!("(post-call span emitted via tracing; see stderr with -v)");
    Ok(())
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("llm_router_proxy={default_level}")));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
