// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! # tether-agent
//!
//! Runs inside a child cluster: registers it with a parent cluster, sets up
//! the tunnel and reports heartbeats until it is told to stop.
//!
//! ## Exit codes
//!
//! - `0`: the agent stopped normally, or a version query was answered
//! - `1`: any bootstrap failure (option defaults, completion, validation,
//!   agent construction, agent run) or process setup failure
//! - `2`: the command line could not be parsed

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use tether_agent::app::{run_command, Cli};
use tether_agent::logging::init_logging;
use tether_agent::signals::spawn_shutdown_listener;
use tether_agent_core::application::AgentOptions;
use tether_agent_core::domain::error::BootstrapError;
use tether_agent_core::infrastructure::heartbeat_agent::HeartbeatAgentConstructor;

#[tokio::main]
async fn main() -> ExitCode {
    // Defaults are built before the command line is bound to them.
    let options = match AgentOptions::new() {
        Ok(options) => options,
        Err(e) => return fail(&anyhow::Error::new(e)),
    };

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if let Err(e) = init_logging(&cli.log_level) {
        return fail(&e);
    }

    let root = CancellationToken::new();
    let finished = CancellationToken::new();
    let listener = match spawn_shutdown_listener(root.clone(), finished.clone()) {
        Ok(handle) => handle,
        Err(e) => return fail(&e),
    };

    let result = run_command(
        &cli,
        options,
        &root,
        &HeartbeatAgentConstructor,
        &mut std::io::stdout(),
    )
    .await;

    root.cancel();
    finished.cancel();
    if let Err(e) = listener.await {
        warn!(error = %e, "Signal listener task failed");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

/// Reports a fatal error on stderr and in the log.
fn fail(err: &anyhow::Error) -> ExitCode {
    // Bootstrap messages already embed their source.
    let message = match err.downcast_ref::<BootstrapError>() {
        Some(bootstrap) => {
            error!(stage = bootstrap.stage(), error = %bootstrap, "Agent failed");
            bootstrap.to_string()
        }
        None => {
            let message = format!("{:#}", err);
            error!(error = %message, "Agent failed");
            message
        }
    };
    eprintln!("{} {}", "error:".red().bold(), message);
    ExitCode::FAILURE
}
