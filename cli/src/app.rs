// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! # Command Surface
//!
//! The `tether-agent` command: binds every option flag, the feature-gate flag,
//! `--version` and `--log-level`, then hands off to the lifecycle controller.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tether_agent_core::application::{AgentFlags, AgentOptions, LifecycleController};
use tether_agent_core::domain::agent::AgentConstructor;
use tether_agent_core::domain::feature_gate::{FeatureGateFlags, FeatureGates};
use tether_agent_core::domain::flag::EffectiveFlag;

use crate::version::{VersionInfo, VersionRequest};

pub const COMMAND_NAME: &str = "tether-agent";

const LONG_ABOUT: &str =
    "Running in child cluster, responsible for cluster registration, tunnel setup, cluster heartbeat, etc";

/// Tether child-cluster agent
#[derive(Debug, Parser)]
#[command(name = COMMAND_NAME)]
#[command(about, long_about = LONG_ABOUT)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(flatten)]
    pub options: AgentFlags,

    #[command(flatten)]
    pub feature_gates: FeatureGateFlags,

    /// Print version information and quit; --version=raw prints it as JSON
    #[arg(
        long,
        value_enum,
        value_name = "BOOL|raw",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = VersionRequest::Off,
        default_missing_value = "true"
    )]
    pub version: VersionRequest,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TETHER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Flags owned by the command itself, reported alongside the option flags.
    fn command_flags(&self) -> Vec<EffectiveFlag> {
        vec![
            EffectiveFlag::new("log-level", self.log_level.clone()),
            EffectiveFlag::new("version", self.version.to_string()),
        ]
    }
}

/// Runs one invocation of the command.
///
/// `options` must already hold the defaults; flags from `cli` are applied on
/// top. A version query writes to `out` and returns before any option is
/// completed. Bootstrap failures are returned as
/// [`tether_agent_core::domain::error::BootstrapError`] inside the
/// [`anyhow::Error`].
pub async fn run_command<W: Write>(
    cli: &Cli,
    mut options: AgentOptions,
    root: &CancellationToken,
    constructor: &dyn AgentConstructor,
    out: &mut W,
) -> Result<()> {
    if let Some(rendered) = VersionInfo::current().render(COMMAND_NAME, cli.version)? {
        writeln!(out, "{}", rendered).context("Failed to write version information")?;
        return Ok(());
    }

    options.apply_flags(&cli.options);
    let features = FeatureGates::from_overrides(&cli.feature_gates.feature_gates);
    debug!(feature_gates = %features.flag_value(), "Feature gates sealed");

    LifecycleController::new(features)
        .with_command_flags(cli.command_flags())
        .run(options, root, constructor)
        .await?;

    Ok(())
}
