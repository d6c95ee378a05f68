// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--log-level` when both are set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("Failed to create log filter from {:?}", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
