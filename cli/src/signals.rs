// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! OS signal wiring for the process root token.
//!
//! The first SIGINT, SIGTERM or SIGQUIT (Ctrl-C on other platforms) cancels
//! the root token so the running agent can wind down. A second signal that
//! arrives before shutdown has finished exits the process immediately with
//! status 1.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
struct ShutdownSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?,
            sigterm: signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?,
            sigquit: signal(SignalKind::quit()).context("Failed to install SIGQUIT handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigquit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                warn!(error = %e, "Ctrl+C handler failed");
                std::future::pending::<&'static str>().await
            }
        }
    }
}

/// Installs the handlers and spawns the task that cancels `root` on the first
/// signal. Must be called from inside the runtime.
///
/// The task returns once `finished` is cancelled, which the caller does after
/// the run sequence has returned.
pub fn spawn_shutdown_listener(
    root: CancellationToken,
    finished: CancellationToken,
) -> Result<JoinHandle<()>> {
    let mut signals = ShutdownSignals::install()?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = finished.cancelled() => return,
            _ = root.cancelled() => {}
            name = signals.recv() => {
                info!(signal = name, "Received shutdown signal");
                root.cancel();
            }
        }

        tokio::select! {
            _ = finished.cancelled() => {}
            name = signals.recv() => {
                warn!(signal = name, "Received second shutdown signal, exiting immediately");
                std::process::exit(1);
            }
        }
    }))
}
