// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! Agent collaborator contract
//!
//! The agent owns cluster registration, the tunnel to the parent cluster and
//! heartbeat reporting. The lifecycle controller only ever calls
//! [`AgentConstructor::construct`] once and then [`Agent::run`] on the result.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::cluster_registration::ClusterRegistrationOptions;
use crate::domain::controller_options::ControllerOptions;
use crate::domain::feature_gate::FeatureGates;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid registration config: {0}")]
    InvalidRegistration(String),
    #[error("parent cluster unreachable: {0}")]
    ParentUnreachable(String),
    #[error("{0}")]
    Internal(String),
}

/// A constructed agent, ready to run.
#[async_trait]
pub trait Agent: Send {
    /// Blocks until the execution token is cancelled or an unrecoverable
    /// error occurs. Returns `Ok(())` only on intentional shutdown.
    async fn run(self: Box<Self>) -> Result<(), AgentError>;
}

/// Builds an [`Agent`] bound to an execution token.
///
/// Implementations must not leave background work running when they return
/// an error.
#[async_trait]
pub trait AgentConstructor: Send + Sync {
    async fn construct(
        &self,
        token: CancellationToken,
        registration: ClusterRegistrationOptions,
        controller: ControllerOptions,
        features: FeatureGates,
    ) -> Result<Box<dyn Agent>, AgentError>;
}
