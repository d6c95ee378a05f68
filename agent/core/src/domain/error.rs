// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

use crate::domain::agent::AgentError;
use crate::domain::validation::ValidationErrors;
use thiserror::Error;

/// Every way the bootstrap sequence can end in failure.
///
/// None of these are recovered locally: the binary reports the message and
/// exits non-zero.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("unable to initialize command options: {0}")]
    Initialization(String),
    #[error("unable to complete options: {0}")]
    Completion(String),
    #[error("invalid options: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("unable to construct agent: {0}")]
    AgentConstruction(#[source] AgentError),
    #[error("agent exited: {0}")]
    AgentRuntime(#[source] AgentError),
}

impl BootstrapError {
    /// Short stable name of the failing stage, used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            BootstrapError::Initialization(_) => "initialization",
            BootstrapError::Completion(_) => "completion",
            BootstrapError::Validation(_) => "validation",
            BootstrapError::AgentConstruction(_) => "agent-construction",
            BootstrapError::AgentRuntime(_) => "agent-runtime",
        }
    }
}
