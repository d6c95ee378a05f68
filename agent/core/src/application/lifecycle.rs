// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0
//! # Lifecycle Controller
//!
//! Drives one agent invocation from raw options to a running agent:
//!
//! ```text
//! Created -> Completing -> Validating -> Configured -> Running -> Terminated(Success)
//!                 |             |             |            |
//!                 +-------------+-------------+------------+----> Terminated(Error)
//! ```
//!
//! ## Ordering
//! | Step | State on entry | Failure |
//! |------|----------------|---------|
//! | complete options | `Completing` | `BootstrapError::Completion` |
//! | validate options | `Validating` | `BootstrapError::Validation` |
//! | dump effective flags, derive execution scope | `Configured` | - |
//! | construct agent | `Configured` | `BootstrapError::AgentConstruction` |
//! | run agent | `Running` | `BootstrapError::AgentRuntime` |
//!
//! The execution scope is a child of the process root token. It is cancelled
//! when it goes out of scope, which happens on every path out of the
//! sequence and always before `Terminated` is entered.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::options::{AgentOptions, ValidatedOptions};
use crate::domain::agent::AgentConstructor;
use crate::domain::error::BootstrapError;
use crate::domain::feature_gate::FeatureGates;
use crate::domain::flag::EffectiveFlag;

pub const FLAG_FEATURE_GATES: &str = "feature-gates";

/// Resolves the local hostname during completion.
pub type HostnameSource = fn() -> Result<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Completing,
    Validating,
    Configured,
    Running,
    Terminated(Termination),
}

impl LifecycleState {
    /// Legal edges of the lifecycle; `Terminated` is absorbing.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Created, Completing)
                | (Completing, Validating)
                | (Validating, Configured)
                | (Configured, Running)
                | (Running, Terminated(_))
                | (Completing | Validating | Configured, Terminated(Termination::Error))
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Created => write!(f, "Created"),
            LifecycleState::Completing => write!(f, "Completing"),
            LifecycleState::Validating => write!(f, "Validating"),
            LifecycleState::Configured => write!(f, "Configured"),
            LifecycleState::Running => write!(f, "Running"),
            LifecycleState::Terminated(Termination::Success) => write!(f, "Terminated(success)"),
            LifecycleState::Terminated(Termination::Error) => write!(f, "Terminated(error)"),
        }
    }
}

pub trait LifecycleObserver: Send + Sync {
    fn on_transition(&self, from: LifecycleState, to: LifecycleState);
    fn on_scope_released(&self) {}
}

/// Default observer: every transition becomes a debug event.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn on_transition(&self, from: LifecycleState, to: LifecycleState) {
        debug!(%from, %to, "Lifecycle transition");
    }

    fn on_scope_released(&self) {
        debug!("Execution context released");
    }
}

/// Cancellable execution context handed to the agent.
///
/// Dropping the scope cancels its token exactly once.
pub struct ExecutionScope {
    token: CancellationToken,
    observer: Arc<dyn LifecycleObserver>,
}

impl ExecutionScope {
    pub fn derive(root: &CancellationToken, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            token: root.child_token(),
            observer,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for ExecutionScope {
    fn drop(&mut self) {
        self.token.cancel();
        self.observer.on_scope_released();
    }
}

pub struct LifecycleController {
    state: LifecycleState,
    features: FeatureGates,
    observer: Arc<dyn LifecycleObserver>,
    hostname: HostnameSource,
    command_flags: Vec<EffectiveFlag>,
}

impl LifecycleController {
    pub fn new(features: FeatureGates) -> Self {
        Self {
            state: LifecycleState::Created,
            features,
            observer: Arc::new(TracingObserver),
            hostname: crate::application::options::system_hostname,
            command_flags: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_hostname_source(mut self, hostname: HostnameSource) -> Self {
        self.hostname = hostname;
        self
    }

    /// Flags owned by the command surface rather than the option set, included
    /// in the effective flag dump.
    pub fn with_command_flags(mut self, flags: Vec<EffectiveFlag>) -> Self {
        self.command_flags = flags;
        self
    }

    /// Runs the whole sequence. Returns only once the agent has stopped or a
    /// stage has failed; the execution scope is already cancelled by then.
    pub async fn run(
        mut self,
        options: AgentOptions,
        root: &CancellationToken,
        constructor: &dyn AgentConstructor,
    ) -> Result<(), BootstrapError> {
        let result = self.drive(options, root, constructor).await;

        let termination = match &result {
            Ok(()) => Termination::Success,
            Err(_) => Termination::Error,
        };
        self.transition(LifecycleState::Terminated(termination));

        result
    }

    async fn drive(
        &mut self,
        options: AgentOptions,
        root: &CancellationToken,
        constructor: &dyn AgentConstructor,
    ) -> Result<(), BootstrapError> {
        self.transition(LifecycleState::Completing);
        let completed = options.complete_with(self.hostname)?;

        self.transition(LifecycleState::Validating);
        let validated = completed.validate(&self.features)?;

        self.log_effective_flags(&validated);

        let scope = ExecutionScope::derive(root, self.observer.clone());
        self.transition(LifecycleState::Configured);

        let (registration, controller) = validated.into_parts();
        info!(
            cluster_id = registration.cluster_id.as_deref().unwrap_or_default(),
            cluster_name = registration.cluster_name.as_deref().unwrap_or_default(),
            parent_url = registration.parent_url.as_deref().unwrap_or_default(),
            sync_mode = %registration.sync_mode,
            "Constructing agent"
        );

        let agent = constructor
            .construct(scope.token(), registration, controller, self.features.clone())
            .await
            .map_err(BootstrapError::AgentConstruction)?;

        self.transition(LifecycleState::Running);
        agent.run().await.map_err(BootstrapError::AgentRuntime)?;

        info!("Agent run returned");
        Ok(())
    }

    fn transition(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal lifecycle transition {} -> {}",
            self.state,
            next
        );
        let from = self.state;
        self.state = next;
        self.observer.on_transition(from, next);
    }

    fn log_effective_flags(&self, options: &ValidatedOptions) {
        let features = EffectiveFlag::new(FLAG_FEATURE_GATES, self.features.flag_value());
        for flag in options
            .effective_flags()
            .iter()
            .chain(std::iter::once(&features))
            .chain(self.command_flags.iter())
        {
            debug!("FLAG: {}", flag);
        }
    }
}
