// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! # Agent Option Set
//!
//! Raw and derived configuration for one agent invocation.
//!
//! The option set moves through three types, so validation can only ever see
//! fully completed state:
//!
//! | Type | Produced by | Allowed next step |
//! |------|-------------|-------------------|
//! | [`AgentOptions`] | [`AgentOptions::new`] + [`AgentOptions::apply_flags`] | `complete` |
//! | [`CompletedOptions`] | [`AgentOptions::complete`] | `validate` |
//! | [`ValidatedOptions`] | [`CompletedOptions::validate`] | hand to the agent |

use clap::Args;
use tracing::debug;

use crate::domain::cluster_registration::{ClusterRegistrationFlags, ClusterRegistrationOptions};
use crate::domain::controller_options::{ControllerFlags, ControllerOptions};
use crate::domain::error::BootstrapError;
use crate::domain::feature_gate::FeatureGates;
use crate::domain::flag::EffectiveFlag;

/// Every option flag, flattened into the command by the binary.
#[derive(Debug, Clone, Default, Args)]
pub struct AgentFlags {
    #[command(flatten)]
    pub registration: ClusterRegistrationFlags,

    #[command(flatten)]
    pub controller: ControllerFlags,
}

/// Options as built from defaults and flags, before completion.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub cluster_registration: ClusterRegistrationOptions,
    pub controller: ControllerOptions,
}

impl AgentOptions {
    /// Builds the defaults. Must run before flags are applied.
    pub fn new() -> Result<Self, BootstrapError> {
        let cluster_registration =
            ClusterRegistrationOptions::with_defaults().map_err(BootstrapError::Initialization)?;
        let controller = ControllerOptions::with_defaults().map_err(BootstrapError::Initialization)?;

        Ok(Self {
            cluster_registration,
            controller,
        })
    }

    /// Overlays every flag the operator set on top of the defaults.
    pub fn apply_flags(&mut self, flags: &AgentFlags) {
        self.cluster_registration.apply_flags(&flags.registration);
        self.controller.apply_flags(&flags.controller);
    }

    /// Resolves derived defaults using the local hostname.
    pub fn complete(self) -> Result<CompletedOptions, BootstrapError> {
        self.complete_with(system_hostname)
    }

    /// Like [`AgentOptions::complete`] with an explicit hostname source. The
    /// source is only consulted when a derived field is actually unset.
    pub fn complete_with<F>(mut self, resolve_hostname: F) -> Result<CompletedOptions, BootstrapError>
    where
        F: FnOnce() -> Result<String, String>,
    {
        let needs_hostname = self.cluster_registration.cluster_id.is_none()
            || self.controller.leader_election.identity.is_none();

        let hostname = if needs_hostname {
            let hostname = resolve_hostname()
                .map_err(|e| BootstrapError::Completion(format!("unable to determine hostname: {}", e)))?;
            if hostname.trim().is_empty() {
                return Err(BootstrapError::Completion("hostname is empty".to_string()));
            }
            hostname
        } else {
            String::new()
        };

        self.cluster_registration
            .complete(&hostname)
            .map_err(BootstrapError::Completion)?;
        self.controller.complete(&hostname);

        debug!(
            cluster_id = self.cluster_registration.cluster_id.as_deref().unwrap_or_default(),
            cluster_name = self.cluster_registration.cluster_name.as_deref().unwrap_or_default(),
            "Options completed"
        );

        Ok(CompletedOptions {
            cluster_registration: self.cluster_registration,
            controller: self.controller,
        })
    }
}

/// Options with every derived field resolved.
#[derive(Debug, Clone)]
pub struct CompletedOptions {
    cluster_registration: ClusterRegistrationOptions,
    controller: ControllerOptions,
}

impl CompletedOptions {
    pub fn cluster_registration(&self) -> &ClusterRegistrationOptions {
        &self.cluster_registration
    }

    pub fn controller(&self) -> &ControllerOptions {
        &self.controller
    }

    /// Runs every check and reports all violations together.
    pub fn validate(self, features: &FeatureGates) -> Result<ValidatedOptions, BootstrapError> {
        let mut errors = self.cluster_registration.validate(features);
        errors.extend(self.controller.validate());
        errors.into_result()?;

        Ok(ValidatedOptions {
            cluster_registration: self.cluster_registration,
            controller: self.controller,
        })
    }
}

/// Options that passed validation; read-only from here on.
#[derive(Debug, Clone)]
pub struct ValidatedOptions {
    cluster_registration: ClusterRegistrationOptions,
    controller: ControllerOptions,
}

impl ValidatedOptions {
    pub fn cluster_registration(&self) -> &ClusterRegistrationOptions {
        &self.cluster_registration
    }

    pub fn controller(&self) -> &ControllerOptions {
        &self.controller
    }

    /// Every option flag with its resolved value, in declaration order.
    pub fn effective_flags(&self) -> Vec<EffectiveFlag> {
        let mut flags = self.cluster_registration.effective_flags();
        flags.extend(self.controller.effective_flags());
        flags
    }

    pub fn into_parts(self) -> (ClusterRegistrationOptions, ControllerOptions) {
        (self.cluster_registration, self.controller)
    }
}

/// Hostname of the machine the agent runs on.
pub fn system_hostname() -> Result<String, String> {
    hostname::get()
        .map_err(|e| e.to_string())?
        .into_string()
        .map_err(|raw| format!("hostname {:?} is not valid UTF-8", raw))
}
