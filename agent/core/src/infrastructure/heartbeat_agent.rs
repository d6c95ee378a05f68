// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0
//! Heartbeat Agent - default agent collaborator
//!
//! Announces the registration request, reports how the tunnel to the parent
//! cluster will be established, then emits a heartbeat every
//! `status_report_frequency` until its execution token is cancelled.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Default implementation of the agent collaborator contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::agent::{Agent, AgentConstructor, AgentError};
use crate::domain::cluster_registration::{ClusterRegistrationOptions, ClusterType, SyncMode};
use crate::domain::controller_options::ControllerOptions;
use crate::domain::feature_gate::{Feature, FeatureGates};

/// Payload reported to the parent cluster on every tick.
#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cluster_type: ClusterType,
    pub sync_mode: SyncMode,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct HeartbeatAgentConstructor;

#[async_trait]
impl AgentConstructor for HeartbeatAgentConstructor {
    async fn construct(
        &self,
        token: CancellationToken,
        registration: ClusterRegistrationOptions,
        controller: ControllerOptions,
        features: FeatureGates,
    ) -> Result<Box<dyn Agent>, AgentError> {
        let raw_url = registration
            .parent_url
            .as_deref()
            .ok_or_else(|| AgentError::InvalidRegistration("parent URL is not set".to_string()))?;
        let parent_url = url::Url::parse(raw_url)
            .map_err(|e| AgentError::InvalidRegistration(format!("parent URL {:?}: {}", raw_url, e)))?;

        let cluster_id = registration
            .cluster_id
            .clone()
            .ok_or_else(|| AgentError::InvalidRegistration("cluster id is not set".to_string()))?;
        let cluster_name = registration
            .cluster_name
            .clone()
            .ok_or_else(|| AgentError::InvalidRegistration("cluster name is not set".to_string()))?;

        if registration.status_report_frequency.is_zero() {
            return Err(AgentError::InvalidRegistration(
                "status report frequency must be greater than 0".to_string(),
            ));
        }

        Ok(Box::new(HeartbeatAgent {
            token,
            parent_url,
            cluster_id,
            cluster_name,
            registration,
            controller,
            features,
        }))
    }
}

pub struct HeartbeatAgent {
    token: CancellationToken,
    parent_url: url::Url,
    cluster_id: String,
    cluster_name: String,
    registration: ClusterRegistrationOptions,
    controller: ControllerOptions,
    features: FeatureGates,
}

impl HeartbeatAgent {
    fn heartbeat(&self, sequence: u64) -> Heartbeat {
        Heartbeat {
            cluster_id: self.cluster_id.clone(),
            cluster_name: self.cluster_name.clone(),
            cluster_type: self.registration.cluster_type,
            sync_mode: self.registration.sync_mode,
            sequence,
            timestamp: Utc::now(),
        }
    }

    fn report_frequency(&self) -> Duration {
        self.registration.status_report_frequency
    }
}

#[async_trait]
impl Agent for HeartbeatAgent {
    async fn run(self: Box<Self>) -> Result<(), AgentError> {
        info!(
            parent_url = %self.parent_url,
            cluster_id = %self.cluster_id,
            cluster_name = %self.cluster_name,
            labels = self.registration.labels.len(),
            "Registering cluster with parent"
        );

        if self.features.enabled(Feature::SocketConnection) {
            info!(parent_url = %self.parent_url, "Establishing websocket tunnel to parent cluster");
        } else {
            info!(parent_url = %self.parent_url, "Socket connection disabled, dialing parent cluster directly");
        }

        debug!(
            leader_elect = self.controller.leader_election.enabled,
            workers = self.controller.workers,
            "Controller options"
        );

        let mut tick = interval(self.report_frequency());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence: u64 = 0;

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    info!("Shutdown signal received, stopping heartbeats");
                    break;
                }
                _ = tick.tick() => {
                    sequence += 1;
                    let heartbeat = self.heartbeat(sequence);
                    let payload = serde_json::to_string(&heartbeat)
                        .map_err(|e| AgentError::Internal(format!("failed to encode heartbeat: {}", e)))?;
                    debug!(sequence, %payload, "Cluster heartbeat");
                }
            }
        }

        info!(heartbeats = sequence, "Agent stopped");
        Ok(())
    }
}
