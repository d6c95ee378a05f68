// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! Background controller options: leader election, API client throttling and
//! worker concurrency. Passed to the agent unmodified.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::flag::EffectiveFlag;
use crate::domain::validation::{check_dns1123_label, FieldError, ValidationErrors};

pub const DEFAULT_LEASE_DURATION: &str = "15s";
pub const DEFAULT_RENEW_DEADLINE: &str = "10s";
pub const DEFAULT_RETRY_PERIOD: &str = "2s";
pub const DEFAULT_RESOURCE_NAMESPACE: &str = "tether-system";
pub const DEFAULT_RESOURCE_NAME: &str = "tether-agent";
pub const DEFAULT_KUBE_API_QPS: f32 = 5.0;
pub const DEFAULT_KUBE_API_BURST: u32 = 10;
pub const DEFAULT_WORKERS: u32 = 2;

/// Renew deadline must exceed the retry period by this factor.
pub const LEADER_ELECTION_JITTER_FACTOR: f64 = 1.2;

pub const FLAG_LEADER_ELECT: &str = "leader-elect";
pub const FLAG_LEASE_DURATION: &str = "leader-elect-lease-duration";
pub const FLAG_RENEW_DEADLINE: &str = "leader-elect-renew-deadline";
pub const FLAG_RETRY_PERIOD: &str = "leader-elect-retry-period";
pub const FLAG_RESOURCE_NAMESPACE: &str = "leader-elect-resource-namespace";
pub const FLAG_RESOURCE_NAME: &str = "leader-elect-resource-name";
pub const FLAG_KUBECONFIG: &str = "kubeconfig";
pub const FLAG_KUBE_API_QPS: &str = "kube-api-qps";
pub const FLAG_KUBE_API_BURST: &str = "kube-api-burst";
pub const FLAG_WORKERS: &str = "workers";

#[derive(Debug, Clone, Default, Args)]
pub struct ControllerFlags {
    /// Acquire a leader lease before running controllers [default: true]
    #[arg(
        long = "leader-elect",
        env = "TETHER_LEADER_ELECT",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub leader_elect: Option<bool>,

    /// How long non-leaders wait before trying to take over the lease [default: 15s]
    #[arg(
        long = "leader-elect-lease-duration",
        env = "TETHER_LEADER_ELECT_LEASE_DURATION",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub lease_duration: Option<Duration>,

    /// How long the leader keeps retrying a renewal before giving up [default: 10s]
    #[arg(
        long = "leader-elect-renew-deadline",
        env = "TETHER_LEADER_ELECT_RENEW_DEADLINE",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub renew_deadline: Option<Duration>,

    /// Wait between lease acquisition or renewal attempts [default: 2s]
    #[arg(
        long = "leader-elect-retry-period",
        env = "TETHER_LEADER_ELECT_RETRY_PERIOD",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub retry_period: Option<Duration>,

    /// Namespace of the lease object [default: tether-system]
    #[arg(long = "leader-elect-resource-namespace", env = "TETHER_LEADER_ELECT_RESOURCE_NAMESPACE")]
    pub resource_namespace: Option<String>,

    /// Name of the lease object [default: tether-agent]
    #[arg(long = "leader-elect-resource-name", env = "TETHER_LEADER_ELECT_RESOURCE_NAME")]
    pub resource_name: Option<String>,

    /// Path to a kubeconfig for the child cluster [default: in-cluster config]
    #[arg(long = "kubeconfig", env = "TETHER_KUBECONFIG", value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Queries per second against the child cluster API server [default: 5]
    #[arg(long = "kube-api-qps", env = "TETHER_KUBE_API_QPS")]
    pub kube_api_qps: Option<f32>,

    /// Burst allowance against the child cluster API server [default: 10]
    #[arg(long = "kube-api-burst", env = "TETHER_KUBE_API_BURST")]
    pub kube_api_burst: Option<u32>,

    /// Concurrent workers per controller [default: 2]
    #[arg(long = "workers", env = "TETHER_WORKERS")]
    pub workers: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderElectionOptions {
    pub enabled: bool,
    pub lease_duration: Duration,
    pub renew_deadline: Duration,
    pub retry_period: Duration,
    pub resource_namespace: String,
    pub resource_name: String,
    /// Holder identity; filled in during completion when unset.
    pub identity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerOptions {
    pub leader_election: LeaderElectionOptions,
    pub kubeconfig: Option<PathBuf>,
    pub kube_api_qps: f32,
    pub kube_api_burst: u32,
    pub workers: u32,
}

fn parse_default(flag: &str, value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| format!("default --{}: {}", flag, e))
}

impl ControllerOptions {
    pub fn with_defaults() -> Result<Self, String> {
        check_dns1123_label(DEFAULT_RESOURCE_NAMESPACE)
            .map_err(|e| format!("default --{}: {}", FLAG_RESOURCE_NAMESPACE, e))?;

        Ok(Self {
            leader_election: LeaderElectionOptions {
                enabled: true,
                lease_duration: parse_default(FLAG_LEASE_DURATION, DEFAULT_LEASE_DURATION)?,
                renew_deadline: parse_default(FLAG_RENEW_DEADLINE, DEFAULT_RENEW_DEADLINE)?,
                retry_period: parse_default(FLAG_RETRY_PERIOD, DEFAULT_RETRY_PERIOD)?,
                resource_namespace: DEFAULT_RESOURCE_NAMESPACE.to_string(),
                resource_name: DEFAULT_RESOURCE_NAME.to_string(),
                identity: None,
            },
            kubeconfig: None,
            kube_api_qps: DEFAULT_KUBE_API_QPS,
            kube_api_burst: DEFAULT_KUBE_API_BURST,
            workers: DEFAULT_WORKERS,
        })
    }

    pub fn apply_flags(&mut self, flags: &ControllerFlags) {
        let le = &mut self.leader_election;
        if let Some(enabled) = flags.leader_elect {
            le.enabled = enabled;
        }
        if let Some(d) = flags.lease_duration {
            le.lease_duration = d;
        }
        if let Some(d) = flags.renew_deadline {
            le.renew_deadline = d;
        }
        if let Some(d) = flags.retry_period {
            le.retry_period = d;
        }
        if let Some(ns) = &flags.resource_namespace {
            le.resource_namespace = ns.clone();
        }
        if let Some(name) = &flags.resource_name {
            le.resource_name = name.clone();
        }
        if let Some(path) = &flags.kubeconfig {
            self.kubeconfig = Some(path.clone());
        }
        if let Some(qps) = flags.kube_api_qps {
            self.kube_api_qps = qps;
        }
        if let Some(burst) = flags.kube_api_burst {
            self.kube_api_burst = burst;
        }
        if let Some(workers) = flags.workers {
            self.workers = workers;
        }
    }

    /// Gives the leader lease a unique holder identity.
    pub fn complete(&mut self, hostname: &str) {
        if self.leader_election.identity.is_none() {
            self.leader_election.identity = Some(format!("{}_{}", hostname, uuid::Uuid::new_v4()));
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let le = &self.leader_election;

        if le.enabled {
            if le.lease_duration.is_zero() {
                errors.push(FieldError::new(FLAG_LEASE_DURATION, "must be greater than 0"));
            }
            if le.renew_deadline.is_zero() {
                errors.push(FieldError::new(FLAG_RENEW_DEADLINE, "must be greater than 0"));
            }
            if le.retry_period.is_zero() {
                errors.push(FieldError::new(FLAG_RETRY_PERIOD, "must be greater than 0"));
            }
            if le.lease_duration <= le.renew_deadline {
                errors.push(FieldError::new(
                    FLAG_LEASE_DURATION,
                    format!("must be greater than --{}", FLAG_RENEW_DEADLINE),
                ));
            }
            if le.renew_deadline.as_secs_f64() <= LEADER_ELECTION_JITTER_FACTOR * le.retry_period.as_secs_f64() {
                errors.push(FieldError::new(
                    FLAG_RENEW_DEADLINE,
                    format!(
                        "must be greater than {} times --{}",
                        LEADER_ELECTION_JITTER_FACTOR, FLAG_RETRY_PERIOD
                    ),
                ));
            }
            if let Err(reason) = check_dns1123_label(&le.resource_namespace) {
                errors.push(FieldError::new(FLAG_RESOURCE_NAMESPACE, reason));
            }
            if let Err(reason) = check_dns1123_label(&le.resource_name) {
                errors.push(FieldError::new(FLAG_RESOURCE_NAME, reason));
            }
        }

        if self.kube_api_qps.is_nan() || self.kube_api_qps <= 0.0 {
            errors.push(FieldError::new(FLAG_KUBE_API_QPS, "must be greater than 0"));
        }
        if self.kube_api_burst < 1 {
            errors.push(FieldError::new(FLAG_KUBE_API_BURST, "must be at least 1"));
        }
        if self.workers < 1 {
            errors.push(FieldError::new(FLAG_WORKERS, "must be at least 1"));
        }

        errors
    }

    pub fn effective_flags(&self) -> Vec<EffectiveFlag> {
        let le = &self.leader_election;
        vec![
            EffectiveFlag::new(FLAG_LEADER_ELECT, le.enabled.to_string()),
            EffectiveFlag::new(FLAG_LEASE_DURATION, humantime::format_duration(le.lease_duration).to_string()),
            EffectiveFlag::new(FLAG_RENEW_DEADLINE, humantime::format_duration(le.renew_deadline).to_string()),
            EffectiveFlag::new(FLAG_RETRY_PERIOD, humantime::format_duration(le.retry_period).to_string()),
            EffectiveFlag::new(FLAG_RESOURCE_NAMESPACE, le.resource_namespace.clone()),
            EffectiveFlag::new(FLAG_RESOURCE_NAME, le.resource_name.clone()),
            EffectiveFlag::new(
                FLAG_KUBECONFIG,
                self.kubeconfig
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            EffectiveFlag::new(FLAG_KUBE_API_QPS, self.kube_api_qps.to_string()),
            EffectiveFlag::new(FLAG_KUBE_API_BURST, self.kube_api_burst.to_string()),
            EffectiveFlag::new(FLAG_WORKERS, self.workers.to_string()),
        ]
    }
}
