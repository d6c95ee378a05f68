// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

// Cluster Registration Options
//
// Describes how this agent identifies and authenticates itself to the parent
// cluster:
// - Identity: cluster id, cluster name (or generated from a prefix), type, labels
// - Endpoint: parent cluster URL
// - Credentials: bootstrap token (sensitive, never logged)
// - Sync mode and status collect/report cadence

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::domain::feature_gate::{Feature, FeatureGates};
use crate::domain::flag::EffectiveFlag;
use crate::domain::validation::{
    check_dns1123_label, check_label_key, check_label_value, FieldError, ValidationErrors,
    DNS1123_LABEL_MAX_LENGTH,
};

pub const CLUSTER_NAME_MAX_LENGTH: usize = 60;
pub const DEFAULT_CLUSTER_NAME_PREFIX: &str = "tether-cluster";
pub const CLUSTER_NAME_SUFFIX_LENGTH: usize = 5;
pub const DEFAULT_STATUS_COLLECT_FREQUENCY: &str = "20s";
pub const DEFAULT_STATUS_REPORT_FREQUENCY: &str = "3m";

pub const FLAG_CLUSTER_ID: &str = "cluster-id";
pub const FLAG_CLUSTER_NAME: &str = "cluster-reg-name";
pub const FLAG_CLUSTER_NAME_PREFIX: &str = "cluster-reg-name-prefix";
pub const FLAG_CLUSTER_TYPE: &str = "cluster-reg-type";
pub const FLAG_CLUSTER_LABELS: &str = "cluster-labels";
pub const FLAG_PARENT_URL: &str = "cluster-reg-parent-url";
pub const FLAG_BOOTSTRAP_TOKEN: &str = "cluster-reg-token";
pub const FLAG_SYNC_MODE: &str = "cluster-sync-mode";
pub const FLAG_STATUS_COLLECT_FREQUENCY: &str = "cluster-status-collect-frequency";
pub const FLAG_STATUS_REPORT_FREQUENCY: &str = "cluster-status-report-frequency";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum ClusterType {
    #[value(name = "EdgeCluster")]
    EdgeCluster,
    #[value(name = "CloudCluster")]
    CloudCluster,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::EdgeCluster => write!(f, "EdgeCluster"),
            ClusterType::CloudCluster => write!(f, "CloudCluster"),
        }
    }
}

/// How workloads reach the child cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum SyncMode {
    /// Parent cluster pushes workloads down.
    #[value(name = "Push")]
    Push,
    /// Agent pulls workloads from the parent cluster.
    #[value(name = "Pull")]
    Pull,
    /// Both directions.
    #[value(name = "Dual")]
    Dual,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Push => write!(f, "Push"),
            SyncMode::Pull => write!(f, "Pull"),
            SyncMode::Dual => write!(f, "Dual"),
        }
    }
}

/// A `key=value` cluster label from `--cluster-labels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub key: String,
    pub value: String,
}

pub fn parse_label(s: &str) -> Result<Label, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' must be formatted as key=value", s))?;
    Ok(Label {
        key: key.trim().to_string(),
        value: value.trim().to_string(),
    })
}

/// Binds the registration flags onto a command. Unset flags keep the
/// defaults built by [`ClusterRegistrationOptions::with_defaults`].
#[derive(Debug, Clone, Default, Args)]
pub struct ClusterRegistrationFlags {
    /// Unique identity of this cluster [default: derived from the hostname]
    #[arg(long = "cluster-id", env = "TETHER_CLUSTER_ID", value_name = "ID")]
    pub cluster_id: Option<String>,

    /// Name of this cluster as registered in the parent cluster [default: <prefix>-<random suffix>]
    #[arg(long = "cluster-reg-name", env = "TETHER_CLUSTER_REG_NAME", value_name = "NAME")]
    pub cluster_name: Option<String>,

    /// Prefix of the generated cluster name, mutually exclusive with --cluster-reg-name [default: tether-cluster]
    #[arg(
        long = "cluster-reg-name-prefix",
        env = "TETHER_CLUSTER_REG_NAME_PREFIX",
        value_name = "PREFIX"
    )]
    pub cluster_name_prefix: Option<String>,

    /// Type of this cluster [default: EdgeCluster]
    #[arg(long = "cluster-reg-type", env = "TETHER_CLUSTER_REG_TYPE", value_enum)]
    pub cluster_type: Option<ClusterType>,

    /// Labels attached to this cluster, e.g. region=us-east-1,env=prod
    #[arg(
        long = "cluster-labels",
        env = "TETHER_CLUSTER_LABELS",
        value_name = "KEY=VALUE",
        value_delimiter = ',',
        value_parser = parse_label
    )]
    pub labels: Vec<Label>,

    /// URL of the parent cluster to register with
    #[arg(long = "cluster-reg-parent-url", env = "TETHER_CLUSTER_REG_PARENT_URL", value_name = "URL")]
    pub parent_url: Option<String>,

    /// Bootstrap token used for cluster registration
    #[arg(
        long = "cluster-reg-token",
        env = "TETHER_CLUSTER_REG_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub bootstrap_token: Option<String>,

    /// How workloads are synchronized with the parent cluster [default: Pull]
    #[arg(long = "cluster-sync-mode", env = "TETHER_CLUSTER_SYNC_MODE", value_enum)]
    pub sync_mode: Option<SyncMode>,

    /// How often cluster status is collected [default: 20s]
    #[arg(
        long = "cluster-status-collect-frequency",
        env = "TETHER_CLUSTER_STATUS_COLLECT_FREQUENCY",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub status_collect_frequency: Option<Duration>,

    /// How often cluster status is reported to the parent cluster [default: 3m]
    #[arg(
        long = "cluster-status-report-frequency",
        env = "TETHER_CLUSTER_STATUS_REPORT_FREQUENCY",
        value_name = "DURATION",
        value_parser = humantime::parse_duration
    )]
    pub status_report_frequency: Option<Duration>,
}

/// Registration configuration handed to the agent unmodified.
#[derive(Clone, PartialEq)]
pub struct ClusterRegistrationOptions {
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub cluster_name_prefix: Option<String>,
    pub cluster_type: ClusterType,
    pub labels: BTreeMap<String, String>,
    pub parent_url: Option<String>,
    pub bootstrap_token: Option<String>,
    pub sync_mode: SyncMode,
    pub status_collect_frequency: Duration,
    pub status_report_frequency: Duration,
    name_generated: bool,
}

// Hand-written so the bootstrap token never ends up in a log line.
impl fmt::Debug for ClusterRegistrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterRegistrationOptions")
            .field("cluster_id", &self.cluster_id)
            .field("cluster_name", &self.cluster_name)
            .field("cluster_name_prefix", &self.cluster_name_prefix)
            .field("cluster_type", &self.cluster_type)
            .field("labels", &self.labels)
            .field("parent_url", &self.parent_url)
            .field("bootstrap_token", &self.bootstrap_token.as_ref().map(|_| "<redacted>"))
            .field("sync_mode", &self.sync_mode)
            .field("status_collect_frequency", &self.status_collect_frequency)
            .field("status_report_frequency", &self.status_report_frequency)
            .finish()
    }
}

impl ClusterRegistrationOptions {
    /// Built-in defaults. Fails only if a built-in default does not parse.
    pub fn with_defaults() -> Result<Self, String> {
        let status_collect_frequency = humantime::parse_duration(DEFAULT_STATUS_COLLECT_FREQUENCY)
            .map_err(|e| format!("default {}: {}", FLAG_STATUS_COLLECT_FREQUENCY, e))?;
        let status_report_frequency = humantime::parse_duration(DEFAULT_STATUS_REPORT_FREQUENCY)
            .map_err(|e| format!("default {}: {}", FLAG_STATUS_REPORT_FREQUENCY, e))?;

        Ok(Self {
            cluster_id: None,
            cluster_name: None,
            cluster_name_prefix: None,
            cluster_type: ClusterType::EdgeCluster,
            labels: BTreeMap::new(),
            parent_url: None,
            bootstrap_token: None,
            sync_mode: SyncMode::Pull,
            status_collect_frequency,
            status_report_frequency,
            name_generated: false,
        })
    }

    pub fn apply_flags(&mut self, flags: &ClusterRegistrationFlags) {
        if let Some(id) = &flags.cluster_id {
            self.cluster_id = Some(id.clone());
        }
        if let Some(name) = &flags.cluster_name {
            self.cluster_name = Some(name.clone());
        }
        if let Some(prefix) = &flags.cluster_name_prefix {
            self.cluster_name_prefix = Some(prefix.clone());
        }
        if let Some(cluster_type) = flags.cluster_type {
            self.cluster_type = cluster_type;
        }
        for label in &flags.labels {
            self.labels.insert(label.key.clone(), label.value.clone());
        }
        if let Some(url) = &flags.parent_url {
            self.parent_url = Some(url.clone());
        }
        if let Some(token) = &flags.bootstrap_token {
            self.bootstrap_token = Some(token.clone());
        }
        if let Some(mode) = flags.sync_mode {
            self.sync_mode = mode;
        }
        if let Some(freq) = flags.status_collect_frequency {
            self.status_collect_frequency = freq;
        }
        if let Some(freq) = flags.status_report_frequency {
            self.status_report_frequency = freq;
        }
    }

    pub fn effective_name_prefix(&self) -> &str {
        self.cluster_name_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CLUSTER_NAME_PREFIX)
    }

    /// Fills the identity fields that cannot be known at flag time.
    pub fn complete(&mut self, hostname: &str) -> Result<(), String> {
        if self.cluster_id.is_none() {
            let id = cluster_id_from_hostname(hostname).ok_or_else(|| {
                format!(
                    "cannot derive --{} from hostname {:?}, set it explicitly",
                    FLAG_CLUSTER_ID, hostname
                )
            })?;
            self.cluster_id = Some(id);
        }

        if self.cluster_name.is_none() {
            let suffix: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(CLUSTER_NAME_SUFFIX_LENGTH)
                .collect();
            self.cluster_name = Some(format!("{}-{}", self.effective_name_prefix(), suffix));
            self.name_generated = true;
        }

        Ok(())
    }

    /// Runs every registration check and returns all violations.
    pub fn validate(&self, features: &FeatureGates) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        match self.parent_url.as_deref() {
            None | Some("") => errors.push(FieldError::required(FLAG_PARENT_URL)),
            Some(raw) => {
                if let Err(reason) = check_parent_url(raw) {
                    errors.push(FieldError::new(FLAG_PARENT_URL, reason));
                }
            }
        }

        match self.bootstrap_token.as_deref() {
            None | Some("") => errors.push(FieldError::required(FLAG_BOOTSTRAP_TOKEN)),
            Some(token) => {
                if !is_valid_bootstrap_token(token) {
                    errors.push(FieldError::new(
                        FLAG_BOOTSTRAP_TOKEN,
                        "must be of the form [a-z0-9]{6}.[a-z0-9]{16}",
                    ));
                }
            }
        }

        match self.cluster_id.as_deref() {
            None => errors.push(FieldError::required(FLAG_CLUSTER_ID)),
            Some(id) => {
                if let Err(reason) = check_dns1123_label(id) {
                    errors.push(FieldError::new(FLAG_CLUSTER_ID, reason));
                }
            }
        }

        if self.cluster_name_prefix.is_some() && self.cluster_name.is_some() && !self.name_generated {
            errors.push(FieldError::new(
                FLAG_CLUSTER_NAME,
                format!("--{} and --{} are mutually exclusive", FLAG_CLUSTER_NAME, FLAG_CLUSTER_NAME_PREFIX),
            ));
        }

        if let Some(name) = self.cluster_name.as_deref() {
            let field = if self.name_generated {
                FLAG_CLUSTER_NAME_PREFIX
            } else {
                FLAG_CLUSTER_NAME
            };
            if name.len() > CLUSTER_NAME_MAX_LENGTH {
                errors.push(FieldError::new(
                    field,
                    format!("cluster name must be no more than {} characters", CLUSTER_NAME_MAX_LENGTH),
                ));
            } else if let Err(reason) = check_dns1123_label(name) {
                errors.push(FieldError::new(field, reason));
            }
        }

        for (key, value) in &self.labels {
            if let Err(reason) = check_label_key(key) {
                errors.push(FieldError::new(FLAG_CLUSTER_LABELS, format!("invalid key: {}", reason)));
            }
            if let Err(reason) = check_label_value(value) {
                errors.push(FieldError::new(FLAG_CLUSTER_LABELS, format!("invalid value: {}", reason)));
            }
        }

        if self.status_collect_frequency.is_zero() {
            errors.push(FieldError::new(FLAG_STATUS_COLLECT_FREQUENCY, "must be greater than 0"));
        }
        if self.status_report_frequency < self.status_collect_frequency {
            errors.push(FieldError::new(
                FLAG_STATUS_REPORT_FREQUENCY,
                format!("must not be less than --{}", FLAG_STATUS_COLLECT_FREQUENCY),
            ));
        }

        if matches!(self.sync_mode, SyncMode::Push | SyncMode::Dual)
            && !features.enabled(Feature::AppPusher)
        {
            errors.push(FieldError::new(
                FLAG_SYNC_MODE,
                format!("sync mode {} requires feature gate {}=true", self.sync_mode, Feature::AppPusher),
            ));
        }

        errors
    }

    pub fn effective_flags(&self) -> Vec<EffectiveFlag> {
        let labels = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");

        vec![
            EffectiveFlag::new(FLAG_CLUSTER_ID, self.cluster_id.clone().unwrap_or_default()),
            EffectiveFlag::new(FLAG_CLUSTER_NAME, self.cluster_name.clone().unwrap_or_default()),
            EffectiveFlag::new(FLAG_CLUSTER_NAME_PREFIX, self.effective_name_prefix()),
            EffectiveFlag::new(FLAG_CLUSTER_TYPE, self.cluster_type.to_string()),
            EffectiveFlag::new(FLAG_CLUSTER_LABELS, labels),
            EffectiveFlag::new(FLAG_PARENT_URL, self.parent_url.clone().unwrap_or_default()),
            EffectiveFlag::sensitive(
                FLAG_BOOTSTRAP_TOKEN,
                self.bootstrap_token.clone().unwrap_or_default(),
            ),
            EffectiveFlag::new(FLAG_SYNC_MODE, self.sync_mode.to_string()),
            EffectiveFlag::new(
                FLAG_STATUS_COLLECT_FREQUENCY,
                humantime::format_duration(self.status_collect_frequency).to_string(),
            ),
            EffectiveFlag::new(
                FLAG_STATUS_REPORT_FREQUENCY,
                humantime::format_duration(self.status_report_frequency).to_string(),
            ),
        ]
    }
}

/// Lowercases the hostname and folds anything outside `[a-z0-9-]` into `-`.
/// Returns `None` when nothing usable remains.
pub fn cluster_id_from_hostname(hostname: &str) -> Option<String> {
    let folded: String = hostname
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    let truncated: String = folded
        .trim_matches('-')
        .chars()
        .take(DNS1123_LABEL_MAX_LENGTH)
        .collect();
    let id = truncated.trim_end_matches('-');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

fn check_parent_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL {:?}: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}, expected http or https", parsed.scheme()));
    }
    if parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(format!("URL {:?} has no host", raw));
    }
    Ok(())
}

/// Bootstrap tokens are `<6 chars>.<16 chars>` of `[a-z0-9]`.
pub fn is_valid_bootstrap_token(token: &str) -> bool {
    let valid_part = |part: &str, len: usize| {
        part.len() == len
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    };
    match token.split_once('.') {
        Some((id, secret)) => valid_part(id, 6) && valid_part(secret, 16),
        None => false,
    }
}
