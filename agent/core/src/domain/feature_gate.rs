// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! Feature gates
//!
//! Named boolean toggles for optional or experimental agent behaviour.
//!
//! Resolution happens exactly once at startup: built-in defaults, then the
//! `--feature-gates` overrides in command-line order. [`MutableFeatureGate`]
//! is the only writable form; [`MutableFeatureGate::seal`] turns it into an
//! immutable [`FeatureGates`] that is handed by value to every reader,
//! including the agent's background workers.

use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Every feature the agent knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Feature {
    /// Reach the parent cluster through a websocket tunnel instead of direct dialing.
    SocketConnection,
    /// Allow the parent cluster to push workloads (sync modes `Push` and `Dual`).
    AppPusher,
    /// Run the in-cluster deployer for pulled workloads.
    Deployer,
    /// Serve scheduling predictions for this cluster.
    Predictor,
    /// Re-create resources removed out of band.
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Maturity {
    Alpha,
    Beta,
    GA,
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maturity::Alpha => write!(f, "ALPHA"),
            Maturity::Beta => write!(f, "BETA"),
            Maturity::GA => write!(f, "GA"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    pub default: bool,
    pub maturity: Maturity,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::SocketConnection,
        Feature::AppPusher,
        Feature::Deployer,
        Feature::Predictor,
        Feature::Recovery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::SocketConnection => "SocketConnection",
            Feature::AppPusher => "AppPusher",
            Feature::Deployer => "Deployer",
            Feature::Predictor => "Predictor",
            Feature::Recovery => "Recovery",
        }
    }

    pub fn spec(self) -> FeatureSpec {
        match self {
            Feature::SocketConnection => FeatureSpec { default: true, maturity: Maturity::Beta },
            Feature::AppPusher => FeatureSpec { default: true, maturity: Maturity::Beta },
            Feature::Deployer => FeatureSpec { default: false, maturity: Maturity::Alpha },
            Feature::Predictor => FeatureSpec { default: false, maturity: Maturity::Alpha },
            Feature::Recovery => FeatureSpec { default: false, maturity: Maturity::Alpha },
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureGateError {
    #[error("unrecognized feature gate: {0}")]
    UnknownFeature(String),
    #[error("missing bool value for {0}")]
    MissingValue(String),
    #[error("invalid value of {name}={value}, err: expected true or false")]
    InvalidValue { name: String, value: String },
}

impl FromStr for Feature {
    type Err = FeatureGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| FeatureGateError::UnknownFeature(s.to_string()))
    }
}

/// One `Name=bool` pair from `--feature-gates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureOverride {
    pub feature: Feature,
    pub enabled: bool,
}

impl FromStr for FeatureOverride {
    type Err = FeatureGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| FeatureGateError::MissingValue(s.to_string()))?;
        let (name, value) = (name.trim(), value.trim());
        let feature = name.parse::<Feature>()?;
        let enabled = match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "t" => true,
            "false" | "0" | "f" => false,
            _ => {
                return Err(FeatureGateError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            }
        };
        Ok(Self { feature, enabled })
    }
}

/// Value parser for `--feature-gates`; unknown names fail at parse time.
pub fn parse_feature_override(s: &str) -> Result<FeatureOverride, String> {
    s.parse::<FeatureOverride>().map_err(|e| e.to_string())
}

fn feature_gates_help() -> String {
    let mut help = String::from(
        "A set of key=value pairs that describe feature gates for alpha/experimental features. Options are:",
    );
    let mut features = Feature::ALL.to_vec();
    features.sort_by_key(|f| f.as_str());
    for feature in features {
        let spec = feature.spec();
        help.push_str(&format!(
            "\n{}=true|false ({} - default={})",
            feature, spec.maturity, spec.default
        ));
    }
    help
}

/// Binds `--feature-gates` onto a command.
#[derive(Debug, Clone, Default, Args)]
pub struct FeatureGateFlags {
    #[arg(
        long = "feature-gates",
        env = "TETHER_FEATURE_GATES",
        value_name = "NAME=BOOL",
        value_delimiter = ',',
        value_parser = parse_feature_override,
        help = feature_gates_help()
    )]
    pub feature_gates: Vec<FeatureOverride>,
}

/// Writable feature gate, used only while flags are being applied.
#[derive(Debug, Clone)]
pub struct MutableFeatureGate {
    enabled: BTreeMap<Feature, bool>,
    explicit: BTreeMap<Feature, bool>,
}

impl Default for MutableFeatureGate {
    fn default() -> Self {
        Self::new()
    }
}

impl MutableFeatureGate {
    /// All known features at their defaults.
    pub fn new() -> Self {
        Self {
            enabled: Feature::ALL
                .into_iter()
                .map(|feature| (feature, feature.spec().default))
                .collect(),
            explicit: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        self.enabled.insert(feature, enabled);
        self.explicit.insert(feature, enabled);
    }

    /// Applies overrides in order; a later entry for the same feature wins.
    pub fn apply(&mut self, overrides: &[FeatureOverride]) {
        for o in overrides {
            self.set(o.feature, o.enabled);
        }
    }

    /// Freezes the gate. Nothing can change it afterwards.
    pub fn seal(self) -> FeatureGates {
        FeatureGates {
            enabled: Arc::new(self.enabled),
            explicit: Arc::new(self.explicit),
        }
    }
}

/// Sealed, read-only feature gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGates {
    enabled: Arc<BTreeMap<Feature, bool>>,
    explicit: Arc<BTreeMap<Feature, bool>>,
}

impl Default for FeatureGates {
    fn default() -> Self {
        MutableFeatureGate::new().seal()
    }
}

impl FeatureGates {
    /// Defaults plus `overrides`, sealed.
    pub fn from_overrides(overrides: &[FeatureOverride]) -> Self {
        let mut gate = MutableFeatureGate::new();
        gate.apply(overrides);
        gate.seal()
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.enabled
            .get(&feature)
            .copied()
            .unwrap_or_else(|| feature.spec().default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        self.enabled.iter().map(|(feature, enabled)| (*feature, *enabled))
    }

    /// The explicitly set gates rendered the way `--feature-gates` accepts them.
    pub fn flag_value(&self) -> String {
        let mut pairs: Vec<String> = self
            .explicit
            .iter()
            .map(|(feature, enabled)| format!("{}={}", feature, enabled))
            .collect();
        pairs.sort();
        pairs.join(",")
    }
}
