// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! Build identification printed by `--version`.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// Value of the `--version` flag. A bare `--version` means `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum VersionRequest {
    #[default]
    #[value(name = "false")]
    Off,
    #[value(name = "true")]
    Short,
    #[value(name = "raw")]
    Raw,
}

impl VersionRequest {
    pub fn requested(self) -> bool {
        self != VersionRequest::Off
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Off => write!(f, "false"),
            VersionRequest::Short => write!(f, "true"),
            VersionRequest::Raw => write!(f, "raw"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_date: &'static str,
    pub platform: String,
}

impl VersionInfo {
    /// Commit and build date are stamped through `TETHER_GIT_COMMIT` and
    /// `TETHER_BUILD_DATE` at compile time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("TETHER_GIT_COMMIT").unwrap_or("unknown"),
            build_date: option_env!("TETHER_BUILD_DATE").unwrap_or("unknown"),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    /// Renders the version for the given request; `None` when not requested.
    pub fn render(&self, command: &str, request: VersionRequest) -> anyhow::Result<Option<String>> {
        match request {
            VersionRequest::Off => Ok(None),
            VersionRequest::Short => Ok(Some(format!(
                "{} version {} (commit {})",
                command, self.version, self.git_commit
            ))),
            VersionRequest::Raw => Ok(Some(serde_json::to_string_pretty(self)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_version_line() {
        let info = VersionInfo::current();
        let line = info
            .render("tether-agent", VersionRequest::Short)
            .unwrap()
            .unwrap();
        assert!(line.starts_with("tether-agent version "));
        assert!(line.contains(env!("CARGO_PKG_VERSION")));
        assert!(line.ends_with(')'));
    }

    #[test]
    fn test_raw_version_is_json() {
        let rendered = VersionInfo::current()
            .render("tether-agent", VersionRequest::Raw)
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert!(value.get("gitCommit").is_some());
        assert!(value.get("platform").is_some());
    }

    #[test]
    fn test_off_renders_nothing() {
        assert!(VersionInfo::current()
            .render("tether-agent", VersionRequest::Off)
            .unwrap()
            .is_none());
    }
}
