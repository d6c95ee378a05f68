// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

const REDACTED: &str = "<redacted>";

/// Resolved value of one command-line flag, as reported in the startup
/// flag dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveFlag {
    pub name: &'static str,
    pub value: String,
    /// Sensitive values are never rendered.
    pub sensitive: bool,
}

impl EffectiveFlag {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            sensitive: true,
        }
    }

    /// The value as it may appear in logs.
    pub fn display_value(&self) -> &str {
        if self.sensitive && !self.value.is_empty() {
            REDACTED
        } else {
            &self.value
        }
    }
}

impl fmt::Display for EffectiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}={:?}", self.name, self.display_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let flag = EffectiveFlag::new("cluster-id", "edge-01");
        assert_eq!(flag.to_string(), "--cluster-id=\"edge-01\"");

        let token = EffectiveFlag::sensitive("cluster-reg-token", "abcdef.0123456789abcdef");
        assert_eq!(token.to_string(), "--cluster-reg-token=\"<redacted>\"");

        let unset = EffectiveFlag::sensitive("cluster-reg-token", "");
        assert_eq!(unset.to_string(), "--cluster-reg-token=\"\"");
    }
}
