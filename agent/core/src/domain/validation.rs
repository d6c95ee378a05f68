// Copyright (c) 2026 Tether Authors
// SPDX-License-Identifier: Apache-2.0

//! Field-level validation results.
//!
//! Option validation is exhaustive: every check runs and each violation is
//! recorded as a [`FieldError`], so operators see all problems at once.

use serde::Serialize;
use std::fmt;

/// Maximum length of a DNS-1123 label.
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// A single violated constraint, keyed by the flag name that controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "required")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}: {}", self.field, self.message)
    }
}

/// Aggregate of every [`FieldError`] found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True when at least one violation names `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was recorded, otherwise the aggregate.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", error)?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks `value` against RFC 1123 label syntax: lowercase alphanumerics and
/// `-`, starting and ending with an alphanumeric, at most 63 characters.
///
/// Returns a human-readable reason on failure.
pub fn check_dns1123_label(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(format!(
            "must be no more than {} characters",
            DNS1123_LABEL_MAX_LENGTH
        ));
    }
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let alnum_edges = value
        .chars()
        .next()
        .zip(value.chars().last())
        .map(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric())
        .unwrap_or(false);
    if !valid_chars || !alnum_edges {
        return Err(format!(
            "'{}' must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character",
            value
        ));
    }
    Ok(())
}

/// Checks a Kubernetes label name segment or label value body: alphanumerics,
/// `-`, `_` and `.`, alphanumeric at both ends, at most 63 characters.
fn check_qualified_segment(value: &str) -> Result<(), String> {
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(format!(
            "'{}' must be no more than {} characters",
            value, DNS1123_LABEL_MAX_LENGTH
        ));
    }
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    let alnum_edges = value
        .chars()
        .next()
        .zip(value.chars().last())
        .map(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric())
        .unwrap_or(false);
    if !valid_chars || !alnum_edges {
        return Err(format!(
            "'{}' must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character",
            value
        ));
    }
    Ok(())
}

/// Checks a label key, optionally prefixed with a DNS subdomain and `/`.
pub fn check_label_key(key: &str) -> Result<(), String> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > 253 {
            return Err(format!("prefix of '{}' must be 1-253 characters", key));
        }
        for part in prefix.split('.') {
            check_dns1123_label(part).map_err(|reason| format!("prefix of '{}': {}", key, reason))?;
        }
    }
    if name.is_empty() {
        return Err(format!("name part of '{}' must not be empty", key));
    }
    check_qualified_segment(name)
}

/// Checks a label value; empty values are allowed.
pub fn check_label_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    check_qualified_segment(value)
}
