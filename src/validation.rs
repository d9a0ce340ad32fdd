//! Runtime validation for values crossing the process boundary.
//!
//! Typed parameter structs cover most of what the wrappers used to check
//! dynamically; what remains is the handful of string-shaped values a caller
//! can still get wrong. Validation failures fail fast as
//! [`FlexClientError::Validation`] and are never routed through the retry
//! policy.

use serde_json::Value;

use crate::error::{FlexClientError, Result};

/// Require a resource identifier: the given two-letter prefix followed by
/// 32 hex characters
pub fn require_sid(value: &str, prefix: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(FlexClientError::Validation(format!(
            "{field} must be a non-empty string"
        )));
    }
    if !value.starts_with(prefix) {
        return Err(FlexClientError::Validation(format!(
            "{field} must start with '{prefix}', got '{value}'"
        )));
    }
    if value.len() != 34 || !value[2..].bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FlexClientError::Validation(format!(
            "{field} must be '{prefix}' followed by 32 hex characters, got '{value}'"
        )));
    }
    Ok(())
}

pub fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FlexClientError::Validation(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}

/// Require a JSON object where the platform schema demands one
pub fn require_object(value: &Value, field: &str) -> Result<()> {
    if !value.is_object() {
        return Err(FlexClientError::Validation(format!(
            "{field} must be a JSON object"
        )));
    }
    Ok(())
}
