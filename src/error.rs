//! Engine Errors
//!
//! Fatal failures abort a single calculation and carry the name of the
//! offending config key, category, or request field. Soft data gaps (an
//! unresolvable emission factor) are never errors; they surface as
//! `incomplete` results instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CarbonError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CarbonError {
    /// A required baseline or configuration document is absent.
    #[error("missing configuration: {key}")]
    ConfigMissing { key: String },

    /// A configuration document exists but violates its invariants.
    #[error("invalid configuration {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    /// Malformed request, rejected before any resolution work.
    #[error("invalid request field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("store read failed: {0}")]
    Store(String),

    #[error("store read timed out: {operation}")]
    StoreTimeout { operation: String },
}

impl CarbonError {
    pub fn config_missing(key: impl Into<String>) -> Self {
        Self::ConfigMissing { key: key.into() }
    }

    pub fn config_invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is an administrator-actionable data problem
    /// rather than a transient store fault.
    pub fn is_config_problem(&self) -> bool {
        matches!(self, Self::ConfigMissing { .. } | Self::ConfigInvalid { .. })
    }
}
