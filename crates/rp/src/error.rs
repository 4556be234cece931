// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy shared by the state machine, session monitor and validator.
///
/// None of these abort the caller. They are attached to log records and to
/// [`crate::events::AuthorizationResult`] so an external decision-maker can act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Required configuration or well-known data is absent.
    ConfigurationMissing,
    /// The provider stopped answering heartbeats.
    TransientLiveness,
    /// A response or message failed validation.
    ValidationFailure,
    /// A stored token has expired (or is inside the renewal lead time).
    Expiry,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "CONFIGURATION_MISSING",
            Self::TransientLiveness => "TRANSIENT_LIVENESS",
            Self::ValidationFailure => "VALIDATION_FAILURE",
            Self::Expiry => "EXPIRY",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
