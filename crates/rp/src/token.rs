// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token expiry checks and unverified JWT payload decoding.
//!
//! Signatures, nonces and audiences are validated by the callback path before
//! tokens reach the store; everything here only reads the `exp` claim.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Expiry contract consumed by the state machine.
pub trait TokenValidator: Send + Sync {
    /// True when `token` has no readable `exp` or expires within `renew_margin_secs`.
    fn has_id_token_expired(&self, token: &str, renew_margin_secs: u64) -> bool;

    /// True when no expiry is recorded or it lies beyond `renew_margin_secs`.
    fn is_access_token_valid(&self, expires_at: Option<u64>, renew_margin_secs: u64) -> bool;
}

/// Reads `exp` from the JWT payload and compares it against a clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtExpiryValidator {
    fixed_now: Option<u64>,
}

impl JwtExpiryValidator {
    /// Validator using the system clock.
    pub fn system() -> Self {
        Self { fixed_now: None }
    }

    /// Validator frozen at `now` (epoch seconds).
    pub fn fixed(now: u64) -> Self {
        Self { fixed_now: Some(now) }
    }

    fn now(&self) -> u64 {
        self.fixed_now.unwrap_or_else(epoch_secs)
    }
}

impl TokenValidator for JwtExpiryValidator {
    fn has_id_token_expired(&self, token: &str, renew_margin_secs: u64) -> bool {
        has_id_token_expired_at(token, renew_margin_secs, self.now())
    }

    fn is_access_token_valid(&self, expires_at: Option<u64>, renew_margin_secs: u64) -> bool {
        is_access_token_valid_at(expires_at, renew_margin_secs, self.now())
    }
}

pub fn has_id_token_expired_at(token: &str, renew_margin_secs: u64, now: u64) -> bool {
    match token_expiration(token) {
        Some(exp) => exp <= now.saturating_add(renew_margin_secs),
        None => true,
    }
}

pub fn is_access_token_valid_at(expires_at: Option<u64>, renew_margin_secs: u64, now: u64) -> bool {
    match expires_at {
        Some(exp) => exp > now.saturating_add(renew_margin_secs),
        None => true,
    }
}

/// Decode the claims segment of a compact JWT without verifying it.
pub fn payload_from_token(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_header, payload) = (parts.next()?, parts.next()?);
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// `exp` claim in epoch seconds. Fractional values are truncated.
pub fn token_expiration(token: &str) -> Option<u64> {
    let exp = payload_from_token(token)?.get("exp")?.clone();
    exp.as_u64().or_else(|| exp.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Return current epoch seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
