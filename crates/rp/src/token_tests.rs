// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{jwt_with_claims, jwt_with_exp};

const NOW: u64 = 1_700_000_000;

#[yare::parameterized(
    far_future = { NOW + 1000, 30, false },
    inside_margin = { NOW + 20, 30, true },
    exactly_at_margin = { NOW + 30, 30, true },
    just_past_margin = { NOW + 31, 30, false },
    already_expired = { NOW - 1, 0, true },
    expires_now = { NOW, 0, true },
)]
fn id_token_expiry(exp: u64, margin: u64, expired: bool) {
    let token = jwt_with_exp(exp);
    assert_eq!(has_id_token_expired_at(&token, margin, NOW), expired);
    assert_eq!(JwtExpiryValidator::fixed(NOW).has_id_token_expired(&token, margin), expired);
}

#[yare::parameterized(
    no_exp_claim = { jwt_with_claims(&serde_json::json!({ "sub": "alice" })) },
    not_a_jwt = { "opaque-token".to_owned() },
    bad_base64 = { "aGVhZGVy.!!!.sig".to_owned() },
    empty = { String::new() },
)]
fn unreadable_id_token_counts_as_expired(token: String) {
    assert!(has_id_token_expired_at(&token, 0, NOW));
}

#[yare::parameterized(
    none_recorded = { None, 30, true },
    far_future = { Some(NOW + 1000), 30, true },
    inside_margin = { Some(NOW + 10), 30, false },
    expired = { Some(NOW - 5), 0, false },
)]
fn access_token_validity(expires_at: Option<u64>, margin: u64, valid: bool) {
    assert_eq!(is_access_token_valid_at(expires_at, margin, NOW), valid);
    assert_eq!(JwtExpiryValidator::fixed(NOW).is_access_token_valid(expires_at, margin), valid);
}

#[test]
fn payload_is_decoded_without_verification() -> anyhow::Result<()> {
    let token = jwt_with_claims(&serde_json::json!({ "sub": "alice", "exp": 42 }));
    let payload = payload_from_token(&token).ok_or_else(|| anyhow::anyhow!("no payload"))?;
    assert_eq!(payload["sub"], "alice");
    assert_eq!(token_expiration(&token), Some(42));
    Ok(())
}

#[test]
fn padded_payload_is_accepted() {
    let token = jwt_with_exp(NOW);
    let (head, rest) = token.split_once('.').unwrap_or_default();
    let (payload, sig) = rest.split_once('.').unwrap_or_default();
    let padded = format!("{head}.{payload}==.{sig}");
    assert_eq!(token_expiration(&padded), Some(NOW));
}

#[test]
fn fractional_exp_is_truncated() {
    let token = jwt_with_claims(&serde_json::json!({ "exp": 10.9 }));
    assert_eq!(token_expiration(&token), Some(10));
}

#[test]
fn system_validator_uses_wall_clock() {
    let validator = JwtExpiryValidator::system();
    assert!(!validator.has_id_token_expired(&jwt_with_exp(epoch_secs() + 600), 30));
    assert!(validator.has_id_token_expired(&jwt_with_exp(epoch_secs() - 600), 0));
}
