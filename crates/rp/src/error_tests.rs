// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    configuration_missing = { ErrorKind::ConfigurationMissing, "CONFIGURATION_MISSING" },
    transient_liveness = { ErrorKind::TransientLiveness, "TRANSIENT_LIVENESS" },
    validation_failure = { ErrorKind::ValidationFailure, "VALIDATION_FAILURE" },
    expiry = { ErrorKind::Expiry, "EXPIRY" },
)]
fn display(kind: ErrorKind, expected: &str) {
    assert_eq!(kind.to_string(), expected);
    assert_eq!(kind.as_str(), expected);
}

#[test]
fn serializes_as_variant_name() -> anyhow::Result<()> {
    let json = serde_json::to_string(&ErrorKind::Expiry)?;
    assert_eq!(json, "\"Expiry\"");
    Ok(())
}
