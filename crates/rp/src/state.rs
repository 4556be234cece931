// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization state machine.
//!
//! The in-memory [`AuthorizedState`] is the single source of truth for "is the
//! user logged in". Storage is a durability mirror written on every
//! transition; on restore it is only trusted after expiry checks.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::ErrorKind;
use crate::events::{AuthEvent, AuthorizationResult, PublicEvents};
use crate::store::{StorageKey, TokenStore};
use crate::token::TokenValidator;

/// Authorization state; persisted under `authorizedState`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizedState {
    #[default]
    Unknown,
    Authorized,
    Unauthorized,
}

impl AuthorizedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Authorized => "Authorized",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

impl fmt::Display for AuthorizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorizedState {
    type Err = std::convert::Infallible;

    /// Unrecognised values parse as `Unknown` so a corrupt flag forces a fresh check.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Authorized" => Self::Authorized,
            "Unauthorized" => Self::Unauthorized,
            _ => Self::Unknown,
        })
    }
}

/// Owns the current authorization state and gates token exposure on it.
pub struct AuthStateService {
    store: Arc<dyn TokenStore>,
    validator: Arc<dyn TokenValidator>,
    events: PublicEvents,
    renew_margin_secs: u64,
    auth_state: Mutex<AuthorizedState>,
    authorized_tx: watch::Sender<bool>,
}

impl AuthStateService {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        validator: Arc<dyn TokenValidator>,
        events: PublicEvents,
    ) -> Self {
        let (authorized_tx, _) = watch::channel(false);
        Self {
            store,
            validator,
            events,
            renew_margin_secs: config.renew_time_before_token_expires_in_seconds,
            auth_state: Mutex::new(AuthorizedState::Unknown),
            authorized_tx,
        }
    }

    /// Authorized-flag channel; new receivers observe the latest value at once.
    pub fn authorized(&self) -> watch::Receiver<bool> {
        self.authorized_tx.subscribe()
    }

    pub fn current_state(&self) -> AuthorizedState {
        *self.auth_state.lock()
    }

    pub fn set_authorized_and_fire_event(&self) {
        *self.auth_state.lock() = AuthorizedState::Authorized;
        self.store.set(StorageKey::AuthorizedState, AuthorizedState::Authorized.as_str());
        self.authorized_tx.send_replace(true);
    }

    pub fn set_unauthorized_and_fire_event(&self) {
        *self.auth_state.lock() = AuthorizedState::Unauthorized;
        self.store.reset_auth_state();
        self.authorized_tx.send_replace(false);
    }

    /// Restore from storage. A persisted `Unauthorized` is not adopted: only
    /// `Authorized` survives a reload, anything else becomes `Unknown`.
    pub fn init_from_storage(&self) {
        let persisted = self.persisted_state();
        let state = if persisted == AuthorizedState::Authorized {
            AuthorizedState::Authorized
        } else {
            AuthorizedState::Unknown
        };
        tracing::debug!(persisted = %persisted, adopted = %state, "restored auth state");
        *self.auth_state.lock() = state;
    }

    pub fn update_and_publish_auth_state(&self, result: AuthorizationResult) {
        self.events.fire(AuthEvent::NewAuthorizationResult(result));
    }

    pub fn set_authorization_data(&self, access_token: &str, id_token: &str) {
        tracing::debug!("storing tokens");
        self.store.set(StorageKey::AccessToken, access_token);
        self.store.set(StorageKey::IdToken, id_token);
        self.set_authorized_and_fire_event();
    }

    /// Record the access-token lifetime reported by the token endpoint.
    pub fn set_access_token_expires_at(&self, expires_at: u64) {
        self.store.set(StorageKey::AccessTokenExpiresIn, &expires_at.to_string());
    }

    pub fn set_refresh_token(&self, refresh_token: &str) {
        self.store.set(StorageKey::RefreshToken, refresh_token);
    }

    pub fn set_session_state(&self, session_state: &str) {
        self.store.set(StorageKey::SessionState, session_state);
    }

    pub fn set_auth_result_in_storage(&self, auth_result: &serde_json::Value) {
        self.store.set(StorageKey::AuthResult, &auth_result.to_string());
    }

    pub fn get_access_token(&self) -> String {
        self.gated_token(StorageKey::AccessToken)
    }

    pub fn get_id_token(&self) -> String {
        self.gated_token(StorageKey::IdToken)
    }

    pub fn get_refresh_token(&self) -> String {
        self.gated_token(StorageKey::RefreshToken)
    }

    /// Whether persisted credentials can be trusted without a round-trip.
    pub fn are_auth_storage_tokens_valid(&self) -> bool {
        let persisted = self.persisted_state();
        if persisted != AuthorizedState::Authorized {
            return false;
        }
        tracing::debug!(persisted = %persisted, "authorizedState in storage");

        if self.has_id_token_expired() {
            tracing::debug!(kind = %ErrorKind::Expiry, "persisted id_token is expired");
            return false;
        }

        if self.has_access_token_expired_if_expiry_exists() {
            tracing::debug!(kind = %ErrorKind::Expiry, "persisted access_token is expired");
            return false;
        }

        tracing::debug!("persisted id_token and access token are valid");
        true
    }

    /// Check the stored ID token; fires [`AuthEvent::IdTokenExpired`] when expired.
    pub fn has_id_token_expired(&self) -> bool {
        let token = self.store.get(StorageKey::IdToken).unwrap_or_default();
        let expired = self.validator.has_id_token_expired(&token, self.renew_margin_secs);
        if expired {
            self.events.fire(AuthEvent::IdTokenExpired { expired });
        }
        expired
    }

    /// Check the recorded access-token expiry; no record counts as not expired.
    /// Fires [`AuthEvent::TokenExpired`] when expired.
    pub fn has_access_token_expired_if_expiry_exists(&self) -> bool {
        let expires_at =
            self.store.get(StorageKey::AccessTokenExpiresIn).and_then(|v| v.trim().parse().ok());
        let expired = !self.validator.is_access_token_valid(expires_at, self.renew_margin_secs);
        if expired {
            self.events.fire(AuthEvent::TokenExpired { expired });
        }
        expired
    }

    fn gated_token(&self, key: StorageKey) -> String {
        if self.current_state() != AuthorizedState::Authorized {
            return String::new();
        }
        let raw = self.store.get(key).unwrap_or_default();
        match urlencoding::decode(&raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => raw,
        }
    }

    fn persisted_state(&self) -> AuthorizedState {
        self.store
            .get(StorageKey::AuthorizedState)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
