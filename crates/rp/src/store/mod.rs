// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value persistence for the token set and authorization flag.
//!
//! The store holds no logic: values are opaque strings written and read
//! verbatim. Tokens may be percent-encoded at rest; decoding happens in the
//! state machine getters.

pub mod file;

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use file::FileStore;

/// Keys persisted by the client core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKey {
    AuthorizedState,
    IdToken,
    AccessToken,
    RefreshToken,
    /// Access-token expiry as epoch seconds.
    AccessTokenExpiresIn,
    SessionState,
    /// Raw token response stored by the callback path.
    AuthResult,
}

impl StorageKey {
    /// Every key cleared by [`TokenStore::reset_auth_state`].
    pub const AUTH_STATE: [StorageKey; 7] = [
        Self::AuthorizedState,
        Self::IdToken,
        Self::AccessToken,
        Self::RefreshToken,
        Self::AccessTokenExpiresIn,
        Self::SessionState,
        Self::AuthResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizedState => "authorizedState",
            Self::IdToken => "idToken",
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::AccessTokenExpiresIn => "accessTokenExpiresIn",
            Self::SessionState => "sessionState",
            Self::AuthResult => "authResult",
        }
    }
}

/// Synchronous get/set storage contract.
///
/// Implementations must make [`reset_auth_state`](TokenStore::reset_auth_state)
/// a single atomic step: observers never see a partially cleared set.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Option<String>;

    fn set(&self, key: StorageKey, value: &str);

    fn reset_auth_state(&self);
}

/// In-process store; contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with initial values, e.g. to simulate a reload.
    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (StorageKey, String)>,
    {
        Self { values: Mutex::new(values.into_iter().collect()) }
    }

    pub fn snapshot(&self) -> HashMap<StorageKey, String> {
        self.values.lock().clone()
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        self.values.lock().insert(key, value.to_owned());
    }

    fn reset_auth_state(&self) {
        let mut values = self.values.lock();
        for key in StorageKey::AUTH_STATE {
            values.remove(&key);
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
