// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public notification bus.
//!
//! Every component publishes through a single multicast channel so any
//! observer can see any event without the core knowing who listens. Generic
//! events are delivered in emission order with no replay; the two boolean
//! channels (`authorized$`, `check_session_changed$`) live on `watch` senders
//! owned by their components and replay the latest value to new subscribers.

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::config::ClientConfig;
use crate::error::ErrorKind;

/// Outcome of an authorization attempt (callback, silent renew, restore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResult {
    pub is_authenticated: bool,
    #[serde(default)]
    pub is_renew_process: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ErrorKind>,
}

impl AuthorizationResult {
    pub fn authenticated(is_renew_process: bool) -> Self {
        Self { is_authenticated: true, is_renew_process, validation_result: None }
    }

    pub fn unauthenticated(is_renew_process: bool, reason: ErrorKind) -> Self {
        Self { is_authenticated: false, is_renew_process, validation_result: Some(reason) }
    }
}

/// Notifications published by the client core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// Configuration accepted by the client.
    ConfigLoaded { config: ClientConfig },
    /// An authorization attempt resolved.
    NewAuthorizationResult(AuthorizationResult),
    /// The stored ID token is expired or inside the renewal lead time.
    IdTokenExpired { expired: bool },
    /// The stored access token is expired or inside the renewal lead time.
    TokenExpired { expired: bool },
    /// The check-session frame answered with something other than `error`.
    CheckSessionReceived { raw: String },
}

/// Discriminant of [`AuthEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ConfigLoaded,
    NewAuthorizationResult,
    IdTokenExpired,
    TokenExpired,
    CheckSessionReceived,
}

impl AuthEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConfigLoaded { .. } => EventKind::ConfigLoaded,
            Self::NewAuthorizationResult(_) => EventKind::NewAuthorizationResult,
            Self::IdTokenExpired { .. } => EventKind::IdTokenExpired,
            Self::TokenExpired { .. } => EventKind::TokenExpired,
            Self::CheckSessionReceived { .. } => EventKind::CheckSessionReceived,
        }
    }
}

/// Multicast hub for [`AuthEvent`]s. Cheap to clone; clones share the channel.
#[derive(Debug, Clone)]
pub struct PublicEvents {
    event_tx: broadcast::Sender<AuthEvent>,
}

impl PublicEvents {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self { event_tx }
    }

    /// Publish to all current subscribers. Having none is not an error.
    pub fn fire(&self, event: AuthEvent) {
        tracing::trace!(kind = ?event.kind(), "firing event");
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.event_tx.subscribe()
    }

    /// Lazy stream of events of a single kind. Lagged items are skipped.
    pub fn events_of(&self, kind: EventKind) -> impl Stream<Item = AuthEvent> + Send + 'static {
        BroadcastStream::new(self.event_tx.subscribe()).filter_map(move |item| async move {
            match item {
                Ok(event) if event.kind() == kind => Some(event),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(err = %e, "event subscriber lagged");
                    None
                }
            }
        })
    }
}

impl Default for PublicEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
