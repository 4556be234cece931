// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenID Connect relying-party client core: authorization state machine,
//! check-session heartbeat monitor and periodic token validation.

pub mod check_session;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod state;
pub mod store;
pub mod test_support;
pub mod token;
pub mod validator;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::check_session::HeadlessHost;
use crate::client::OidcClient;
use crate::config::Cli;
use crate::events::PublicEvents;
use crate::state::AuthorizedState;
use crate::store::FileStore;

/// Summary printed by the `oidc-rp` binary after bootstrap.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
    pub is_authenticated: bool,
    pub authorized_state: AuthorizedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token_claims: Option<serde_json::Value>,
}

/// Restore a client from a file-backed store, report its state, and
/// optionally keep validating tokens for `--watch-secs`, printing every
/// event as a JSON line.
pub async fn run(cli: Cli) -> anyhow::Result<AuthReport> {
    let config = cli.client_config()?;
    let store = Arc::new(FileStore::open(&cli.store)?);
    tracing::info!(store = %store.path().display(), "restoring client state");

    let events = PublicEvents::new();
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(err = %e, "failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });

    let client = OidcClient::builder(config, Arc::new(HeadlessHost::new()))
        .store(store)
        .events(events)
        .build();

    let is_authenticated = client.check_auth("").await;
    let report = AuthReport {
        is_authenticated,
        authorized_state: client.authorized_state(),
        id_token_claims: client.payload_from_id_token(),
    };

    if is_authenticated && !cli.watch_duration().is_zero() {
        tracing::info!(secs = cli.watch_secs, "watching token expiry");
        tokio::time::sleep(cli.watch_duration()).await;
    }
    client.token_validator().stop();
    client.check_session().stop();

    Ok(report)
}
