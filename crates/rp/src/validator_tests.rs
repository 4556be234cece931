// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::config::ClientConfig;
use crate::events::{AuthEvent, EventKind, PublicEvents};
use crate::store::{MemoryStore, StorageKey, TokenStore};
use crate::test_support::jwt_with_exp;
use crate::token::{epoch_secs, JwtExpiryValidator};

const INTERVAL: Duration = Duration::from_secs(3);

fn fixture() -> (PeriodicTokenValidator, Arc<MemoryStore>, PublicEvents) {
    let store = Arc::new(MemoryStore::new());
    let events = PublicEvents::new();
    let auth_state = Arc::new(AuthStateService::new(
        &ClientConfig::default(),
        store.clone(),
        Arc::new(JwtExpiryValidator::system()),
        events.clone(),
    ));
    (PeriodicTokenValidator::new(auth_state), store, events)
}

fn drain(rx: &mut broadcast::Receiver<AuthEvent>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => kinds.push(event.kind()),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break kinds,
        }
    }
}

async fn ticks(n: u32) {
    tokio::time::sleep(INTERVAL * n + Duration::from_millis(100)).await;
}

#[tokio::test(start_paused = true)]
async fn each_tick_runs_both_checks() -> anyhow::Result<()> {
    let (validator, store, events) = fixture();
    store.set(StorageKey::IdToken, &jwt_with_exp(epoch_secs() - 10));
    store.set(StorageKey::AccessTokenExpiresIn, &(epoch_secs() - 10).to_string());
    let mut rx = events.subscribe();

    validator.start(INTERVAL);
    ticks(2).await;

    assert_eq!(
        drain(&mut rx),
        vec![
            EventKind::IdTokenExpired,
            EventKind::TokenExpired,
            EventKind::IdTokenExpired,
            EventKind::TokenExpired,
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn valid_tokens_publish_nothing() -> anyhow::Result<()> {
    let (validator, store, events) = fixture();
    store.set(StorageKey::IdToken, &jwt_with_exp(epoch_secs() + 3600));
    let mut rx = events.subscribe();

    validator.start(INTERVAL);
    ticks(3).await;
    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() -> anyhow::Result<()> {
    let (validator, _store, events) = fixture();
    let mut rx = events.subscribe();

    validator.start(INTERVAL);
    validator.start(INTERVAL);
    ticks(1).await;

    // Missing ID token counts as expired: one event per tick, single timer.
    assert_eq!(drain(&mut rx), vec![EventKind::IdTokenExpired]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn skips_while_silent_renew_runs() -> anyhow::Result<()> {
    let (validator, _store, events) = fixture();
    let mut rx = events.subscribe();

    validator.set_silent_renew_running(true);
    validator.start(INTERVAL);
    ticks(2).await;
    assert!(drain(&mut rx).is_empty());

    validator.set_silent_renew_running(false);
    ticks(1).await;
    assert_eq!(drain(&mut rx), vec![EventKind::IdTokenExpired]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_ends_validation() -> anyhow::Result<()> {
    let (validator, _store, events) = fixture();
    let mut rx = events.subscribe();

    validator.start(INTERVAL);
    ticks(1).await;
    validator.stop();
    assert!(!validator.is_running());
    ticks(3).await;

    assert_eq!(drain(&mut rx).len(), 1);
    Ok(())
}
