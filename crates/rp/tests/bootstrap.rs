// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end bootstrap across simulated page reloads.

use std::sync::Arc;

use clap::Parser;

use oidc_rp::check_session::{HeadlessHost, HostEvent, CHECK_SESSION_FRAME_ID};
use oidc_rp::client::OidcClient;
use oidc_rp::config::{Cli, ClientConfig};
use oidc_rp::events::{AuthEvent, EventKind};
use oidc_rp::state::AuthorizedState;
use oidc_rp::store::{FileStore, StorageKey, TokenStore};
use oidc_rp::test_support::{jwt_with_exp, FakeFrameHost};
use oidc_rp::token::epoch_secs;

fn config() -> ClientConfig {
    ClientConfig {
        sts_server: "https://idp.example".to_owned(),
        client_id: "spa".to_owned(),
        start_check_session: true,
        renew_time_before_token_expires_in_seconds: 30,
        check_session_iframe: Some("https://idp.example/connect/checksession".to_owned()),
        ..ClientConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn login_survives_reload_and_logoff_does_not() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    // First page load: a callback collaborator stores fresh tokens.
    {
        let store = Arc::new(FileStore::open(&path)?);
        let client =
            OidcClient::builder(config(), Arc::new(HeadlessHost::new())).store(store).build();
        assert!(!client.check_auth("").await);

        let id_token = jwt_with_exp(epoch_secs() + 3600);
        client.auth_state().set_session_state("sess-abc");
        client.auth_state().set_authorization_data("AT%201", &id_token);
        assert_eq!(client.get_token(), "AT 1");
    }

    // Reload: state and tokens come back from disk.
    {
        let store = Arc::new(FileStore::open(&path)?);
        let host = Arc::new(FakeFrameHost::new());
        let client = OidcClient::builder(config(), host.clone()).store(store).build();
        assert_eq!(client.authorized_state(), AuthorizedState::Authorized);
        assert!(client.check_auth("").await);
        assert_eq!(client.get_token(), "AT 1");

        tokio::time::sleep(std::time::Duration::from_millis(3100)).await;
        assert_eq!(host.posts().len(), 1);

        let mut rx = client.subscribe_events();
        host.emit(HostEvent::Message(host.reply_from(
            CHECK_SESSION_FRAME_ID,
            "https://idp.example",
            "changed",
        )));
        let event = rx.recv().await?;
        assert_eq!(event, AuthEvent::CheckSessionReceived { raw: "changed".to_owned() });
        assert!(client.server_state_changed());

        client.logoff_local();
    }

    // Reload after logoff: nothing to restore.
    let store = Arc::new(FileStore::open(&path)?);
    assert_eq!(store.get(StorageKey::AuthorizedState), None);
    let client = OidcClient::builder(config(), Arc::new(HeadlessHost::new())).store(store).build();
    assert_eq!(client.authorized_state(), AuthorizedState::Unknown);
    assert!(!client.check_auth("").await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn expiring_access_token_triggers_renewal_signal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileStore::open(dir.path().join("tokens.json"))?);
    store.set(StorageKey::AuthorizedState, "Authorized");
    store.set(StorageKey::IdToken, &jwt_with_exp(epoch_secs() + 3600));
    store.set(StorageKey::AccessTokenExpiresIn, &(epoch_secs() + 3600).to_string());

    let client = OidcClient::builder(config(), Arc::new(HeadlessHost::new()))
        .store(store.clone())
        .build();
    assert!(client.check_auth("").await);

    // The provider shortened the access-token lifetime on the last refresh.
    store.set(StorageKey::AccessTokenExpiresIn, &(epoch_secs() + 10).to_string());
    let mut rx = client.subscribe_events();
    tokio::time::sleep(std::time::Duration::from_millis(3100)).await;

    assert_eq!(rx.try_recv()?.kind(), EventKind::TokenExpired);
    Ok(())
}

#[tokio::test]
async fn run_reports_restored_state() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    {
        let store = FileStore::open(&path)?;
        store.set(StorageKey::AuthorizedState, "Authorized");
        store.set(StorageKey::IdToken, &jwt_with_exp(epoch_secs() + 3600));
    }

    let store_arg = path.display().to_string();
    let cli = Cli::try_parse_from([
        "oidc-rp",
        "--store",
        store_arg.as_str(),
        "--sts-server",
        "https://idp.example",
        "--client-id",
        "spa",
    ])?;
    let report = oidc_rp::run(cli).await?;

    assert!(report.is_authenticated);
    assert_eq!(report.authorized_state, AuthorizedState::Authorized);
    let claims = report.id_token_claims.ok_or_else(|| anyhow::anyhow!("no claims"))?;
    assert_eq!(claims["sub"], "alice");
    Ok(())
}
