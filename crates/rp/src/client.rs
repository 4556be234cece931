// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client facade: wires storage, events, the state machine, the session
//! monitor and the periodic validator, and drives bootstrap.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::check_session::{CheckSessionService, FrameHost};
use crate::config::ClientConfig;
use crate::error::ErrorKind;
use crate::events::{AuthEvent, PublicEvents};
use crate::state::{AuthStateService, AuthorizedState};
use crate::store::{MemoryStore, TokenStore};
use crate::token::{payload_from_token, JwtExpiryValidator, TokenValidator};
use crate::validator::PeriodicTokenValidator;

/// Element id of the hidden frame a renewal collaborator navigates for silent renew.
pub const SILENT_RENEW_FRAME_ID: &str = "myiFrameForSilentRenew";

/// Processes a pending authorization response in the current URL, if any.
///
/// Implementations validate the response (signature, nonce, state) and feed
/// the outcome into [`AuthStateService`]. Object-safe for `Arc<dyn _>`.
pub trait CallbackHandler: Send + Sync {
    fn handle_possible_callback<'a>(
        &'a self,
        current_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

/// Handler for applications that never receive redirects.
pub struct NoCallback;

impl CallbackHandler for NoCallback {
    fn handle_possible_callback<'a>(
        &'a self,
        _current_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// Builder for [`OidcClient`] with in-memory defaults.
pub struct ClientBuilder {
    config: ClientConfig,
    host: Arc<dyn FrameHost>,
    store: Option<Arc<dyn TokenStore>>,
    callback: Option<Arc<dyn CallbackHandler>>,
    validator: Option<Arc<dyn TokenValidator>>,
    events: Option<PublicEvents>,
}

impl ClientBuilder {
    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn callback(mut self, callback: Arc<dyn CallbackHandler>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Share an existing bus, e.g. to observe `ConfigLoaded`.
    pub fn events(mut self, events: PublicEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the client, restore state from storage and fire `ConfigLoaded`.
    pub fn build(self) -> OidcClient {
        let store: Arc<dyn TokenStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let validator: Arc<dyn TokenValidator> = match self.validator {
            Some(validator) => validator,
            None => Arc::new(JwtExpiryValidator::system()),
        };
        let callback: Arc<dyn CallbackHandler> = match self.callback {
            Some(callback) => callback,
            None => Arc::new(NoCallback),
        };
        let events = self.events.unwrap_or_default();

        let auth_state = Arc::new(AuthStateService::new(
            &self.config,
            Arc::clone(&store),
            validator,
            events.clone(),
        ));
        let check_session = CheckSessionService::new(
            self.config.clone(),
            Arc::clone(&store),
            Arc::clone(&self.host),
            events.clone(),
        );
        let token_validator = PeriodicTokenValidator::new(Arc::clone(&auth_state));

        auth_state.init_from_storage();
        events.fire(AuthEvent::ConfigLoaded { config: self.config.clone() });

        OidcClient {
            config: self.config,
            host: self.host,
            events,
            auth_state,
            check_session,
            token_validator,
            callback,
        }
    }
}

/// Relying-party client core.
pub struct OidcClient {
    config: ClientConfig,
    host: Arc<dyn FrameHost>,
    events: PublicEvents,
    auth_state: Arc<AuthStateService>,
    check_session: CheckSessionService,
    token_validator: PeriodicTokenValidator,
    callback: Arc<dyn CallbackHandler>,
}

impl OidcClient {
    pub fn builder(config: ClientConfig, host: Arc<dyn FrameHost>) -> ClientBuilder {
        ClientBuilder { config, host, store: None, callback: None, validator: None, events: None }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve the authentication state at bootstrap.
    ///
    /// Handles a pending callback in `current_url`, then trusts stored
    /// credentials only if they pass the expiry checks. On success, marks the
    /// client authorized and starts session monitoring (when configured) and
    /// periodic validation, and prepares the silent-renew frame when silent
    /// renew is enabled. Never fails: problems resolve to `false`.
    pub async fn check_auth(&self, current_url: &str) -> bool {
        if !self.config.has_valid_config() {
            tracing::error!(
                kind = %ErrorKind::ConfigurationMissing,
                "please provide a configuration before setting up the client"
            );
            return false;
        }
        tracing::debug!(sts_server = %self.config.sts_server, "checking auth");

        if let Err(e) = self.callback.handle_possible_callback(current_url).await {
            tracing::warn!(kind = %ErrorKind::ValidationFailure, err = %e, "callback handling failed");
            return false;
        }

        let is_authenticated = self.auth_state.are_auth_storage_tokens_valid();
        if is_authenticated {
            self.auth_state.set_authorized_and_fire_event();

            if self.check_session.is_check_session_configured() {
                self.check_session.start();
            }

            self.token_validator.start(self.config.token_refresh_interval());

            if self.is_silent_renew_configured() {
                self.ensure_silent_renew_frame();
            }
        }

        tracing::debug!(is_authenticated, "check auth completed");
        is_authenticated
    }

    pub fn is_silent_renew_configured(&self) -> bool {
        self.config.silent_renew
    }

    /// Attach the silent-renew frame if the document does not have it yet.
    fn ensure_silent_renew_frame(&self) {
        if self.host.find_frame(SILENT_RENEW_FRAME_ID).is_none() {
            tracing::debug!("creating silent renew frame");
            self.host.create_hidden_frame(SILENT_RENEW_FRAME_ID);
        }
    }

    /// Local logout: stop background checks and clear stored credentials.
    pub fn logoff_local(&self) {
        self.check_session.stop();
        self.token_validator.stop();
        self.auth_state.set_unauthorized_and_fire_event();
    }

    pub fn is_authenticated(&self) -> watch::Receiver<bool> {
        self.auth_state.authorized()
    }

    pub fn check_session_changed(&self) -> watch::Receiver<bool> {
        self.check_session.check_session_changed()
    }

    pub fn server_state_changed(&self) -> bool {
        self.check_session.server_state_changed()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &PublicEvents {
        &self.events
    }

    pub fn authorized_state(&self) -> AuthorizedState {
        self.auth_state.current_state()
    }

    pub fn get_token(&self) -> String {
        self.auth_state.get_access_token()
    }

    pub fn get_id_token(&self) -> String {
        self.auth_state.get_id_token()
    }

    pub fn get_refresh_token(&self) -> String {
        self.auth_state.get_refresh_token()
    }

    /// Claims of the current ID token, unverified. `None` when not authorized.
    pub fn payload_from_id_token(&self) -> Option<serde_json::Value> {
        let token = self.get_id_token();
        if token.is_empty() {
            return None;
        }
        payload_from_token(&token)
    }

    /// State machine handle for callback and renewal collaborators.
    pub fn auth_state(&self) -> &Arc<AuthStateService> {
        &self.auth_state
    }

    pub fn check_session(&self) -> &CheckSessionService {
        &self.check_session
    }

    pub fn token_validator(&self) -> &PeriodicTokenValidator {
        &self.token_validator
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
