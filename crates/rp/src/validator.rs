// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic token validation.
//!
//! Purely a trigger: each tick re-runs both expiry checks on the state
//! machine, which publish the expiry events a renewal collaborator reacts to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorKind;
use crate::state::AuthStateService;

pub struct PeriodicTokenValidator {
    auth_state: Arc<AuthStateService>,
    running: Mutex<Option<CancellationToken>>,
    silent_renew_running: Arc<AtomicBool>,
}

impl PeriodicTokenValidator {
    pub fn new(auth_state: Arc<AuthStateService>) -> Self {
        Self {
            auth_state,
            running: Mutex::new(None),
            silent_renew_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Begin validating every `interval`. No-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let mut running = self.running.lock();
        if running.is_some() {
            return;
        }
        let token = CancellationToken::new();
        *running = Some(token.clone());
        drop(running);

        let interval = interval.max(Duration::from_millis(1));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "starting token validation");
        spawn_validation_loop(
            Arc::clone(&self.auth_state),
            Arc::clone(&self.silent_renew_running),
            interval,
            token,
        );
    }

    pub fn stop(&self) {
        if let Some(token) = self.running.lock().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Set by the renewal collaborator while a silent renew is in flight;
    /// ticks are skipped meanwhile.
    pub fn set_silent_renew_running(&self, running: bool) {
        self.silent_renew_running.store(running, Ordering::Relaxed);
    }

    pub fn is_silent_renew_running(&self) -> bool {
        self.silent_renew_running.load(Ordering::Relaxed)
    }
}

impl Drop for PeriodicTokenValidator {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_validation_loop(
    auth_state: Arc<AuthStateService>,
    silent_renew_running: Arc<AtomicBool>,
    interval: Duration,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = timer.tick() => {}
            }

            if silent_renew_running.load(Ordering::Relaxed) {
                tracing::debug!("silent renew in flight, skipping token validation");
                continue;
            }

            // Both checks run every tick so each publishes its own event.
            let id_token_expired = auth_state.has_id_token_expired();
            let access_token_expired = auth_state.has_access_token_expired_if_expiry_exists();
            if id_token_expired || access_token_expired {
                tracing::debug!(
                    kind = %ErrorKind::Expiry,
                    id_token_expired,
                    access_token_expired,
                    "token expired, renewal expected"
                );
            }
        }
    });
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
