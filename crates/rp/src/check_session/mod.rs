// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-change monitor (OpenID Connect Session Management).
//!
//! A hidden frame pointed at the provider's check-session endpoint is pinged
//! with `"<client_id> <session_state>"` on a fixed heartbeat. The provider
//! answers `unchanged`, `changed` or `error` through the window's shared
//! message channel, so every inbound message is authenticated by sender
//! window and origin before it is trusted.

pub mod frame;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ErrorKind;
use crate::events::{AuthEvent, PublicEvents};
use crate::store::{StorageKey, TokenStore};

pub use frame::{
    CheckSessionMessage, CheckSessionReply, FrameHandle, FrameHost, HeadlessHost, HostEvent,
    InboundMessage, WindowId,
};

/// Element id of the single, reused check-session frame.
pub const CHECK_SESSION_FRAME_ID: &str = "oidcCheckSessionFrame";

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(3000);

/// Minimum age of the last frame load before `start` navigates it again.
pub const FRAME_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Unanswered heartbeats tolerated before the condition is logged.
pub const MAX_OUTSTANDING_MESSAGES: u32 = 3;

/// Transient heartbeat bookkeeping; reset by `start` and `stop`.
#[derive(Default)]
struct Heartbeat {
    /// Present while the heartbeat timer runs.
    timer: Option<CancellationToken>,
    /// Present while a message listener is bound.
    listener: Option<CancellationToken>,
    /// Set on frame `load`, not on navigation dispatch.
    last_frame_refresh: Option<Instant>,
    outstanding_messages: u32,
    check_session_received: bool,
}

struct Inner {
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    host: Arc<dyn FrameHost>,
    events: PublicEvents,
    changed_tx: watch::Sender<bool>,
    heartbeat: Mutex<Heartbeat>,
}

/// Heartbeat-driven session monitor. One instance per client; no global state.
pub struct CheckSessionService {
    inner: Arc<Inner>,
}

impl CheckSessionService {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        host: Arc<dyn FrameHost>,
        events: PublicEvents,
    ) -> Self {
        let (changed_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                host,
                events,
                changed_tx,
                heartbeat: Mutex::new(Heartbeat::default()),
            }),
        }
    }

    pub fn is_check_session_configured(&self) -> bool {
        self.inner.config.start_check_session
    }

    /// Session-changed channel. Sticky: stays `true` until `stop` or the next `start`.
    pub fn check_session_changed(&self) -> watch::Receiver<bool> {
        self.inner.changed_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.inner.heartbeat.lock().timer.is_some()
    }

    /// Heartbeats sent since the provider last answered.
    pub fn outstanding_messages(&self) -> u32 {
        self.inner.heartbeat.lock().outstanding_messages
    }

    /// Start the heartbeat. No-op while already running.
    ///
    /// Host calls happen without the heartbeat lock held, so a host may
    /// deliver events synchronously from inside `navigate`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let token = CancellationToken::new();
        let refresh_due = {
            let mut hb = self.inner.heartbeat.lock();
            if hb.timer.is_some() {
                return;
            }
            hb.timer = Some(token.clone());
            hb.outstanding_messages = 0;
            hb.check_session_received = false;
            hb.last_frame_refresh.map_or(true, |last| last.elapsed() >= FRAME_REFRESH_INTERVAL)
        };
        self.inner.changed_tx.send_if_modified(|changed| std::mem::replace(changed, false));

        if refresh_due {
            Inner::init(&self.inner);
        }

        spawn_heartbeat(Arc::clone(&self.inner), token);
    }

    /// Stop the heartbeat. The frame element and message listener stay in place.
    pub fn stop(&self) {
        let mut hb = self.inner.heartbeat.lock();
        let Some(timer) = hb.timer.take() else {
            return;
        };
        timer.cancel();
        hb.check_session_received = false;
        drop(hb);

        self.inner.changed_tx.send_if_modified(|changed| std::mem::replace(changed, false));
    }

    /// True when monitoring is enabled and `changed` arrived since the last `start`.
    pub fn server_state_changed(&self) -> bool {
        self.inner.config.start_check_session && self.inner.heartbeat.lock().check_session_received
    }

    /// Dispatch one hosting-window event. The bound listener calls this; hosts
    /// that deliver events synchronously may call it directly.
    pub fn handle_host_event(&self, event: &HostEvent) {
        self.inner.handle_host_event(event);
    }

    pub fn existing_frame(&self) -> Option<FrameHandle> {
        self.inner.host.find_frame(CHECK_SESSION_FRAME_ID)
    }
}

impl Drop for CheckSessionService {
    fn drop(&mut self) {
        let mut hb = self.inner.heartbeat.lock();
        for token in [hb.timer.take(), hb.listener.take()].into_iter().flatten() {
            token.cancel();
        }
    }
}

impl Inner {
    /// Point the frame at the check-session endpoint. The listener is bound
    /// first so a `load` raised during navigation is not missed.
    fn init(this: &Arc<Self>) {
        let Some(ref url) = this.config.check_session_iframe else {
            tracing::warn!(
                kind = %ErrorKind::ConfigurationMissing,
                "init check session: check_session_iframe endpoint is undefined"
            );
            return;
        };

        let frame = this.get_or_create_frame();
        Self::bind_message_listener(this);
        this.host.navigate(&frame, url);
    }

    fn get_or_create_frame(&self) -> FrameHandle {
        match self.host.find_frame(CHECK_SESSION_FRAME_ID) {
            Some(frame) => frame,
            None => self.host.create_hidden_frame(CHECK_SESSION_FRAME_ID),
        }
    }

    /// Replace any previous listener with a fresh subscription.
    fn bind_message_listener(this: &Arc<Self>) {
        let mut rx = this.host.subscribe();
        let token = CancellationToken::new();
        let previous = this.heartbeat.lock().listener.replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let inner = Arc::clone(this);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => event,
                };
                match event {
                    Ok(event) => inner.handle_host_event(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "check session listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn handle_host_event(&self, event: &HostEvent) {
        match event {
            HostEvent::FrameLoaded { element_id }
                if element_id.as_str() == CHECK_SESSION_FRAME_ID =>
            {
                self.heartbeat.lock().last_frame_refresh = Some(Instant::now());
            }
            HostEvent::FrameLoaded { .. } => {}
            HostEvent::Message(msg) => self.handle_message(msg),
        }
    }

    fn handle_message(&self, msg: &InboundMessage) {
        let Some(frame) = self.host.find_frame(CHECK_SESSION_FRAME_ID) else {
            return;
        };
        // Unrelated or spoofed senders are dropped without a trace.
        if msg.source != Some(frame.window) || !self.origin_matches(&msg.origin) {
            return;
        }

        let mut hb = self.heartbeat.lock();
        hb.outstanding_messages = 0;

        match CheckSessionReply::parse(&msg.data) {
            CheckSessionReply::Error => {
                drop(hb);
                tracing::warn!("error from check session message handler");
            }
            CheckSessionReply::Changed => {
                hb.check_session_received = true;
                drop(hb);
                tracing::debug!("check session reports changed");
                self.events.fire(AuthEvent::CheckSessionReceived { raw: msg.data.clone() });
                self.changed_tx.send_replace(true);
            }
            CheckSessionReply::Other(raw) => {
                drop(hb);
                tracing::debug!(reply = %raw, "check session reply");
                self.events.fire(AuthEvent::CheckSessionReceived { raw });
            }
        }
    }

    /// The sender origin must be the provider's origin or a path-boundary
    /// prefix of the configured STS URL.
    fn origin_matches(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        if self.config.sts_origin().as_deref() == Some(origin) {
            return true;
        }
        match self.config.sts_server.strip_prefix(origin) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn heartbeat_tick(&self) {
        let client_id = self.config.client_id.as_str();
        match self.host.find_frame(CHECK_SESSION_FRAME_ID) {
            Some(frame) if !client_id.is_empty() => self.post_session_state(&frame, client_id),
            _ => {
                tracing::warn!(
                    kind = %ErrorKind::ConfigurationMissing,
                    "check session frame does not exist"
                );
            }
        }

        let outstanding = self.heartbeat.lock().outstanding_messages;
        if outstanding > MAX_OUTSTANDING_MESSAGES {
            tracing::error!(
                kind = %ErrorKind::TransientLiveness,
                outstanding,
                "not receiving check session response messages, server unreachable?"
            );
        }
    }

    fn post_session_state(&self, frame: &FrameHandle, client_id: &str) {
        let Some(session_state) =
            self.store.get(StorageKey::SessionState).filter(|s| !s.is_empty())
        else {
            tracing::debug!("check session heartbeat: session_state is blank");
            return;
        };
        let Some(target_origin) = self.config.sts_origin() else {
            tracing::warn!(
                kind = %ErrorKind::ConfigurationMissing,
                sts_server = %self.config.sts_server,
                "check session heartbeat: sts_server has no origin"
            );
            return;
        };

        self.heartbeat.lock().outstanding_messages += 1;
        let message = CheckSessionMessage { client_id, session_state: &session_state };
        self.host.post_message(frame, &message.to_wire(), &target_origin);
    }
}

/// Tick every [`HEARTBEAT_INTERVAL`] until cancelled; the first tick is one
/// interval after start.
fn spawn_heartbeat(inner: Arc<Inner>, token: CancellationToken) {
    tokio::spawn(async move {
        let mut timer =
            tokio::time::interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = timer.tick() => {}
            }
            inner.heartbeat_tick();
        }
    });
}

#[cfg(test)]
#[path = "check_session_tests.rs"]
mod tests;
