// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token builders and host doubles.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::check_session::{FrameHandle, FrameHost, HostEvent, InboundMessage, WindowId};
use crate::client::CallbackHandler;

/// Unsigned compact JWT carrying `claims`.
pub fn jwt_with_claims(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

/// Unsigned compact JWT whose `exp` is `exp` epoch seconds.
pub fn jwt_with_exp(exp: u64) -> String {
    jwt_with_claims(&serde_json::json!({ "sub": "alice", "exp": exp }))
}

/// A `postMessage` call recorded by [`FakeFrameHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub element_id: String,
    pub window: WindowId,
    pub body: String,
    pub target_origin: String,
}

#[derive(Default)]
struct FakeHostState {
    frames: HashMap<String, FrameHandle>,
    next_window: u64,
    frames_created: usize,
    navigations: Vec<(String, String)>,
    posts: Vec<PostedMessage>,
    load_on_navigate: bool,
}

/// In-memory hosting window: hands out window ids, records navigations and
/// posts, and lets tests inject frame-load and message events.
pub struct FakeFrameHost {
    state: Mutex<FakeHostState>,
    event_tx: broadcast::Sender<HostEvent>,
}

impl Default for FakeFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFrameHost {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self { state: Mutex::new(FakeHostState { next_window: 1, ..Default::default() }), event_tx }
    }

    /// Deliver an event to every bound listener.
    pub fn emit(&self, event: HostEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn emit_loaded(&self, element_id: &str) {
        self.emit(HostEvent::FrameLoaded { element_id: element_id.to_owned() });
    }

    /// Message posted by the frame `element_id`, if it exists.
    pub fn reply_from(&self, element_id: &str, origin: &str, data: &str) -> InboundMessage {
        let source = self.state.lock().frames.get(element_id).map(|f| f.window);
        InboundMessage { origin: origin.to_owned(), source, data: data.to_owned() }
    }

    /// Broadcast `FrameLoaded` from inside every `navigate` call, like a
    /// cached document that loads before navigation returns.
    pub fn set_load_on_navigate(&self, on: bool) {
        self.state.lock().load_on_navigate = on;
    }

    /// Drop a frame element, as if page script removed it.
    pub fn remove_frame(&self, element_id: &str) {
        self.state.lock().frames.remove(element_id);
    }

    pub fn frames_created(&self) -> usize {
        self.state.lock().frames_created
    }

    pub fn navigations(&self) -> Vec<(String, String)> {
        self.state.lock().navigations.clone()
    }

    pub fn posts(&self) -> Vec<PostedMessage> {
        self.state.lock().posts.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl FrameHost for FakeFrameHost {
    fn find_frame(&self, element_id: &str) -> Option<FrameHandle> {
        self.state.lock().frames.get(element_id).cloned()
    }

    fn create_hidden_frame(&self, element_id: &str) -> FrameHandle {
        let mut state = self.state.lock();
        let window = WindowId(state.next_window);
        state.next_window += 1;
        state.frames_created += 1;
        let frame = FrameHandle { element_id: element_id.to_owned(), window };
        state.frames.insert(element_id.to_owned(), frame.clone());
        frame
    }

    fn navigate(&self, frame: &FrameHandle, url: &str) {
        let load = {
            let mut state = self.state.lock();
            state.navigations.push((frame.element_id.clone(), url.to_owned()));
            state.load_on_navigate
        };
        if load {
            self.emit_loaded(&frame.element_id);
        }
    }

    fn post_message(&self, frame: &FrameHandle, body: &str, target_origin: &str) {
        self.state.lock().posts.push(PostedMessage {
            element_id: frame.element_id.clone(),
            window: frame.window,
            body: body.to_owned(),
            target_origin: target_origin.to_owned(),
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.event_tx.subscribe()
    }
}

/// Callback handler that resolves immediately with a fixed outcome.
pub struct StaticCallback {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StaticCallback {
    pub fn ok() -> Self {
        Self { fail: false, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { fail: true, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl CallbackHandler for StaticCallback {
    fn handle_possible_callback<'a>(
        &'a self,
        current_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().push(current_url.to_owned());
            if self.fail {
                anyhow::bail!("callback validation failed");
            }
            Ok(())
        })
    }
}
