// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hosting-window capability used by the check-session heartbeat.
//!
//! The browser primitives (hidden iframe, `postMessage`, window `message` and
//! frame `load` events) are reached only through [`FrameHost`], so a wasm
//! binding and a test double can stand in for each other.

use tokio::sync::broadcast;

/// Identity of a frame's content window. Compared by value when
/// authenticating the sender of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// A hidden frame element as currently present in the document.
///
/// Never cache one across callbacks: the element can be recreated between
/// start/stop cycles, so look it up again by `element_id` each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    pub element_id: String,
    pub window: WindowId,
}

/// Outbound heartbeat: `"<client_id> <session_state>"`, no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSessionMessage<'a> {
    pub client_id: &'a str,
    pub session_state: &'a str,
}

impl CheckSessionMessage<'_> {
    pub fn to_wire(&self) -> String {
        format!("{} {}", self.client_id, self.session_state)
    }
}

/// A `message` event delivered to the hosting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub origin: String,
    /// Window that posted the message, if the host could identify it.
    pub source: Option<WindowId>,
    pub data: String,
}

/// Provider reply after sender validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSessionReply {
    Error,
    Changed,
    /// `unchanged` or any other provider-defined literal.
    Other(String),
}

impl CheckSessionReply {
    pub fn parse(data: &str) -> Self {
        match data {
            "error" => Self::Error,
            "changed" => Self::Changed,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// Events raised by the hosting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A frame finished loading its document.
    FrameLoaded { element_id: String },
    /// Any cross-document message, from any sender.
    Message(InboundMessage),
}

/// Frame and messaging primitives of the hosting window.
pub trait FrameHost: Send + Sync {
    /// Look up a frame by element id.
    fn find_frame(&self, element_id: &str) -> Option<FrameHandle>;

    /// Append a hidden frame with `element_id` to the document body.
    fn create_hidden_frame(&self, element_id: &str) -> FrameHandle;

    /// Replace the frame's location (no history entry).
    fn navigate(&self, frame: &FrameHandle, url: &str);

    /// Fire-and-forget `postMessage` scoped to `target_origin`.
    fn post_message(&self, frame: &FrameHandle, body: &str, target_origin: &str);

    /// Subscribe to the window's frame-load and message events.
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}

/// Host for environments without a document (CLI, server-side rendering).
///
/// No frame ever exists, so the heartbeat logs a missing frame each tick and
/// never posts; the session monitor stays inert without failing.
pub struct HeadlessHost {
    event_tx: broadcast::Sender<HostEvent>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1);
        Self { event_tx }
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for HeadlessHost {
    fn find_frame(&self, _element_id: &str) -> Option<FrameHandle> {
        None
    }

    fn create_hidden_frame(&self, element_id: &str) -> FrameHandle {
        tracing::debug!(element_id, "headless host cannot attach frames");
        FrameHandle { element_id: element_id.to_owned(), window: WindowId(0) }
    }

    fn navigate(&self, _frame: &FrameHandle, _url: &str) {}

    fn post_message(&self, _frame: &FrameHandle, _body: &str, _target_origin: &str) {}

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.event_tx.subscribe()
    }
}
