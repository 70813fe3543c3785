/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Shared test fixtures.

use std::collections::VecDeque;

use crate::app::CanvasController;
use crate::graph::{EdgeKind, NodeKind};
use crate::prefs::CanvasPrefs;
use crate::protocol::channel::{ChannelError, CommandChannel};
use crate::protocol::{InboundEvent, OutboundRequest, WireEdge, WireNode};
use crate::render::headless::HeadlessEngine;

/// Channel that records every request and serves queued events.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub sent: Vec<OutboundRequest>,
    pub inbox: VecDeque<InboundEvent>,
    disconnected: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event as if the authority had sent it.
    pub fn deliver(&mut self, event: InboundEvent) {
        self.inbox.push_back(event);
    }

    /// Make every later `push` fail.
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    pub fn take_sent(&mut self) -> Vec<OutboundRequest> {
        std::mem::take(&mut self.sent)
    }
}

impl CommandChannel for RecordingChannel {
    fn push(&mut self, request: OutboundRequest) -> Result<(), ChannelError> {
        if self.disconnected {
            return Err(ChannelError::Disconnected);
        }
        self.sent.push(request);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<InboundEvent> {
        self.inbox.pop_front()
    }
}

pub type TestController = CanvasController<HeadlessEngine, RecordingChannel>;

/// Editor-mode controller over a fresh headless engine.
pub fn editor_controller() -> TestController {
    controller_with(CanvasPrefs::default())
}

pub fn controller_with(prefs: CanvasPrefs) -> TestController {
    match CanvasController::mount(HeadlessEngine::new(), RecordingChannel::new(), prefs) {
        Ok(controller) => controller,
        Err(err) => panic!("headless mount failed: {err}"),
    }
}

pub fn node(id: &str, kind: NodeKind, x: f32, y: f32) -> WireNode {
    WireNode::new(id, kind).at(x, y)
}

pub fn edge(id: &str, source: &str, target: &str, kind: EdgeKind) -> WireEdge {
    WireEdge::new(id, source, target, kind)
}

/// Small knowledge graph: two concepts, one ADR, one pattern.
///
/// ```text
/// c1 -has_many-> c2      a1 -constrains-> c1      p1 -applies_to-> c2
/// c2 -belongs_to-> c1    a1 -generic-> p1
/// ```
pub fn knowledge_graph() -> InboundEvent {
    InboundEvent::LoadGraph {
        nodes: vec![
            node("c1", NodeKind::Concept, 0.0, 0.0),
            node("c2", NodeKind::Concept, 100.0, 0.0),
            node("a1", NodeKind::Adr, 0.0, 100.0),
            node("p1", NodeKind::Pattern, 100.0, 100.0),
        ],
        edges: vec![
            edge("hm", "c1", "c2", EdgeKind::HasMany),
            edge("bt", "c2", "c1", EdgeKind::BelongsTo),
            edge("cn", "a1", "c1", EdgeKind::Constrains),
            edge("ap", "p1", "c2", EdgeKind::AppliesTo),
            edge("gx", "a1", "p1", EdgeKind::Generic),
        ],
    }
}
