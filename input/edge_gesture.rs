/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Two-step edge creation: mark a source, then mark a target.

use crate::graph::NodeId;

/// Pending edge-creation slot. Owned by one controller; never shared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EdgeGesture {
    #[default]
    Idle,
    SourceMarked(NodeId),
}

/// What a transition asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureStep {
    /// Show the transient source marker on this node.
    Marked(NodeId),
    /// Clear the marker on `source` and request `create_edge{source, target}`.
    Completed { source: NodeId, target: NodeId },
    /// Clear the marker on this node; nothing is requested.
    Cancelled(NodeId),
    Unchanged,
}

impl EdgeGesture {
    pub fn source(&self) -> Option<&NodeId> {
        match self {
            EdgeGesture::Idle => None,
            EdgeGesture::SourceMarked(source) => Some(source),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EdgeGesture::Idle)
    }

    /// Contextual activation on `node`. A second activation on the same node
    /// completes a self-loop request; the authority decides whether to accept it.
    pub fn activate(&mut self, node: NodeId) -> GestureStep {
        match std::mem::take(self) {
            EdgeGesture::Idle => {
                *self = EdgeGesture::SourceMarked(node.clone());
                GestureStep::Marked(node)
            },
            EdgeGesture::SourceMarked(source) => GestureStep::Completed {
                source,
                target: node,
            },
        }
    }

    /// Primary activation on empty canvas.
    pub fn cancel(&mut self) -> GestureStep {
        match std::mem::take(self) {
            EdgeGesture::Idle => GestureStep::Unchanged,
            EdgeGesture::SourceMarked(source) => GestureStep::Cancelled(source),
        }
    }

    /// Drop the marked source if it no longer exists. Returns the id that was
    /// cleared so the caller can log it.
    pub fn forget_missing(&mut self, exists: impl Fn(&NodeId) -> bool) -> Option<NodeId> {
        if !matches!(self, EdgeGesture::SourceMarked(source) if !exists(source)) {
            return None;
        }
        match std::mem::take(self) {
            EdgeGesture::SourceMarked(source) => Some(source),
            EdgeGesture::Idle => None,
        }
    }
}
