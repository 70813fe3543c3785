/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Buffer for edges confirmed before their endpoints.

use std::collections::VecDeque;

use serde::Deserialize;

use crate::graph::{Edge, EdgeId, Graph, NodeId};

/// Bounds for the out-of-order edge buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PendingEdgePolicy {
    /// Maximum buffered edges; the oldest is evicted past this.
    pub capacity: usize,
    /// Number of mirror-changing events a buffered edge survives.
    pub ttl_events: u64,
}

impl Default for PendingEdgePolicy {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_events: 64,
        }
    }
}

#[derive(Debug, Clone)]
struct Deferred {
    edge: Edge,
    queued_at: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PendingEdges {
    policy: PendingEdgePolicy,
    /// Counts events that changed the mirror.
    clock: u64,
    entries: VecDeque<Deferred>,
}

impl PendingEdges {
    pub(crate) fn new(policy: PendingEdgePolicy) -> Self {
        Self {
            policy,
            clock: 0,
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, id: &EdgeId) -> bool {
        self.entries.iter().any(|d| &d.edge.id == id)
    }

    pub(crate) fn ages(&self) -> Vec<(EdgeId, u64)> {
        self.entries
            .iter()
            .map(|d| (d.edge.id.clone(), self.clock - d.queued_at))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Buffer `edge`. Returns the id evicted to stay within capacity, if any.
    pub(crate) fn defer(&mut self, edge: Edge) -> Option<EdgeId> {
        if self.contains(&edge.id) {
            return None;
        }
        self.entries.push_back(Deferred {
            edge,
            queued_at: self.clock,
        });
        if self.entries.len() > self.policy.capacity {
            return self.entries.pop_front().map(|d| d.edge.id);
        }
        None
    }

    /// Remove and return edges whose endpoints are now both in `graph`,
    /// oldest first.
    pub(crate) fn take_ready(&mut self, graph: &Graph) -> Vec<Edge> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let (ready, waiting): (VecDeque<_>, VecDeque<_>) =
            self.entries.drain(..).partition(|d| {
                graph.contains_node(&d.edge.source) && graph.contains_node(&d.edge.target)
            });
        self.entries = waiting;
        ready.into_iter().map(|d| d.edge).collect()
    }

    /// Drop buffered edges that reference any of `nodes`.
    pub(crate) fn forget_nodes(&mut self, nodes: &[NodeId]) -> Vec<EdgeId> {
        let mut dropped = Vec::new();
        self.entries.retain(|d| {
            let touches = nodes.contains(&d.edge.source) || nodes.contains(&d.edge.target);
            if touches {
                dropped.push(d.edge.id.clone());
            }
            !touches
        });
        dropped
    }

    pub(crate) fn forget_edges(&mut self, edges: &[EdgeId]) {
        self.entries.retain(|d| !edges.contains(&d.edge.id));
    }

    /// Advance the event clock and expire stale entries.
    pub(crate) fn tick(&mut self) -> Vec<EdgeId> {
        self.clock += 1;
        let clock = self.clock;
        let ttl = self.policy.ttl_events;
        let mut expired = Vec::new();
        self.entries.retain(|d| {
            let alive = clock - d.queued_at <= ttl;
            if !alive {
                expired.push(d.edge.id.clone());
            }
            alive
        });
        expired
    }
}
