/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Applying confirmed events to the local mirror.
//!
//! `Mirror::apply_event` is the single write path into the graph. Every event
//! is idempotent under redelivery, and each one is applied completely within
//! one call: there is no intermediate state in which an edge outlives an
//! endpoint.

mod pending;

use std::fmt;

use log::{debug, info, warn};

use crate::graph::{EdgeId, EdgeInsert, Graph, NodeId};
use crate::protocol::{InboundEvent, WireEdge, WireNode};
pub use pending::PendingEdgePolicy;
use pending::PendingEdges;

/// Non-fatal conditions raised while applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// Node arrived without a position and was placed at the origin.
    MissingPosition(NodeId),
    /// `add_edge` arrived before its endpoints; buffered for later.
    EdgeDeferred { edge: EdgeId, missing: Vec<NodeId> },
    /// Edge discarded because its endpoints are absent from a full snapshot.
    EdgeDropped { edge: EdgeId, missing: Vec<NodeId> },
    /// Buffered edge never saw its endpoints within the buffer lifetime.
    DeferredEdgeExpired(EdgeId),
    /// Buffered edge pushed out by a full buffer.
    DeferredEdgeEvicted(EdgeId),
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &[NodeId]| {
            ids.iter()
                .map(NodeId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            SyncWarning::MissingPosition(id) => {
                write!(f, "node {id} has no position, placed at origin")
            },
            SyncWarning::EdgeDeferred { edge, missing } => {
                write!(f, "edge {edge} arrived before endpoint(s) {}; deferred", join(missing))
            },
            SyncWarning::EdgeDropped { edge, missing } => {
                write!(f, "edge {edge} references missing endpoint(s) {}; dropped", join(missing))
            },
            SyncWarning::DeferredEdgeExpired(edge) => {
                write!(f, "deferred edge {edge} expired before its endpoints arrived")
            },
            SyncWarning::DeferredEdgeEvicted(edge) => {
                write!(f, "deferred edge {edge} evicted, buffer full")
            },
        }
    }
}

/// What one applied event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Mirror content was replaced wholesale (`load_graph`, `clear_canvas`).
    pub replaced: bool,
    pub added_nodes: Vec<NodeId>,
    pub added_edges: Vec<EdgeId>,
    pub moved_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub removed_edges: Vec<EdgeId>,
    pub warnings: Vec<SyncWarning>,
}

impl ApplyReport {
    pub fn changed(&self) -> bool {
        self.replaced
            || !self.added_nodes.is_empty()
            || !self.added_edges.is_empty()
            || !self.moved_nodes.is_empty()
            || !self.removed_nodes.is_empty()
            || !self.removed_edges.is_empty()
    }
}

/// The local graph mirror plus its out-of-order edge buffer.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    graph: Graph,
    pending: PendingEdges,
}

impl Mirror {
    pub fn new(policy: PendingEdgePolicy) -> Self {
        Self {
            graph: Graph::new(),
            pending: PendingEdges::new(policy),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn pending_edge_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_edge_pending(&self, id: &EdgeId) -> bool {
        self.pending.contains(id)
    }

    /// Buffered edge ids with their age in mirror-changing events, oldest
    /// first.
    pub fn pending_edges(&self) -> Vec<(EdgeId, u64)> {
        self.pending.ages()
    }

    /// Apply one confirmed event. Layout and filter events do not touch the
    /// mirror and return an empty report.
    pub fn apply_event(&mut self, event: &InboundEvent) -> ApplyReport {
        let mut report = ApplyReport::default();
        match event {
            InboundEvent::LoadGraph { nodes, edges } => self.load_graph(nodes, edges, &mut report),
            InboundEvent::AddNode(node) => self.add_node(node, &mut report),
            InboundEvent::AddEdge(edge) => self.add_edge(edge, &mut report),
            InboundEvent::NodeMoved { id, position } => {
                if self.graph.set_node_position(id, *position) {
                    report.moved_nodes.push(id.clone());
                }
            },
            InboundEvent::RemoveNodes { node_ids } => {
                let removal = self.graph.remove_nodes(node_ids);
                for edge in self.pending.forget_nodes(node_ids) {
                    debug!("sync: dropping deferred edge {edge}, endpoint removed");
                }
                report.removed_nodes = removal.nodes;
                report.removed_edges = removal.edges;
            },
            InboundEvent::RemoveEdges { edge_ids } => {
                report.removed_edges = self.graph.remove_edges(edge_ids);
                self.pending.forget_edges(edge_ids);
            },
            InboundEvent::ClearCanvas => {
                self.graph.clear();
                self.pending.clear();
                report.replaced = true;
            },
            InboundEvent::ApplyLayout { .. }
            | InboundEvent::FilterGraph { .. }
            | InboundEvent::ChangeLayout { .. } => return report,
        }

        self.reconcile_pending(&mut report);
        // Redeliveries change nothing and must not age the buffer.
        if report.changed() {
            for edge in self.pending.tick() {
                report.warnings.push(SyncWarning::DeferredEdgeExpired(edge));
            }
        }
        for warning in &report.warnings {
            warn!("sync: {} ({warning})", event.name());
        }
        debug_assert!(self.graph.endpoints_consistent());
        report
    }

    fn load_graph(&mut self, nodes: &[WireNode], edges: &[WireEdge], report: &mut ApplyReport) {
        let mut graph = Graph::new();
        for wire in nodes {
            let (node, position_missing) = wire.to_node();
            let id = node.id.clone();
            if !graph.insert_node(node) {
                debug!("sync: load_graph repeats node {id}, keeping the first record");
                continue;
            }
            if position_missing {
                report
                    .warnings
                    .push(SyncWarning::MissingPosition(id.clone()));
            }
            report.added_nodes.push(id);
        }
        for wire in edges {
            match graph.insert_edge(wire.to_edge()) {
                EdgeInsert::Inserted => report.added_edges.push(wire.id.clone()),
                EdgeInsert::Duplicate => {
                    debug!("sync: load_graph repeats edge {}, keeping the first record", wire.id);
                },
                EdgeInsert::MissingEndpoints(missing) => {
                    report.warnings.push(SyncWarning::EdgeDropped {
                        edge: wire.id.clone(),
                        missing,
                    });
                },
            }
        }
        self.graph = graph;
        self.pending.clear();
        report.replaced = true;
    }

    fn add_node(&mut self, wire: &WireNode, report: &mut ApplyReport) {
        let (node, position_missing) = wire.to_node();
        if !self.graph.insert_node(node) {
            return;
        }
        if position_missing {
            report
                .warnings
                .push(SyncWarning::MissingPosition(wire.id.clone()));
        }
        report.added_nodes.push(wire.id.clone());
    }

    fn add_edge(&mut self, wire: &WireEdge, report: &mut ApplyReport) {
        if self.pending.contains(&wire.id) {
            return;
        }
        let edge = wire.to_edge();
        match self.graph.insert_edge(edge.clone()) {
            EdgeInsert::Inserted => report.added_edges.push(wire.id.clone()),
            EdgeInsert::Duplicate => {},
            EdgeInsert::MissingEndpoints(missing) => {
                report.warnings.push(SyncWarning::EdgeDeferred {
                    edge: wire.id.clone(),
                    missing,
                });
                if let Some(evicted) = self.pending.defer(edge) {
                    report
                        .warnings
                        .push(SyncWarning::DeferredEdgeEvicted(evicted));
                }
            },
        }
    }

    fn reconcile_pending(&mut self, report: &mut ApplyReport) {
        for edge in self.pending.take_ready(&self.graph) {
            let id = edge.id.clone();
            if self.graph.insert_edge(edge) == EdgeInsert::Inserted {
                info!("sync: deferred edge {id} resolved");
                report.added_edges.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, NodeKind};
    use euclid::default::Point2D;
    use proptest::prelude::*;

    fn node(id: &str) -> WireNode {
        WireNode::new(id, NodeKind::Generic).at(0.0, 0.0)
    }

    fn edge(id: &str, s: &str, t: &str) -> WireEdge {
        WireEdge::new(id, s, t, EdgeKind::Generic)
    }

    fn nid(id: &str) -> NodeId {
        NodeId::new(id)
    }

    fn eid(id: &str) -> EdgeId {
        EdgeId::new(id)
    }

    type Canonical = (Vec<(String, NodeKind, f32, f32)>, Vec<(String, String, String, EdgeKind)>);

    fn canonical(graph: &Graph) -> Canonical {
        let mut nodes: Vec<_> = graph
            .nodes()
            .map(|n| (n.id.to_string(), n.kind, n.position.x, n.position.y))
            .collect();
        nodes.sort_by(|a, b| a.0.cmp(&b.0));
        let mut edges: Vec<_> = graph
            .edges()
            .map(|e| (e.id.to_string(), e.source.to_string(), e.target.to_string(), e.kind))
            .collect();
        edges.sort();
        (nodes, edges)
    }

    #[test]
    fn load_graph_replaces_and_defaults_missing_positions() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("old")));

        let report = mirror.apply_event(&InboundEvent::LoadGraph {
            nodes: vec![node("n1"), WireNode::new("n2", NodeKind::Concept)],
            edges: vec![edge("e1", "n1", "n2")],
        });

        assert!(report.replaced);
        assert!(!mirror.graph().contains_node(&nid("old")));
        assert_eq!(
            mirror.graph().node(&nid("n2")).unwrap().position,
            Point2D::origin()
        );
        assert_eq!(report.warnings, vec![SyncWarning::MissingPosition(nid("n2"))]);
        assert_eq!(mirror.graph().edge_count(), 1);
    }

    #[test]
    fn load_graph_drops_dangling_edges() {
        let mut mirror = Mirror::default();
        let report = mirror.apply_event(&InboundEvent::LoadGraph {
            nodes: vec![node("n1")],
            edges: vec![edge("e1", "n1", "ghost")],
        });

        assert_eq!(mirror.graph().edge_count(), 0);
        assert_eq!(mirror.pending_edge_count(), 0);
        assert_eq!(
            report.warnings,
            vec![SyncWarning::EdgeDropped {
                edge: eid("e1"),
                missing: vec![nid("ghost")]
            }]
        );
    }

    #[test]
    fn early_edge_is_deferred_then_resolved_by_add_node() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("n1")));

        let report = mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "n1", "n2")));
        assert!(!mirror.graph().contains_edge(&eid("e1")));
        assert!(mirror.is_edge_pending(&eid("e1")));
        assert!(!report.changed());
        assert!(matches!(report.warnings[0], SyncWarning::EdgeDeferred { .. }));

        let report = mirror.apply_event(&InboundEvent::AddNode(node("n2")));
        assert_eq!(report.added_nodes, vec![nid("n2")]);
        assert_eq!(report.added_edges, vec![eid("e1")]);
        assert!(mirror.graph().contains_edge(&eid("e1")));
        assert_eq!(mirror.pending_edge_count(), 0);

        let report = mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "n1", "n2")));
        assert!(!report.changed());
        assert_eq!(mirror.graph().edge_count(), 1);
    }

    #[test]
    fn deferred_edge_expires() {
        let mut mirror = Mirror::new(PendingEdgePolicy {
            capacity: 4,
            ttl_events: 1,
        });
        mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "a", "b")));
        mirror.apply_event(&InboundEvent::AddNode(node("a")));
        let report = mirror.apply_event(&InboundEvent::AddNode(node("x")));

        assert_eq!(report.warnings, vec![SyncWarning::DeferredEdgeExpired(eid("e1"))]);
        mirror.apply_event(&InboundEvent::AddNode(node("b")));
        assert!(!mirror.graph().contains_edge(&eid("e1")));
    }

    #[test]
    fn redelivered_event_does_not_age_deferred_edges() {
        let mut mirror = Mirror::new(PendingEdgePolicy {
            capacity: 4,
            ttl_events: 2,
        });
        mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "a", "b")));
        mirror.apply_event(&InboundEvent::AddNode(node("a")));
        let report = mirror.apply_event(&InboundEvent::AddNode(node("a")));
        assert!(!report.changed());
        assert!(report.warnings.is_empty());
        assert_eq!(mirror.pending_edges(), vec![(eid("e1"), 1)]);

        let report = mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "a", "b")));
        assert!(!report.changed());
        assert_eq!(mirror.pending_edges(), vec![(eid("e1"), 1)]);

        mirror.apply_event(&InboundEvent::AddNode(node("b")));
        assert!(mirror.graph().contains_edge(&eid("e1")));
    }

    #[test]
    fn redelivered_move_is_not_a_change() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("a")));
        let moved = InboundEvent::NodeMoved {
            id: nid("a"),
            position: Point2D::new(4.0, 5.0),
        };
        assert_eq!(mirror.apply_event(&moved).moved_nodes, vec![nid("a")]);
        assert!(!mirror.apply_event(&moved).changed());
    }

    #[test]
    fn remove_nodes_cascades_in_one_step() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::LoadGraph {
            nodes: vec![node("n1"), node("n2"), node("n3")],
            edges: vec![edge("e1", "n1", "n2"), edge("e2", "n3", "n1")],
        });

        let report = mirror.apply_event(&InboundEvent::RemoveNodes {
            node_ids: vec![nid("n1")],
        });

        assert_eq!(report.removed_nodes, vec![nid("n1")]);
        assert_eq!(report.removed_edges, vec![eid("e1"), eid("e2")]);
        assert_eq!(mirror.graph().edge_count(), 0);
        assert!(mirror.graph().endpoints_consistent());
    }

    #[test]
    fn remove_nodes_forgets_deferred_edges_touching_them() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "a", "b")));
        mirror.apply_event(&InboundEvent::RemoveNodes {
            node_ids: vec![nid("b")],
        });
        assert_eq!(mirror.pending_edge_count(), 0);
    }

    #[test]
    fn unknown_ids_are_silent_noops() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("n1")));

        let moved = mirror.apply_event(&InboundEvent::NodeMoved {
            id: nid("ghost"),
            position: Point2D::new(3.0, 3.0),
        });
        let removed = mirror.apply_event(&InboundEvent::RemoveEdges {
            edge_ids: vec![eid("ghost")],
        });

        assert_eq!(moved, ApplyReport::default());
        assert_eq!(removed, ApplyReport::default());
    }

    #[test]
    fn node_moved_updates_known_node() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("n1")));
        let report = mirror.apply_event(&InboundEvent::NodeMoved {
            id: nid("n1"),
            position: Point2D::new(3.0, 4.0),
        });
        assert_eq!(report.moved_nodes, vec![nid("n1")]);
        assert_eq!(
            mirror.graph().node(&nid("n1")).unwrap().position,
            Point2D::new(3.0, 4.0)
        );
    }

    #[test]
    fn clear_canvas_empties_everything() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddNode(node("n1")));
        mirror.apply_event(&InboundEvent::AddEdge(edge("e9", "n1", "later")));

        let report = mirror.apply_event(&InboundEvent::ClearCanvas);
        assert!(report.replaced);
        assert!(mirror.graph().is_empty());
        assert_eq!(mirror.pending_edge_count(), 0);
    }

    #[test]
    fn view_events_do_not_touch_the_mirror() {
        let mut mirror = Mirror::default();
        mirror.apply_event(&InboundEvent::AddEdge(edge("e1", "a", "b")));
        let report = mirror.apply_event(&InboundEvent::FilterGraph {
            filter_mode: "adrs".to_string(),
        });
        assert_eq!(report, ApplyReport::default());
        assert!(mirror.is_edge_pending(&eid("e1")));
    }

    fn event_strategy() -> impl Strategy<Value = InboundEvent> {
        let id = || (0u8..6).prop_map(|i| format!("n{i}"));
        let edge_id = || (0u8..6).prop_map(|i| format!("e{i}"));
        prop_oneof![
            (id(), -50.0f32..50.0, -50.0f32..50.0)
                .prop_map(|(id, x, y)| InboundEvent::AddNode(WireNode::new(&id, NodeKind::Generic).at(x, y))),
            (edge_id(), id(), id())
                .prop_map(|(e, s, t)| InboundEvent::AddEdge(WireEdge::new(&e, &s, &t, EdgeKind::Generic))),
            (id(), -50.0f32..50.0, -50.0f32..50.0).prop_map(|(id, x, y)| InboundEvent::NodeMoved {
                id: NodeId::new(id),
                position: Point2D::new(x, y),
            }),
            prop::collection::vec(id(), 0..3).prop_map(|ids| InboundEvent::RemoveNodes {
                node_ids: ids.into_iter().map(NodeId::new).collect(),
            }),
            prop::collection::vec(edge_id(), 0..3).prop_map(|ids| InboundEvent::RemoveEdges {
                edge_ids: ids.into_iter().map(EdgeId::new).collect(),
            }),
            Just(InboundEvent::ClearCanvas),
            (prop::collection::vec(id(), 0..6), prop::collection::vec((edge_id(), id(), id()), 0..6))
                .prop_map(|(nodes, edges)| InboundEvent::LoadGraph {
                    nodes: nodes.iter().map(|id| WireNode::new(id, NodeKind::Concept).at(1.0, 1.0)).collect(),
                    edges: edges
                        .iter()
                        .map(|(e, s, t)| WireEdge::new(e, s, t, EdgeKind::HasMany))
                        .collect(),
                }),
        ]
    }

    proptest! {
        #[test]
        fn every_event_is_idempotent(
            history in prop::collection::vec(event_strategy(), 0..25),
            next in event_strategy(),
            later in prop::collection::vec(event_strategy(), 0..10),
        ) {
            let mut base = Mirror::new(PendingEdgePolicy {
                capacity: 4,
                ttl_events: 3,
            });
            for event in &history {
                base.apply_event(event);
            }

            let mut once = base.clone();
            once.apply_event(&next);
            let mut twice = base;
            twice.apply_event(&next);
            twice.apply_event(&next);

            prop_assert_eq!(canonical(once.graph()), canonical(twice.graph()));
            prop_assert_eq!(once.pending_edges(), twice.pending_edges());

            for event in &later {
                once.apply_event(event);
                twice.apply_event(event);
            }
            prop_assert_eq!(canonical(once.graph()), canonical(twice.graph()));
            prop_assert_eq!(once.pending_edges(), twice.pending_edges());
        }

        #[test]
        fn no_reachable_state_has_dangling_edges(
            history in prop::collection::vec(event_strategy(), 0..40),
        ) {
            let mut mirror = Mirror::default();
            for event in &history {
                mirror.apply_event(event);
                prop_assert!(mirror.graph().endpoints_consistent());
            }
        }
    }
}
