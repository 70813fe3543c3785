/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Local graph mirror.
//!
//! Core structures:
//! - `Graph`: the client's copy of the authoritative graph, backed by
//!   `petgraph::StableGraph` with id indices for both nodes and edges
//! - `Node`: a positioned entity with an immutable kind and entity reference
//! - `Edge`: a typed, directed relation between two existing nodes
//!
//! Boundary: mutation methods are `pub(crate)` and only called from
//! `sync::apply_event`. Gestures never reach them directly.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use euclid::default::Point2D;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

/// Stable node handle (petgraph NodeIndex, survives other deletions)
pub type NodeKey = NodeIndex;

/// Stable edge handle (petgraph EdgeIndex)
pub type EdgeKey = EdgeIndex;

/// Opaque node identity assigned by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque edge identity assigned by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reference to the media or content item a node stands for.
///
/// The authority sends numeric media ids for palette entities and string keys
/// for knowledge-graph entries; both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(u64),
    Key(String),
}

impl EntityRef {
    /// Parse a drag-transfer string. Numeric text becomes `Id`, anything else
    /// non-empty becomes `Key`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<u64>() {
            Ok(id) => EntityRef::Id(id),
            Err(_) => EntityRef::Key(trimmed.to_string()),
        })
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{id}"),
            EntityRef::Key(key) => f.write_str(key),
        }
    }
}

/// Node classification. Immutable once the node exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Concept,
    Adr,
    Pattern,
    #[default]
    Generic,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Concept => "concept",
            NodeKind::Adr => "adr",
            NodeKind::Pattern => "pattern",
            NodeKind::Generic => "generic",
        }
    }
}

/// Edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    HasMany,
    BelongsTo,
    Constrains,
    AppliesTo,
    #[default]
    Generic,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::HasMany => "has_many",
            EdgeKind::BelongsTo => "belongs_to",
            EdgeKind::Constrains => "constrains",
            EdgeKind::AppliesTo => "applies_to",
            EdgeKind::Generic => "generic",
        }
    }

    /// Domain-model structure (`has_many`, `belongs_to`) as opposed to
    /// cross-cutting relations.
    pub fn is_structural(self) -> bool {
        matches!(self, EdgeKind::HasMany | EdgeKind::BelongsTo)
    }
}

/// A node as known to this client.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable node identity.
    pub id: NodeId,

    /// Underlying media/content item
    pub entity_ref: Option<EntityRef>,

    pub kind: NodeKind,

    /// Display label (knowledge-graph nodes)
    pub label: Option<String>,

    /// Origin content reference, e.g. the image a palette entity was dragged from
    pub origin_ref: Option<String>,

    /// Position in graph space
    pub position: Point2D<f32>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Point2D<f32>) -> Self {
        Self {
            id: NodeId::new(id),
            entity_ref: None,
            kind,
            label: None,
            origin_ref: None,
            position,
        }
    }
}

/// A directed edge as known to this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: &str, target: &str, kind: EdgeKind) -> Self {
        Self {
            id: EdgeId::new(id),
            source: NodeId::new(source),
            target: NodeId::new(target),
            kind,
        }
    }
}

/// Outcome of an edge insertion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EdgeInsert {
    Inserted,
    /// Id already present; the mirror is unchanged.
    Duplicate,
    /// One or both endpoints are not in the mirror; the mirror is unchanged.
    MissingEndpoints(Vec<NodeId>),
}

/// Everything a single `remove_nodes` call took out of the mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NodeRemoval {
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) edges: Vec<EdgeId>,
}

/// Main mirror structure backed by petgraph::StableGraph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: StableGraph<Node, Edge, Directed>,

    /// Stable id to node mapping.
    node_index: HashMap<NodeId, NodeKey>,

    /// Stable id to edge mapping.
    edge_index: HashMap<EdgeId, EdgeKey>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns `false` when the id is already present.
    pub(crate) fn insert_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let key = self.inner.add_node(node);
        self.node_index.insert(id, key);
        true
    }

    /// Insert an edge whose endpoints must both already exist.
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> EdgeInsert {
        if self.edge_index.contains_key(&edge.id) {
            return EdgeInsert::Duplicate;
        }
        let source = self.node_index.get(&edge.source).copied();
        let target = self.node_index.get(&edge.target).copied();
        let (Some(from), Some(to)) = (source, target) else {
            let mut missing = Vec::new();
            if source.is_none() {
                missing.push(edge.source.clone());
            }
            if target.is_none() && edge.target != edge.source {
                missing.push(edge.target.clone());
            }
            return EdgeInsert::MissingEndpoints(missing);
        };
        let id = edge.id.clone();
        let key = self.inner.add_edge(from, to, edge);
        self.edge_index.insert(id, key);
        EdgeInsert::Inserted
    }

    /// Update a node position. Returns `false` for unknown ids and when the
    /// node is already there.
    pub(crate) fn set_node_position(&mut self, id: &NodeId, position: Point2D<f32>) -> bool {
        let Some(key) = self.node_index.get(id).copied() else {
            return false;
        };
        match self.inner.node_weight_mut(key) {
            Some(node) if node.position != position => {
                node.position = position;
                true
            },
            _ => false,
        }
    }

    /// Remove nodes and every edge incident to any of them in one step.
    ///
    /// Incident edges are collected before anything is removed, so the edge
    /// index never points at an edge petgraph already dropped.
    pub(crate) fn remove_nodes(&mut self, ids: &[NodeId]) -> NodeRemoval {
        let keys: Vec<(NodeId, NodeKey)> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| self.node_index.get(id).map(|key| (id.clone(), *key)))
            .collect();

        let edge_ids: BTreeSet<EdgeId> = keys
            .iter()
            .flat_map(|(id, _)| self.incident_edges(id))
            .collect();

        for edge_id in &edge_ids {
            if let Some(key) = self.edge_index.remove(edge_id) {
                self.inner.remove_edge(key);
            }
        }
        let mut removal = NodeRemoval {
            nodes: Vec::with_capacity(keys.len()),
            edges: edge_ids.into_iter().collect(),
        };
        for (id, key) in keys {
            self.node_index.remove(&id);
            self.inner.remove_node(key);
            removal.nodes.push(id);
        }
        removal
    }

    /// Remove edges by id. Unknown ids are skipped; returns the ids removed.
    pub(crate) fn remove_edges(&mut self, ids: &[EdgeId]) -> Vec<EdgeId> {
        let mut removed = Vec::new();
        for id in ids {
            if let Some(key) = self.edge_index.remove(id) {
                self.inner.remove_edge(key);
                removed.push(id.clone());
            }
        }
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
        self.node_index.clear();
        self.edge_index.clear();
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index
            .get(id)
            .and_then(|key| self.inner.node_weight(*key))
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edge_index
            .get(id)
            .and_then(|key| self.inner.edge_weight(*key))
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge_index.contains_key(id)
    }

    /// Iterate over all nodes (unordered)
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    /// Iterate over all edges (unordered)
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.inner.edge_weights()
    }

    /// Ids of edges touching `id`, in id order.
    pub fn incident_edges(&self, id: &NodeId) -> Vec<EdgeId> {
        let Some(key) = self.node_index.get(id).copied() else {
            return Vec::new();
        };
        let mut ids = BTreeSet::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.inner.edges_directed(key, direction) {
                ids.insert(edge.weight().id.clone());
            }
        }
        ids.into_iter().collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// True when every edge's endpoints resolve to nodes in this mirror.
    pub fn endpoints_consistent(&self) -> bool {
        self.edges()
            .all(|edge| self.contains_node(&edge.source) && self.contains_node(&edge.target))
            && self.node_index.len() == self.inner.node_count()
            && self.edge_index.len() == self.inner.edge_count()
    }
}
