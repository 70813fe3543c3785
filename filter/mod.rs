/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Subgraph visibility.
//!
//! Visibility is derived, never stored on the mirror: a pure function of the
//! filter mode and current mirror content. An edge is only ever visible when
//! both of its endpoints are.

use std::collections::BTreeSet;
use std::fmt;

use log::warn;

use crate::graph::{EdgeId, EdgeKind, Graph, NodeId, NodeKind};

/// Named filter modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    All,
    /// Nodes of one kind plus the concepts they relate to.
    Kind(NodeKind),
    /// Concepts joined by structural (`has_many`, `belongs_to`) edges.
    Relationships,
}

impl FilterMode {
    /// Parse a mode name. Unknown names fall back to `All`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" | "" => FilterMode::All,
            "concepts" | "concept" => FilterMode::Kind(NodeKind::Concept),
            "adrs" | "adr" => FilterMode::Kind(NodeKind::Adr),
            "patterns" | "pattern" => FilterMode::Kind(NodeKind::Pattern),
            "generic" => FilterMode::Kind(NodeKind::Generic),
            "relationships" => FilterMode::Relationships,
            other => {
                warn!("filter: unknown mode `{other}`, showing everything");
                FilterMode::All
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Kind(NodeKind::Concept) => "concepts",
            FilterMode::Kind(NodeKind::Adr) => "adrs",
            FilterMode::Kind(NodeKind::Pattern) => "patterns",
            FilterMode::Kind(NodeKind::Generic) => "generic",
            FilterMode::Relationships => "relationships",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge kind linking nodes of `kind` to concepts. `None` means any kind
/// (the concept view keeps every edge between visible concepts).
fn relating_edge_kind(kind: NodeKind) -> Option<EdgeKind> {
    match kind {
        NodeKind::Concept => None,
        NodeKind::Adr => Some(EdgeKind::Constrains),
        NodeKind::Pattern => Some(EdgeKind::AppliesTo),
        NodeKind::Generic => Some(EdgeKind::Generic),
    }
}

/// Visible node and edge ids, ordered for stable iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub nodes: BTreeSet<NodeId>,
    pub edges: BTreeSet<EdgeId>,
}

impl Visibility {
    pub fn shows_node(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn shows_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub fn compute_visibility(mode: FilterMode, graph: &Graph) -> Visibility {
    let node_visible = |kind: NodeKind| match mode {
        FilterMode::All => true,
        FilterMode::Kind(k) => kind == k || kind == NodeKind::Concept,
        FilterMode::Relationships => kind == NodeKind::Concept,
    };
    let edge_kind_visible = |kind: EdgeKind| match mode {
        FilterMode::All => true,
        FilterMode::Kind(k) => relating_edge_kind(k).is_none_or(|wanted| wanted == kind),
        FilterMode::Relationships => kind.is_structural(),
    };

    let nodes: BTreeSet<NodeId> = graph
        .nodes()
        .filter(|node| node_visible(node.kind))
        .map(|node| node.id.clone())
        .collect();
    let edges = graph
        .edges()
        .filter(|edge| edge_kind_visible(edge.kind))
        .filter(|edge| nodes.contains(&edge.source) && nodes.contains(&edge.target))
        .map(|edge| edge.id.clone())
        .collect();

    Visibility { nodes, edges }
}
