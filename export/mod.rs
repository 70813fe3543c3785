/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable snapshot of the mirror.
//!
//! The snapshot always covers the full mirror, independent of the active
//! filter. Nodes and edges are ordered by id so two snapshots of the same
//! mirror differ only in their timestamp.

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::graph::{EdgeId, EdgeKind, EntityRef, Graph, NodeId, NodeKind};
use crate::protocol::WirePosition;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_ref: Option<String>,
    pub position: WirePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEdge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSnapshot {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl ExportSnapshot {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot the mirror as of now.
pub fn serialize(graph: &Graph) -> Result<ExportSnapshot, ExportError> {
    serialize_at(graph, OffsetDateTime::now_utc())
}

pub fn serialize_at(graph: &Graph, at: OffsetDateTime) -> Result<ExportSnapshot, ExportError> {
    let mut nodes: Vec<ExportNode> = graph
        .nodes()
        .map(|node| ExportNode {
            id: node.id.clone(),
            kind: node.kind,
            entity_ref: node.entity_ref.clone(),
            label: node.label.clone(),
            origin_ref: node.origin_ref.clone(),
            position: node.position.into(),
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<ExportEdge> = graph
        .edges()
        .map(|edge| ExportEdge {
            id: edge.id.clone(),
            source_id: edge.source.clone(),
            target_id: edge.target.clone(),
            kind: edge.kind,
        })
        .collect();
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(ExportSnapshot {
        timestamp: at.to_offset(time::UtcOffset::UTC).format(&Rfc3339)?,
        node_count: nodes.len(),
        edge_count: edges.len(),
        nodes,
        edges,
    })
}
