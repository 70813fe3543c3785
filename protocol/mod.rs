/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Command channel messages.
//!
//! Every message on the wire is a named envelope, `{"event": name, "payload": {...}}`.
//! Outbound requests only ask the authority for a change; inbound events are
//! the authority's confirmed decisions and are the only thing that mutates
//! the mirror.

pub mod channel;

use euclid::default::Point2D;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{Edge, EdgeId, EdgeKind, EntityRef, Node, NodeId, NodeKind};

/// `{x, y}` position as it travels over the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePosition {
    pub x: f32,
    pub y: f32,
}

impl From<Point2D<f32>> for WirePosition {
    fn from(point: Point2D<f32>) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<WirePosition> for Point2D<f32> {
    fn from(position: WirePosition) -> Self {
        Point2D::new(position.x, position.y)
    }
}

/// Node record as sent by the authority in `add_node` and `load_graph`.
///
/// Positions arrive either nested (`position: {x, y}`) or flattened
/// (`position_x`, `position_y`); the nested form wins when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: NodeId,
    #[serde(default, alias = "media_id", skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<EntityRef>,
    #[serde(default, alias = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub origin_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<WirePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f32>,
}

impl WireNode {
    pub fn new(id: &str, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            entity_ref: None,
            kind,
            label: None,
            origin_ref: None,
            position: None,
            position_x: None,
            position_y: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some(WirePosition { x, y });
        self
    }

    pub fn with_entity(mut self, entity_ref: EntityRef) -> Self {
        self.entity_ref = Some(entity_ref);
        self
    }

    pub fn resolved_position(&self) -> Option<Point2D<f32>> {
        if let Some(position) = self.position {
            return Some(position.into());
        }
        self.position_x
            .zip(self.position_y)
            .map(|(x, y)| Point2D::new(x, y))
    }

    /// Convert into a mirror node. The flag is `true` when the record carried
    /// no usable position and the node was placed at the origin.
    pub(crate) fn to_node(&self) -> (Node, bool) {
        let position = self.resolved_position();
        let node = Node {
            id: self.id.clone(),
            entity_ref: self.entity_ref.clone(),
            kind: self.kind,
            label: self.label.clone(),
            origin_ref: self.origin_ref.clone(),
            position: position.unwrap_or_else(Point2D::origin),
        };
        (node, position.is_none())
    }
}

/// Edge record as sent by the authority in `add_edge` and `load_graph`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEdge {
    pub id: EdgeId,
    #[serde(alias = "source")]
    pub source_id: NodeId,
    #[serde(alias = "target")]
    pub target_id: NodeId,
    #[serde(default, alias = "type")]
    pub kind: EdgeKind,
}

impl WireEdge {
    pub fn new(id: &str, source: &str, target: &str, kind: EdgeKind) -> Self {
        Self {
            id: EdgeId::new(id),
            source_id: NodeId::new(source),
            target_id: NodeId::new(target),
            kind,
        }
    }

    pub(crate) fn to_edge(&self) -> Edge {
        Edge {
            id: self.id.clone(),
            source: self.source_id.clone(),
            target: self.target_id.clone(),
            kind: self.kind,
        }
    }
}

/// Confirmed event from the remote authority.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    LoadGraph {
        nodes: Vec<WireNode>,
        edges: Vec<WireEdge>,
    },
    AddNode(WireNode),
    AddEdge(WireEdge),
    NodeMoved {
        id: NodeId,
        position: Point2D<f32>,
    },
    RemoveNodes {
        node_ids: Vec<NodeId>,
    },
    RemoveEdges {
        edge_ids: Vec<EdgeId>,
    },
    ClearCanvas,
    /// Delegated to the rendering engine; `None` selects the configured default.
    ApplyLayout {
        layout_name: Option<String>,
    },
    /// Delegated to the subgraph filter.
    FilterGraph {
        filter_mode: String,
    },
    ChangeLayout {
        layout_name: String,
    },
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::LoadGraph { .. } => "load_graph",
            InboundEvent::AddNode(_) => "add_node",
            InboundEvent::AddEdge(_) => "add_edge",
            InboundEvent::NodeMoved { .. } => "node_moved",
            InboundEvent::RemoveNodes { .. } => "remove_nodes",
            InboundEvent::RemoveEdges { .. } => "remove_edges",
            InboundEvent::ClearCanvas => "clear_canvas",
            InboundEvent::ApplyLayout { .. } => "apply_layout",
            InboundEvent::FilterGraph { .. } => "filter_graph",
            InboundEvent::ChangeLayout { .. } => "change_layout",
        }
    }

    /// Whether the event can change mirror content.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            InboundEvent::ApplyLayout { .. }
                | InboundEvent::FilterGraph { .. }
                | InboundEvent::ChangeLayout { .. }
        )
    }

    /// Decode a named envelope into a typed event.
    pub fn from_message(message: Message) -> Result<Self, ProtocolError> {
        let Message { event, payload } = message;
        let payload = match payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let invalid = |source| ProtocolError::InvalidPayload {
            event: event.clone(),
            source,
        };

        let decoded = match event.as_str() {
            "load_graph" => {
                let p: LoadGraphPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::LoadGraph {
                    nodes: p.nodes,
                    edges: p.edges,
                }
            },
            "add_node" => InboundEvent::AddNode(serde_json::from_value(payload).map_err(invalid)?),
            "add_edge" => InboundEvent::AddEdge(serde_json::from_value(payload).map_err(invalid)?),
            "node_moved" => {
                let p: NodeMovedPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::NodeMoved {
                    id: p.id,
                    position: p.position.into(),
                }
            },
            "remove_nodes" => {
                let p: RemoveNodesPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::RemoveNodes {
                    node_ids: p.node_ids,
                }
            },
            "remove_edges" => {
                let p: RemoveEdgesPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::RemoveEdges {
                    edge_ids: p.edge_ids,
                }
            },
            "clear_canvas" => InboundEvent::ClearCanvas,
            "apply_layout" => {
                let p: ApplyLayoutPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::ApplyLayout {
                    layout_name: p.layout_name,
                }
            },
            "filter_graph" => {
                let p: FilterGraphPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::FilterGraph {
                    filter_mode: p.filter_mode,
                }
            },
            "change_layout" => {
                let p: ChangeLayoutPayload = serde_json::from_value(payload).map_err(invalid)?;
                InboundEvent::ChangeLayout {
                    layout_name: p.layout_name,
                }
            },
            _ => return Err(ProtocolError::UnknownEvent(event.clone())),
        };
        Ok(decoded)
    }
}

/// Request from the controller to the remote authority.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum OutboundRequest {
    NodeMoved {
        id: NodeId,
        position: WirePosition,
    },
    NodeSelected {
        id: NodeId,
        entity_ref: Option<EntityRef>,
    },
    NodeDeselected {},
    CreateEdge {
        source_id: NodeId,
        target_id: NodeId,
    },
    DeleteNodes {
        node_ids: Vec<NodeId>,
    },
    DeleteEdges {
        edge_ids: Vec<EdgeId>,
    },
    AddNodeFromPalette {
        entity_ref: EntityRef,
        position: WirePosition,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin_ref: Option<String>,
        /// Client-side correlation id until the authority assigns the real one.
        placeholder_id: String,
    },
}

impl OutboundRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundRequest::NodeMoved { .. } => "node_moved",
            OutboundRequest::NodeSelected { .. } => "node_selected",
            OutboundRequest::NodeDeselected {} => "node_deselected",
            OutboundRequest::CreateEdge { .. } => "create_edge",
            OutboundRequest::DeleteNodes { .. } => "delete_nodes",
            OutboundRequest::DeleteEdges { .. } => "delete_edges",
            OutboundRequest::AddNodeFromPalette { .. } => "add_node_from_palette",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Wire envelope shared by both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Decode one JSON envelope into an inbound event.
pub fn decode_event(text: &str) -> Result<InboundEvent, ProtocolError> {
    let message: Message = serde_json::from_str(text)?;
    InboundEvent::from_message(message)
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("invalid payload for `{event}`: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct LoadGraphPayload {
    #[serde(default)]
    nodes: Vec<WireNode>,
    #[serde(default)]
    edges: Vec<WireEdge>,
}

#[derive(Deserialize)]
struct NodeMovedPayload {
    id: NodeId,
    position: WirePosition,
}

#[derive(Deserialize)]
struct RemoveNodesPayload {
    node_ids: Vec<NodeId>,
}

#[derive(Deserialize)]
struct RemoveEdgesPayload {
    edge_ids: Vec<EdgeId>,
}

#[derive(Deserialize)]
struct ApplyLayoutPayload {
    #[serde(default, alias = "layout_type", alias = "layoutName")]
    layout_name: Option<String>,
}

#[derive(Deserialize)]
struct FilterGraphPayload {
    #[serde(alias = "filterType", alias = "filter_type")]
    filter_mode: String,
}

#[derive(Deserialize)]
struct ChangeLayoutPayload {
    #[serde(alias = "layoutName")]
    layout_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_add_node_with_nested_position() {
        let event = decode_event(
            r#"{"event":"add_node","payload":{"id":"n1","entity_ref":42,"image_url":"/m/42.png","position":{"x":10.5,"y":-3}}}"#,
        )
        .unwrap();

        let InboundEvent::AddNode(node) = event else {
            panic!("expected add_node, got {event:?}");
        };
        assert_eq!(node.id, NodeId::new("n1"));
        assert_eq!(node.entity_ref, Some(EntityRef::Id(42)));
        assert_eq!(node.origin_ref.as_deref(), Some("/m/42.png"));
        assert_eq!(node.kind, NodeKind::Generic);
        assert_eq!(node.resolved_position(), Some(Point2D::new(10.5, -3.0)));
    }

    #[test]
    fn decode_load_graph_with_flattened_positions_and_types() {
        let event = decode_event(
            r#"{"event":"load_graph","payload":{
                "nodes":[
                    {"id":"c1","type":"concept","label":"User","position_x":1,"position_y":2},
                    {"id":"a1","type":"adr","media_id":"adr-0001"}
                ],
                "edges":[{"id":"e1","source_id":"a1","target_id":"c1","type":"constrains"}]
            }}"#,
        )
        .unwrap();

        let InboundEvent::LoadGraph { nodes, edges } = event else {
            panic!("expected load_graph");
        };
        assert_eq!(nodes[0].kind, NodeKind::Concept);
        assert_eq!(nodes[0].resolved_position(), Some(Point2D::new(1.0, 2.0)));
        assert_eq!(nodes[1].resolved_position(), None);
        assert_eq!(
            nodes[1].entity_ref,
            Some(EntityRef::Key("adr-0001".to_string()))
        );
        assert_eq!(edges[0].kind, EdgeKind::Constrains);
    }

    #[test]
    fn decode_payloadless_and_aliased_events() {
        assert_eq!(
            decode_event(r#"{"event":"clear_canvas"}"#).unwrap(),
            InboundEvent::ClearCanvas
        );
        assert_eq!(
            decode_event(r#"{"event":"load_graph"}"#).unwrap(),
            InboundEvent::LoadGraph {
                nodes: vec![],
                edges: vec![]
            }
        );
        assert_eq!(
            decode_event(r#"{"event":"apply_layout","payload":{"layout_type":"grid"}}"#).unwrap(),
            InboundEvent::ApplyLayout {
                layout_name: Some("grid".to_string())
            }
        );
        assert_eq!(
            decode_event(r#"{"event":"filter_graph","payload":{"filterType":"adrs"}}"#).unwrap(),
            InboundEvent::FilterGraph {
                filter_mode: "adrs".to_string()
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_and_invalid() {
        assert!(matches!(
            decode_event(r#"{"event":"explode","payload":{}}"#),
            Err(ProtocolError::UnknownEvent(name)) if name == "explode"
        ));
        assert!(matches!(
            decode_event(r#"{"event":"remove_nodes","payload":{"ids":[]}}"#),
            Err(ProtocolError::InvalidPayload { event, .. }) if event == "remove_nodes"
        ));
        assert!(matches!(
            decode_event("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_requests_use_named_envelopes() {
        let request = OutboundRequest::CreateEdge {
            source_id: NodeId::new("a"),
            target_id: NodeId::new("b"),
        };
        let value: Value = serde_json::from_str(&request.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "create_edge", "payload": {"source_id": "a", "target_id": "b"}})
        );
        assert_eq!(request.name(), "create_edge");

        let value = serde_json::to_value(OutboundRequest::NodeDeselected {}).unwrap();
        assert_eq!(value, json!({"event": "node_deselected", "payload": {}}));
    }

    #[test]
    fn palette_request_omits_missing_origin() {
        let request = OutboundRequest::AddNodeFromPalette {
            entity_ref: EntityRef::Id(42),
            position: WirePosition { x: 125.0, y: 75.0 },
            origin_ref: None,
            placeholder_id: "pending-1".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "add_node_from_palette",
                "payload": {
                    "entity_ref": 42,
                    "position": {"x": 125.0, "y": 75.0},
                    "placeholder_id": "pending-1"
                }
            })
        );
    }

    #[test]
    fn mutating_classification() {
        assert!(InboundEvent::ClearCanvas.is_mutating());
        assert!(
            !InboundEvent::ChangeLayout {
                layout_name: "circle".to_string()
            }
            .is_mutating()
        );
    }
}
