/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Rendering engine capability interface.
//!
//! The engine owns pixels, hit testing, the camera, selection highlighting,
//! and layout algorithms. It holds a projection of the mirror and is driven
//! one way from it: the controller tells the engine what to show, the engine
//! never writes back into the mirror.
//!
//! Every method here is required. An engine that cannot deliver one of the
//! [`crate::input::REQUIRED_INPUTS`] fails at mount time through
//! [`RenderEngine::subscribe`], not at the first gesture.

pub mod headless;

use euclid::default::Point2D;

use crate::camera::Camera;
use crate::filter::Visibility;
use crate::graph::{Edge, EdgeId, EdgeKind, Node, NodeId, NodeKind};
use crate::input::InputKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("rendering engine unavailable: {0}")]
    Unavailable(String),
    #[error("rendering engine cannot deliver {0:?} input")]
    MissingCapability(InputKind),
    #[error("unknown layout `{0}`")]
    UnknownLayout(String),
}

/// Settings handed to the engine at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub min_zoom: f32,
    pub max_zoom: f32,
}

/// Something the engine draws, keyed by mirror id.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualElement {
    Node {
        id: NodeId,
        kind: NodeKind,
        label: Option<String>,
        position: Point2D<f32>,
    },
    Edge {
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
    },
}

impl VisualElement {
    pub fn from_node(node: &Node) -> Self {
        VisualElement::Node {
            id: node.id.clone(),
            kind: node.kind,
            label: node.label.clone(),
            position: node.position,
        }
    }

    pub fn from_edge(edge: &Edge) -> Self {
        VisualElement::Edge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    Node(NodeId),
    Edge(EdgeId),
}

/// The engine's current selection highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Transient per-node decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMarker {
    /// Source of an in-progress edge gesture.
    EdgeSource,
}

pub trait RenderEngine {
    /// Acquire the rendering surface.
    fn initialize(&mut self, options: &EngineOptions) -> Result<(), EngineError>;

    /// Register for the given input categories. Fails if any cannot be
    /// delivered.
    fn subscribe(&mut self, inputs: &[InputKind]) -> Result<(), EngineError>;

    /// Show a disabled canvas with `reason`.
    fn enter_degraded_state(&mut self, reason: &str);

    fn add_element(&mut self, element: VisualElement);
    fn remove_element(&mut self, element: &ElementRef);
    fn clear_elements(&mut self);

    fn element_position(&self, id: &NodeId) -> Option<Point2D<f32>>;
    fn set_element_position(&mut self, id: &NodeId, position: Point2D<f32>);

    /// Current pan, zoom, and viewport bounds, read fresh on every call.
    fn camera(&self) -> Camera;
    fn selection(&self) -> Selection;

    fn set_marker(&mut self, id: &NodeId, marker: Option<NodeMarker>);

    /// Hide everything outside `visibility`.
    fn apply_visibility(&mut self, visibility: &Visibility);

    /// Run the named layout over the visible subset only.
    fn run_layout(&mut self, name: &str, visibility: &Visibility) -> Result<(), EngineError>;

    /// Fit the camera to the visible elements.
    fn fit(&mut self, padding: f32);

    /// Release the surface and every element.
    fn teardown(&mut self);
}

impl<E: RenderEngine + ?Sized> RenderEngine for &mut E {
    fn initialize(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        (**self).initialize(options)
    }

    fn subscribe(&mut self, inputs: &[InputKind]) -> Result<(), EngineError> {
        (**self).subscribe(inputs)
    }

    fn enter_degraded_state(&mut self, reason: &str) {
        (**self).enter_degraded_state(reason)
    }

    fn add_element(&mut self, element: VisualElement) {
        (**self).add_element(element)
    }

    fn remove_element(&mut self, element: &ElementRef) {
        (**self).remove_element(element)
    }

    fn clear_elements(&mut self) {
        (**self).clear_elements()
    }

    fn element_position(&self, id: &NodeId) -> Option<Point2D<f32>> {
        (**self).element_position(id)
    }

    fn set_element_position(&mut self, id: &NodeId, position: Point2D<f32>) {
        (**self).set_element_position(id, position)
    }

    fn camera(&self) -> Camera {
        (**self).camera()
    }

    fn selection(&self) -> Selection {
        (**self).selection()
    }

    fn set_marker(&mut self, id: &NodeId, marker: Option<NodeMarker>) {
        (**self).set_marker(id, marker)
    }

    fn apply_visibility(&mut self, visibility: &Visibility) {
        (**self).apply_visibility(visibility)
    }

    fn run_layout(&mut self, name: &str, visibility: &Visibility) -> Result<(), EngineError> {
        (**self).run_layout(name, visibility)
    }

    fn fit(&mut self, padding: f32) {
        (**self).fit(padding)
    }

    fn teardown(&mut self) {
        (**self).teardown()
    }
}
