/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-memory engine with no surface.
//!
//! Keeps the projection, camera, selection, and markers the controller asked
//! for, so the CLI can replay an event log and tests can assert on exactly
//! what a real engine would have been told.

use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::TAU;

use euclid::default::{Box2D, Point2D, Size2D};
use log::debug;

use super::{
    ElementRef, EngineError, EngineOptions, NodeMarker, RenderEngine, Selection, VisualElement,
};
use crate::camera::Camera;
use crate::filter::Visibility;
use crate::graph::{EdgeId, EdgeKind, NodeId, NodeKind};
use crate::input::InputKind;

const GRID_SPACING: f32 = 120.0;
const CIRCLE_RADIUS_PER_NODE: f32 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessNode {
    pub kind: NodeKind,
    pub label: Option<String>,
    pub position: Point2D<f32>,
    pub hidden: bool,
    pub marker: Option<NodeMarker>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessEngine {
    options: Option<EngineOptions>,
    subscribed: BTreeSet<InputKind>,
    init_failure: Option<String>,
    unsupported: BTreeSet<InputKind>,
    degraded: Option<String>,
    torn_down: bool,
    nodes: BTreeMap<NodeId, HeadlessNode>,
    edges: BTreeMap<EdgeId, HeadlessEdge>,
    camera: Camera,
    selection: Selection,
    layout_runs: Vec<(String, usize)>,
    fit_count: usize,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface of `size` at the pointer origin.
    pub fn with_viewport(mut self, size: Size2D<f32>) -> Self {
        self.camera.viewport_size = size;
        self
    }

    /// Engine whose `initialize` fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            init_failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Engine that cannot deliver `kind`.
    pub fn without_input(mut self, kind: InputKind) -> Self {
        self.unsupported.insert(kind);
        self
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn node(&self, id: &NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&HeadlessEdge> {
        self.edges.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = &EdgeId> {
        self.edges.keys()
    }

    pub fn visible_node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.hidden)
            .map(|(id, _)| id)
    }

    pub fn visible_edge_ids(&self) -> impl Iterator<Item = &EdgeId> {
        self.edges
            .iter()
            .filter(|(_, edge)| !edge.hidden)
            .map(|(id, _)| id)
    }

    pub fn marked_nodes(&self) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.marker.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Every layout run so far, with the number of nodes it covered.
    pub fn layout_runs(&self) -> &[(String, usize)] {
        &self.layout_runs
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        match self.options {
            Some(options) => zoom.clamp(options.min_zoom, options.max_zoom),
            None => zoom,
        }
    }

    fn layout_targets(&self, visibility: &Visibility) -> Vec<NodeId> {
        self.nodes
            .keys()
            .filter(|id| visibility.shows_node(id))
            .cloned()
            .collect()
    }

    fn layout_grid(&mut self, targets: &[NodeId]) {
        let columns = (targets.len() as f32).sqrt().ceil().max(1.0) as usize;
        for (index, id) in targets.iter().enumerate() {
            let (row, column) = (index / columns, index % columns);
            if let Some(node) = self.nodes.get_mut(id) {
                node.position =
                    Point2D::new(column as f32 * GRID_SPACING, row as f32 * GRID_SPACING);
            }
        }
    }

    fn layout_circle(&mut self, targets: &[NodeId]) {
        let count = targets.len().max(1) as f32;
        let radius = CIRCLE_RADIUS_PER_NODE * count;
        for (index, id) in targets.iter().enumerate() {
            let angle = TAU * index as f32 / count;
            if let Some(node) = self.nodes.get_mut(id) {
                node.position = Point2D::new(radius * angle.cos(), radius * angle.sin());
            }
        }
    }
}

impl RenderEngine for HeadlessEngine {
    fn initialize(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        if let Some(reason) = &self.init_failure {
            return Err(EngineError::Unavailable(reason.clone()));
        }
        self.options = Some(*options);
        self.camera.zoom = self.clamp_zoom(self.camera.zoom);
        self.torn_down = false;
        Ok(())
    }

    fn subscribe(&mut self, inputs: &[InputKind]) -> Result<(), EngineError> {
        if let Some(kind) = inputs.iter().find(|kind| self.unsupported.contains(kind)) {
            return Err(EngineError::MissingCapability(*kind));
        }
        self.subscribed.extend(inputs.iter().copied());
        Ok(())
    }

    fn enter_degraded_state(&mut self, reason: &str) {
        self.degraded = Some(reason.to_string());
    }

    fn add_element(&mut self, element: VisualElement) {
        match element {
            VisualElement::Node {
                id,
                kind,
                label,
                position,
            } => {
                self.nodes.insert(
                    id,
                    HeadlessNode {
                        kind,
                        label,
                        position,
                        hidden: false,
                        marker: None,
                    },
                );
            },
            VisualElement::Edge {
                id,
                source,
                target,
                kind,
            } => {
                self.edges.insert(
                    id,
                    HeadlessEdge {
                        source,
                        target,
                        kind,
                        hidden: false,
                    },
                );
            },
        }
    }

    fn remove_element(&mut self, element: &ElementRef) {
        match element {
            ElementRef::Node(id) => {
                self.nodes.remove(id);
                self.selection.nodes.retain(|selected| selected != id);
            },
            ElementRef::Edge(id) => {
                self.edges.remove(id);
                self.selection.edges.retain(|selected| selected != id);
            },
        }
    }

    fn clear_elements(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.selection = Selection::default();
    }

    fn element_position(&self, id: &NodeId) -> Option<Point2D<f32>> {
        self.nodes.get(id).map(|node| node.position)
    }

    fn set_element_position(&mut self, id: &NodeId, position: Point2D<f32>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.position = position;
        }
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn selection(&self) -> Selection {
        self.selection.clone()
    }

    fn set_marker(&mut self, id: &NodeId, marker: Option<NodeMarker>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.marker = marker;
        }
    }

    fn apply_visibility(&mut self, visibility: &Visibility) {
        for (id, node) in &mut self.nodes {
            node.hidden = !visibility.shows_node(id);
        }
        for (id, edge) in &mut self.edges {
            edge.hidden = !visibility.shows_edge(id);
        }
    }

    fn run_layout(&mut self, name: &str, visibility: &Visibility) -> Result<(), EngineError> {
        let targets = self.layout_targets(visibility);
        match name {
            // Positions come from the authority or the real engine's solver.
            "preset" | "cose" => {},
            "grid" => self.layout_grid(&targets),
            "circle" => self.layout_circle(&targets),
            other => return Err(EngineError::UnknownLayout(other.to_string())),
        }
        debug!("headless: {name} layout over {} node(s)", targets.len());
        self.layout_runs.push((name.to_string(), targets.len()));
        Ok(())
    }

    fn fit(&mut self, padding: f32) {
        self.fit_count += 1;
        let visible: Vec<Point2D<f32>> = self
            .nodes
            .values()
            .filter(|node| !node.hidden)
            .map(|node| node.position)
            .collect();
        if visible.is_empty() {
            return;
        }
        let bounds = Box2D::from_points(&visible);
        let viewport = self.camera.viewport_size;
        let content = bounds.size();
        let zoom = if content.width > 0.0
            && content.height > 0.0
            && viewport.width > 0.0
            && viewport.height > 0.0
        {
            let available = Size2D::new(
                (viewport.width - 2.0 * padding).max(1.0),
                (viewport.height - 2.0 * padding).max(1.0),
            );
            (available.width / content.width).min(available.height / content.height)
        } else {
            self.camera.zoom
        };
        let zoom = self.clamp_zoom(zoom);
        let centre = bounds.center();
        let viewport_centre = Point2D::new(viewport.width / 2.0, viewport.height / 2.0);
        self.camera.zoom = zoom;
        self.camera.pan = viewport_centre - centre * zoom;
    }

    fn teardown(&mut self) {
        self.clear_elements();
        self.subscribed.clear();
        self.options = None;
        self.torn_down = true;
    }
}
