/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas controller.
//!
//! Owns the mirror, the edge gesture slot, the active filter, the engine, and
//! the command channel. Two entry points drive it:
//!
//! - [`CanvasController::handle_input`]: user gestures, already hit tested by
//!   the engine. These only ever produce requests on the channel.
//! - [`CanvasController::apply_event`]: confirmed events from the authority.
//!   These are the only path that mutates the mirror; the engine is then told
//!   to reflect the change.

use log::{debug, info, warn};

use crate::export::{self, ExportSnapshot};
use crate::filter::{FilterMode, Visibility, compute_visibility};
use crate::graph::{Graph, NodeId};
use crate::input::drop::ingest_drop;
use crate::input::edge_gesture::{EdgeGesture, GestureStep};
use crate::input::{CanvasInput, REQUIRED_INPUTS};
use crate::prefs::{CanvasMode, CanvasPrefs, PrefsError};
use crate::protocol::channel::CommandChannel;
use crate::protocol::{InboundEvent, OutboundRequest};
use crate::render::{ElementRef, EngineError, EngineOptions, NodeMarker, RenderEngine, VisualElement};
use crate::sync::{ApplyReport, Mirror};

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas disabled: {0}")]
    EngineUnavailable(#[source] EngineError),
    #[error(transparent)]
    Prefs(#[from] PrefsError),
}

/// Lifecycle of the mounted canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasStatus {
    Mounting,
    Ready,
    Unmounted,
}

pub struct CanvasController<E: RenderEngine, C: CommandChannel> {
    prefs: CanvasPrefs,
    mirror: Mirror,
    edge_gesture: EdgeGesture,
    filter: FilterMode,
    visibility: Visibility,
    /// Recomputed after every mutating event.
    export: Option<ExportSnapshot>,
    status: CanvasStatus,
    engine: E,
    channel: C,
}

impl<E: RenderEngine, C: CommandChannel> CanvasController<E, C> {
    /// Acquire the engine and register for every required input.
    ///
    /// Any failure puts the engine into its degraded state and is returned;
    /// there is no partially mounted canvas.
    pub fn mount(mut engine: E, channel: C, prefs: CanvasPrefs) -> Result<Self, CanvasError> {
        prefs.validate()?;
        let options = EngineOptions {
            min_zoom: prefs.min_zoom,
            max_zoom: prefs.max_zoom,
        };
        let acquired = engine
            .initialize(&options)
            .and_then(|()| engine.subscribe(&REQUIRED_INPUTS));
        if let Err(err) = acquired {
            warn!("canvas: mount failed, entering degraded state: {err}");
            engine.enter_degraded_state(&err.to_string());
            return Err(CanvasError::EngineUnavailable(err));
        }

        let mut controller = Self {
            mirror: Mirror::new(prefs.pending_edges),
            prefs,
            edge_gesture: EdgeGesture::Idle,
            filter: FilterMode::All,
            visibility: Visibility::default(),
            export: None,
            status: CanvasStatus::Mounting,
            engine,
            channel,
        };
        controller.refresh_export();
        controller.status = CanvasStatus::Ready;
        info!("canvas: mounted in {} mode", controller.prefs.mode);
        Ok(controller)
    }

    pub fn status(&self) -> &CanvasStatus {
        &self.status
    }

    pub fn mode(&self) -> CanvasMode {
        self.prefs.mode
    }

    pub fn prefs(&self) -> &CanvasPrefs {
        &self.prefs
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn graph(&self) -> &Graph {
        self.mirror.graph()
    }

    pub fn edge_gesture(&self) -> &EdgeGesture {
        &self.edge_gesture
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Snapshot as of the last applied mutating event.
    pub fn export(&self) -> Option<&ExportSnapshot> {
        self.export.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Engine-owned state (camera, selection) may be driven directly.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn set_mode(&mut self, mode: CanvasMode) {
        if mode == self.prefs.mode {
            return;
        }
        if mode == CanvasMode::Browser {
            self.cancel_edge_gesture();
        }
        info!("canvas: switching to {mode} mode");
        self.prefs.mode = mode;
    }

    /// Interpret one gesture. Never mutates the mirror.
    pub fn handle_input(&mut self, input: CanvasInput) {
        if self.status != CanvasStatus::Ready {
            debug!("canvas: ignoring {:?} input while {:?}", input.kind(), self.status);
            return;
        }
        match self.prefs.mode {
            CanvasMode::Browser => self.handle_browser_input(input),
            CanvasMode::Editor => self.handle_editor_input(input),
        }
    }

    fn handle_browser_input(&mut self, input: CanvasInput) {
        match input {
            CanvasInput::TapNode(id) => self.request_selection(id),
            CanvasInput::TapBackground => self.send(OutboundRequest::NodeDeselected {}),
            other => debug!("canvas: {:?} input ignored in browser mode", other.kind()),
        }
    }

    fn handle_editor_input(&mut self, input: CanvasInput) {
        match input {
            CanvasInput::TapNode(_) => {},
            CanvasInput::SelectNode(id) => self.request_selection(id),
            CanvasInput::TapBackground => self.cancel_edge_gesture(),
            CanvasInput::ContextActivate(id) => self.activate_edge_gesture(id),
            CanvasInput::DragEnd { id, position } => {
                if !self.mirror.graph().contains_node(&id) {
                    debug!("canvas: drag end on unknown node {id}");
                    return;
                }
                self.send(OutboundRequest::NodeMoved {
                    id,
                    position: position.into(),
                });
            },
            CanvasInput::DeleteSelection => {
                let selection = self.engine.selection();
                if !selection.nodes.is_empty() {
                    self.send(OutboundRequest::DeleteNodes {
                        node_ids: selection.nodes,
                    });
                } else if !selection.edges.is_empty() {
                    self.send(OutboundRequest::DeleteEdges {
                        edge_ids: selection.edges,
                    });
                }
            },
            CanvasInput::Drop { transfer, pointer } => {
                // Camera is read now, not at drag start.
                let camera = self.engine.camera();
                match ingest_drop(&transfer, pointer, &camera) {
                    Ok(request) => self.send(request),
                    Err(err) => warn!("canvas: drop rejected: {err}"),
                }
            },
        }
    }

    fn request_selection(&mut self, id: NodeId) {
        let Some(node) = self.mirror.graph().node(&id) else {
            debug!("canvas: selection of unknown node {id}");
            return;
        };
        let entity_ref = node.entity_ref.clone();
        self.send(OutboundRequest::NodeSelected { id, entity_ref });
    }

    fn activate_edge_gesture(&mut self, id: NodeId) {
        if !self.mirror.graph().contains_node(&id) {
            debug!("canvas: contextual activation on unknown node {id}");
            return;
        }
        match self.edge_gesture.activate(id) {
            GestureStep::Marked(source) => {
                self.engine.set_marker(&source, Some(NodeMarker::EdgeSource));
            },
            GestureStep::Completed { source, target } => {
                self.engine.set_marker(&source, None);
                self.send(OutboundRequest::CreateEdge {
                    source_id: source,
                    target_id: target,
                });
            },
            GestureStep::Cancelled(_) | GestureStep::Unchanged => {},
        }
    }

    fn cancel_edge_gesture(&mut self) {
        if let GestureStep::Cancelled(source) = self.edge_gesture.cancel() {
            self.engine.set_marker(&source, None);
        }
    }

    fn send(&mut self, request: OutboundRequest) {
        let name = request.name();
        match self.channel.push(request) {
            Ok(()) => debug!("canvas: sent {name}"),
            Err(err) => warn!("canvas: {name} request not sent: {err}"),
        }
    }

    /// Apply one confirmed event and reflect it in the engine.
    pub fn apply_event(&mut self, event: &InboundEvent) -> ApplyReport {
        if self.status != CanvasStatus::Ready {
            debug!("canvas: dropping {} while {:?}", event.name(), self.status);
            return ApplyReport::default();
        }
        if event.is_mutating() {
            return self.apply_mutation(event);
        }
        match event {
            InboundEvent::ApplyLayout { layout_name } => {
                let name = layout_name
                    .clone()
                    .unwrap_or_else(|| self.prefs.default_layout.clone());
                self.run_layout(&name);
                ApplyReport::default()
            },
            InboundEvent::ChangeLayout { layout_name } => {
                self.run_layout(layout_name);
                ApplyReport::default()
            },
            InboundEvent::FilterGraph { filter_mode } => {
                self.filter_graph(FilterMode::parse(filter_mode));
                ApplyReport::default()
            },
            _ => ApplyReport::default(),
        }
    }

    pub fn apply_events<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a InboundEvent>,
    {
        for event in events {
            self.apply_event(event);
        }
    }

    /// Apply every event waiting on the channel. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.channel.poll_event() {
            self.apply_event(&event);
            applied += 1;
        }
        applied
    }

    fn apply_mutation(&mut self, event: &InboundEvent) -> ApplyReport {
        let report = self.mirror.apply_event(event);
        self.reflect(&report);

        let graph = self.mirror.graph();
        if let Some(gone) = self.edge_gesture.forget_missing(|id| graph.contains_node(id)) {
            debug!("canvas: edge gesture source {gone} removed, gesture reset");
        }
        // A reload rebuilds every element, markers included.
        if report.replaced {
            if let Some(source) = self.edge_gesture.source() {
                self.engine.set_marker(source, Some(NodeMarker::EdgeSource));
            }
        }

        self.refresh_visibility();
        self.refresh_export();
        if matches!(event, InboundEvent::LoadGraph { .. }) && !self.mirror.graph().is_empty() {
            self.engine.fit(self.prefs.fit_padding);
        }
        report
    }

    /// Push one report's changes to the engine. Removals go first so the
    /// engine never holds an edge whose endpoint is gone.
    fn reflect(&mut self, report: &ApplyReport) {
        let graph = self.mirror.graph();
        if report.replaced {
            self.engine.clear_elements();
            for node in graph.nodes() {
                self.engine.add_element(VisualElement::from_node(node));
            }
            for edge in graph.edges() {
                self.engine.add_element(VisualElement::from_edge(edge));
            }
            return;
        }

        for id in &report.removed_edges {
            self.engine.remove_element(&ElementRef::Edge(id.clone()));
        }
        for id in &report.removed_nodes {
            self.engine.remove_element(&ElementRef::Node(id.clone()));
        }
        for node in report.added_nodes.iter().filter_map(|id| graph.node(id)) {
            self.engine.add_element(VisualElement::from_node(node));
        }
        for edge in report.added_edges.iter().filter_map(|id| graph.edge(id)) {
            self.engine.add_element(VisualElement::from_edge(edge));
        }
        for node in report.moved_nodes.iter().filter_map(|id| graph.node(id)) {
            self.engine.set_element_position(&node.id, node.position);
        }
    }

    fn refresh_visibility(&mut self) {
        self.visibility = compute_visibility(self.filter, self.mirror.graph());
        self.engine.apply_visibility(&self.visibility);
    }

    fn refresh_export(&mut self) {
        match export::serialize(self.mirror.graph()) {
            Ok(snapshot) => self.export = Some(snapshot),
            Err(err) => warn!("canvas: export snapshot failed: {err}"),
        }
    }

    /// Switch the active filter and re-run the filter layout over the
    /// visible subset.
    pub fn filter_graph(&mut self, mode: FilterMode) {
        self.filter = mode;
        self.refresh_visibility();
        if self.visibility.is_empty() {
            info!("canvas: filter {mode} shows no nodes");
            return;
        }
        let layout = self.prefs.filter_layout.clone();
        self.run_layout(&layout);
    }

    fn run_layout(&mut self, name: &str) {
        if let Err(err) = self.engine.run_layout(name, &self.visibility) {
            warn!("canvas: layout `{name}` not applied: {err}");
        }
    }

    /// Tear down the engine. The controller ignores input and events
    /// afterwards.
    pub fn unmount(&mut self) {
        self.cancel_edge_gesture();
        self.engine.teardown();
        self.status = CanvasStatus::Unmounted;
        info!("canvas: unmounted");
    }
}
