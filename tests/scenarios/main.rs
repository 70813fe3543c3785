/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::io::Write;
use std::process::{Command, Output};

use euclid::default::{Point2D, Vector2D};
use spatial_canvas::filter::FilterMode;
use spatial_canvas::graph::{EdgeId, EdgeKind, NodeId, NodeKind};
use spatial_canvas::input::CanvasInput;
use spatial_canvas::input::drop::{DragTransfer, ENTITY_REF_KEY, ORIGIN_REF_KEY};
use spatial_canvas::protocol::channel::in_process;
use spatial_canvas::protocol::{InboundEvent, OutboundRequest, WirePosition, decode_event};
use spatial_canvas::render::RenderEngine;
use spatial_canvas::test_utils::{edge, editor_controller, knowledge_graph, node};

fn nid(id: &str) -> NodeId {
    NodeId::new(id)
}

fn eid(id: &str) -> EdgeId {
    EdgeId::new(id)
}

fn replay_cli(lines: &[&str], extra: &[&str]) -> Output {
    let mut log = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(log, "{line}").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_spatial-canvas"))
        .arg("replay")
        .args(extra)
        .arg(log.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn replay_cli_prints_export_and_filter_summary() {
    let output = replay_cli(
        &[
            "# knowledge graph",
            r#"{"event":"load_graph","payload":{"nodes":[{"id":"c1","type":"concept"},{"id":"c2","type":"concept"},{"id":"a1","type":"adr"}],"edges":[{"id":"e1","source":"c1","target":"c2","type":"has_many"},{"id":"e2","source":"a1","target":"c1","type":"constrains"}]}}"#,
            "",
            r#"{"event":"add_edge","payload":{"id":"e3","source":"c2","target":"p1"}}"#,
        ],
        &["--filter", "adrs"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let export: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(export["node_count"], 3);
    assert_eq!(export["edge_count"], 2);
    assert_eq!(export["edges"][0]["id"], "e1");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("filter adrs: 3 node(s) [a1, c1, c2], 1 edge(s) [e2]"),
        "{stderr}"
    );
}

#[test]
fn replay_cli_reports_bad_line() {
    let output = replay_cli(
        &[
            r#"{"event":"add_node","payload":{"id":"n1"}}"#,
            r#"{"event":"teleport","payload":{}}"#,
        ],
        &[],
    );
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 2"));
}

#[test]
fn load_graph_snapshot_counts() {
    let mut controller = editor_controller();

    controller.apply_event(&InboundEvent::LoadGraph {
        nodes: vec![
            node("n1", NodeKind::Generic, 0.0, 0.0),
            node("n2", NodeKind::Generic, 50.0, 0.0),
            node("n3", NodeKind::Generic, 0.0, 50.0),
        ],
        edges: vec![edge("e1", "n1", "n2", EdgeKind::Generic)],
    });

    let snapshot = controller.export().expect("snapshot after load");
    assert_eq!(snapshot.node_count, 3);
    assert_eq!(snapshot.edge_count, 1);
}

#[test]
fn early_edge_appears_once_endpoint_arrives_and_redelivery_is_harmless() {
    let mut controller = editor_controller();
    controller.apply_event(&InboundEvent::AddNode(node("n1", NodeKind::Generic, 0.0, 0.0)));

    let early = InboundEvent::AddEdge(edge("e1", "n1", "n2", EdgeKind::Generic));
    controller.apply_event(&early);
    assert!(!controller.graph().contains_edge(&eid("e1")));
    assert_eq!(controller.engine().edge_ids().count(), 0);

    controller.apply_event(&InboundEvent::AddNode(node("n2", NodeKind::Generic, 9.0, 9.0)));
    controller.apply_event(&early);

    assert!(controller.graph().contains_edge(&eid("e1")));
    assert_eq!(controller.graph().edge_count(), 1);
    assert_eq!(controller.engine().edge_ids().collect::<Vec<_>>(), vec![&eid("e1")]);
    assert_eq!(controller.export().unwrap().edge_count, 1);
}

#[test]
fn palette_drop_maps_pointer_through_current_camera() {
    let mut controller = editor_controller();
    let mut camera = controller.engine().camera();
    camera.pan = Vector2D::new(50.0, 50.0);
    camera.zoom = 2.0;
    controller.engine_mut().set_camera(camera);

    controller.handle_input(CanvasInput::Drop {
        transfer: DragTransfer::new()
            .with(ENTITY_REF_KEY, "42")
            .with(ORIGIN_REF_KEY, "https://media.example/42.png"),
        pointer: Point2D::new(300.0, 200.0),
    });

    let sent = controller.channel_mut().take_sent();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        OutboundRequest::AddNodeFromPalette {
            position,
            origin_ref,
            placeholder_id,
            ..
        } => {
            assert_eq!(*position, WirePosition { x: 125.0, y: 75.0 });
            assert_eq!(origin_ref.as_deref(), Some("https://media.example/42.png"));
            assert!(placeholder_id.starts_with("pending-"));
        },
        other => panic!("unexpected request {other:?}"),
    }
    assert!(controller.graph().is_empty());
}

#[test]
fn adr_filter_shows_adrs_concepts_and_constraints_only() {
    let mut controller = editor_controller();
    controller.apply_event(&knowledge_graph());
    controller.apply_event(&InboundEvent::FilterGraph {
        filter_mode: "adrs".into(),
    });

    let visibility = controller.visibility();
    assert_eq!(controller.filter(), FilterMode::Kind(NodeKind::Adr));
    assert_eq!(
        visibility.nodes.iter().map(NodeId::as_str).collect::<Vec<_>>(),
        vec!["a1", "c1", "c2"]
    );
    assert_eq!(
        visibility.edges.iter().map(EdgeId::as_str).collect::<Vec<_>>(),
        vec!["cn"]
    );
    assert!(!controller.engine().visible_node_ids().any(|id| id == &nid("p1")));

    // A later mutation keeps the active filter applied.
    controller.apply_event(&InboundEvent::AddNode(node("a2", NodeKind::Adr, 5.0, 5.0)));
    assert!(controller.visibility().shows_node(&nid("a2")));
    assert!(controller.engine().visible_node_ids().any(|id| id == &nid("a2")));
}

#[test]
fn edge_gesture_round_trip_through_authority() {
    let mut controller = editor_controller();
    controller.apply_event(&knowledge_graph());

    controller.handle_input(CanvasInput::ContextActivate(nid("c1")));
    controller.handle_input(CanvasInput::ContextActivate(nid("p1")));
    let sent = controller.channel_mut().take_sent();
    assert_eq!(
        sent,
        vec![OutboundRequest::CreateEdge {
            source_id: nid("c1"),
            target_id: nid("p1"),
        }]
    );
    assert!(!controller.graph().contains_edge(&eid("new")));

    controller
        .channel_mut()
        .deliver(InboundEvent::AddEdge(edge("new", "c1", "p1", EdgeKind::Generic)));
    assert_eq!(controller.pump(), 1);
    assert!(controller.graph().contains_edge(&eid("new")));
}

#[test]
fn self_loop_is_requested_and_accepted_on_confirmation() {
    let mut controller = editor_controller();
    controller.apply_event(&knowledge_graph());

    controller.handle_input(CanvasInput::ContextActivate(nid("c1")));
    controller.handle_input(CanvasInput::ContextActivate(nid("c1")));
    assert_eq!(
        controller.channel_mut().take_sent(),
        vec![OutboundRequest::CreateEdge {
            source_id: nid("c1"),
            target_id: nid("c1"),
        }]
    );

    controller.apply_event(&InboundEvent::AddEdge(edge("loop", "c1", "c1", EdgeKind::Generic)));
    assert!(controller.graph().contains_edge(&eid("loop")));
}

#[test]
fn node_removal_never_leaves_engine_edges_behind() {
    let mut controller = editor_controller();
    controller.apply_event(&knowledge_graph());

    let report = controller.apply_event(&InboundEvent::RemoveNodes {
        node_ids: vec![nid("c1"), nid("ghost")],
    });

    assert_eq!(report.removed_nodes, vec![nid("c1")]);
    assert_eq!(report.removed_edges, vec![eid("bt"), eid("cn"), eid("hm")]);
    let engine = controller.engine();
    for id in engine.edge_ids() {
        let projected = engine.edge(id).unwrap();
        assert!(engine.node(&projected.source).is_some());
        assert!(engine.node(&projected.target).is_some());
    }
    assert!(controller.graph().endpoints_consistent());
}

#[test]
fn replay_over_in_process_channel_with_wire_aliases() {
    let (client, authority) = in_process();
    let mut controller = spatial_canvas::app::CanvasController::mount(
        spatial_canvas::render::headless::HeadlessEngine::new(),
        client,
        spatial_canvas::prefs::CanvasPrefs::default(),
    )
    .unwrap();

    let log = [
        r#"{"event":"load_graph","payload":{"nodes":[{"id":"c1","type":"concept","position_x":1,"position_y":2}],"edges":[]}}"#,
        r#"{"event":"add_node","payload":{"id":"n7","media_id":7,"image_url":"https://media.example/7.png","position":{"x":3,"y":4}}}"#,
        r#"{"event":"add_edge","payload":{"id":"e1","source":"c1","target":"n7"}}"#,
        r#"{"event":"node_moved","payload":{"id":"n7","position":{"x":10,"y":20}}}"#,
        r#"{"event":"apply_layout","payload":{"layout_type":"circle"}}"#,
    ];
    for line in log {
        authority.send(decode_event(line).unwrap()).unwrap();
    }

    assert_eq!(controller.pump(), log.len());
    let graph = controller.graph();
    assert_eq!(graph.node(&nid("c1")).unwrap().position, Point2D::new(1.0, 2.0));
    assert_eq!(graph.node(&nid("n7")).unwrap().position, Point2D::new(10.0, 20.0));
    assert_eq!(
        graph.node(&nid("n7")).unwrap().origin_ref.as_deref(),
        Some("https://media.example/7.png")
    );
    assert!(graph.contains_edge(&eid("e1")));
    assert_eq!(controller.engine().layout_runs(), &[("circle".to_string(), 2)]);
}

#[test]
fn clear_canvas_resets_engine_and_export() {
    let mut controller = editor_controller();
    controller.apply_event(&knowledge_graph());
    controller.handle_input(CanvasInput::ContextActivate(nid("c2")));

    controller.apply_event(&InboundEvent::ClearCanvas);

    assert_eq!(controller.export().unwrap().node_count, 0);
    assert_eq!(controller.engine().node_ids().count(), 0);
    assert!(controller.edge_gesture().is_idle());
}
