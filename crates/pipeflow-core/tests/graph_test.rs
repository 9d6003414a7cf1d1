use pipeflow_core::{
    ChangeKind, ConnectOutcome, Connection, ConnectionRejection, Document, Error, GraphModel,
    LinkField, LoadIssue, NodeKind, NodeStatus, NodeUpdate, Recognition, TaskRecord, Terminal,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn load(value: Value) -> (GraphModel, pipeflow_core::LoadReport) {
    let doc = Document::from_value(value).expect("document");
    GraphModel::from_document(&doc)
}

fn model(value: Value) -> GraphModel {
    load(value).0
}

#[test]
fn load_then_export_round_trips() {
    let doc = json!({
        "$schema": "schema.json",
        "Start": {
            "recognition": "TemplateMatch",
            "template": ["start.png"],
            "next": ["A", "[JumpBack]Start"],
            "on_error": "Recover",
            "roi": [0, 0, 100, 100]
        },
        "A": {"action": "Click", "next": "[Anchor][JumpBack]Start"},
        "Recover": {"timeout_next": "A", "pre_delay": 0}
    });
    let (m, report) = load(doc.clone());
    assert!(report.placeholders.is_empty());
    assert_eq!(m.export_value(), doc);
    assert!(!m.is_dirty());
}

#[test]
fn load_strips_editor_only_keys() {
    let m = model(json!({"A": {"id": "A", "interrupt": ["B"], "next": ["B"]}, "B": {}}));
    assert_eq!(m.export_value(), json!({"A": {"next": ["B"]}, "B": {}}));
}

#[test]
fn missing_targets_become_placeholders() {
    let (m, report) = load(json!({"X": {"next": ["Y"], "on_error": ["[Anchor]Z"]}}));
    assert_eq!(report.nodes, 3);
    assert_eq!(report.edges, 2);
    assert_eq!(report.placeholders, ["Y", "Z"]);

    let y = m.node("Y").expect("placeholder");
    assert!(y.placeholder);
    assert_eq!(y.kind, NodeKind::Unknown);
    assert_eq!(y.status, NodeStatus::Missing);
    assert_eq!(m.outgoing("Y").count(), 0);
    assert_eq!(y.record.to_value(), json!({}));

    assert_eq!(m.node("Z").map(|n| n.kind.clone()), Some(NodeKind::Anchor));
    assert_eq!(m.export_value(), json!({"X": {"next": ["Y"], "on_error": ["[Anchor]Z"]}}));
}

#[test]
fn edges_follow_fields_and_markers() {
    let m = model(json!({
        "A": {"next": ["B", "[JumpBack]A"], "on_error": ["C"], "timeout_next": "B"},
        "B": {},
        "C": {}
    }));
    let edges = m.edges();
    assert_eq!(edges.len(), 4);

    assert_eq!(edges[0].id, "e-A-B-next");
    assert_eq!(edges[0].source_terminal, Terminal::Primary);
    assert_eq!(edges[0].label(), "next");
    assert_eq!(edges[0].color(), "#3b82f6");

    assert_eq!(edges[1].target, "A");
    assert!(edges[1].back_jump);
    assert_eq!(edges[1].label(), "JumpBack");
    assert_eq!(edges[1].color(), "#a855f7");

    assert_eq!(edges[2].source_terminal, Terminal::Error);
    assert_eq!(edges[2].color(), "#f43f5e");

    assert_eq!(edges[3].field, LinkField::TimeoutNext);
    assert_eq!(edges[3].source_terminal, Terminal::Error);
    assert_eq!(edges[3].id, "e-A-B-timeout_next");
}

#[test]
fn duplicate_links_get_distinct_edge_ids() {
    let m = model(json!({"A": {"next": ["B", "B"]}, "B": {}}));
    let ids: Vec<_> = m.edges().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["e-A-B-next", "e-A-B-next-2"]);
}

#[test]
fn reserved_ids_and_param_issues_are_reported() {
    let (_, report) = load(json!({
        "[Anchor]Bad": {},
        "Ok": {"recognition": "OCR", "timeout": "slow"}
    }));
    assert!(report.issues.contains(&LoadIssue::ReservedIdentifier {
        id: "[Anchor]Bad".into()
    }));
    assert!(report
        .issues
        .iter()
        .any(|i| matches!(i, LoadIssue::Param { node, .. } if node == "Ok")));
}

#[test]
fn tasks_with_unknown_recognition_are_exported() {
    let doc = json!({"A": {"recognition": "Unknown", "next": ["Ghost"]}});
    let m = model(doc.clone());
    assert_eq!(m.node("A").expect("A").kind, NodeKind::Unknown);
    assert!(m.node("Ghost").expect("placeholder").placeholder);
    assert_eq!(m.export_value(), doc);
}

#[test]
fn connect_twice_restores_the_document() {
    let original = json!({"A": {"recognition": "OCR"}, "B": {}});
    let mut m = model(original.clone());
    let conn = Connection::new("A", Terminal::Primary, "B");

    let added = m.connect(&conn).expect("connect");
    assert_eq!(added, ConnectOutcome::Added("e-A-B-next".into()));
    assert_eq!(m.export_value()["A"]["next"], json!(["B"]));
    assert!(m.is_dirty());

    let removed = m.connect(&conn).expect("toggle");
    assert_eq!(removed, ConnectOutcome::Removed("e-A-B-next".into()));
    assert_eq!(m.export_value(), original);
    assert!(m.edges().is_empty());
    assert!(!m.is_dirty());
}

#[test]
fn connect_twice_restores_a_scalar_field() {
    let original = json!({"A": {"next": "C"}, "B": {}, "C": {}});
    let mut m = model(original.clone());
    let conn = Connection::new("A", Terminal::Primary, "B");

    m.connect(&conn).expect("connect");
    assert_eq!(m.export_value()["A"]["next"], json!(["C", "B"]));

    m.connect(&conn).expect("toggle");
    assert_eq!(m.export_value(), original);
    assert!(!m.is_dirty());
}

#[test]
fn connect_appends_and_converts_scalars() {
    let mut m = model(json!({"A": {"next": "B"}, "B": {}, "C": {}}));
    m.connect(&Connection::new("A", Terminal::Primary, "C"))
        .expect("connect");
    assert_eq!(m.export_value()["A"]["next"], json!(["B", "C"]));

    m.connect(&Connection::new("A", Terminal::Error, "B"))
        .expect("connect");
    assert_eq!(m.export_value()["A"]["on_error"], json!(["B"]));
    assert_eq!(m.edge_count(), 3);
}

#[test]
fn connect_to_anchor_writes_the_marker() {
    let mut m = model(json!({"A": {}, "Mark": {"anchor": true}}));
    m.connect(&Connection::new("A", Terminal::Primary, "Mark"))
        .expect("connect");
    assert_eq!(m.export_value()["A"]["next"], json!(["[Anchor]Mark"]));
    assert!(m.edges()[0].anchor);
}

#[test]
fn toggle_removes_the_legacy_field_it_came_from() {
    let mut m = model(json!({"A": {"timeout_next": "B", "on_error": ["C"]}, "B": {}, "C": {}}));
    let out = m
        .connect(&Connection::new("A", Terminal::Error, "B"))
        .expect("toggle");
    assert_eq!(out, ConnectOutcome::Removed("e-A-B-timeout_next".into()));
    assert_eq!(m.export_value(), json!({"A": {"on_error": ["C"]}, "B": {}, "C": {}}));
}

#[test]
fn invalid_connections_are_rejected_without_changes() {
    let mut m = model(json!({"A": {}, "B": {}}));
    let before = m.version();

    let err = m
        .connect(&Connection::new("A", Terminal::Primary, "A"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConnection {
            reason: ConnectionRejection::SelfLoop
        }
    ));

    let mut conn = Connection::new("A", Terminal::Primary, "B");
    conn.source_terminal = "in".into();
    assert!(m.connect(&conn).is_err());

    let mut conn = Connection::new("A", Terminal::Primary, "B");
    conn.target_terminal = "source-a".into();
    assert!(m.connect(&conn).is_err());

    assert_eq!(m.version(), before);
    assert!(m.edges().is_empty());
}

#[test]
fn connecting_unknown_nodes_is_a_no_op() {
    let mut m = model(json!({"A": {}}));
    let out = m
        .connect(&Connection::new("A", Terminal::Primary, "Ghost"))
        .expect("connect");
    assert_eq!(out, ConnectOutcome::Ignored);
    assert!(m.edges().is_empty());
}

#[test]
fn disconnect_removes_value_and_empty_field() {
    let mut m = model(json!({"A": {"next": ["B"], "on_error": ["B", "C"]}, "B": {}, "C": {}}));
    assert!(m.disconnect("e-A-B-next"));
    assert!(m.disconnect("e-A-B-on_error"));
    assert!(!m.disconnect("e-A-B-next"));
    assert_eq!(m.export_value()["A"], json!({"on_error": ["C"]}));
    assert_eq!(m.edge_count(), 1);
}

#[test]
fn back_jump_flag_rewrites_the_value() {
    let mut m = model(json!({"A": {"next": ["B", "C"]}, "B": {"next": "A"}, "C": {}}));
    m.set_back_jump("e-B-A-next", true).expect("flag");
    assert_eq!(m.export_value()["B"]["next"], json!("[JumpBack]A"));
    let edge = m.edge("e-B-A-next").expect("edge");
    assert!(edge.back_jump);
    assert_eq!(edge.label(), "JumpBack");

    m.set_back_jump("e-B-A-next", false).expect("unflag");
    assert_eq!(m.export_value()["B"]["next"], json!("A"));

    let version = m.version();
    let err = m.set_back_jump("missing", true).unwrap_err();
    assert!(matches!(err, Error::EdgeNotFound { ref id } if id == "missing"));
    assert_eq!(m.version(), version);
}

#[test]
fn back_jump_on_a_repeated_target_rewrites_its_own_value() {
    let doc = json!({"A": {"next": ["B", "B"]}, "B": {}});
    let mut m = model(doc);
    m.set_back_jump("e-A-B-next-2", true).expect("flag");
    assert_eq!(m.export_value()["A"]["next"], json!(["B", "[JumpBack]B"]));
    assert!(!m.edge("e-A-B-next").expect("first").back_jump);

    // A reload puts the flag on the same edge.
    let reloaded = model(m.export_value());
    assert!(!reloaded.edge("e-A-B-next").expect("first").back_jump);
    assert!(reloaded.edge("e-A-B-next-2").expect("second").back_jump);

    assert!(m.disconnect("e-A-B-next-2"));
    assert_eq!(m.export_value()["A"]["next"], json!(["B"]));
}

#[test]
fn rename_propagates_and_keeps_markers() {
    let mut m = model(json!({
        "A": {"next": ["B", "[JumpBack]A"]},
        "B": {"next": ["[Anchor][JumpBack]A"], "on_error": "A"},
        "C": {"timeout_next": "[Anchor]A"}
    }));
    m.rename("A", "Start").expect("rename");

    let doc = m.export_value();
    let keys: Vec<_> = doc.as_object().expect("object").keys().cloned().collect();
    assert_eq!(keys, ["Start", "B", "C"]);
    assert_eq!(doc["Start"]["next"], json!(["B", "[JumpBack]Start"]));
    assert_eq!(doc["B"]["next"], json!(["[JumpBack][Anchor]Start"]));
    assert_eq!(doc["B"]["on_error"], json!("Start"));
    assert_eq!(doc["C"]["timeout_next"], json!("[Anchor]Start"));

    assert!(!doc.to_string().contains("\"A\""));
    assert!(m.edges().iter().all(|e| e.source != "A" && e.target != "A"));
    assert!(m.edge("e-Start-B-next").is_some());
    assert!(m.edge("e-B-Start-on_error").is_some());
}

#[test]
fn rename_collision_changes_nothing() {
    let mut m = model(json!({"A": {"next": ["B"]}, "B": {}}));
    let before_doc = m.export_value();
    let before_edges = m.edges().to_vec();
    let before_version = m.version();

    let err = m.rename("A", "B").unwrap_err();
    assert!(matches!(err, Error::RenameCollision { ref id } if id == "B"));
    assert_eq!(m.export_value(), before_doc);
    assert_eq!(m.edges(), before_edges.as_slice());
    assert_eq!(m.version(), before_version);
}

#[test]
fn rename_rejects_reserved_and_unknown_ids() {
    let mut m = model(json!({"A": {}}));
    assert!(matches!(
        m.rename("A", "[JumpBack]A"),
        Err(Error::ReservedIdentifier { .. })
    ));
    assert!(matches!(m.rename("A", ""), Err(Error::EmptyIdentifier)));
    assert!(matches!(m.rename("Nope", "X"), Err(Error::NodeNotFound { .. })));
    m.rename("A", "A").expect("same id is a no-op");
}

#[test]
fn update_node_replaces_record_and_rebuilds_edges() {
    let mut m = model(json!({"A": {"next": ["B"]}, "B": {}, "C": {}}));
    let record = TaskRecord::parse_edit("A", "{recognition: 'OCR', next: ['C', 'D']}")
        .expect("record");
    m.update_node(NodeUpdate::new("A").record(record))
        .expect("update");

    let targets: Vec<_> = m.outgoing("A").map(|e| e.target.as_str()).collect();
    assert_eq!(targets, ["C", "D"]);
    assert!(m.node("D").expect("placeholder").placeholder);
    assert_eq!(
        m.node("A").map(|n| n.kind.clone()),
        Some(NodeKind::Task(Recognition::OCR))
    );
}

#[test]
fn update_node_normalizes_anchor_links() {
    let mut m = model(json!({"A": {"next": ["M"]}, "M": {}}));
    assert_eq!(m.export_value()["A"]["next"], json!(["M"]));

    let record = TaskRecord::from_value("M", json!({"anchor": true})).expect("record");
    m.update_node(NodeUpdate::new("M").record(record))
        .expect("update");
    assert_eq!(m.export_value()["A"]["next"], json!(["[Anchor]M"]));
    assert!(m.edges()[0].anchor);
}

#[test]
fn update_node_renames_and_changes_kind() {
    let mut m = model(json!({"A": {"next": ["B"]}, "B": {}}));
    m.update_node(
        NodeUpdate::new("B")
            .rename("Done")
            .recognition(Recognition::ColorMatch),
    )
    .expect("update");
    assert_eq!(
        m.export_value(),
        json!({"A": {"next": ["Done"]}, "Done": {"recognition": "ColorMatch"}})
    );
}

#[test]
fn editing_a_placeholder_makes_it_real() {
    let mut m = model(json!({"A": {"next": ["Y"]}}));
    m.update_node(NodeUpdate::new("Y").recognition(Recognition::DirectHit))
        .expect("update");
    let y = m.node("Y").expect("node");
    assert!(!y.placeholder);
    assert_eq!(y.status, NodeStatus::Idle);
    assert_eq!(m.export_value()["Y"], json!({"recognition": "DirectHit"}));
}

#[test]
fn add_and_remove_nodes() {
    let mut m = model(json!({"A": {"next": ["B", "C"]}, "B": {"next": ["C"]}, "C": {}}));
    assert!(matches!(
        m.add_node("A", TaskRecord::default()),
        Err(Error::NodeExists { .. })
    ));

    m.add_node("D", TaskRecord::new(Recognition::OCR))
        .expect("add");
    assert!(m.has_node("D"));

    assert!(m.remove_node("C"));
    assert_eq!(
        m.export_value(),
        json!({"A": {"next": ["B"]}, "B": {}, "D": {"recognition": "OCR"}})
    );
    assert!(m.edges().iter().all(|e| e.target != "C"));
    assert!(!m.remove_node("C"));
}

#[test]
fn adding_over_a_placeholder_promotes_it() {
    let mut m = model(json!({"A": {"next": ["Y"]}}));
    let record = TaskRecord::from_value("Y", json!({"next": ["A"]})).expect("record");
    m.add_node("Y", record).expect("add");
    assert!(!m.node("Y").expect("node").placeholder);
    assert_eq!(m.edge_count(), 2);
    assert_eq!(
        m.export_value(),
        json!({"A": {"next": ["Y"]}, "Y": {"next": ["A"]}})
    );
}

#[test]
fn prune_drops_only_unreferenced_placeholders() {
    let mut m = model(json!({"A": {"next": ["Y", "Z"]}}));
    m.disconnect("e-A-Y-next");
    assert_eq!(m.prune_placeholders(), ["Y"]);
    assert!(m.has_node("Z"));
}

#[test]
fn dirty_tracking_follows_the_baseline() {
    let mut m = model(json!({"A": {}, "B": {}}));
    assert!(!m.is_dirty());

    m.connect(&Connection::new("A", Terminal::Primary, "B"))
        .expect("connect");
    assert!(m.is_dirty());

    m.mark_saved();
    assert!(!m.is_dirty());

    m.set_position("A", pipeflow_core::Position::new(10.0, 20.0));
    assert!(!m.is_dirty());
}

#[test]
fn subscribers_see_every_change() {
    let mut m = GraphModel::new();
    let seen: Arc<Mutex<Vec<(u64, ChangeKind)>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let sub = m.subscribe(move |c| {
        if let Ok(mut v) = sink.lock() {
            v.push((c.version, c.kind));
        }
    });

    let doc = Document::from_value(json!({"A": {}, "B": {}})).expect("doc");
    m.load(&doc);
    m.connect(&Connection::new("A", Terminal::Primary, "B"))
        .expect("connect");
    m.set_status("A", NodeStatus::Running);
    assert!(m.unsubscribe(sub));
    m.reset_statuses();

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(
        seen,
        [
            (1, ChangeKind::Loaded),
            (2, ChangeKind::Structure),
            (3, ChangeKind::Status)
        ]
    );
    assert_eq!(m.version(), 4);
}
