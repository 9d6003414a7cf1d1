use pipeflow_layout::{GraphLabel, LayoutGraph, NodeLabel, RankDir, layout, new_graph};

fn center(g: &LayoutGraph, v: &str) -> (f64, f64) {
    let n = g.node(v).expect("node");
    (n.x.expect("x"), n.y.expect("y"))
}

fn spaced() -> GraphLabel {
    GraphLabel {
        nodesep: 40.0,
        ranksep: 60.0,
        ..Default::default()
    }
}

#[test]
fn layout_places_successors_below_their_parent() {
    let mut g = new_graph(spaced());
    for v in ["a", "b", "c"] {
        g.set_node(v, NodeLabel::sized(100.0, 50.0));
    }
    g.set_edge("a", "b");
    g.set_edge("a", "c");
    layout(&mut g);

    let (ax, ay) = center(&g, "a");
    let (bx, by) = center(&g, "b");
    let (cx, cy) = center(&g, "c");
    assert_eq!(by, cy);
    assert!(by > ay);
    assert_eq!(by - ay, 50.0 + 60.0);
    assert!(bx < cx, "insertion order decides left-to-right");
    assert!((cx - bx) >= 140.0);
    assert!((ax - (bx + cx) / 2.0).abs() < 1e-6);
}

#[test]
fn layout_translates_to_the_origin_and_reports_size() {
    let mut g = new_graph(spaced());
    g.set_node("a", NodeLabel::sized(100.0, 50.0));
    g.set_node("b", NodeLabel::sized(80.0, 30.0));
    g.set_edge("a", "b");
    layout(&mut g);

    let a = g.node("a").expect("a");
    assert_eq!(a.y, Some(25.0));
    let min_left = ["a", "b"]
        .iter()
        .filter_map(|v| g.node(v))
        .map(|n| n.x.unwrap_or(0.0) - n.width / 2.0)
        .fold(f64::INFINITY, f64::min);
    assert!(min_left.abs() < 1e-9);
    assert_eq!(g.graph().height, Some(50.0 + 60.0 + 30.0));
}

#[test]
fn layout_handles_cycles_and_restores_edges() {
    let mut g = new_graph(spaced());
    for v in ["a", "b", "c"] {
        g.set_node(v, NodeLabel::sized(50.0, 20.0));
    }
    g.set_path(&["a", "b", "c", "a"]);
    g.set_edge("b", "b");
    layout(&mut g);

    assert_eq!(g.node_count(), 3, "dummy nodes are removed");
    assert!(g.has_edge("c", "a", None));
    assert!(g.has_edge("b", "b", None));
    let (_, ay) = center(&g, "a");
    let (_, cy) = center(&g, "c");
    assert!(cy > ay);

    let back = g.edge("c", "a", None).expect("edge");
    assert!(!back.reversed);
    assert!(back.points.len() >= 3, "long edge keeps its dummy bend points");
    let first = back.points.first().expect("first");
    assert_eq!(first.y, cy - 10.0, "reversed edge starts at the top of its tail");
}

#[test]
fn layout_lr_swaps_axes() {
    let mut g = new_graph(GraphLabel {
        rankdir: RankDir::LR,
        ..spaced()
    });
    g.set_node("a", NodeLabel::sized(100.0, 50.0));
    g.set_node("b", NodeLabel::sized(100.0, 50.0));
    g.set_edge("a", "b");
    layout(&mut g);

    let (ax, ay) = center(&g, "a");
    let (bx, by) = center(&g, "b");
    assert_eq!(ay, by);
    assert_eq!(bx - ax, 100.0 + 60.0);
}

#[test]
fn layout_of_an_empty_graph_is_a_no_op() {
    let mut g = new_graph(GraphLabel::default());
    layout(&mut g);
    assert_eq!(g.node_count(), 0);
    assert_eq!(g.graph().width, None);
}
