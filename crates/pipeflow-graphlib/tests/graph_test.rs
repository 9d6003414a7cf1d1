use pipeflow_graphlib::{EdgeKey, Graph, GraphOptions};

fn new_graph() -> Graph<u32, u32, ()> {
    Graph::new(GraphOptions::default())
}

#[test]
fn successors_follow_edge_insertion_order() {
    let mut g = new_graph();
    g.set_edge("root", "c");
    g.set_edge("root", "a");
    g.set_edge("root", "b");
    g.set_edge_named("root", "a", Some("dup"), None);

    assert_eq!(g.successors("root"), vec!["c", "a", "b"]);
    assert_eq!(g.predecessors("a"), vec!["root"]);
}

#[test]
fn removing_a_node_drops_incident_edges() {
    let mut g = new_graph();
    g.set_path(&["a", "b", "c"]);
    g.set_edge("a", "c");

    assert!(g.remove_node("b"));
    assert!(!g.has_node("b"));
    assert_eq!(g.edge_count(), 1);
    assert!(g.has_edge("a", "c", None));
    assert_eq!(g.successors("a"), vec!["c"]);
    assert!(g.in_edges("c").iter().all(|e| e.v == "a"));
}

#[test]
fn remove_edge_key_keeps_lookups_consistent() {
    let mut g = new_graph();
    g.set_edge_named("a", "b", Some("one"), Some(1));
    g.set_edge_named("b", "c", Some("two"), Some(2));
    g.set_edge_named("c", "d", Some("three"), Some(3));

    assert!(g.remove_edge_key(&EdgeKey::new("b", "c", Some("two"))));
    assert!(!g.remove_edge_key(&EdgeKey::new("b", "c", Some("two"))));
    assert_eq!(g.edge("c", "d", Some("three")), Some(&3));
    assert_eq!(g.edge("a", "b", Some("one")), Some(&1));
}

#[test]
fn sources_ignore_self_loops() {
    let mut g = new_graph();
    g.set_edge("a", "a");
    g.set_edge("a", "b");
    g.set_node("lonely", 7);

    assert_eq!(g.sources(), vec!["a", "lonely"]);
    assert_eq!(g.node("lonely"), Some(&7));
}
