use pipeflow_layout::{GraphLabel, LayoutGraph, new_graph, order, rank};

fn set_ranks(g: &mut LayoutGraph, ranks: &[(&str, i32)]) {
    for (v, r) in ranks {
        g.ensure_node(*v);
        if let Some(n) = g.node_mut(v) {
            n.rank = Some(*r);
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn init_order_follows_edge_insertion_order() {
    let mut g = new_graph(GraphLabel::default());
    g.set_edge("root", "right");
    g.set_edge("root", "left");
    rank::rank(&mut g);

    let layers = order::init_order(&g);
    assert_eq!(layers, vec![strings(&["root"]), strings(&["right", "left"])]);
}

#[test]
fn cross_count_counts_a_single_crossing() {
    let mut g = new_graph(GraphLabel::default());
    set_ranks(&mut g, &[("a1", 0), ("a2", 0), ("b1", 1), ("b2", 1)]);
    g.set_edge("a1", "b2");
    g.set_edge("a2", "b1");

    let cc = order::cross_count(&g, &[strings(&["a1", "a2"]), strings(&["b1", "b2"])]);
    assert_eq!(cc, 1.0);
    let cc = order::cross_count(&g, &[strings(&["a1", "a2"]), strings(&["b2", "b1"])]);
    assert_eq!(cc, 0.0);
}

#[test]
fn order_removes_avoidable_crossings() {
    let mut g = new_graph(GraphLabel::default());
    set_ranks(&mut g, &[("a1", 0), ("a2", 0), ("b1", 1), ("b2", 1)]);
    g.set_edge("a1", "b2");
    g.set_edge("a2", "b1");

    order::order(&mut g);
    let layers = order::build_layer_matrix(&g);
    assert_eq!(order::cross_count(&g, &layers), 0.0);
    assert_eq!(layers[1], strings(&["b2", "b1"]));
}

#[test]
fn sort_layer_keeps_unsortable_nodes_in_place() {
    let layer = strings(&["a", "b", "c", "d"]);
    let bcs = [Some(3.0), None, Some(1.0), Some(2.0)];
    assert_eq!(
        order::sort_layer(&layer, &bcs, false),
        strings(&["c", "b", "d", "a"])
    );
}

#[test]
fn sort_layer_bias_decides_ties() {
    let layer = strings(&["a", "b"]);
    let bcs = [Some(1.0), Some(1.0)];
    assert_eq!(order::sort_layer(&layer, &bcs, false), strings(&["a", "b"]));
    assert_eq!(order::sort_layer(&layer, &bcs, true), strings(&["b", "a"]));
}

#[test]
fn init_order_handles_very_long_chains() {
    let ids: Vec<String> = (0..50_000).map(|i| format!("n{i}")).collect();
    let path: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut g = new_graph(GraphLabel::default());
    g.set_path(&path);
    rank::rank(&mut g);

    let layers = order::init_order(&g);
    assert_eq!(layers.len(), 50_000);
    assert_eq!(layers[0], strings(&["n0"]));
    assert_eq!(layers[49_999], strings(&["n49999"]));
}
