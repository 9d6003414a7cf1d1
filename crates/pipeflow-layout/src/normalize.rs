//! Split edges that span more than one rank into chains of dummy nodes.
//!
//! Ordering and positioning then only deal with rank-adjacent edges. `undo` removes the dummies
//! and folds their coordinates back into the original edge's `points`.

use crate::graphlib::{EdgeKey, Graph};
use crate::{EdgeLabel, GraphLabel, NodeLabel, Point};

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

/// Records one normalized edge: the original key/label and its dummy chain, top to bottom.
#[derive(Debug, Clone)]
pub struct DummyChain {
    pub edge: EdgeKey,
    pub label: EdgeLabel,
    pub dummies: Vec<String>,
}

fn add_dummy_node(g: &mut LayoutGraph, label: NodeLabel) -> String {
    let mut i = g.node_count();
    loop {
        let id = format!("_d{i}");
        if !g.has_node(&id) {
            g.set_node(id.clone(), label);
            return id;
        }
        i += 1;
    }
}

pub fn run(g: &mut LayoutGraph) -> Vec<DummyChain> {
    let mut chains: Vec<DummyChain> = Vec::new();
    for e in g.edge_keys() {
        if e.is_self_loop() {
            continue;
        }
        let v_rank = g.node(&e.v).and_then(|n| n.rank).unwrap_or(0);
        let w_rank = g.node(&e.w).and_then(|n| n.rank).unwrap_or(0);
        if w_rank <= v_rank + 1 {
            continue;
        }
        let Some(label) = g.edge_by_key(&e).cloned() else {
            continue;
        };
        let _ = g.remove_edge_key(&e);

        let mut dummies: Vec<String> = Vec::new();
        let mut prev = e.v.clone();
        for r in (v_rank + 1)..w_rank {
            let dummy = add_dummy_node(
                g,
                NodeLabel {
                    rank: Some(r),
                    dummy_for: Some(e.clone()),
                    ..Default::default()
                },
            );
            g.set_edge_named(
                prev.clone(),
                dummy.clone(),
                e.name.clone(),
                Some(EdgeLabel {
                    weight: label.weight,
                    ..Default::default()
                }),
            );
            dummies.push(dummy.clone());
            prev = dummy;
        }
        g.set_edge_named(
            prev,
            e.w.clone(),
            e.name.clone(),
            Some(EdgeLabel {
                weight: label.weight,
                ..Default::default()
            }),
        );

        chains.push(DummyChain {
            edge: e,
            label,
            dummies,
        });
    }
    chains
}

pub fn undo(g: &mut LayoutGraph, chains: Vec<DummyChain>) {
    for chain in chains {
        let mut label = chain.label;
        label.points.clear();
        for dummy in &chain.dummies {
            if let Some(n) = g.node(dummy) {
                label.points.push(Point {
                    x: n.x.unwrap_or(0.0),
                    y: n.y.unwrap_or(0.0),
                });
            }
            let _ = g.remove_node(dummy);
        }
        g.set_edge_named(chain.edge.v, chain.edge.w, chain.edge.name, Some(label));
    }
}
