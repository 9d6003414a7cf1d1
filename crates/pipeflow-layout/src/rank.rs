//! Rank assignment.
//!
//! Longest-path ranking from the sources, followed by a pass that pulls predecessor-free nodes
//! down next to their successors so that side entries don't stretch edges across the drawing.
//! Expects an acyclic graph (run `acyclic::run` first); self-loops are ignored.

use crate::graphlib::Graph;
use crate::{EdgeLabel, GraphLabel, NodeLabel};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

pub fn rank(g: &mut LayoutGraph) {
    let node_ids = g.node_ids();

    let mut indegree: FxHashMap<String, usize> =
        node_ids.iter().map(|id| (id.clone(), 0)).collect();
    for e in g.edges() {
        if e.is_self_loop() {
            continue;
        }
        if let Some(d) = indegree.get_mut(&e.w) {
            *d += 1;
        }
    }

    let mut queue: VecDeque<String> = node_ids
        .iter()
        .filter(|id| indegree.get(*id).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    let mut ranks: FxHashMap<String, i32> = node_ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut topo: Vec<String> = Vec::with_capacity(node_ids.len());
    while let Some(v) = queue.pop_front() {
        let r = ranks.get(&v).copied().unwrap_or(0);
        for e in g.out_edges(&v) {
            if e.is_self_loop() {
                continue;
            }
            let minlen = g.edge_by_key(&e).map(|l| l.minlen).unwrap_or(1).max(1) as i32;
            let entry = ranks.entry(e.w.clone()).or_insert(0);
            *entry = (*entry).max(r + minlen);
            if let Some(d) = indegree.get_mut(&e.w) {
                *d = d.saturating_sub(1);
                if *d == 0 {
                    queue.push_back(e.w.clone());
                }
            }
        }
        topo.push(v);
    }

    if topo.len() != node_ids.len() {
        tracing::warn!(
            ranked = topo.len(),
            total = node_ids.len(),
            "rank: graph still has cycles; unranked nodes stay on rank 0"
        );
    }

    // Pull sources down, last topological node first so chains of sources settle together.
    for v in topo.iter().rev() {
        let has_preds = g.in_edges(v).iter().any(|e| !e.is_self_loop());
        if has_preds {
            continue;
        }
        let mut target: Option<i32> = None;
        for e in g.out_edges(v) {
            if e.is_self_loop() {
                continue;
            }
            let minlen = g.edge_by_key(&e).map(|l| l.minlen).unwrap_or(1).max(1) as i32;
            let Some(&w_rank) = ranks.get(&e.w) else {
                continue;
            };
            let candidate = w_rank - minlen;
            target = Some(target.map_or(candidate, |t| t.min(candidate)));
        }
        if let Some(t) = target {
            ranks.insert(v.clone(), t);
        }
    }

    for id in &node_ids {
        if let Some(n) = g.node_mut(id) {
            n.rank = ranks.get(id).copied();
        }
    }
    normalize_ranks(g);
}

/// Shift ranks so the smallest one is zero.
pub fn normalize_ranks(g: &mut LayoutGraph) {
    let min_rank = g
        .node_ids()
        .iter()
        .filter_map(|id| g.node(id).and_then(|n| n.rank))
        .min();
    let Some(min_rank) = min_rank else {
        return;
    };
    g.for_each_node_mut(|_, n| {
        if let Some(r) = n.rank {
            n.rank = Some(r - min_rank);
        }
    });
}

pub fn max_rank(g: &LayoutGraph) -> Option<i32> {
    g.nodes().filter_map(|id| g.node(id).and_then(|n| n.rank)).max()
}
