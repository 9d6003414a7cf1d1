//! Break cycles by reversing a feedback arc set (FAS).
//!
//! The FAS comes from a depth-first search in node insertion order: every edge that points back
//! into the active DFS stack is reversed. Self-loops are left alone; they never constrain ranking.

use crate::graphlib::{EdgeKey, Graph};
use crate::{EdgeLabel, GraphLabel, NodeLabel};
use rustc_hash::FxHashSet;

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

pub fn run(g: &mut LayoutGraph) {
    for e in dfs_fas(g).into_iter().filter(|e| !e.is_self_loop()) {
        let Some(mut label) = g.edge_by_key(&e).cloned() else {
            continue;
        };
        let _ = g.remove_edge_key(&e);

        label.forward_name = e.name.clone();
        label.reversed = true;

        let name = unique_rev_name(g, &e.w, &e.v);
        g.set_edge_named(e.w, e.v, Some(name), Some(label));
    }
}

pub fn undo(g: &mut LayoutGraph) {
    for e in g.edge_keys() {
        let Some(mut label) = g.edge_by_key(&e).cloned() else {
            continue;
        };
        if !label.reversed {
            continue;
        }
        let _ = g.remove_edge_key(&e);

        let forward_name = label.forward_name.take();
        label.reversed = false;
        label.points.reverse();
        g.set_edge_named(e.w, e.v, forward_name, Some(label));
    }
}

fn unique_rev_name(g: &LayoutGraph, v: &str, w: &str) -> String {
    let mut i = 1usize;
    loop {
        let candidate = format!("rev{i}");
        if !g.has_edge(v, w, Some(&candidate)) {
            return candidate;
        }
        i += 1;
    }
}

fn dfs_fas(g: &LayoutGraph) -> Vec<EdgeKey> {
    let mut fas: Vec<EdgeKey> = Vec::new();
    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut on_stack: FxHashSet<String> = FxHashSet::default();
    // (node, its out-edges, index of the next edge to follow)
    let mut frames: Vec<(String, Vec<EdgeKey>, usize)> = Vec::new();

    for root in g.node_ids() {
        if !visited.insert(root.clone()) {
            continue;
        }
        on_stack.insert(root.clone());
        let out = g.out_edges(&root);
        frames.push((root, out, 0));

        while let Some((v, out, next)) = frames.last_mut() {
            let Some(e) = out.get(*next).cloned() else {
                on_stack.remove(v.as_str());
                frames.pop();
                continue;
            };
            *next += 1;
            if e.is_self_loop() {
                continue;
            }
            if on_stack.contains(&e.w) {
                fas.push(e);
            } else if visited.insert(e.w.clone()) {
                on_stack.insert(e.w.clone());
                let out = g.out_edges(&e.w);
                frames.push((e.w, out, 0));
            }
        }
    }
    fas
}
