//! Node ordering / crossing minimization.
//!
//! Initial order comes from a DFS over successors in edge insertion order, so the order in which
//! edges were added to the graph decides left-to-right placement whenever the sweeps find no
//! better arrangement. Barycenter sweeps then alternate downward and upward, keeping the layering
//! with the fewest crossings.

use crate::graphlib::Graph;
use crate::rank::max_rank;
use crate::{EdgeLabel, GraphLabel, NodeLabel};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

/// Stop sweeping after this many iterations without improvement.
const STALE_SWEEPS: usize = 4;

pub fn init_order(g: &LayoutGraph) -> Vec<Vec<String>> {
    let Some(max_rank) = max_rank(g) else {
        return Vec::new();
    };
    let mut layers: Vec<Vec<String>> = vec![Vec::new(); (max_rank + 1).max(0) as usize];

    fn visit(
        g: &LayoutGraph,
        v: &str,
        visited: &mut FxHashSet<String>,
        layers: &mut [Vec<String>],
    ) -> bool {
        if !visited.insert(v.to_string()) {
            return false;
        }
        let Some(rank) = g.node(v).and_then(|n| n.rank) else {
            return false;
        };
        if let Some(layer) = layers.get_mut(rank.max(0) as usize) {
            layer.push(v.to_string());
        }
        true
    }

    // Stable on (rank, insertion index): same-rank nodes keep the order they were added in.
    let mut ordered: Vec<(i32, usize, String)> = g
        .node_ids()
        .into_iter()
        .enumerate()
        .map(|(idx, v)| {
            let rank = g.node(&v).and_then(|n| n.rank).unwrap_or(i32::MAX);
            (rank, idx, v)
        })
        .collect();
    ordered.sort_by_key(|(rank, idx, _)| (*rank, *idx));

    let mut visited: FxHashSet<String> = FxHashSet::default();
    // (successors, index of the next one to visit)
    let mut frames: Vec<(Vec<String>, usize)> = Vec::new();
    for (_, _, root) in ordered {
        if !visit(g, &root, &mut visited, &mut layers) {
            continue;
        }
        frames.push((g.successors(&root), 0));
        while let Some((successors, next)) = frames.last_mut() {
            let Some(w) = successors.get(*next).cloned() else {
                frames.pop();
                continue;
            };
            *next += 1;
            if visit(g, &w, &mut visited, &mut layers) {
                frames.push((g.successors(&w), 0));
            }
        }
    }
    layers
}

pub fn cross_count(g: &LayoutGraph, layering: &[Vec<String>]) -> f64 {
    layering
        .windows(2)
        .map(|pair| two_layer_cross_count(g, &pair[0], &pair[1]))
        .sum()
}

fn two_layer_cross_count(g: &LayoutGraph, north: &[String], south: &[String]) -> f64 {
    if south.is_empty() {
        return 0.0;
    }
    let south_pos: FxHashMap<&str, usize> = south
        .iter()
        .enumerate()
        .map(|(i, v)| (v.as_str(), i))
        .collect();

    let mut south_entries: Vec<(usize, f64)> = Vec::new();
    for v in north {
        let mut entries: Vec<(usize, f64)> = g
            .out_edges(v)
            .into_iter()
            .filter_map(|e| {
                let pos = *south_pos.get(e.w.as_str())?;
                let weight = g.edge_by_key(&e).map(|l| l.weight).unwrap_or(0.0);
                Some((pos, weight))
            })
            .collect();
        entries.sort_by_key(|(pos, _)| *pos);
        south_entries.extend(entries);
    }

    // Accumulator tree (Barth et al.) over south positions.
    let mut first_index: usize = 1;
    while first_index < south.len() {
        first_index <<= 1;
    }
    let tree_size = 2 * first_index - 1;
    first_index -= 1;
    let mut tree: Vec<f64> = vec![0.0; tree_size];

    let mut cc: f64 = 0.0;
    for (pos, weight) in south_entries {
        let mut index = pos + first_index;
        tree[index] += weight;
        let mut weight_sum: f64 = 0.0;
        while index > 0 {
            if index % 2 == 1 {
                weight_sum += tree[index + 1];
            }
            index = (index - 1) >> 1;
            tree[index] += weight;
        }
        cc += weight * weight_sum;
    }
    cc
}

pub fn order(g: &mut LayoutGraph) {
    let mut layering = init_order(g);
    if layering.len() < 2 {
        assign_order(g, &layering);
        return;
    }
    assign_order(g, &layering);

    let iterations = g.graph().order_iterations;
    let mut best = layering.clone();
    let mut best_cc = cross_count(g, &best);
    let mut stale = 0usize;
    let mut i = 0usize;
    while stale < STALE_SWEEPS && i < iterations && best_cc > 0.0 {
        let downward = i % 2 == 0;
        let bias_right = i % 4 >= 2;
        layering = sweep(g, &layering, downward, bias_right);
        assign_order(g, &layering);

        let cc = cross_count(g, &layering);
        if cc < best_cc {
            stale = 0;
            best = layering.clone();
            best_cc = cc;
        } else {
            stale += 1;
        }
        i += 1;
    }
    tracing::trace!(sweeps = i, crossings = best_cc, "order: sweeps finished");
    assign_order(g, &best);
}

fn assign_order(g: &mut LayoutGraph, layering: &[Vec<String>]) {
    for layer in layering {
        for (i, v) in layer.iter().enumerate() {
            if let Some(n) = g.node_mut(v) {
                n.order = Some(i);
            }
        }
    }
}

fn sweep(
    g: &LayoutGraph,
    layering: &[Vec<String>],
    downward: bool,
    bias_right: bool,
) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = layering.to_vec();
    let ranks: Vec<usize> = if downward {
        (1..out.len()).collect()
    } else {
        (0..out.len().saturating_sub(1)).rev().collect()
    };

    for r in ranks {
        let fixed_idx = if downward { r - 1 } else { r + 1 };
        let fixed_pos: FxHashMap<&str, usize> = out[fixed_idx]
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();

        let barycenters: Vec<Option<f64>> = out[r]
            .iter()
            .map(|v| {
                let edges = if downward { g.in_edges(v) } else { g.out_edges(v) };
                let mut sum = 0.0;
                let mut weight = 0.0;
                for e in edges {
                    let other = if downward { &e.v } else { &e.w };
                    let Some(&pos) = fixed_pos.get(other.as_str()) else {
                        continue;
                    };
                    let w = g.edge_by_key(&e).map(|l| l.weight).unwrap_or(1.0);
                    sum += w * pos as f64;
                    weight += w;
                }
                (weight > 0.0).then(|| sum / weight)
            })
            .collect();

        let sorted = sort_layer(&out[r], &barycenters, bias_right);
        out[r] = sorted;
    }
    out
}

/// Sorts nodes with a barycenter; nodes without one keep their index.
pub fn sort_layer(layer: &[String], barycenters: &[Option<f64>], bias_right: bool) -> Vec<String> {
    let mut sortable: Vec<(usize, f64)> = barycenters
        .iter()
        .enumerate()
        .filter_map(|(i, bc)| bc.map(|bc| (i, bc)))
        .collect();
    sortable.sort_by(|a, b| {
        a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then_with(|| {
            if bias_right {
                b.0.cmp(&a.0)
            } else {
                a.0.cmp(&b.0)
            }
        })
    });
    let mut unsortable = barycenters
        .iter()
        .enumerate()
        .filter(|(_, bc)| bc.is_none())
        .map(|(i, _)| i)
        .peekable();
    let mut sortable = sortable.into_iter();

    let mut out: Vec<String> = Vec::with_capacity(layer.len());
    while out.len() < layer.len() {
        if unsortable.peek().is_some_and(|&i| i <= out.len()) {
            if let Some(i) = unsortable.next() {
                out.push(layer[i].clone());
            }
            continue;
        }
        match sortable.next() {
            Some((i, _)) => out.push(layer[i].clone()),
            None => match unsortable.next() {
                Some(i) => out.push(layer[i].clone()),
                None => break,
            },
        }
    }
    out
}

/// Current layering read back from node `rank`/`order` labels.
pub fn build_layer_matrix(g: &LayoutGraph) -> Vec<Vec<String>> {
    let Some(max_rank) = max_rank(g) else {
        return Vec::new();
    };
    let mut layers: Vec<Vec<(usize, String)>> = vec![Vec::new(); (max_rank + 1).max(0) as usize];
    for v in g.nodes() {
        let Some(n) = g.node(v) else {
            continue;
        };
        let (Some(rank), Some(order)) = (n.rank, n.order) else {
            continue;
        };
        if let Some(layer) = layers.get_mut(rank.max(0) as usize) {
            layer.push((order, v.to_string()));
        }
    }
    layers
        .into_iter()
        .map(|mut layer| {
            layer.sort_by_key(|(order, _)| *order);
            layer.into_iter().map(|(_, v)| v).collect()
        })
        .collect()
}
