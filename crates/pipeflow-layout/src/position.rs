//! Coordinate assignment.
//!
//! `y` stacks ranks top to bottom using each rank's tallest node. `x` starts from a packed
//! placement in rank order and is then relaxed toward neighbor averages, alternating downward and
//! upward passes. Every pass keeps the within-rank order and the minimum separation intact.

use crate::graphlib::Graph;
use crate::order::build_layer_matrix;
use crate::{EdgeLabel, GraphLabel, NodeLabel};
use rustc_hash::FxHashMap;

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

const RELAX_PASSES: usize = 8;

pub fn position(g: &mut LayoutGraph) {
    let layering = build_layer_matrix(g);
    position_y(g, &layering);

    let mut xs = initial_x(g, &layering);
    for pass in 0..RELAX_PASSES {
        let downward = pass % 2 == 0;
        relax(g, &layering, &mut xs, downward);
    }
    for (v, x) in &xs {
        if let Some(n) = g.node_mut(v) {
            n.x = Some(*x);
        }
    }
    translate(g);
}

fn position_y(g: &mut LayoutGraph, layering: &[Vec<String>]) {
    let ranksep = g.graph().ranksep;
    let mut y_cursor = 0.0;
    for layer in layering {
        let height = layer
            .iter()
            .filter_map(|v| g.node(v).map(|n| n.height))
            .fold(0.0_f64, f64::max);
        for v in layer {
            if let Some(n) = g.node_mut(v) {
                n.y = Some(y_cursor + height / 2.0);
            }
        }
        y_cursor += height + ranksep;
    }
}

fn width(g: &LayoutGraph, v: &str) -> f64 {
    g.node(v).map(|n| n.width).unwrap_or(0.0)
}

/// Center-to-center distance required between two rank neighbors.
fn sep(g: &LayoutGraph, left: &str, right: &str) -> f64 {
    let nodesep = g.graph().nodesep;
    let is_dummy = |v: &str| g.node(v).is_some_and(NodeLabel::is_dummy);
    let gap = if is_dummy(left) || is_dummy(right) {
        nodesep / 2.0
    } else {
        nodesep
    };
    (width(g, left) + width(g, right)) / 2.0 + gap
}

fn initial_x(g: &LayoutGraph, layering: &[Vec<String>]) -> FxHashMap<String, f64> {
    let mut xs: FxHashMap<String, f64> = FxHashMap::default();
    let layer_widths: Vec<f64> = layering
        .iter()
        .map(|layer| {
            layer
                .windows(2)
                .map(|pair| sep(g, &pair[0], &pair[1]))
                .sum::<f64>()
        })
        .collect();
    let widest = layer_widths.iter().copied().fold(0.0_f64, f64::max);

    for (layer, layer_width) in layering.iter().zip(layer_widths) {
        let mut x = (widest - layer_width) / 2.0;
        for (i, v) in layer.iter().enumerate() {
            if i > 0 {
                x += sep(g, &layer[i - 1], v);
            }
            xs.insert(v.clone(), x);
        }
    }
    xs
}

fn relax(
    g: &LayoutGraph,
    layering: &[Vec<String>],
    xs: &mut FxHashMap<String, f64>,
    downward: bool,
) {
    let ranks: Vec<usize> = if downward {
        (1..layering.len()).collect()
    } else {
        (0..layering.len().saturating_sub(1)).rev().collect()
    };

    for r in ranks {
        let layer = &layering[r];
        if layer.is_empty() {
            continue;
        }
        let desired: Vec<f64> = layer
            .iter()
            .map(|v| {
                let neighbors = if downward {
                    g.predecessors(v)
                } else {
                    g.successors(v)
                };
                let known: Vec<f64> = neighbors
                    .iter()
                    .filter(|w| *w != v)
                    .filter_map(|w| xs.get(w).copied())
                    .collect();
                if known.is_empty() {
                    xs.get(v).copied().unwrap_or(0.0)
                } else {
                    known.iter().sum::<f64>() / known.len() as f64
                }
            })
            .collect();

        // Left-packed and right-packed placements both honor `sep`; so does their average.
        let n = layer.len();
        let mut left = vec![0.0; n];
        let mut right = vec![0.0; n];
        for i in 0..n {
            left[i] = if i == 0 {
                desired[i]
            } else {
                desired[i].max(left[i - 1] + sep(g, &layer[i - 1], &layer[i]))
            };
        }
        for i in (0..n).rev() {
            right[i] = if i + 1 == n {
                desired[i]
            } else {
                desired[i].min(right[i + 1] - sep(g, &layer[i], &layer[i + 1]))
            };
        }
        for (i, v) in layer.iter().enumerate() {
            xs.insert(v.clone(), (left[i] + right[i]) / 2.0);
        }
    }
}

/// Moves the drawing so its top-left corner sits at the margins and records the graph size.
fn translate(g: &mut LayoutGraph) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in g.nodes() {
        let Some(n) = g.node(v) else {
            continue;
        };
        let (Some(x), Some(y)) = (n.x, n.y) else {
            continue;
        };
        min_x = min_x.min(x - n.width / 2.0);
        max_x = max_x.max(x + n.width / 2.0);
        min_y = min_y.min(y - n.height / 2.0);
        max_y = max_y.max(y + n.height / 2.0);
    }
    if !min_x.is_finite() {
        return;
    }

    let label = g.graph().clone();
    let dx = label.marginx - min_x;
    let dy = label.marginy - min_y;
    g.for_each_node_mut(|_, n| {
        if let Some(x) = n.x.as_mut() {
            *x += dx;
        }
        if let Some(y) = n.y.as_mut() {
            *y += dy;
        }
    });
    let graph = g.graph_mut();
    graph.width = Some(max_x - min_x + 2.0 * label.marginx);
    graph.height = Some(max_y - min_y + 2.0 * label.marginy);
}
