#![forbid(unsafe_code)]

//! Layered graph layout.
//!
//! The pipeline is the classic Sugiyama sequence: break cycles, assign ranks, split long edges
//! with dummy nodes, order each rank to reduce crossings, then assign coordinates. Input and
//! output both live on a [`graphlib::Graph`] whose node labels carry sizes in and centers out.

pub use pipeflow_graphlib as graphlib;

pub mod acyclic;
pub mod model;
pub mod normalize;
pub mod order;
pub mod position;
pub mod rank;

pub use model::{EdgeLabel, GraphLabel, NodeLabel, Point, RankDir};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type LayoutGraph = graphlib::Graph<NodeLabel, EdgeLabel, GraphLabel>;

/// Creates an empty multigraph ready for [`layout`].
pub fn new_graph(label: GraphLabel) -> LayoutGraph {
    let mut g = LayoutGraph::new(graphlib::GraphOptions { multigraph: true });
    g.set_graph(label);
    g
}

/// Lays out `g` in place: every node gets `x`/`y` (its center) and every edge gets `points`.
pub fn layout(g: &mut LayoutGraph) {
    if g.node_count() == 0 {
        return;
    }
    let rankdir = g.graph().rankdir;
    if rankdir == RankDir::LR {
        swap_width_height(g);
    }

    acyclic::run(g);
    rank::rank(g);
    let chains = normalize::run(g);
    order::order(g);
    position::position(g);
    normalize::undo(g, chains);
    assign_edge_endpoints(g);
    acyclic::undo(g);

    if rankdir == RankDir::LR {
        swap_width_height(g);
        swap_xy(g);
    }
}

fn swap_width_height(g: &mut LayoutGraph) {
    g.for_each_node_mut(|_, n| std::mem::swap(&mut n.width, &mut n.height));
    let graph = g.graph_mut();
    std::mem::swap(&mut graph.width, &mut graph.height);
}

fn swap_xy(g: &mut LayoutGraph) {
    g.for_each_node_mut(|_, n| std::mem::swap(&mut n.x, &mut n.y));
    for e in g.edge_keys() {
        if let Some(lbl) = g.edge_mut_by_key(&e) {
            for p in &mut lbl.points {
                std::mem::swap(&mut p.x, &mut p.y);
            }
        }
    }
}

/// Adds the bottom-center of the tail and the top-center of the head around any dummy points.
fn assign_edge_endpoints(g: &mut LayoutGraph) {
    for e in g.edge_keys() {
        let geometry = |id: &str| {
            g.node(id)
                .map(|n| (n.x.unwrap_or(0.0), n.y.unwrap_or(0.0), n.width, n.height))
        };
        let (Some((sx, sy, sw, sh)), Some((tx, ty, _, th))) = (geometry(&e.v), geometry(&e.w))
        else {
            continue;
        };
        let nodesep = g.graph().nodesep;
        let Some(lbl) = g.edge_mut_by_key(&e) else {
            continue;
        };

        if e.is_self_loop() {
            let x0 = sx + sw / 2.0;
            let x1 = x0 + nodesep / 2.0;
            lbl.points = vec![
                Point { x: x0, y: sy - sh / 4.0 },
                Point { x: x1, y: sy - sh / 4.0 },
                Point { x: x1, y: sy + sh / 4.0 },
                Point { x: x0, y: sy + sh / 4.0 },
            ];
            continue;
        }

        let mut points = Vec::with_capacity(lbl.points.len() + 2);
        points.push(Point {
            x: sx,
            y: sy + sh / 2.0,
        });
        points.append(&mut lbl.points);
        points.push(Point {
            x: tx,
            y: ty - th / 2.0,
        });
        lbl.points = points;
    }
}
