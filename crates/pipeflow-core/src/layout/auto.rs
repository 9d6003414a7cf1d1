use pipeflow_layout::{EdgeLabel, GraphLabel, NodeLabel, RankDir};
use rustc_hash::FxHashSet;
use std::time::Instant;

use super::{LayoutEngine, MeasuredSizes, Position, Positions};
use crate::graph::GraphModel;

impl LayoutEngine {
    /// Lays out the given nodes and the edges among them, top to bottom.
    ///
    /// Edges are fed primary terminal first and error terminal last (stable within a weight)
    /// so success paths tend to sit left of error paths.
    pub fn layout_subset(
        &self,
        model: &GraphModel,
        ids: &[&str],
        measured: &MeasuredSizes,
    ) -> Positions {
        let started = Instant::now();
        let mut g = pipeflow_layout::new_graph(GraphLabel {
            rankdir: RankDir::TB,
            nodesep: self.spacing.nodesep,
            ranksep: self.spacing.ranksep,
            ..GraphLabel::default()
        });

        let included: FxHashSet<&str> = ids.iter().copied().collect();
        for &id in ids {
            let size = self.sizing.footprint(measured.get(id).copied());
            g.set_node(id, NodeLabel::sized(size.width, size.height));
        }

        let mut edges: Vec<_> = model
            .edges()
            .iter()
            .filter(|e| included.contains(e.source.as_str()) && included.contains(e.target.as_str()))
            .collect();
        edges.sort_by_key(|e| e.source_terminal.sort_weight());
        for e in edges {
            g.set_edge_named(
                e.source.as_str(),
                e.target.as_str(),
                Some(e.id.as_str()),
                Some(EdgeLabel::default()),
            );
        }

        pipeflow_layout::layout(&mut g);

        let positions: Positions = ids
            .iter()
            .map(|&id| {
                let pos = g
                    .node(id)
                    .map(|n| {
                        Position::new(
                            n.x.unwrap_or(0.0) - n.width / 2.0,
                            n.y.unwrap_or(0.0) - n.height / 2.0,
                        )
                    })
                    .unwrap_or_default();
                (id.to_string(), pos)
            })
            .collect();
        tracing::debug!(
            nodes = ids.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "auto layout"
        );
        positions
    }
}
