use rustc_hash::FxHashSet;
use serde::Serialize;

use super::{LayoutEngine, MeasuredSizes, Position, Positions};
use crate::graph::GraphModel;
use crate::port::LinkField;

/// Result of laying out the chain reachable from one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainLayout {
    /// Breadth-first layers; `levels[0]` is the root.
    pub levels: Vec<Vec<String>>,
    pub chain: Positions,
    /// Nodes the traversal never reached, laid out on their own to the right of the chain.
    pub rest: Positions,
}

impl ChainLayout {
    pub fn contains(&self, id: &str) -> bool {
        self.chain.contains_key(id)
    }

    /// Chain positions followed by the rest.
    pub fn positions(&self) -> Positions {
        self.chain
            .iter()
            .chain(self.rest.iter())
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

/// Children in declared order: `next` then `on_error`, markers stripped.
fn ordered_children<'a>(model: &'a GraphModel, id: &str) -> Vec<&'a str> {
    let Some(node) = model.node(id) else {
        return Vec::new();
    };
    [LinkField::Next, LinkField::OnError]
        .into_iter()
        .filter_map(|f| node.record.link_slot(f))
        .flat_map(|slot| slot.refs().iter().map(|l| l.target()))
        .filter(|t| !t.is_empty())
        .collect()
}

pub(super) fn chain_layout(
    engine: &LayoutEngine,
    model: &GraphModel,
    root: &str,
    measured: &MeasuredSizes,
) -> Option<ChainLayout> {
    if !model.has_node(root) {
        return None;
    }

    let mut visited: FxHashSet<&str> = FxHashSet::default();
    visited.insert(root);
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<&str> = vec![root];
    while !current.is_empty() {
        let mut next_level = Vec::new();
        for &id in &current {
            for child in ordered_children(model, id) {
                if model.has_node(child) && visited.insert(child) {
                    next_level.push(child);
                }
            }
        }
        levels.push(current.iter().map(|s| s.to_string()).collect());
        current = next_level;
    }

    let unit_x = engine.spacing.nodesep;
    let unit_y = engine.spacing.ranksep;
    let mut chain = Positions::new();
    for (depth, level) in levels.iter().enumerate() {
        let start_x = -((level.len() as f64 - 1.0) * unit_x) / 2.0;
        for (index, id) in level.iter().enumerate() {
            chain.insert(
                id.clone(),
                Position::new(start_x + index as f64 * unit_x, depth as f64 * unit_y),
            );
        }
    }

    let remaining: Vec<&str> = model.node_ids().filter(|id| !visited.contains(id)).collect();
    let mut rest = Positions::new();
    if !remaining.is_empty() {
        let laid = engine.layout_subset(model, &remaining, measured);
        let max_x = chain.values().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let offset_x = if max_x.is_finite() { max_x } else { 0.0 }
            + engine.spacing.nodesep * engine.chain_block_gap;
        for (id, pos) in laid {
            rest.insert(id, Position::new(pos.x + offset_x, pos.y));
        }
    }

    tracing::debug!(
        root,
        depth = levels.len(),
        chain = chain.len(),
        rest = rest.len(),
        "chain layout"
    );
    Some(ChainLayout {
        levels,
        chain,
        rest,
    })
}
