//! Node placement: general layered layout and the ordered task-chain layout.

mod auto;
mod chain;

pub use chain::ChainLayout;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::graph::{ChangeKind, GraphModel};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Top-left corner of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub type Positions = IndexMap<String, Position>;

/// Rendered node sizes, when the caller has them.
pub type MeasuredSizes = FxHashMap<String, Size>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingKey {
    Compact,
    #[default]
    Normal,
    Loose,
}

impl SpacingKey {
    pub fn spacing(self) -> Spacing {
        match self {
            Self::Compact => Spacing::new(80.0, 120.0),
            Self::Normal => Spacing::new(120.0, 180.0),
            Self::Loose => Spacing::new(300.0, 300.0),
        }
    }
}

impl std::str::FromStr for SpacingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(Self::Compact),
            "normal" => Ok(Self::Normal),
            "loose" => Ok(Self::Loose),
            other => Err(format!("unknown spacing `{other}` (expected compact, normal or loose)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    /// Vertical gap between ranks.
    pub ranksep: f64,
    /// Horizontal gap between nodes in a rank.
    pub nodesep: f64,
}

impl Spacing {
    pub fn new(ranksep: f64, nodesep: f64) -> Self {
        Self { ranksep, nodesep }
    }
}

impl Default for Spacing {
    fn default() -> Self {
        SpacingKey::Normal.spacing()
    }
}

/// Footprint assumed for a node: its measured size (or the fallback) plus padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSizing {
    pub fallback_width: f64,
    pub fallback_height: f64,
    pub extra_width: f64,
    pub extra_height: f64,
}

impl Default for NodeSizing {
    fn default() -> Self {
        Self {
            fallback_width: 280.0,
            fallback_height: 150.0,
            extra_width: 20.0,
            extra_height: 20.0,
        }
    }
}

impl NodeSizing {
    pub fn footprint(&self, measured: Option<Size>) -> Size {
        let base = measured.unwrap_or(Size::new(self.fallback_width, self.fallback_height));
        Size::new(base.width + self.extra_width, base.height + self.extra_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutEngine {
    pub spacing: Spacing,
    pub sizing: NodeSizing,
    /// Gap between the chain and the remaining nodes, in multiples of `nodesep`.
    pub chain_block_gap: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(Spacing::default())
    }
}

impl LayoutEngine {
    pub fn new(spacing: Spacing) -> Self {
        Self {
            spacing,
            sizing: NodeSizing::default(),
            chain_block_gap: 2.0,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            spacing: config.spacing.spacing(),
            sizing: config.node_size,
            chain_block_gap: config.chain_block_gap,
        }
    }

    pub fn with_spacing(mut self, spacing: Spacing) -> Self {
        self.spacing = spacing;
        self
    }

    /// First pass, before anything is rendered: every node gets the fallback size.
    pub fn layout(&self, model: &GraphModel) -> Positions {
        self.relayout(model, &MeasuredSizes::default())
    }

    /// Second pass with rendered sizes. Nodes missing from `measured` use the fallback.
    pub fn relayout(&self, model: &GraphModel, measured: &MeasuredSizes) -> Positions {
        let ids: Vec<&str> = model.node_ids().collect();
        self.layout_subset(model, &ids, measured)
    }

    pub fn chain_layout(
        &self,
        model: &GraphModel,
        root: &str,
        measured: &MeasuredSizes,
    ) -> Option<ChainLayout> {
        chain::chain_layout(self, model, root, measured)
    }
}

impl GraphModel {
    /// Writes positions into nodes. Ids that are not in the model are skipped.
    pub fn apply_positions(&mut self, positions: &Positions) -> usize {
        let mut applied = 0;
        for (id, pos) in positions {
            if let Some(node) = self.nodes.get_mut(id) {
                node.position = *pos;
                applied += 1;
            }
        }
        if applied > 0 {
            self.feed.bump(ChangeKind::Layout);
        }
        applied
    }

    pub fn positions(&self) -> Positions {
        self.nodes
            .values()
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }
}
