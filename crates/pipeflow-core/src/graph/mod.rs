//! The graph view of a pipeline document and the operations that keep both in sync.
//!
//! Every edge corresponds to one entry in its source record's link field, and every entry whose
//! target id is non-empty has an edge. Targets that name no task get a placeholder node so the
//! edge has somewhere to land; placeholders are never exported.

mod edit;
mod feed;

pub use edit::{ConnectOutcome, Connection, NodeUpdate};
pub use feed::{Change, ChangeFeed, ChangeKind, SubscriptionId};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::assets::NodeAssets;
use crate::document::Document;
use crate::layout::Position;
use crate::link::{LinkRef, contains_marker};
use crate::port::{
    BACK_JUMP_COLOR, DEFAULT_EDGE_COLOR, EdgeAppearance, EdgeStyle, LinkField, Terminal,
};
use crate::record::{Recognition, TaskRecord};
use crate::schema::{self, ParamIssue};
use crate::snapshot::DirtySnapshot;

/// Display kind of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Task(Recognition),
    /// A marker-only node. Never exported.
    Anchor,
    /// A placeholder for a target no task defines.
    Unknown,
}

impl NodeKind {
    pub fn for_record(record: &TaskRecord) -> Self {
        match record.recognition_kind() {
            Some(Recognition::Other(s)) if s == "Anchor" => Self::Anchor,
            Some(Recognition::Other(s)) if s == "Unknown" => Self::Unknown,
            Some(r) => Self::Task(r),
            None => Self::Task(Recognition::DirectHit),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Task(r) => r.as_str(),
            Self::Anchor => "Anchor",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime status shown while debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
    Ignored,
    Missing,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub record: TaskRecord,
    pub status: NodeStatus,
    pub placeholder: bool,
    pub position: Position,
    pub assets: NodeAssets,
    /// Fields authored as a single value that a connection turned into a list.
    pub(crate) widened: Vec<LinkField>,
}

impl GraphNode {
    fn task(id: &str, record: TaskRecord) -> Self {
        Self {
            id: id.to_string(),
            kind: NodeKind::for_record(&record),
            record,
            status: NodeStatus::Idle,
            placeholder: false,
            position: Position::default(),
            assets: NodeAssets::default(),
            widened: Vec::new(),
        }
    }

    fn placeholder(id: &str, anchor: bool) -> Self {
        let mut record = TaskRecord::default();
        record.anchor = anchor.then_some(true);
        Self {
            id: id.to_string(),
            kind: if anchor { NodeKind::Anchor } else { NodeKind::Unknown },
            record,
            status: NodeStatus::Missing,
            placeholder: true,
            position: Position::default(),
            assets: NodeAssets::default(),
            widened: Vec::new(),
        }
    }

    /// Marker-only nodes and nodes flagged `anchor: true`.
    pub fn is_anchor(&self) -> bool {
        self.kind == NodeKind::Anchor || self.record.is_anchor()
    }

    pub fn is_exported(&self) -> bool {
        !self.placeholder && self.kind != NodeKind::Anchor
    }

    fn promote(&mut self, record: TaskRecord) {
        self.kind = NodeKind::for_record(&record);
        self.record = record;
        self.placeholder = false;
        self.status = NodeStatus::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_terminal: Terminal,
    pub target_terminal: Terminal,
    /// The record field this edge was read from or written to.
    pub field: LinkField,
    pub back_jump: bool,
    pub anchor: bool,
}

impl GraphEdge {
    pub fn label(&self) -> &'static str {
        if self.back_jump {
            "JumpBack"
        } else {
            self.field.key()
        }
    }

    pub fn color(&self) -> &'static str {
        if self.back_jump {
            return BACK_JUMP_COLOR;
        }
        self.source_terminal
            .port()
            .map(|p| p.color)
            .unwrap_or(DEFAULT_EDGE_COLOR)
    }

    pub fn appearance(&self, style: EdgeStyle) -> EdgeAppearance {
        EdgeAppearance {
            style,
            color: self.color(),
            label: self.label().to_string(),
            animated: self.back_jump,
            dashed: self.back_jump,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadIssue {
    /// A task id containing `[Anchor]` or `[JumpBack]`; links to it cannot be decoded.
    ReservedIdentifier { id: String },
    /// A link value that is nothing but markers.
    EmptyLink { node: String, field: LinkField },
    Param { node: String, issue: ParamIssue },
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedIdentifier { id } => {
                write!(f, "task id `{id}` contains a reserved link marker")
            }
            Self::EmptyLink { node, field } => {
                write!(f, "`{node}.{field}` has a link without a target")
            }
            Self::Param { node, issue } => write!(f, "`{node}`: {issue}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub nodes: usize,
    pub edges: usize,
    pub placeholders: Vec<String>,
    pub issues: Vec<LoadIssue>,
}

/// The editable graph plus the feed that tells observers it changed.
#[derive(Debug, Default)]
pub struct GraphModel {
    pub(crate) nodes: IndexMap<String, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
    pub(crate) extras: IndexMap<String, Value>,
    pub(crate) feed: ChangeFeed,
    pub(crate) snapshot: DirtySnapshot,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &Document) -> (Self, LoadReport) {
        let mut model = Self::new();
        let report = model.load(doc);
        (model, report)
    }

    /// Replaces the whole graph with one derived from `doc`.
    ///
    /// Link values are taken as written: anchor markers are not added at this point, so
    /// exporting straight after a load reproduces the document. The export is captured as the
    /// dirty-tracking baseline.
    pub fn load(&mut self, doc: &Document) -> LoadReport {
        self.nodes.clear();
        self.edges.clear();
        self.extras = doc.extras.clone();

        let mut issues = Vec::new();
        for (id, record) in &doc.tasks {
            if contains_marker(id) {
                tracing::warn!(id = %id, "task id contains a reserved link marker");
                issues.push(LoadIssue::ReservedIdentifier { id: id.clone() });
            }
            issues.extend(schema::validate(record).into_iter().map(|issue| LoadIssue::Param {
                node: id.clone(),
                issue,
            }));
            self.nodes.insert(id.clone(), GraphNode::task(id, record.clone()));
        }

        let ids: Vec<String> = self.nodes.keys().cloned().collect();
        for id in &ids {
            self.derive_outgoing_edges(id, &mut issues);
        }

        let placeholders: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.placeholder)
            .map(|n| n.id.clone())
            .collect();
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            placeholders = placeholders.len(),
            issues = issues.len(),
            "loaded pipeline document"
        );
        self.capture_baseline();
        self.feed.bump(ChangeKind::Loaded);

        LoadReport {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            placeholders,
            issues,
        }
    }

    /// Builds edges for every link in `source`'s record, creating placeholders for unknown
    /// targets.
    fn derive_outgoing_edges(&mut self, source: &str, issues: &mut Vec<LoadIssue>) {
        let Some(node) = self.nodes.get(source) else {
            return;
        };
        let mut links: Vec<(LinkField, LinkRef)> = Vec::new();
        for field in LinkField::ALL {
            if let Some(slot) = node.record.link_slot(field) {
                links.extend(slot.refs().iter().map(|l| (field, l.clone())));
            }
        }

        for (field, link) in links {
            let target = link.target();
            if target.is_empty() {
                issues.push(LoadIssue::EmptyLink {
                    node: source.to_string(),
                    field,
                });
                continue;
            }
            self.ensure_target(target, link.is_anchor());
            let id = self.unique_edge_id(source, target, field);
            self.edges.push(GraphEdge {
                id,
                source: source.to_string(),
                target: target.to_string(),
                source_terminal: field.terminal(),
                target_terminal: Terminal::Input,
                field,
                back_jump: link.is_back_jump(),
                anchor: link.is_anchor(),
            });
        }
    }

    fn ensure_target(&mut self, id: &str, anchor: bool) {
        match self.nodes.get_mut(id) {
            Some(node) => {
                if anchor && node.placeholder && !node.record.is_anchor() {
                    node.record.anchor = Some(true);
                    node.kind = NodeKind::Anchor;
                }
            }
            None => {
                tracing::debug!(id, anchor, "creating placeholder for missing task");
                self.nodes
                    .insert(id.to_string(), GraphNode::placeholder(id, anchor));
            }
        }
    }

    pub(crate) fn unique_edge_id(&self, source: &str, target: &str, field: LinkField) -> String {
        let base = format!("e-{source}-{target}-{}", field.key());
        if !self.edges.iter().any(|e| e.id == base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.edges.iter().any(|e| e.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Records of every exportable node, in node order.
    pub fn export_document(&self) -> Document {
        Document {
            tasks: self
                .nodes
                .values()
                .filter(|n| n.is_exported())
                .map(|n| (n.id.clone(), n.record.clone()))
                .collect(),
            extras: self.extras.clone(),
        }
    }

    pub fn export_value(&self) -> Value {
        self.export_document().to_value()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(|n| n.placeholder)
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn is_anchor_node(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(GraphNode::is_anchor)
    }

    pub fn version(&self) -> u64 {
        self.feed.version()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + Send + 'static) -> SubscriptionId {
        self.feed.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.feed.unsubscribe(id)
    }

    /// Records the current export as the saved state.
    pub fn capture_baseline(&mut self) {
        let current = self.export_value();
        self.snapshot.capture(current);
    }

    pub fn mark_saved(&mut self) {
        self.capture_baseline();
    }

    pub fn clear_baseline(&mut self) {
        self.snapshot.clear();
    }

    pub fn has_baseline(&self) -> bool {
        self.snapshot.has_baseline()
    }

    pub fn is_dirty(&self) -> bool {
        self.snapshot.has_baseline() && self.snapshot.is_dirty(&self.export_value())
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.position = position;
                self.feed.bump(ChangeKind::Layout);
                true
            }
            None => false,
        }
    }
}
