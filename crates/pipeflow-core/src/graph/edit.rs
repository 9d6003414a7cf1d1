use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::{ChangeKind, GraphEdge, GraphModel, GraphNode, NodeKind, NodeStatus};
use crate::error::{Error, Result};
use crate::link::{LinkRef, LinkSlot, contains_marker};
use crate::port::{LinkField, Terminal, validate_connection};
use crate::record::{Recognition, TaskRecord};

/// A connection gesture between two terminals, identified by wire ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub source_terminal: String,
    pub target: String,
    pub target_terminal: String,
}

impl Connection {
    pub fn new(source: impl Into<String>, terminal: Terminal, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_terminal: terminal.wire_id().to_string(),
            target: target.into(),
            target_terminal: Terminal::Input.wire_id().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Added(String),
    /// The same link already existed and the gesture removed it.
    Removed(String),
    /// One of the endpoints does not exist.
    Ignored,
}

/// An edit to one node: rename, recognition change, record replacement, or any combination.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub id: String,
    pub new_id: Option<String>,
    pub recognition: Option<Recognition>,
    pub record: Option<TaskRecord>,
}

impl NodeUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn rename(mut self, new_id: impl Into<String>) -> Self {
        self.new_id = Some(new_id.into());
        self
    }

    pub fn recognition(mut self, recognition: Recognition) -> Self {
        self.recognition = Some(recognition);
        self
    }

    pub fn record(mut self, record: TaskRecord) -> Self {
        self.record = Some(record);
        self
    }
}

fn check_identifier(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::EmptyIdentifier);
    }
    if contains_marker(id) {
        return Err(Error::ReservedIdentifier { id: id.to_string() });
    }
    Ok(())
}

impl GraphModel {
    /// Applies a connection gesture. Connecting two terminals that are already linked removes
    /// the link instead.
    pub fn connect(&mut self, conn: &Connection) -> Result<ConnectOutcome> {
        let (from, _) = validate_connection(
            &conn.source,
            &conn.source_terminal,
            &conn.target,
            &conn.target_terminal,
        )?;
        if !self.nodes.contains_key(&conn.source) || !self.nodes.contains_key(&conn.target) {
            tracing::debug!(source = %conn.source, target = %conn.target, "ignoring connection to unknown node");
            return Ok(ConnectOutcome::Ignored);
        }

        if let Some(idx) = self.edges.iter().position(|e| {
            e.source == conn.source && e.target == conn.target && e.source_terminal == from
        }) {
            self.remove_link_value(idx);
            let edge = self.edges.remove(idx);
            self.feed.bump(ChangeKind::Structure);
            return Ok(ConnectOutcome::Removed(edge.id));
        }

        let Some(port) = from.port() else {
            return Ok(ConnectOutcome::Ignored);
        };
        let anchor = self.is_anchor_node(&conn.target);
        let link = LinkRef::new(conn.target.as_str()).with_anchor(anchor);
        self.append_link_value(&conn.source, port.field, link);

        let id = self.unique_edge_id(&conn.source, &conn.target, port.field);
        self.edges.push(GraphEdge {
            id: id.clone(),
            source: conn.source.clone(),
            target: conn.target.clone(),
            source_terminal: from,
            target_terminal: Terminal::Input,
            field: port.field,
            back_jump: false,
            anchor,
        });
        self.feed.bump(ChangeKind::Structure);
        Ok(ConnectOutcome::Added(id))
    }

    /// Appends to a list field. A scalar value becomes the first element, and the node remembers
    /// the field so [`Self::remove_link_value`] can fold it back.
    fn append_link_value(&mut self, source: &str, field: LinkField, link: LinkRef) {
        let Some(node) = self.nodes.get_mut(source) else {
            return;
        };
        let slot = node.record.link_slot_mut(field);
        let (mut list, widened) = match slot.take() {
            Some(LinkSlot::Single(existing)) => (vec![existing], true),
            Some(LinkSlot::List(list)) => (list, false),
            None => (Vec::new(), false),
        };
        list.push(link);
        *slot = Some(LinkSlot::List(list));
        if widened && !node.widened.contains(&field) {
            node.widened.push(field);
        }
    }

    /// Position of the link value behind `edges[idx]` within its field.
    ///
    /// Edges from one field keep the order of its values, so the edge that is the nth one for
    /// its (source, field, target) maps to the nth value naming that target.
    fn value_index(&self, idx: usize) -> Option<usize> {
        let edge = self.edges.get(idx)?;
        let nth = self.edges[..idx]
            .iter()
            .filter(|e| {
                e.source == edge.source && e.field == edge.field && e.target == edge.target
            })
            .count();
        let slot = self.nodes.get(&edge.source)?.record.link_slot(edge.field)?;
        slot.refs()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.target() == edge.target)
            .map(|(i, _)| i)
            .nth(nth)
    }

    /// Drops the value behind `edges[idx]`, leaving the edge itself in place. An emptied field
    /// is removed, and a widened scalar left with one value goes back to a scalar.
    fn remove_link_value(&mut self, idx: usize) {
        let Some(pos) = self.value_index(idx) else {
            return;
        };
        let (source, field) = {
            let e = &self.edges[idx];
            (e.source.clone(), e.field)
        };
        let Some(node) = self.nodes.get_mut(&source) else {
            return;
        };
        let fold = node.widened.contains(&field);
        let slot = node.record.link_slot_mut(field);
        *slot = match slot.take() {
            Some(LinkSlot::List(mut list)) => {
                list.remove(pos);
                match list.len() {
                    0 => None,
                    1 if fold => list.pop().map(LinkSlot::Single),
                    _ => Some(LinkSlot::List(list)),
                }
            }
            Some(LinkSlot::Single(_)) | None => None,
        };
        let still_list = matches!(slot, Some(LinkSlot::List(_)));
        if !still_list {
            node.widened.retain(|f| *f != field);
        }
    }

    /// Removes an edge and the link value behind it. Unknown ids are ignored.
    pub fn disconnect(&mut self, edge_id: &str) -> bool {
        let Some(idx) = self.edges.iter().position(|e| e.id == edge_id) else {
            return false;
        };
        self.remove_link_value(idx);
        self.edges.remove(idx);
        self.feed.bump(ChangeKind::Structure);
        true
    }

    pub fn disconnect_all(&mut self, edge_ids: &[&str]) -> usize {
        edge_ids.iter().filter(|id| self.disconnect(id)).count()
    }

    /// Marks or unmarks an edge as a back-jump and rewrites the link value to match.
    pub fn set_back_jump(&mut self, edge_id: &str, back_jump: bool) -> Result<()> {
        let Some(idx) = self.edges.iter().position(|e| e.id == edge_id) else {
            return Err(Error::EdgeNotFound {
                id: edge_id.to_string(),
            });
        };
        let (source, target, field) = {
            let e = &self.edges[idx];
            (e.source.clone(), e.target.clone(), e.field)
        };
        let anchor_target = self.is_anchor_node(&target);
        let mut anchor = self.edges[idx].anchor;
        let pos = self.value_index(idx);
        if let (Some(i), Some(slot)) = (
            pos,
            self.nodes
                .get_mut(&source)
                .and_then(|n| n.record.link_slot_mut(field).as_mut()),
        ) {
            let current = slot.refs()[i].clone();
            let updated = current
                .with_back_jump(back_jump)
                .with_anchor(current.is_anchor() || anchor_target);
            anchor = updated.is_anchor();
            slot.replace_at(i, updated);
        }
        let edge = &mut self.edges[idx];
        edge.back_jump = back_jump;
        edge.anchor = anchor;
        self.feed.bump(ChangeKind::Structure);
        Ok(())
    }

    /// Renames a node, rewriting every link value and edge that referenced it.
    pub fn rename(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        if !self.nodes.contains_key(old_id) {
            return Err(Error::NodeNotFound {
                id: old_id.to_string(),
            });
        }
        if old_id == new_id {
            return Ok(());
        }
        check_identifier(new_id)?;
        if self.nodes.contains_key(new_id) {
            return Err(Error::RenameCollision {
                id: new_id.to_string(),
            });
        }

        let Some((index, _, mut node)) = self.nodes.shift_remove_full(old_id) else {
            return Err(Error::NodeNotFound {
                id: old_id.to_string(),
            });
        };
        node.id = new_id.to_string();
        self.nodes.shift_insert(index, new_id.to_string(), node);

        for node in self.nodes.values_mut() {
            for field in LinkField::ALL {
                if let Some(slot) = node.record.link_slot_mut(field).as_mut() {
                    slot.map_refs(|l| (l.target() == old_id).then(|| l.with_target(new_id)));
                }
            }
        }

        let touched: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.source == old_id || e.target == old_id)
            .map(|(i, _)| i)
            .collect();
        for &i in &touched {
            let e = &mut self.edges[i];
            if e.source == old_id {
                e.source = new_id.to_string();
            }
            if e.target == old_id {
                e.target = new_id.to_string();
            }
            e.id.clear();
        }
        for &i in &touched {
            let (source, target, field) = {
                let e = &self.edges[i];
                (e.source.clone(), e.target.clone(), e.field)
            };
            self.edges[i].id = self.unique_edge_id(&source, &target, field);
        }

        tracing::debug!(old_id, new_id, edges = touched.len(), "renamed node");
        self.feed.bump(ChangeKind::Structure);
        Ok(())
    }

    /// Applies a node edit. Editing a placeholder turns it into a real task.
    pub fn update_node(&mut self, update: NodeUpdate) -> Result<()> {
        let mut id = update.id;
        if let Some(new_id) = update.new_id.filter(|n| *n != id) {
            self.rename(&id, &new_id)?;
            id = new_id;
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(Error::NodeNotFound { id });
        };

        let record_replaced = update.record.is_some();
        if update.record.is_some() || update.recognition.is_some() {
            let mut record = update.record.unwrap_or_else(|| node.record.clone());
            if let Some(recognition) = update.recognition {
                record.recognition = Some(recognition);
            }
            node.promote(record);
        }
        if record_replaced {
            node.widened.clear();
            self.sync_outgoing_edges(&id);
        }
        self.normalize_anchor_links();
        self.feed.bump(ChangeKind::Record);
        Ok(())
    }

    /// Adds a task. Adding over a placeholder fills it in.
    pub fn add_node(&mut self, id: &str, record: TaskRecord) -> Result<()> {
        check_identifier(id)?;
        match self.nodes.get_mut(id) {
            Some(node) if !node.placeholder => {
                return Err(Error::NodeExists { id: id.to_string() });
            }
            Some(node) => node.promote(record),
            None => {
                self.nodes
                    .insert(id.to_string(), GraphNode::task(id, record));
            }
        }
        self.sync_outgoing_edges(id);
        self.normalize_anchor_links();
        self.feed.bump(ChangeKind::Structure);
        Ok(())
    }

    /// Removes a node with its edges, dropping the link values that pointed at it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        // Back to front, so each edge still finds its own value.
        let incoming: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.target == id && e.source != id)
            .map(|(i, _)| i)
            .collect();
        for &idx in incoming.iter().rev() {
            self.remove_link_value(idx);
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        self.nodes.shift_remove(id);
        self.feed.bump(ChangeKind::Structure);
        true
    }

    /// Removes placeholders nothing links to any more.
    pub fn prune_placeholders(&mut self) -> Vec<String> {
        let referenced: FxHashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        let orphans: Vec<String> = self
            .nodes
            .values()
            .filter(|n| n.placeholder && !referenced.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        if orphans.is_empty() {
            return orphans;
        }
        for id in &orphans {
            self.nodes.shift_remove(id);
        }
        self.edges.retain(|e| !orphans.contains(&e.source));
        self.feed.bump(ChangeKind::Structure);
        orphans
    }

    /// Rebuilds the edges leaving `id` from its record.
    fn sync_outgoing_edges(&mut self, id: &str) {
        self.edges.retain(|e| e.source != id);
        let mut issues = Vec::new();
        self.derive_outgoing_edges(id, &mut issues);
        for issue in issues {
            tracing::warn!(%issue, "link skipped");
        }
    }

    /// Adds the anchor marker to every link value whose target is an anchor node.
    pub(crate) fn normalize_anchor_links(&mut self) {
        let anchors: FxHashSet<String> = self
            .nodes
            .values()
            .filter(|n| n.is_anchor())
            .map(|n| n.id.clone())
            .collect();
        if anchors.is_empty() {
            return;
        }
        for node in self.nodes.values_mut() {
            for field in LinkField::ALL {
                if let Some(slot) = node.record.link_slot_mut(field).as_mut() {
                    slot.map_refs(|l| {
                        (!l.is_anchor() && anchors.contains(l.target())).then(|| l.with_anchor(true))
                    });
                }
            }
        }
        for edge in &mut self.edges {
            if anchors.contains(&edge.target) {
                edge.anchor = true;
            }
        }
    }

    pub fn set_status(&mut self, id: &str, status: NodeStatus) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) if node.status != status => {
                node.status = status;
                self.feed.bump(ChangeKind::Status);
                true
            }
            _ => false,
        }
    }

    /// Back to idle; placeholders go back to missing.
    pub fn reset_statuses(&mut self) {
        for node in self.nodes.values_mut() {
            node.status = if node.placeholder {
                NodeStatus::Missing
            } else {
                NodeStatus::Idle
            };
        }
        self.feed.bump(ChangeKind::Status);
    }

    pub fn node_kind(&self, id: &str) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }
}
