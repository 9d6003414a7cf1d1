//! Graph container used by `pipeflow-layout`.
//!
//! A directed multigraph keyed by string ids. Nodes and edges keep insertion order, which the
//! layered layout relies on for deterministic tie-breaking.

use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::hash::{Hash, Hasher};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone, Copy)]
pub struct GraphOptions {
    pub multigraph: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self { multigraph: true }
    }
}

#[derive(Debug, Clone)]
pub struct EdgeKey {
    pub v: String,
    pub w: String,
    pub name: Option<String>,
}

impl EdgeKey {
    pub fn new(
        v: impl Into<String>,
        w: impl Into<String>,
        name: Option<impl Into<String>>,
    ) -> Self {
        Self {
            v: v.into(),
            w: w.into(),
            name: name.map(Into::into),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.v == self.w
    }
}

impl PartialEq for EdgeKey {
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v && self.w == other.w && self.name == other.name
    }
}

impl Eq for EdgeKey {}

impl Hash for EdgeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.v.hash(state);
        self.w.hash(state);
        self.name.hash(state);
    }
}

#[derive(Debug, Clone)]
struct NodeEntry<N> {
    id: String,
    label: N,
}

#[derive(Debug, Clone)]
struct EdgeEntry<E> {
    key: EdgeKey,
    label: E,
}

#[derive(Debug, Clone)]
struct AdjCache {
    generation: u64,
    out: Vec<Vec<usize>>,
    in_: Vec<Vec<usize>>,
}

pub struct Graph<N, E, G>
where
    N: Default,
    E: Default,
    G: Default,
{
    options: GraphOptions,
    graph_label: G,

    nodes: Vec<NodeEntry<N>>,
    node_index: HashMap<String, usize>,

    edges: Vec<EdgeEntry<E>>,
    edge_index: HashMap<EdgeKey, usize>,

    // `successors` / `out_edges` are called once per node per sweep. Rebuild adjacency lazily
    // after mutations instead of scanning every edge per query.
    adj_generation: u64,
    adj_cache: RefCell<Option<AdjCache>>,
}

impl<N, E, G> Graph<N, E, G>
where
    N: Default,
    E: Default,
    G: Default,
{
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            graph_label: G::default(),
            nodes: Vec::new(),
            node_index: HashMap::default(),
            edges: Vec::new(),
            edge_index: HashMap::default(),
            adj_generation: 0,
            adj_cache: RefCell::new(None),
        }
    }

    fn invalidate_adj(&mut self) {
        self.adj_generation = self.adj_generation.wrapping_add(1);
        *self.adj_cache.get_mut() = None;
    }

    fn with_adj<R>(&self, f: impl FnOnce(&AdjCache) -> R) -> R {
        let mut cache = self.adj_cache.borrow_mut();
        let stale = cache
            .as_ref()
            .is_none_or(|c| c.generation != self.adj_generation);
        if stale {
            let mut out: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
            let mut in_: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
            for (edge_idx, e) in self.edges.iter().enumerate() {
                let (Some(&v_idx), Some(&w_idx)) =
                    (self.node_index.get(&e.key.v), self.node_index.get(&e.key.w))
                else {
                    continue;
                };
                out[v_idx].push(edge_idx);
                in_[w_idx].push(edge_idx);
            }
            *cache = Some(AdjCache {
                generation: self.adj_generation,
                out,
                in_,
            });
        }
        match cache.as_ref() {
            Some(c) => f(c),
            None => f(&AdjCache {
                generation: self.adj_generation,
                out: Vec::new(),
                in_: Vec::new(),
            }),
        }
    }

    fn canonical_key(&self, v: String, w: String, name: Option<String>) -> EdgeKey {
        let name = if self.options.multigraph { name } else { None };
        EdgeKey { v, w, name }
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub fn set_graph(&mut self, label: G) -> &mut Self {
        self.graph_label = label;
        self
    }

    pub fn graph(&self) -> &G {
        &self.graph_label
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph_label
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn set_node(&mut self, id: impl Into<String>, label: N) -> &mut Self {
        let id = id.into();
        if let Some(&idx) = self.node_index.get(&id) {
            self.nodes[idx].label = label;
            return self;
        }
        self.invalidate_adj();
        let idx = self.nodes.len();
        self.nodes.push(NodeEntry {
            id: id.clone(),
            label,
        });
        self.node_index.insert(id, idx);
        self
    }

    pub fn ensure_node(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        if self.node_index.contains_key(&id) {
            return self;
        }
        self.set_node(id, N::default())
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx].label)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.node_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.nodes[idx].label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn for_each_node_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut N),
    {
        for n in &mut self.nodes {
            f(&n.id, &mut n.label);
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.iter().map(|e| &e.key)
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges.iter().map(|e| e.key.clone()).collect()
    }

    pub fn set_edge(&mut self, v: impl Into<String>, w: impl Into<String>) -> &mut Self {
        self.set_edge_named(v, w, None::<String>, None)
    }

    pub fn set_edge_named(
        &mut self,
        v: impl Into<String>,
        w: impl Into<String>,
        name: Option<impl Into<String>>,
        label: Option<E>,
    ) -> &mut Self {
        let key = self.canonical_key(v.into(), w.into(), name.map(Into::into));
        self.ensure_node(key.v.clone());
        self.ensure_node(key.w.clone());

        if let Some(&idx) = self.edge_index.get(&key) {
            if let Some(label) = label {
                self.edges[idx].label = label;
            }
            return self;
        }

        self.invalidate_adj();
        let idx = self.edges.len();
        self.edges.push(EdgeEntry {
            key: key.clone(),
            label: label.unwrap_or_default(),
        });
        self.edge_index.insert(key, idx);
        self
    }

    pub fn set_path(&mut self, nodes: &[&str]) -> &mut Self {
        for pair in nodes.windows(2) {
            self.set_edge(pair[0], pair[1]);
        }
        self
    }

    fn index_of(&self, v: &str, w: &str, name: Option<&str>) -> Option<usize> {
        let key = self.canonical_key(v.to_string(), w.to_string(), name.map(str::to_string));
        self.edge_index.get(&key).copied()
    }

    pub fn has_edge(&self, v: &str, w: &str, name: Option<&str>) -> bool {
        self.index_of(v, w, name).is_some()
    }

    pub fn edge(&self, v: &str, w: &str, name: Option<&str>) -> Option<&E> {
        let idx = self.index_of(v, w, name)?;
        Some(&self.edges[idx].label)
    }

    pub fn edge_mut(&mut self, v: &str, w: &str, name: Option<&str>) -> Option<&mut E> {
        let idx = self.index_of(v, w, name)?;
        Some(&mut self.edges[idx].label)
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<&E> {
        self.edge(&key.v, &key.w, key.name.as_deref())
    }

    pub fn edge_mut_by_key(&mut self, key: &EdgeKey) -> Option<&mut E> {
        self.edge_mut(&key.v, &key.w, key.name.as_deref())
    }

    fn reindex_edges(&mut self) {
        self.edge_index.clear();
        for (i, e) in self.edges.iter().enumerate() {
            self.edge_index.insert(e.key.clone(), i);
        }
    }

    pub fn remove_edge_key(&mut self, key: &EdgeKey) -> bool {
        let Some(idx) = self.index_of(&key.v, &key.w, key.name.as_deref()) else {
            return false;
        };
        self.invalidate_adj();
        self.edges.remove(idx);
        self.reindex_edges();
        true
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(idx) = self.node_index.remove(id) else {
            return false;
        };
        self.invalidate_adj();
        self.nodes.remove(idx);
        for i in idx..self.nodes.len() {
            if let Some(slot) = self.node_index.get_mut(self.nodes[i].id.as_str()) {
                *slot = i;
            }
        }

        let before = self.edges.len();
        self.edges.retain(|e| e.key.v != id && e.key.w != id);
        if self.edges.len() != before {
            self.reindex_edges();
        }
        true
    }

    pub fn out_edges(&self, v: &str) -> Vec<EdgeKey> {
        let Some(&v_idx) = self.node_index.get(v) else {
            return Vec::new();
        };
        self.with_adj(|adj| {
            adj.out
                .get(v_idx)
                .map(|edges| edges.iter().map(|&i| self.edges[i].key.clone()).collect())
                .unwrap_or_default()
        })
    }

    pub fn in_edges(&self, v: &str) -> Vec<EdgeKey> {
        let Some(&v_idx) = self.node_index.get(v) else {
            return Vec::new();
        };
        self.with_adj(|adj| {
            adj.in_
                .get(v_idx)
                .map(|edges| edges.iter().map(|&i| self.edges[i].key.clone()).collect())
                .unwrap_or_default()
        })
    }

    /// Distinct successors in edge insertion order.
    pub fn successors(&self, v: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for e in self.out_edges(v) {
            if !out.contains(&e.w) {
                out.push(e.w);
            }
        }
        out
    }

    /// Distinct predecessors in edge insertion order.
    pub fn predecessors(&self, v: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for e in self.in_edges(v) {
            if !out.contains(&e.v) {
                out.push(e.v);
            }
        }
        out
    }

    pub fn sources(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| self.in_edges(id).iter().all(EdgeKey::is_self_loop))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_edge_creates_missing_endpoints() {
        let mut g: Graph<(), (), ()> = Graph::new(GraphOptions::default());
        g.set_edge("a", "b");
        assert_eq!(g.node_ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(g.has_edge("a", "b", None));
    }

    #[test]
    fn named_edges_are_distinct_in_a_multigraph() {
        let mut g: Graph<(), u32, ()> = Graph::new(GraphOptions::default());
        g.set_edge_named("a", "b", Some("x"), Some(1));
        g.set_edge_named("a", "b", Some("y"), Some(2));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edge("a", "b", Some("y")), Some(&2));
    }

    #[test]
    fn names_collapse_without_multigraph() {
        let mut g: Graph<(), u32, ()> = Graph::new(GraphOptions { multigraph: false });
        g.set_edge_named("a", "b", Some("x"), Some(1));
        g.set_edge_named("a", "b", Some("y"), Some(2));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge("a", "b", None), Some(&2));
    }
}
