//! Class hierarchy graph.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: class hashes
//! - Edges: derived → base
//!
//! Registration only ever adds a class after its base, so the graph is a
//! forest rooted at the abstract root and cannot contain cycles.

use classbridge_core::TypeHash;
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

/// Inheritance graph of registered classes.
#[derive(Debug, Default)]
pub struct ClassHierarchy {
    graph: DiGraph<TypeHash, ()>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
}

impl ClassHierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class. Its base, if any, must already be present.
    ///
    /// Adding a class twice is a no-op.
    pub fn add_class(&mut self, class: TypeHash, base: Option<TypeHash>) {
        if self.nodes.contains_key(&class) {
            return;
        }
        let node = self.graph.add_node(class);
        self.nodes.insert(class, node);
        if let Some(base_node) = base.and_then(|base| self.nodes.get(&base).copied()) {
            self.graph.add_edge(node, base_node, ());
        }
    }

    /// Check if a class is present.
    pub fn contains(&self, class: TypeHash) -> bool {
        self.nodes.contains_key(&class)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if the hierarchy is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Immediate base of a class.
    pub fn base_of(&self, class: TypeHash) -> Option<TypeHash> {
        let node = *self.nodes.get(&class)?;
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .map(|base| self.graph[base])
    }

    /// Ancestors of a class, nearest first.
    pub fn ancestors(&self, class: TypeHash) -> Vec<TypeHash> {
        let mut ancestors = Vec::new();
        let mut current = self.base_of(class);
        while let Some(base) = current {
            ancestors.push(base);
            current = self.base_of(base);
        }
        ancestors
    }

    /// Direct subclasses of a class.
    pub fn subclasses(&self, class: TypeHash) -> Vec<TypeHash> {
        let Some(&node) = self.nodes.get(&class) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|derived| self.graph[derived])
            .collect()
    }

    /// All transitive subclasses of a class, breadth first.
    pub fn descendants(&self, class: TypeHash) -> Vec<TypeHash> {
        let mut descendants = Vec::new();
        let mut queue = self.subclasses(class);
        while !queue.is_empty() {
            let next: Vec<TypeHash> = queue.iter().flat_map(|c| self.subclasses(*c)).collect();
            descendants.append(&mut queue);
            queue = next;
        }
        descendants
    }

    /// Check if `derived` is `base` or inherits from it.
    pub fn is_subclass(&self, derived: TypeHash, base: TypeHash) -> bool {
        if derived == base {
            return self.contains(derived);
        }
        match (self.nodes.get(&derived), self.nodes.get(&base)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }
}
