//! Anchor reference graph
//!
//! Tracks which anchors reference which, rejects duplicates and dangling
//! references, and yields the order in which anchors must be resolved.
//! Uses petgraph for graph operations.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

use super::error::ResolveError;
use super::value::Expr;

/// An anchor as written in the recipe, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorDefinition {
    pub name: String,
    pub expr: Expr,
}

impl AnchorDefinition {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// A reference graph over anchor definitions
#[derive(Debug, Default)]
pub struct AnchorGraph {
    /// The underlying directed graph
    graph: DiGraph<String, ()>,

    /// Map from anchor name to node index
    node_map: HashMap<String, NodeIndex>,
}

impl AnchorGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from anchor definitions
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a AnchorDefinition>,
    ) -> Result<Self, ResolveError> {
        let mut graph = Self::new();

        // First pass: add all nodes
        let definitions: Vec<_> = definitions.into_iter().collect();
        for def in &definitions {
            graph.add_anchor(&def.name)?;
        }

        // Second pass: add all edges
        for def in &definitions {
            for target in def.expr.references() {
                graph.add_reference(&def.name, target)?;
            }
        }

        Ok(graph)
    }

    /// Adds an anchor to the graph
    pub fn add_anchor(&mut self, name: &str) -> Result<(), ResolveError> {
        if self.node_map.contains_key(name) {
            return Err(ResolveError::DuplicateAnchor(name.to_string()));
        }

        let idx = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        Ok(())
    }

    /// Records that anchor `from` references anchor `to`
    ///
    /// The edge direction is: to -> from
    /// This means "to must be resolved before from"
    pub fn add_reference(&mut self, from: &str, to: &str) -> Result<(), ResolveError> {
        let from_idx = *self
            .node_map
            .get(from)
            .ok_or_else(|| ResolveError::UnknownAnchor(from.to_string()))?;

        let to_idx = *self
            .node_map
            .get(to)
            .ok_or_else(|| ResolveError::UnresolvedReference {
                name: to.to_string(),
                path: format!("&{}", from),
            })?;

        self.graph.update_edge(to_idx, from_idx, ());
        Ok(())
    }

    /// Returns the anchors that `name` references directly
    pub fn references(&self, name: &str) -> Vec<String> {
        let idx = match self.node_map.get(name) {
            Some(idx) => *idx,
            None => return vec![],
        };

        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Returns all anchors in resolution order (referenced before referencing)
    pub fn resolution_order(&self) -> Result<Vec<String>, ResolveError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(ResolveError::CyclicReference(self.cycle_through(cycle.node_id()))),
        }
    }

    /// Finds the shortest reference chain leading from `start` back to itself
    fn cycle_through(&self, start: NodeIndex) -> Vec<String> {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut closing = None;

        'search: while let Some(idx) = queue.pop_front() {
            for next in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if next == start {
                    closing = Some(idx);
                    break 'search;
                }
                if seen.insert(next) {
                    parent.insert(next, idx);
                    queue.push_back(next);
                }
            }
        }

        let mut chain = vec![start];
        if let Some(mut idx) = closing {
            let mut tail = vec![idx];
            while let Some(&p) = parent.get(&idx) {
                if p == start {
                    break;
                }
                tail.push(p);
                idx = p;
            }
            tail.reverse();
            if tail != [start] {
                chain.extend(tail);
            }
        }
        chain.push(start);

        chain
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Returns true if the graph contains the anchor
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Returns the number of anchors in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}
