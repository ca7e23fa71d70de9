//! Ancestor closures
//!
//! Breadth-first traversal over the shared child -> parents adjacency. Each
//! query owns its visited set, so cycles in the source data cannot cause
//! non-termination; they only stop the walk at the first revisit.

use super::graph::FlowGraph;
use std::collections::{HashSet, VecDeque};
use surtcat_core::network::{is_valid_comid, ClosureScope, Comid};

/// Closure queries over one zone's [`FlowGraph`].
///
/// Optionally restricted to a universe of valid catchment ids, which drops
/// flowlines that have no catchment polygon.
#[derive(Debug, Clone, Copy)]
pub struct AncestorClosure<'a> {
    graph: &'a FlowGraph,
    universe: Option<&'a HashSet<Comid>>,
}

impl<'a> AncestorClosure<'a> {
    pub fn new(graph: &'a FlowGraph) -> Self {
        Self {
            graph,
            universe: None,
        }
    }

    pub fn with_universe(mut self, universe: &'a HashSet<Comid>) -> Self {
        self.universe = Some(universe);
        self
    }

    /// Every node reachable upstream of `start`, `start` first, in BFS
    /// discovery order. No universe filtering.
    pub fn traverse(&self, start: Comid) -> Vec<Comid> {
        if !is_valid_comid(start) {
            return Vec::new();
        }
        let mut visited: HashSet<Comid> = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for &parent in self.graph.parents(current) {
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    /// Closure including `start` (subject to the universe).
    pub fn inclusive(&self, start: Comid) -> Vec<Comid> {
        self.filter(self.traverse(start))
    }

    /// Closure excluding `start`.
    pub fn exclusive(&self, start: Comid) -> Vec<Comid> {
        let mut members = self.inclusive(start);
        if members.first() == Some(&start) {
            members.remove(0);
        }
        members
    }

    pub fn closure(&self, start: Comid, scope: ClosureScope) -> Vec<Comid> {
        match scope {
            ClosureScope::Inclusive => self.inclusive(start),
            ClosureScope::Exclusive => self.exclusive(start),
        }
    }

    /// Inclusive and exclusive closures from a single traversal.
    pub fn both(&self, start: Comid) -> (Vec<Comid>, Vec<Comid>) {
        let inclusive = self.inclusive(start);
        let exclusive = match inclusive.first() {
            Some(&first) if first == start => inclusive[1..].to_vec(),
            _ => inclusive.clone(),
        };
        (inclusive, exclusive)
    }

    fn filter(&self, nodes: Vec<Comid>) -> Vec<Comid> {
        match self.universe {
            Some(universe) => nodes.into_iter().filter(|id| universe.contains(id)).collect(),
            None => nodes,
        }
    }
}
