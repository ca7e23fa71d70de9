//! Upstream adjacency of a zone
//!
//! The flow table of a zone is a noisy edge list: coastline termini,
//! flowlines belonging to neighbouring zones and a handful of known
//! anomalies all show up as sources. [`FlowGraphBuilder`] filters those
//! and injects the manual cross-zone corrections, producing an immutable
//! [`FlowGraph`] mapping each COMID to its direct parents.

use std::collections::{HashMap, HashSet, VecDeque};
use surtcat_core::network::{is_valid_comid, Comid, FlowEdge, InterVpuTable};
use tracing::debug;

/// Child -> ordered direct parents. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowGraph {
    parents: HashMap<Comid, Vec<Comid>>,
}

impl FlowGraph {
    /// Builds a graph from raw `(from, to)` pairs without any zone filtering.
    ///
    /// `from == 0` marks `to` as a headwater; pairs with `to == 0` are ignored.
    pub fn from_pairs(pairs: &[(Comid, Comid)]) -> Self {
        let mut parents: HashMap<Comid, Vec<Comid>> = HashMap::new();
        for &(from, to) in pairs {
            if !is_valid_comid(to) {
                continue;
            }
            let entry = parents.entry(to).or_default();
            if is_valid_comid(from) {
                entry.push(from);
            }
        }
        Self { parents }
    }

    /// Direct parents of `id`; empty for headwaters and unknown ids.
    pub fn parents(&self, id: Comid) -> &[Comid] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `id` appears as a child in the graph.
    pub fn contains(&self, id: Comid) -> bool {
        self.parents.contains_key(&id)
    }

    /// Number of child entries.
    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    /// Number of parent links.
    pub fn edge_count(&self) -> usize {
        self.parents.values().map(Vec::len).sum()
    }

    /// COMIDs that cannot be topologically ordered: members of a cycle and
    /// everything downstream of one.
    ///
    /// Closures over such nodes still terminate (the traversal keeps a
    /// visited set) but may stop short of ancestors reachable only through
    /// the cycle. The result is sorted.
    pub fn cyclic_nodes(&self) -> Vec<Comid> {
        let mut pending: HashMap<Comid, usize> = HashMap::with_capacity(self.parents.len());
        let mut children: HashMap<Comid, Vec<Comid>> = HashMap::new();
        for (&child, parents) in &self.parents {
            pending.insert(child, parents.len());
            for &parent in parents {
                children.entry(parent).or_default().push(child);
                pending.entry(parent).or_insert(0);
            }
        }
        let mut queue: VecDeque<Comid> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&id, _)| id)
            .collect();
        while let Some(id) = queue.pop_front() {
            if let Some(kids) = children.get(&id) {
                for kid in kids {
                    if let Some(n) = pending.get_mut(kid) {
                        *n -= 1;
                        if *n == 0 {
                            queue.push_back(*kid);
                        }
                    }
                }
            }
        }

        let mut stuck: Vec<Comid> = pending
            .into_iter()
            .filter(|&(_, n)| n > 0)
            .map(|(id, _)| id)
            .collect();
        stuck.sort_unstable();
        stuck
    }
}

/// Builds the [`FlowGraph`] of one zone from its raw flow table.
///
/// Rules, applied per edge in this order:
/// 1. `to == 0` is dropped.
/// 2. `from == 0` marks `to` as a node without (further) parents.
/// 3. Sources that are coastline termini are dropped.
/// 4. Sources on the manual removal list are dropped, even when they are
///    whitelisted cross-zone sources.
/// 5. Sources outside the zone that are not whitelisted thru COMIDs are dropped.
///
/// Afterwards every correction row entering this zone with an inflow
/// target injects `thru` as a parent of that target.
#[derive(Debug, Clone, Default)]
pub struct FlowGraphBuilder {
    zone: String,
    members: HashSet<Comid>,
    coastline: HashSet<Comid>,
    removals: HashSet<Comid>,
    whitelist: HashSet<Comid>,
    injections: Vec<(Comid, Comid)>,
}

impl FlowGraphBuilder {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            ..Default::default()
        }
    }

    /// COMIDs belonging to the zone.
    pub fn members<I: IntoIterator<Item = Comid>>(mut self, ids: I) -> Self {
        self.members.extend(ids);
        self
    }

    /// Flowlines of type coastline.
    pub fn coastline<I: IntoIterator<Item = Comid>>(mut self, ids: I) -> Self {
        self.coastline.extend(ids);
        self
    }

    /// Manually removed sources. Zero ids are ignored.
    pub fn removals<I: IntoIterator<Item = Comid>>(mut self, ids: I) -> Self {
        self.removals.extend(ids.into_iter().filter(|&id| is_valid_comid(id)));
        self
    }

    /// Cross-zone whitelist and synthetic parent edges from the InterVPU table.
    pub fn corrections(mut self, table: &InterVpuTable) -> Self {
        self.whitelist.extend(table.thru_comids());
        let zone = self.zone.clone();
        for record in table.to_zone(&zone) {
            if let Some(target) = record.inflow_target {
                if is_valid_comid(record.thru) {
                    self.injections.push((target, record.thru));
                }
            }
        }
        self
    }

    pub fn build(&self, edges: &[FlowEdge]) -> FlowGraph {
        let mut parents: HashMap<Comid, Vec<Comid>> = HashMap::new();
        let mut dropped_coast = 0usize;
        let mut dropped_removed = 0usize;
        let mut dropped_foreign = 0usize;

        for edge in edges {
            if !is_valid_comid(edge.to) {
                continue;
            }
            if !is_valid_comid(edge.from) {
                parents.entry(edge.to).or_default();
                continue;
            }
            if self.coastline.contains(&edge.from) {
                dropped_coast += 1;
                continue;
            }
            if self.removals.contains(&edge.from) {
                dropped_removed += 1;
                continue;
            }
            if !self.members.contains(&edge.from) && !self.whitelist.contains(&edge.from) {
                dropped_foreign += 1;
                continue;
            }
            parents.entry(edge.to).or_default().push(edge.from);
        }

        for &(target, thru) in &self.injections {
            let entry = parents.entry(target).or_default();
            if !entry.contains(&thru) {
                entry.push(thru);
            }
        }

        let graph = FlowGraph { parents };
        debug!(
            "Zone {}: {} nodes, {} links ({} coastline, {} removed, {} foreign sources dropped, {} injected)",
            self.zone,
            graph.node_count(),
            graph.edge_count(),
            dropped_coast,
            dropped_removed,
            dropped_foreign,
            self.injections.len()
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surtcat_core::network::InterVpuRecord;

    fn edges(pairs: &[(Comid, Comid)]) -> Vec<FlowEdge> {
        pairs.iter().map(|&(f, t)| FlowEdge::new(f, t)).collect()
    }

    #[test]
    fn test_headwater_marker_and_zero_targets() {
        let graph = FlowGraphBuilder::new("01")
            .members([1, 2, 3])
            .build(&edges(&[(0, 1), (1, 3), (2, 3), (3, 0)]));

        assert!(graph.contains(1));
        assert!(graph.parents(1).is_empty());
        assert_eq!(graph.parents(3), &[1, 2]);
        assert!(!graph.contains(0));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_marker_does_not_clear_existing_parents() {
        let graph = FlowGraphBuilder::new("01")
            .members([1, 2])
            .build(&edges(&[(1, 2), (0, 2)]));
        assert_eq!(graph.parents(2), &[1]);
    }

    #[test]
    fn test_coastline_and_foreign_sources_dropped() {
        let graph = FlowGraphBuilder::new("01")
            .members([1, 2, 3, 9])
            .coastline([9])
            .build(&edges(&[(9, 3), (50, 3), (1, 3)]));
        assert_eq!(graph.parents(3), &[1]);
    }

    #[test]
    fn test_whitelisted_foreign_source_kept() {
        let table = InterVpuTable::new(vec![InterVpuRecord::new(50, "00", "01")]);
        let graph = FlowGraphBuilder::new("01")
            .members([1, 3])
            .corrections(&table)
            .build(&edges(&[(50, 3), (1, 3)]));
        assert_eq!(graph.parents(3), &[50, 1]);
    }

    #[test]
    fn test_removal_beats_whitelist_and_membership() {
        let table = InterVpuTable::new(vec![InterVpuRecord::new(50, "00", "01").with_removal(50)]);
        let graph = FlowGraphBuilder::new("01")
            .members([1, 3, 50])
            .corrections(&table)
            .removals(table.removals())
            .build(&edges(&[(50, 3), (1, 3)]));
        assert_eq!(graph.parents(3), &[1]);
    }

    #[test]
    fn test_inflow_injection_only_for_target_zone() {
        let table = InterVpuTable::new(vec![
            InterVpuRecord::new(70, "00", "01").with_inflow_target(3),
            InterVpuRecord::new(71, "00", "02").with_inflow_target(3),
        ]);
        let graph = FlowGraphBuilder::new("01")
            .members([3])
            .corrections(&table)
            .build(&[]);
        assert_eq!(graph.parents(3), &[70]);
    }

    #[test]
    fn test_cyclic_nodes() {
        // 1 -> 2 -> 3 -> 2 (cycle), 3 -> 4
        let graph = FlowGraph::from_pairs(&[(0, 1), (1, 2), (3, 2), (2, 3), (3, 4)]);
        assert_eq!(graph.cyclic_nodes(), vec![2, 3, 4]);

        let dag = FlowGraph::from_pairs(&[(1, 3), (2, 3), (3, 4)]);
        assert!(dag.cyclic_nodes().is_empty());
    }
}
