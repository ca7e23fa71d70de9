//! Closure index construction and caching
//!
//! Computing closures is the expensive phase of a run. The closures of a
//! zone are flattened into a [`ClosureIndex`] once and persisted, so any
//! number of metric tables can be accumulated against them afterwards.

use super::closure::AncestorClosure;
use super::graph::FlowGraph;
use std::collections::HashSet;
use surtcat_core::io::IndexStore;
use surtcat_core::network::{ClosureScope, Comid};
use surtcat_core::{ClosureIndex, Result};
use surtcat_parallel::{ParallelStrategy, ProcessingMode};
use tracing::{debug, info};

/// Inclusive (Ws) and exclusive (UpCat) indexes of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneIndexes {
    pub inclusive: ClosureIndex,
    pub exclusive: ClosureIndex,
}

impl ZoneIndexes {
    pub fn get(&self, scope: ClosureScope) -> &ClosureIndex {
        match scope {
            ClosureScope::Inclusive => &self.inclusive,
            ClosureScope::Exclusive => &self.exclusive,
        }
    }
}

/// Builds the index of a single scope for `ids`, in `ids` order.
pub fn build_closure_index(
    zone: &str,
    scope: ClosureScope,
    graph: &FlowGraph,
    ids: &[Comid],
    universe: Option<&HashSet<Comid>>,
    mode: ProcessingMode,
) -> ClosureIndex {
    let closure = closure_for(graph, universe);
    let closures = mode.par_map_slice(ids, |&id| closure.closure(id, scope));
    ClosureIndex::from_closures(zone, scope, ids.iter().copied().zip(closures))
}

/// Builds both scopes from one traversal per id.
pub fn build_zone_indexes(
    zone: &str,
    graph: &FlowGraph,
    ids: &[Comid],
    universe: Option<&HashSet<Comid>>,
    mode: ProcessingMode,
) -> ZoneIndexes {
    let closure = closure_for(graph, universe);
    let pairs = mode.par_map_slice(ids, |&id| closure.both(id));

    let mut inclusive = Vec::with_capacity(ids.len());
    let mut exclusive = Vec::with_capacity(ids.len());
    for (&id, (inc, exc)) in ids.iter().zip(pairs) {
        inclusive.push((id, inc));
        exclusive.push((id, exc));
    }

    let indexes = ZoneIndexes {
        inclusive: ClosureIndex::from_closures(zone, ClosureScope::Inclusive, inclusive),
        exclusive: ClosureIndex::from_closures(zone, ClosureScope::Exclusive, exclusive),
    };
    debug!(
        "Zone {}: {} ids, {} upstream entries (Ws), {} (UpCat)",
        zone,
        ids.len(),
        indexes.inclusive.flat_upstream.len(),
        indexes.exclusive.flat_upstream.len()
    );
    indexes
}

fn closure_for<'a>(graph: &'a FlowGraph, universe: Option<&'a HashSet<Comid>>) -> AncestorClosure<'a> {
    let closure = AncestorClosure::new(graph);
    match universe {
        Some(u) => closure.with_universe(u),
        None => closure,
    }
}

/// Persisted closure indexes. Rebuilds only when an index file is absent.
#[derive(Debug, Clone, Copy)]
pub struct ClosureIndexCache<'a> {
    store: &'a IndexStore,
}

impl<'a> ClosureIndexCache<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self { store }
    }

    /// Both indexes of `zone`, or `None` if either is missing.
    pub fn load(&self, zone: &str) -> Result<Option<ZoneIndexes>> {
        let inclusive = self.store.load_index(zone, ClosureScope::Inclusive)?;
        let exclusive = self.store.load_index(zone, ClosureScope::Exclusive)?;
        Ok(match (inclusive, exclusive) {
            (Some(inclusive), Some(exclusive)) => Some(ZoneIndexes {
                inclusive,
                exclusive,
            }),
            _ => None,
        })
    }

    /// Loads the persisted indexes of `zone` or builds and persists them.
    pub fn get_or_build<F>(&self, zone: &str, build: F) -> Result<ZoneIndexes>
    where
        F: FnOnce() -> Result<ZoneIndexes>,
    {
        if let Some(indexes) = self.load(zone)? {
            info!("Zone {}: using cached closure index", zone);
            return Ok(indexes);
        }
        info!("Zone {}: building closure index", zone);
        let indexes = build()?;
        self.store.save_index(&indexes.inclusive)?;
        self.store.save_index(&indexes.exclusive)?;
        Ok(indexes)
    }
}
