//! Drainage network algorithms
//!
//! - Flow graph: child -> parents adjacency built from a noisy flow table
//! - Ancestor closure: BFS over the adjacency, inclusive or exclusive
//! - Closure index: flattened closures, persisted per zone
//! - Zone order: processing order implied by inter-zone connectors

mod closure;
mod graph;
mod index;
mod order;

pub use closure::AncestorClosure;
pub use graph::{FlowGraph, FlowGraphBuilder};
pub use index::{build_closure_index, build_zone_indexes, ClosureIndexCache, ZoneIndexes};
pub use order::{zone_dependencies, ZoneOrder};
