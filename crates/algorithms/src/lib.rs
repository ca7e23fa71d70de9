//! # SurtCat Algorithms
//!
//! Upstream accumulation over a drainage network partitioned into zones.
//!
//! ## Modules
//!
//! - **network**: flow graph construction, ancestor closures, closure indexes, zone order
//! - **accumulation**: Ws / UpCat aggregation and inter-zone boundary corrections
//! - **pipeline**: configured runs over every zone

pub mod accumulation;
pub mod network;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accumulation::{
        accumulate, adjust_comids, append_connectors, publish_connectors,
        AccumKind, Accumulation, AccumulationParams, ColumnPlan,
    };
    pub use crate::network::{
        build_closure_index, build_zone_indexes, AncestorClosure, ClosureIndexCache,
        FlowGraph, FlowGraphBuilder, ZoneIndexes, ZoneOrder,
    };
    pub use crate::pipeline::{MetricSource, ZoneOutputs, ZonePipeline};
    pub use surtcat_core::prelude::*;
    pub use surtcat_parallel::ProcessingMode;
}
