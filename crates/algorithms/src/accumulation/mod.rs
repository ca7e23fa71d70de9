//! Watershed accumulation
//!
//! - Kind: column roles and reductions for categorical, continuous and count metrics
//! - Engine: Ws / UpCat aggregation over a closure index
//! - InterVPU: connector tables and boundary subtraction between zones

mod engine;
mod intervpu;
mod kind;

pub use engine::{accumulate, Accumulation, AccumulationParams, RowResolver};
pub use intervpu::{adjust_comids, append_connectors, publish_connectors};
pub use kind::{AccumKind, ColumnPlan, Reduction};
