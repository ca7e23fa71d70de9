//! # SurtCat Core
//!
//! Core types, traits and I/O for SurtCat watershed accumulation.
//!
//! This crate provides:
//! - `Comid`, `FlowEdge`, `InterVpuTable`: drainage network primitives
//! - `MetricTable`: per-catchment numeric table keyed by COMID
//! - `ClosureIndex`: flattened upstream closures of a zone
//! - `RunConfig`: explicit run configuration
//! - I/O for CSV tables and persisted binary artifacts
//! - Algorithm traits for consistent API

pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod network;
pub mod table;

pub use config::{RunConfig, ZoneConfig};
pub use error::{Error, Result};
pub use index::ClosureIndex;
pub use network::{ClosureScope, Comid, FlowEdge, InterVpuRecord, InterVpuTable, ZoneId};
pub use table::{AccumulatedTable, MetricTable};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::index::ClosureIndex;
    pub use crate::network::{ClosureScope, Comid, FlowEdge, InterVpuRecord, InterVpuTable, ZoneId};
    pub use crate::table::{AccumulatedTable, MetricTable};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in SurtCat.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
