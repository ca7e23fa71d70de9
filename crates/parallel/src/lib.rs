//! # SurtCat Parallel
//!
//! Parallel processing strategies for closure construction and
//! accumulation.
//!
//! Both workloads are embarrassingly parallel: closures of distinct start
//! nodes share only the immutable adjacency, and accumulated columns are
//! independent reductions.

pub mod strategy;

pub use strategy::{ParallelStrategy, ProcessingMode};
