//! Error types for SurtCat

use crate::network::Comid;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SurtCat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing column '{column}' in {table}")]
    MissingColumn { column: String, table: String },

    #[error("Table shape mismatch: {ids} ids, {columns} columns, values {rows}x{cols}")]
    ShapeMismatch {
        ids: usize,
        columns: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Column mismatch: expected [{expected}], got [{actual}]")]
    ColumnMismatch { expected: String, actual: String },

    #[error("Duplicate COMID {0} in table")]
    DuplicateComid(Comid),

    #[error("COMID {comid} referenced by the closure index has no row in the metric table")]
    UnknownComid { comid: Comid },

    #[error("Closure index for zone {zone} is inconsistent: {reason}")]
    InvalidIndex { zone: String, reason: String },

    #[error("Missing {kind} for zone {zone}: {}", .path.display())]
    MissingArtifact {
        kind: &'static str,
        zone: String,
        path: PathBuf,
    },

    #[error("Zone ordering contains a cycle through: {0}")]
    ZoneCycle(String),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Parse error in {source_name} line {line}: {reason}")]
    Parse {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for SurtCat operations
pub type Result<T> = std::result::Result<T, Error>;
