//! Reading and writing SurtCat artifacts
//!
//! Tabular data travels as CSV (integer `COMID` key, double precision
//! values, empty cell = missing). Closure indexes and the catchment
//! universe are persisted as bincode blobs.

mod csv_table;
mod network_io;
mod store;

pub use csv_table::{read_metric_table, write_metric_table};
pub use network_io::{read_catchment_ids, read_flow_edges, read_flowlines, read_intervpu, Flowlines};
pub use store::{load_binary, save_binary, ConnectorStore, IndexStore};
