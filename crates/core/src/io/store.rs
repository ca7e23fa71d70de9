//! Persisted artifacts: closure indexes, the catchment universe and
//! inter-zone connector tables.
//!
//! Nothing here checks for staleness. An artifact that exists is used as
//! is; removing the file is the only way to force a rebuild.

use super::csv_table::{read_metric_table, write_metric_table};
use crate::error::{Error, Result};
use crate::index::ClosureIndex;
use crate::network::{ClosureScope, Comid};
use crate::table::MetricTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Deserialize a bincode file.
pub fn load_binary<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Serialize a value to a bincode file, creating parent directories.
pub fn save_binary<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    Ok(())
}

/// Directory holding closure indexes (one file per zone and scope) and the
/// catchment universe.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self, zone: &str, scope: ClosureScope) -> PathBuf {
        let dir = match scope {
            ClosureScope::Inclusive => "ws",
            ClosureScope::Exclusive => "upcat",
        };
        self.root.join(dir).join(format!("{zone}.bin"))
    }

    pub fn universe_path(&self) -> PathBuf {
        self.root.join("universe.bin")
    }

    pub fn has_index(&self, zone: &str, scope: ClosureScope) -> bool {
        self.index_path(zone, scope).exists()
    }

    /// Load a persisted index, `None` when it has not been built yet.
    pub fn load_index(&self, zone: &str, scope: ClosureScope) -> Result<Option<ClosureIndex>> {
        let path = self.index_path(zone, scope);
        if !path.exists() {
            return Ok(None);
        }
        let index: ClosureIndex = load_binary(&path)?;
        if index.zone != zone || index.scope != scope {
            return Err(Error::InvalidIndex {
                zone: zone.to_string(),
                reason: format!(
                    "{} holds zone {} scope {}",
                    path.display(),
                    index.zone,
                    index.scope
                ),
            });
        }
        index.validate()?;
        Ok(Some(index))
    }

    /// Load an index that must already exist.
    pub fn require_index(&self, zone: &str, scope: ClosureScope) -> Result<ClosureIndex> {
        self.load_index(zone, scope)?
            .ok_or_else(|| Error::MissingArtifact {
                kind: "closure index",
                zone: zone.to_string(),
                path: self.index_path(zone, scope),
            })
    }

    pub fn save_index(&self, index: &ClosureIndex) -> Result<PathBuf> {
        let path = self.index_path(&index.zone, index.scope);
        save_binary(index, &path)?;
        Ok(path)
    }

    pub fn load_universe(&self) -> Result<Option<Vec<Comid>>> {
        let path = self.universe_path();
        if !path.exists() {
            return Ok(None);
        }
        load_binary(&path).map(Some)
    }

    pub fn save_universe(&self, ids: &[Comid]) -> Result<()> {
        save_binary(&ids, &self.universe_path())
    }
}

/// Connector tables for one metric, one CSV per `(from_zone, to_zone)` pair.
#[derive(Debug, Clone)]
pub struct ConnectorStore {
    root: PathBuf,
    metric: String,
}

impl ConnectorStore {
    pub fn new(root: impl Into<PathBuf>, metric: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            metric: metric.into(),
        }
    }

    pub fn path(&self, from_zone: &str, to_zone: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}_connector.csv", self.metric, from_zone, to_zone))
    }

    pub fn exists(&self, from_zone: &str, to_zone: &str) -> bool {
        self.path(from_zone, to_zone).exists()
    }

    pub fn load(&self, from_zone: &str, to_zone: &str) -> Result<Option<MetricTable>> {
        let path = self.path(from_zone, to_zone);
        if !path.exists() {
            return Ok(None);
        }
        read_metric_table(&path).map(Some)
    }

    /// Load a connector the consuming zone depends on. Absence means the
    /// producing zone has not run yet.
    pub fn require(&self, from_zone: &str, to_zone: &str) -> Result<MetricTable> {
        self.load(from_zone, to_zone)?
            .ok_or_else(|| Error::MissingArtifact {
                kind: "connector table",
                zone: to_zone.to_string(),
                path: self.path(from_zone, to_zone),
            })
    }

    pub fn save(&self, from_zone: &str, to_zone: &str, table: &MetricTable) -> Result<()> {
        write_metric_table(table, self.path(from_zone, to_zone))
    }
}
