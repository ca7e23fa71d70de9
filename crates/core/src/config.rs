//! Run configuration.
//!
//! Everything a run needs is passed in explicitly through [`RunConfig`];
//! nothing is read from process-wide state.

use crate::error::{Error, Result};
use crate::network::{Comid, ZoneId};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Input tables for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneConfig {
    pub name: ZoneId,
    /// `FROMCOMID,TOCOMID` flow table.
    pub flow_table: PathBuf,
    /// `COMID,FTYPE` flowline attributes.
    pub flowlines: PathBuf,
    /// `FEATUREID,AREASQKM` catchment attributes.
    pub catchments: PathBuf,
}

/// Top-level configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Directory for persisted closure indexes and the catchment universe.
    pub index_dir: PathBuf,
    /// Directory for accumulated tables.
    pub output_dir: PathBuf,
    /// Directory for inter-zone connector tables.
    pub connector_dir: PathBuf,
    /// InterVPU correction table.
    pub intervpu: PathBuf,
    /// Worker threads; `None` uses every core.
    #[serde(default)]
    pub threads: Option<usize>,
    /// COMIDs removed from the valid catchment universe.
    #[serde(default)]
    pub universe_exclusions: Vec<Comid>,
    pub zones: Vec<ZoneConfig>,
}

impl RunConfig {
    /// Parses a TOML document. Relative paths stay relative.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file; relative paths are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    pub fn zone(&self, name: &str) -> Result<&ZoneConfig> {
        self.zones
            .iter()
            .find(|z| z.name == name)
            .ok_or_else(|| Error::UnknownZone(name.to_string()))
    }

    pub fn zone_names(&self) -> Vec<ZoneId> {
        self.zones.iter().map(|z| z.name.clone()).collect()
    }

    fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(Error::InvalidParameter {
                name: "zones",
                value: "[]".to_string(),
                reason: "at least one zone is required".to_string(),
            });
        }
        if let Some(0) = self.threads {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        for (i, zone) in self.zones.iter().enumerate() {
            if self.zones[..i].iter().any(|z| z.name == zone.name) {
                return Err(Error::InvalidParameter {
                    name: "zones",
                    value: zone.name.clone(),
                    reason: "zone listed twice".to_string(),
                });
            }
        }
        Ok(())
    }

    fn resolve_relative(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.index_dir);
        fix(&mut self.output_dir);
        fix(&mut self.connector_dir);
        fix(&mut self.intervpu);
        for zone in &mut self.zones {
            fix(&mut zone.flow_table);
            fix(&mut zone.flowlines);
            fix(&mut zone.catchments);
        }
    }
}
