//! Zone processing order
//!
//! Zones exchange boundary values through connector tables, so they form a
//! partial order: a zone publishing a connector runs before the zone that
//! consumes it. To-COMID rows read the downstream zone's catchment-local
//! inputs only, so they order the same way.

use std::collections::{BTreeSet, HashSet};
use surtcat_core::network::{InterVpuTable, ZoneId};
use surtcat_core::{Error, Result};

/// `(before, after)` pairs among the configured zones.
pub fn zone_dependencies(zones: &[ZoneId], table: &InterVpuTable) -> Vec<(ZoneId, ZoneId)> {
    let known: HashSet<&str> = zones.iter().map(String::as_str).collect();
    let mut deps = BTreeSet::new();
    for record in table.records() {
        let (from, to) = (record.from_zone.as_str(), record.to_zone.as_str());
        if from == to || !known.contains(from) || !known.contains(to) {
            continue;
        }
        deps.insert((from.to_string(), to.to_string()));
    }
    deps.into_iter().collect()
}

/// Topological order of zones. Ties keep the configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneOrder {
    order: Vec<ZoneId>,
}

impl ZoneOrder {
    pub fn resolve(zones: &[ZoneId], table: &InterVpuTable) -> Result<Self> {
        let deps = zone_dependencies(zones, table);
        let mut remaining: Vec<ZoneId> = zones.to_vec();
        let mut order = Vec::with_capacity(zones.len());

        while !remaining.is_empty() {
            let ready = remaining.iter().position(|zone| {
                !deps
                    .iter()
                    .any(|(before, after)| after == zone && remaining.contains(before))
            });
            match ready {
                Some(pos) => order.push(remaining.remove(pos)),
                None => return Err(Error::ZoneCycle(remaining.join(", "))),
            }
        }
        Ok(Self { order })
    }

    pub fn zones(&self) -> &[ZoneId] {
        &self.order
    }

    pub fn position(&self, zone: &str) -> Option<usize> {
        self.order.iter().position(|z| z == zone)
    }
}
