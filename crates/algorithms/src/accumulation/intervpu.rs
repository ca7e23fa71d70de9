//! Boundary corrections between zones
//!
//! A zone's catchments may receive flow from another zone. The upstream zone
//! publishes the accumulated values of its boundary COMIDs as a connector
//! table; the downstream zone appends those rows to its own catchment
//! table before accumulating, so the boundary COMID carries everything
//! above it.

use super::kind::ColumnPlan;
use std::collections::{BTreeMap, HashMap, HashSet};
use surtcat_core::io::ConnectorStore;
use surtcat_core::network::{Comid, InterVpuTable, ZoneId};
use surtcat_core::{Error, MetricTable, Result};
use tracing::{debug, info, warn};

/// Subtracts row `comid2` of `source` (or of `tbl` itself) from row
/// `comid1` of `tbl`, for every column except the coverage columns.
/// The area column is adjusted like any other sum.
pub fn adjust_comids(
    tbl: &mut MetricTable,
    comid1: Comid,
    comid2: Comid,
    source: Option<&MetricTable>,
) -> Result<()> {
    let columns = ColumnPlan::from_table(tbl)?.adjustable_columns();
    let subtrahend: Vec<f64> = {
        let src: &MetricTable = match source {
            Some(s) => s,
            None => &*tbl,
        };
        if src.columns() != tbl.columns() {
            return Err(Error::ColumnMismatch {
                expected: tbl.columns().join(","),
                actual: src.columns().join(","),
            });
        }
        src.row(comid2)
            .ok_or(Error::UnknownComid { comid: comid2 })?
            .to_vec()
    };
    let row = tbl
        .position(comid1)
        .ok_or(Error::UnknownComid { comid: comid1 })?;
    for col in columns {
        *tbl.value_mut(row, col) -= subtrahend[col];
    }
    Ok(())
}

/// Appends published connector rows to a zone's catchment table.
///
/// Every COMID present in a connector replaces the local row; only connector
/// rows that are boundary COMIDs of `zone` are kept.
pub fn append_connectors(
    cat: &MetricTable,
    connectors: &[MetricTable],
    zone: &str,
    intervpu: &InterVpuTable,
) -> Result<MetricTable> {
    let keep = intervpu.connector_ids_for(zone);
    let mut out = cat.clone();
    for connector in connectors {
        let present: HashSet<Comid> = connector.ids().iter().copied().collect();
        out = out.without(&present);

        let ids: Vec<Comid> = connector
            .ids()
            .iter()
            .copied()
            .filter(|id| keep.contains(id))
            .collect();
        out = out.merge(&connector.select(&ids))?;
        debug!("Zone {}: appended {} connector rows", zone, ids.len());
    }
    Ok(out)
}

/// Writes the connector tables `zone` owes its downstream zones.
///
/// `totals` is this zone's watershed result with catchment column names.
/// `catchments_of` loads another zone's catchment-local metric table and is
/// only called for zones named by a to-COMID row; the to-COMID rows of that
/// table, less the upstream totals, travel in the connector. Returns the
/// downstream zones written.
pub fn publish_connectors<F>(
    zone: &str,
    totals: &MetricTable,
    intervpu: &InterVpuTable,
    store: &ConnectorStore,
    mut catchments_of: F,
) -> Result<Vec<ZoneId>>
where
    F: FnMut(&str) -> Result<MetricTable>,
{
    let records: Vec<_> = intervpu.from_zone(zone).collect();
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let thru = intervpu.thru_comids();
    let thru_ids: Vec<Comid> = totals.ids().iter().copied().filter(|id| thru.contains(id)).collect();
    let mut through = totals.select(&thru_ids);

    // Catchment rows of other zones that this zone's boundary flow must be taken out of.
    let mut to_vpus: BTreeMap<ZoneId, MetricTable> = BTreeMap::new();
    let mut loaded: HashMap<ZoneId, MetricTable> = HashMap::new();

    for record in &records {
        if let Some(to_comid) = record.to_comid {
            if !loaded.contains_key(&record.to_zone) {
                let table = catchments_of(&record.to_zone)?;
                loaded.insert(record.to_zone.clone(), table);
            }
            if !to_vpus.contains_key(&record.to_zone) {
                let wanted: Vec<Comid> = records
                    .iter()
                    .filter(|r| r.to_zone == record.to_zone)
                    .filter_map(|r| r.to_comid)
                    .collect();
                if let Some(source) = loaded.get(&record.to_zone) {
                    to_vpus.insert(record.to_zone.clone(), source.select(&wanted));
                }
            }
            if let Some(table) = to_vpus.get_mut(&record.to_zone) {
                adjust_comids(table, to_comid, record.thru, Some(&through))?;
            }
        }
        if let Some(target) = record.subtract_target {
            adjust_comids(&mut through, target, record.thru, None)?;
        }
        if let Some(drop_id) = record.drop_comid {
            if !through.remove(drop_id) {
                warn!("Zone {}: drop COMID {} not in boundary set", zone, drop_id);
            }
        }
    }

    let mut downstream: Vec<ZoneId> = Vec::new();
    for record in &records {
        if !downstream.contains(&record.to_zone) {
            downstream.push(record.to_zone.clone());
        }
    }

    for to_zone in &downstream {
        let keep = intervpu.connector_ids_for(to_zone);
        let ids: Vec<Comid> = through.ids().iter().copied().filter(|id| keep.contains(id)).collect();
        let mut connector = through.select(&ids);
        if let Some(adjusted) = to_vpus.get(to_zone) {
            connector = connector.merge(adjusted)?;
        }
        if let Some(existing) = store.load(zone, to_zone)? {
            connector = existing.merge(&connector)?;
        }
        store.save(zone, to_zone, &connector)?;
        info!(
            "Zone {}: published {} connector rows for zone {}",
            zone,
            connector.nrows(),
            to_zone
        );
    }
    Ok(downstream)
}
