//! Readers for the hydrographic network tables

use super::csv_table::{find_column, parse_comid, parse_error, require_column};
use crate::error::Result;
use crate::network::{is_valid_comid, positive, Comid, FlowEdge, InterVpuRecord, InterVpuTable};
use std::collections::HashSet;
use std::path::Path;

/// Flowline type marking a coastline terminus.
const COASTLINE: &str = "Coastline";

/// Flowline attributes of a zone.
#[derive(Debug, Clone, Default)]
pub struct Flowlines {
    /// Every flowline COMID in the zone.
    pub members: HashSet<Comid>,
    /// Flowlines whose type is `Coastline`.
    pub coastline: HashSet<Comid>,
}

fn read_id(path: &Path, record: &csv::StringRecord, col: usize) -> Result<Comid> {
    parse_comid(&record[col])
        .ok_or_else(|| parse_error(path, record, format!("bad COMID '{}'", &record[col])))
}

/// Read a `FROMCOMID,TOCOMID` flow table.
pub fn read_flow_edges<P: AsRef<Path>>(path: P) -> Result<Vec<FlowEdge>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let from_col = require_column(&headers, &["FROMCOMID"], path)?;
    let to_col = require_column(&headers, &["TOCOMID"], path)?;

    let mut edges = Vec::new();
    for record in reader.records() {
        let record = record?;
        edges.push(FlowEdge::new(
            read_id(path, &record, from_col)?,
            read_id(path, &record, to_col)?,
        ));
    }
    Ok(edges)
}

/// Read a `COMID,FTYPE` flowline table.
pub fn read_flowlines<P: AsRef<Path>>(path: P) -> Result<Flowlines> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_col = require_column(&headers, &["COMID"], path)?;
    let type_col = require_column(&headers, &["FTYPE"], path)?;

    let mut flowlines = Flowlines::default();
    for record in reader.records() {
        let record = record?;
        let id = read_id(path, &record, id_col)?;
        if !is_valid_comid(id) {
            continue;
        }
        flowlines.members.insert(id);
        if record[type_col].trim().eq_ignore_ascii_case(COASTLINE) {
            flowlines.coastline.insert(id);
        }
    }
    Ok(flowlines)
}

/// Read the catchment ids of a zone (`FEATUREID` or `COMID` column).
/// Zero ids are skipped.
pub fn read_catchment_ids<P: AsRef<Path>>(path: P) -> Result<Vec<Comid>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_col = require_column(&headers, &["FEATUREID", "COMID"], path)?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = read_id(path, &record, id_col)?;
        if is_valid_comid(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Read the InterVPU correction table.
///
/// `thruCOMIDs`, `FromZone` and `ToZone` are required; the correction
/// columns (`AdjustCOMs`, `toCOMIDs`, `DropCOMID`, `UpCOMs`, `removeCOMs`)
/// default to zero when absent.
pub fn read_intervpu<P: AsRef<Path>>(path: P) -> Result<InterVpuTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let thru_col = require_column(&headers, &["thruCOMIDs", "thruCOMID"], path)?;
    let from_col = require_column(&headers, &["FromZone"], path)?;
    let to_zone_col = require_column(&headers, &["ToZone"], path)?;
    let adjust_col = find_column(&headers, &["AdjustCOMs", "AdjustCOM"]);
    let to_comid_col = find_column(&headers, &["toCOMIDs", "toCOMID"]);
    let drop_col = find_column(&headers, &["DropCOMID", "DropCOMIDs"]);
    let upcom_col = find_column(&headers, &["UpCOMs", "UpCOM"]);
    let removal_col = find_column(&headers, &["removeCOMs", "removeCOM"]);

    let optional = |record: &csv::StringRecord, col: Option<usize>| -> Result<Option<Comid>> {
        match col {
            Some(c) => Ok(positive(read_id(path, record, c)?)),
            None => Ok(None),
        }
    };

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(InterVpuRecord {
            thru: read_id(path, &record, thru_col)?,
            from_zone: record[from_col].trim().to_string(),
            to_zone: record[to_zone_col].trim().to_string(),
            subtract_target: optional(&record, adjust_col)?,
            to_comid: optional(&record, to_comid_col)?,
            drop_comid: optional(&record, drop_col)?,
            inflow_target: optional(&record, upcom_col)?,
            removal: optional(&record, removal_col)?,
        });
    }
    Ok(InterVpuTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_read_network_tables() {
        let dir = tempfile::tempdir().unwrap();
        let flow = write(dir.path(), "flow.csv", "FROMCOMID,TOCOMID\n0,1\n1,3\n2,3\n3,0\n");
        let lines = write(
            dir.path(),
            "lines.csv",
            "COMID,FTYPE\n1,StreamRiver\n2,Coastline\n3,StreamRiver\n0,StreamRiver\n",
        );
        let cats = write(dir.path(), "cats.csv", "FEATUREID,AREASQKM\n1,1.0\n0,0.0\n3,2.0\n");

        let edges = read_flow_edges(&flow).unwrap();
        assert_eq!(edges.len(), 4);
        assert!(edges[0].is_headwater_marker());

        let flowlines = read_flowlines(&lines).unwrap();
        assert_eq!(flowlines.members.len(), 3);
        assert!(flowlines.coastline.contains(&2));

        assert_eq!(read_catchment_ids(&cats).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_read_intervpu() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "intervpu.csv",
            "thruCOMIDs,FromZone,ToZone,AdjustCOMs,toCOMIDs,DropCOMID,UpCOMs,removeCOMs\n\
             100,10U,10L,0,0,0,200,0\n\
             101,10U,10L,100,0,0,0,555\n",
        );

        let table = read_intervpu(&path).unwrap();
        let rows = table.records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].inflow_target, Some(200));
        assert_eq!(rows[0].subtract_target, None);
        assert_eq!(rows[1].subtract_target, Some(100));
        assert_eq!(rows[1].removal, Some(555));
        assert_eq!(rows[1].to_zone, "10L");
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "flow.csv", "FROM,TO\n1,2\n");
        assert!(matches!(
            read_flow_edges(&path),
            Err(crate::Error::MissingColumn { .. })
        ));
    }
}
