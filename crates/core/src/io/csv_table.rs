//! CSV encoding of [`MetricTable`]s

use crate::error::{Error, Result};
use crate::network::Comid;
use crate::table::MetricTable;
use csv::StringRecord;
use ndarray::Array2;
use std::path::Path;

/// Position of a header, compared case-insensitively.
pub(crate) fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Like [`find_column`] but missing headers are an error.
pub(crate) fn require_column(headers: &StringRecord, names: &[&str], path: &Path) -> Result<usize> {
    find_column(headers, names).ok_or_else(|| Error::MissingColumn {
        column: names[0].to_string(),
        table: path.display().to_string(),
    })
}

/// Parses an id cell. Float renderings such as `"1234.0"` are accepted.
pub(crate) fn parse_comid(cell: &str) -> Option<Comid> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0);
    }
    cell.parse::<Comid>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as Comid)
    })
}

/// Parses a value cell; blanks and NA spellings become NaN.
pub(crate) fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("null")
    {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

pub(crate) fn parse_error(path: &Path, record: &StringRecord, reason: String) -> Error {
    Error::Parse {
        source_name: path.display().to_string(),
        line: record.position().map(|p| p.line()).unwrap_or(0),
        reason,
    }
}

/// Read a metric table. The `COMID` column is the key, every other
/// column must be numeric.
pub fn read_metric_table<P: AsRef<Path>>(path: P) -> Result<MetricTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_col = require_column(&headers, &["COMID", "FEATUREID"], path)?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != id_col)
        .map(|(_, h)| h.trim().to_string())
        .collect();

    let mut ids = Vec::new();
    let mut flat = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = parse_comid(&record[id_col])
            .ok_or_else(|| parse_error(path, &record, format!("bad COMID '{}'", &record[id_col])))?;
        ids.push(id);
        for (i, cell) in record.iter().enumerate() {
            if i == id_col {
                continue;
            }
            let value = parse_value(cell)
                .ok_or_else(|| parse_error(path, &record, format!("bad number '{cell}'")))?;
            flat.push(value);
        }
    }

    let values = Array2::from_shape_vec((ids.len(), columns.len()), flat)
        .map_err(|e| Error::Other(e.to_string()))?;
    MetricTable::new(ids, columns, values)
}

/// Write a metric table with a leading `COMID` column. NaN is written as an
/// empty cell.
pub fn write_metric_table<P: AsRef<Path>>(table: &MetricTable, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(table.ncols() + 1);
    header.push("COMID".to_string());
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    let mut record = Vec::with_capacity(table.ncols() + 1);
    for (row, id) in table.ids().iter().enumerate() {
        record.clear();
        record.push(id.to_string());
        for &v in table.values().row(row) {
            record.push(if v.is_nan() { String::new() } else { v.to_string() });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
