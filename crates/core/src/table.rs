//! Catchment metric tables.
//!
//! A [`MetricTable`] holds one row per COMID and a set of named numeric
//! columns. Missing values are `f64::NAN`.

use crate::error::{Error, Result};
use crate::network::{ClosureScope, Comid};
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::{HashMap, HashSet};

/// Substring identifying the catchment area column.
pub const AREA_MARKER: &str = "AreaSqKm";
/// Substring identifying coverage-fraction columns.
pub const COVERAGE_MARKER: &str = "PctFull";

/// True for coverage-fraction ("PctFull") columns.
pub fn is_coverage_column(name: &str) -> bool {
    name.contains(COVERAGE_MARKER)
}

/// True for the catchment area column.
pub fn is_area_column(name: &str) -> bool {
    name.contains(AREA_MARKER)
}

/// Numeric table keyed by COMID.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    ids: Vec<Comid>,
    columns: Vec<String>,
    values: Array2<f64>,
    /// id -> row position, kept in step with `ids`.
    lookup: HashMap<Comid, usize>,
}

impl MetricTable {
    /// Creates a table, checking shapes and id uniqueness.
    pub fn new(ids: Vec<Comid>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != ids.len() || cols != columns.len() {
            return Err(Error::ShapeMismatch {
                ids: ids.len(),
                columns: columns.len(),
                rows,
                cols,
            });
        }
        let mut lookup = HashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            if lookup.insert(id, row).is_some() {
                return Err(Error::DuplicateComid(id));
            }
        }
        Ok(Self {
            ids,
            columns,
            values,
            lookup,
        })
    }

    /// Creates a table from row vectors.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<(Comid, Vec<f64>)>,
    ) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let ncols = columns.len();
        let mut ids = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * ncols);
        for (id, row) in rows {
            if row.len() != ncols {
                return Err(Error::ShapeMismatch {
                    ids: ids.len() + 1,
                    columns: ncols,
                    rows: ids.len() + 1,
                    cols: row.len(),
                });
            }
            ids.push(id);
            flat.extend(row);
        }
        let values = Array2::from_shape_vec((ids.len(), ncols), flat)
            .map_err(|e| Error::Other(e.to_string()))?;
        Self::new(ids, columns, values)
    }

    pub fn ids(&self) -> &[Comid] {
        &self.ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.ids.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of the area column.
    pub fn area_column(&self) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| is_area_column(c))
            .ok_or_else(|| Error::MissingColumn {
                column: AREA_MARKER.to_string(),
                table: "metric table".to_string(),
            })
    }

    pub fn position(&self, id: Comid) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    pub fn contains(&self, id: Comid) -> bool {
        self.position(id).is_some()
    }

    pub fn row(&self, id: Comid) -> Option<ArrayView1<'_, f64>> {
        self.position(id).map(|r| self.values.row(r))
    }

    /// Value at `(id, column)`.
    pub fn get(&self, id: Comid, column: &str) -> Option<f64> {
        let r = self.position(id)?;
        let c = self.column_index(column)?;
        Some(self.values[(r, c)])
    }

    /// Keeps the rows whose id is in `ids`, in `ids` order. Absent and repeated ids are skipped.
    pub fn select(&self, ids: &[Comid]) -> Self {
        let mut seen = HashSet::with_capacity(ids.len());
        let rows: Vec<usize> = ids
            .iter()
            .filter(|&&id| seen.insert(id))
            .filter_map(|&id| self.position(id))
            .collect();
        self.take_rows(&rows)
    }

    /// Removes the rows whose id is in `ids`.
    pub fn without(&self, ids: &HashSet<Comid>) -> Self {
        let rows: Vec<usize> = (0..self.nrows())
            .filter(|&r| !ids.contains(&self.ids[r]))
            .collect();
        self.take_rows(&rows)
    }

    /// Drops one row; returns false when the id was absent.
    pub fn remove(&mut self, id: Comid) -> bool {
        match self.position(id) {
            Some(_) => {
                let mut drop = HashSet::with_capacity(1);
                drop.insert(id);
                *self = self.without(&drop);
                true
            }
            None => false,
        }
    }

    /// Appends the rows of `other`; rows already present are replaced.
    pub fn merge(&self, other: &MetricTable) -> Result<Self> {
        if self.columns != other.columns {
            return Err(Error::ColumnMismatch {
                expected: self.columns.join(","),
                actual: other.columns.join(","),
            });
        }
        let incoming: HashSet<Comid> = other.ids.iter().copied().collect();
        let base = self.without(&incoming);

        let mut ids = base.ids;
        ids.extend_from_slice(&other.ids);
        let values = ndarray::concatenate(Axis(0), &[base.values.view(), other.values.view()])
            .map_err(|e| Error::Other(e.to_string()))?;
        Self::new(ids, self.columns.clone(), values)
    }

    /// Replaces the column names wholesale.
    pub fn with_columns(mut self, columns: Vec<String>) -> Result<Self> {
        if columns.len() != self.columns.len() {
            return Err(Error::ColumnMismatch {
                expected: self.columns.join(","),
                actual: columns.join(","),
            });
        }
        self.columns = columns;
        Ok(self)
    }

    /// Mutable access to one cell.
    pub fn value_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        &mut self.values[(row, col)]
    }

    /// Overwrites every column of a row with NaN.
    pub fn blank_row(&mut self, row: usize) {
        self.values.row_mut(row).fill(f64::NAN);
    }

    /// Rows at `rows`, which must not repeat.
    fn take_rows(&self, rows: &[usize]) -> Self {
        let ids: Vec<Comid> = rows.iter().map(|&r| self.ids[r]).collect();
        let lookup = ids.iter().enumerate().map(|(r, &id)| (id, r)).collect();
        Self {
            ids,
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
            lookup,
        }
    }
}

/// Result of accumulating a [`MetricTable`] over a closure index.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedTable {
    pub scope: ClosureScope,
    pub table: MetricTable,
}

impl AccumulatedTable {
    pub fn new(scope: ClosureScope, table: MetricTable) -> Self {
        Self { scope, table }
    }

    pub fn get(&self, id: Comid, column: &str) -> Option<f64> {
        self.table.get(id, column)
    }

    /// Re-labels the accumulated columns with the catchment-local names so the
    /// totals can be appended to another zone's metric table.
    pub fn as_catchment_table(&self, cat_columns: &[String]) -> Result<MetricTable> {
        self.table.clone().with_columns(cat_columns.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricTable {
        MetricTable::from_rows(
            ["CatAreaSqKm", "CatMetric", "CatPctFull"],
            vec![
                (1, vec![1.0, 10.0, 100.0]),
                (2, vec![2.0, 20.0, 50.0]),
                (3, vec![3.0, f64::NAN, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_and_roles() {
        let t = sample();
        assert_eq!(t.area_column().unwrap(), 0);
        assert_eq!(t.get(2, "CatMetric"), Some(20.0));
        assert!(t.get(3, "CatMetric").unwrap().is_nan());
        assert!(is_coverage_column("WsPctFull"));
        assert!(!is_coverage_column("CatMetric"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = MetricTable::from_rows(["CatAreaSqKm"], vec![(1, vec![1.0]), (1, vec![2.0])]);
        assert!(matches!(err, Err(Error::DuplicateComid(1))));
    }

    #[test]
    fn test_select_without_and_merge() {
        let t = sample();
        let sel = t.select(&[3, 1, 99]);
        assert_eq!(sel.ids(), &[3, 1]);

        let mut drop = HashSet::new();
        drop.insert(2);
        assert_eq!(t.without(&drop).ids(), &[1, 3]);

        let other =
            MetricTable::from_rows(["CatAreaSqKm", "CatMetric", "CatPctFull"], vec![(2, vec![9.0, 9.0, 9.0]), (4, vec![4.0, 4.0, 4.0])])
                .unwrap();
        let merged = t.merge(&other).unwrap();
        assert_eq!(merged.ids(), &[1, 3, 2, 4]);
        assert_eq!(merged.get(2, "CatAreaSqKm"), Some(9.0));
    }

    #[test]
    fn test_merge_requires_same_columns() {
        let t = sample();
        let other = MetricTable::from_rows(["CatAreaSqKm"], vec![(5, vec![1.0])]).unwrap();
        assert!(matches!(t.merge(&other), Err(Error::ColumnMismatch { .. })));
    }

    #[test]
    fn test_position_follows_reshaping() {
        let t = sample();
        assert_eq!(t.position(3), Some(2));
        assert_eq!(t.position(99), None);

        let sel = t.select(&[3, 1, 3]);
        assert_eq!(sel.ids(), &[3, 1]);
        assert_eq!(sel.position(3), Some(0));
        assert_eq!(sel.position(2), None);
        assert_eq!(sel.get(1, "CatMetric"), Some(10.0));

        let other =
            MetricTable::from_rows(["CatAreaSqKm", "CatMetric", "CatPctFull"], vec![(1, vec![7.0, 7.0, 7.0])]).unwrap();
        let merged = t.merge(&other).unwrap();
        assert_eq!(merged.position(2), Some(0));
        assert_eq!(merged.position(1), Some(2));
        assert_eq!(merged.get(1, "CatAreaSqKm"), Some(7.0));

        let mut removed = merged;
        removed.remove(2);
        assert_eq!(removed.position(3), Some(0));
        assert_eq!(removed.get(3, "CatAreaSqKm"), Some(3.0));
    }

    #[test]
    fn test_remove_row() {
        let mut t = sample();
        assert!(t.remove(2));
        assert!(!t.remove(2));
        assert_eq!(t.ids(), &[1, 3]);
    }
}
