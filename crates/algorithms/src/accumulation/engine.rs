//! Watershed accumulation
//!
//! Aggregates catchment-local ("Cat") values over the closures of a zone's
//! [`ClosureIndex`], producing "Ws" (inclusive) or "UpCat" (exclusive)
//! totals.

use super::kind::{AccumKind, ColumnPlan, Reduction};
use ndarray::Array2;
use surtcat_core::network::Comid;
use surtcat_core::{AccumulatedTable, Algorithm, ClosureIndex, Error, MetricTable, Result};
use surtcat_parallel::{ParallelStrategy, ProcessingMode};

/// Parameters for accumulation
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulationParams {
    /// Metric kind; `None` skips kind-specific column checks.
    pub kind: Option<AccumKind>,
    /// Column-level parallelism.
    pub mode: ProcessingMode,
}

/// Watershed accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct Accumulation;

impl Algorithm for Accumulation {
    type Input = (MetricTable, ClosureIndex);
    type Output = AccumulatedTable;
    type Params = AccumulationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Watershed Accumulation"
    }

    fn description(&self) -> &'static str {
        "Aggregate catchment metrics over upstream closures"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (table, index) = input;
        accumulate(&table, &index, params)
    }
}

/// Maps COMIDs to row positions of a table through a sorted copy of its ids.
///
/// Binary search over a sorted vector keeps memory flat even when the
/// upstream array runs to tens of millions of entries.
pub struct RowResolver {
    order: Vec<usize>,
    sorted: Vec<Comid>,
}

impl RowResolver {
    pub fn new(ids: &[Comid]) -> Self {
        let mut order: Vec<usize> = (0..ids.len()).collect();
        order.sort_unstable_by_key(|&i| ids[i]);
        let sorted = order.iter().map(|&i| ids[i]).collect();
        Self { order, sorted }
    }

    pub fn row(&self, id: Comid) -> Option<usize> {
        self.sorted.binary_search(&id).ok().map(|p| self.order[p])
    }

    /// Row positions for every id in `upstream`.
    pub fn resolve(&self, upstream: &[Comid]) -> Result<Vec<usize>> {
        upstream
            .iter()
            .map(|&comid| self.row(comid).ok_or(Error::UnknownComid { comid }))
            .collect()
    }
}

/// One output row: the query id and its span in the resolved row list.
struct Segment {
    id: Comid,
    start: usize,
    len: usize,
}

/// Accumulate `table` over the closures in `index`.
///
/// # Algorithm
/// 1. Resolve every upstream id to a table row (sort + binary search)
/// 2. Reduce each column over each closure: coverage ("PctFull") columns
///    by area-weighted mean, everything else by missing-safe sum
/// 3. Keep only index ids that have a row in `table`, rename columns with
///    the scope prefix, and blank every column of rows whose accumulated
///    area is zero
///
/// # Returns
/// AccumulatedTable with one row per kept id, in index order
pub fn accumulate(
    table: &MetricTable,
    index: &ClosureIndex,
    params: AccumulationParams,
) -> Result<AccumulatedTable> {
    index.validate()?;
    let plan = match params.kind {
        Some(kind) => ColumnPlan::resolve(kind, table)?,
        None => ColumnPlan::from_table(table)?,
    };

    let resolver = RowResolver::new(table.ids());
    let mut segments = Vec::with_capacity(index.len());
    let mut rows = Vec::with_capacity(index.flat_upstream.len());
    for (id, upstream) in index.iter() {
        // Ids without a row of their own only existed to route traversal.
        if resolver.row(id).is_none() {
            continue;
        }
        let start = rows.len();
        rows.extend(resolver.resolve(upstream)?);
        segments.push(Segment {
            id,
            start,
            len: upstream.len(),
        });
    }

    let values = table.values();
    let columns = params.mode.par_map(0..table.ncols(), |col| {
        segments
            .iter()
            .map(|seg| {
                let members = &rows[seg.start..seg.start + seg.len];
                reduce(values, col, plan.reductions[col], plan.area, members)
            })
            .collect::<Vec<f64>>()
    });

    let mut out = Array2::from_elem((segments.len(), table.ncols()), f64::NAN);
    for (col, reduced) in columns.into_iter().enumerate() {
        for (row, value) in reduced.into_iter().enumerate() {
            out[(row, col)] = value;
        }
    }

    let ids: Vec<Comid> = segments.iter().map(|s| s.id).collect();
    let names = table.columns().iter().map(|c| index.scope.rename(c)).collect();
    let mut result = MetricTable::new(ids, names, out)?;
    for row in 0..result.nrows() {
        if result.values()[(row, plan.area)] == 0.0 {
            result.blank_row(row);
        }
    }

    Ok(AccumulatedTable::new(index.scope, result))
}

fn reduce(values: &Array2<f64>, col: usize, reduction: Reduction, area: usize, members: &[usize]) -> f64 {
    match reduction {
        Reduction::Sum => members
            .iter()
            .map(|&r| values[(r, col)])
            .filter(|v| !v.is_nan())
            .fold(0.0, |acc, v| acc + v),
        Reduction::AreaWeighted => {
            let (mut num, mut den) = (0.0, 0.0);
            for &r in members {
                let weight = nan_to_zero(values[(r, area)]);
                num += nan_to_zero(values[(r, col)]) * weight;
                den += weight;
            }
            if den == 0.0 {
                f64::NAN
            } else {
                num / den
            }
        }
    }
}

#[inline]
fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}
