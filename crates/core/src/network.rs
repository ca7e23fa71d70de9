//! Drainage network primitives: catchment ids, flow edges and the
//! inter-zone (InterVPU) correction table.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Catchment / flowline identifier.
///
/// Zero and negative values are sentinels and never name a real node.
pub type Comid = i64;

/// Name of a processing zone (VPU), e.g. `"10U"` or `"17"`.
pub type ZoneId = String;

/// Returns true for ids that may appear in a node set.
#[inline]
pub fn is_valid_comid(id: Comid) -> bool {
    id > 0
}

/// A directed flow connection `from -> to`.
///
/// `from == 0` marks `to` as a headwater without an upstream parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: Comid,
    pub to: Comid,
}

impl FlowEdge {
    pub fn new(from: Comid, to: Comid) -> Self {
        Self { from, to }
    }

    /// True when the edge only marks `to` as a headwater.
    pub fn is_headwater_marker(&self) -> bool {
        self.from == 0
    }
}

/// One row of the InterVPU correction table.
///
/// Optional ids are stored as `None` when the source column holds zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterVpuRecord {
    /// Flowline that carries water across the zone boundary.
    pub thru: Comid,
    pub from_zone: ZoneId,
    pub to_zone: ZoneId,
    /// Through-set COMID that has `thru` subtracted from it.
    pub subtract_target: Option<Comid>,
    /// COMID in `to_zone` whose totals have `thru` subtracted from them.
    pub to_comid: Option<Comid>,
    /// COMID removed from the through set before publishing.
    pub drop_comid: Option<Comid>,
    /// COMID in `to_zone` that receives `thru` as a synthetic parent.
    pub inflow_target: Option<Comid>,
    /// Manually removed flow source.
    pub removal: Option<Comid>,
}

impl InterVpuRecord {
    /// Minimal record: `thru` flows from `from_zone` into `to_zone`.
    pub fn new(thru: Comid, from_zone: impl Into<ZoneId>, to_zone: impl Into<ZoneId>) -> Self {
        Self {
            thru,
            from_zone: from_zone.into(),
            to_zone: to_zone.into(),
            subtract_target: None,
            to_comid: None,
            drop_comid: None,
            inflow_target: None,
            removal: None,
        }
    }

    pub fn with_subtract_target(mut self, id: Comid) -> Self {
        self.subtract_target = positive(id);
        self
    }

    pub fn with_to_comid(mut self, id: Comid) -> Self {
        self.to_comid = positive(id);
        self
    }

    pub fn with_drop(mut self, id: Comid) -> Self {
        self.drop_comid = positive(id);
        self
    }

    pub fn with_inflow_target(mut self, id: Comid) -> Self {
        self.inflow_target = positive(id);
        self
    }

    pub fn with_removal(mut self, id: Comid) -> Self {
        self.removal = positive(id);
        self
    }
}

/// Maps the zero sentinel (and negatives) to `None`.
pub fn positive(id: Comid) -> Option<Comid> {
    is_valid_comid(id).then_some(id)
}

/// The full InterVPU correction table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterVpuTable {
    records: Vec<InterVpuRecord>,
}

impl InterVpuTable {
    pub fn new(records: Vec<InterVpuRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[InterVpuRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whitelisted cross-zone flow sources.
    pub fn thru_comids(&self) -> HashSet<Comid> {
        self.records
            .iter()
            .map(|r| r.thru)
            .filter(|&id| is_valid_comid(id))
            .collect()
    }

    /// Manually removed flow sources.
    pub fn removals(&self) -> HashSet<Comid> {
        self.records.iter().filter_map(|r| r.removal).collect()
    }

    /// Rows describing flow leaving `zone`.
    pub fn from_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a InterVpuRecord> + 'a {
        self.records.iter().filter(move |r| r.from_zone == zone)
    }

    /// Rows describing flow entering `zone`.
    pub fn to_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a InterVpuRecord> + 'a {
        self.records.iter().filter(move |r| r.to_zone == zone)
    }

    /// Thru COMIDs that must be indexed in `zone`: rows entering the zone
    /// that are not flagged for dropping.
    pub fn incoming_thru(&self, zone: &str) -> Vec<Comid> {
        let mut seen = HashSet::new();
        self.to_zone(zone)
            .filter(|r| r.drop_comid.is_none())
            .map(|r| r.thru)
            .filter(|&id| is_valid_comid(id) && seen.insert(id))
            .collect()
    }

    /// COMIDs a connector published for `zone` may carry.
    pub fn connector_ids_for(&self, zone: &str) -> HashSet<Comid> {
        self.to_zone(zone)
            .flat_map(|r| std::iter::once(r.thru).chain(r.to_comid))
            .filter(|&id| is_valid_comid(id))
            .collect()
    }
}

/// Aggregation scope of a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClosureScope {
    /// Includes the start catchment ("Ws").
    Inclusive,
    /// Excludes the start catchment ("UpCat").
    Exclusive,
}

impl ClosureScope {
    pub const ALL: [ClosureScope; 2] = [ClosureScope::Inclusive, ClosureScope::Exclusive];

    /// Column prefix used for accumulated tables.
    pub fn prefix(self) -> &'static str {
        match self {
            ClosureScope::Inclusive => "Ws",
            ClosureScope::Exclusive => "UpCat",
        }
    }

    /// Renames a catchment-local ("Cat") column for this scope.
    ///
    /// `CatAreaSqKm` becomes `WsAreaSqKm` or `UpCatAreaSqKm`; names without
    /// the `Cat` prefix get the scope prefix prepended.
    pub fn rename(self, column: &str) -> String {
        match (self, column.strip_prefix("Cat")) {
            (ClosureScope::Inclusive, Some(rest)) => format!("Ws{rest}"),
            (ClosureScope::Exclusive, Some(rest)) => format!("UpCat{rest}"),
            (scope, None) => format!("{}{column}", scope.prefix()),
        }
    }
}

impl std::fmt::Display for ClosureScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_not_valid() {
        assert!(!is_valid_comid(0));
        assert!(!is_valid_comid(-7));
        assert!(is_valid_comid(1));
        assert_eq!(positive(0), None);
        assert_eq!(positive(42), Some(42));
    }

    #[test]
    fn test_scope_rename() {
        assert_eq!(ClosureScope::Inclusive.rename("CatAreaSqKm"), "WsAreaSqKm");
        assert_eq!(ClosureScope::Exclusive.rename("CatPctFull"), "UpCatPctFull");
        assert_eq!(ClosureScope::Inclusive.rename("Metric"), "WsMetric");
    }

    #[test]
    fn test_intervpu_queries() {
        let table = InterVpuTable::new(vec![
            InterVpuRecord::new(10, "A", "B").with_inflow_target(20),
            InterVpuRecord::new(11, "A", "B").with_drop(11),
            InterVpuRecord::new(12, "C", "B").with_to_comid(30).with_removal(99),
        ]);

        assert_eq!(table.incoming_thru("B"), vec![10, 12]);
        assert_eq!(table.from_zone("A").count(), 2);
        assert!(table.removals().contains(&99));

        let ids = table.connector_ids_for("B");
        assert!(ids.contains(&10) && ids.contains(&11) && ids.contains(&30));
        assert!(!ids.contains(&20));
    }
}
