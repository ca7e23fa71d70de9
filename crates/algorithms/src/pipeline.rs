//! Zone-by-zone processing
//!
//! Ties the pieces together for a configured run: build (or load) each
//! zone's closure indexes, then accumulate a metric table family zone by
//! zone in dependency order, exchanging connector tables at the
//! boundaries.

use crate::accumulation::{accumulate, append_connectors, publish_connectors, AccumKind, AccumulationParams};
use crate::network::{build_zone_indexes, ClosureIndexCache, FlowGraph, FlowGraphBuilder, ZoneIndexes, ZoneOrder};
use std::collections::HashSet;
use std::path::PathBuf;
use surtcat_core::io::{
    read_catchment_ids, read_flow_edges, read_flowlines, read_intervpu, read_metric_table, write_metric_table,
    ConnectorStore, IndexStore,
};
use surtcat_core::network::{is_valid_comid, Comid, InterVpuTable, ZoneId};
use surtcat_core::{Error, MetricTable, Result, RunConfig};
use surtcat_parallel::ProcessingMode;
use tracing::{debug, info, warn};

/// A family of catchment metric tables, one CSV per zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSource {
    /// Metric name, used as file prefix (`{name}_{zone}.csv`).
    pub name: String,
    pub input_dir: PathBuf,
    pub kind: AccumKind,
}

impl MetricSource {
    pub fn new(name: impl Into<String>, input_dir: impl Into<PathBuf>, kind: AccumKind) -> Self {
        Self {
            name: name.into(),
            input_dir: input_dir.into(),
            kind,
        }
    }

    pub fn catchment_path(&self, zone: &str) -> PathBuf {
        self.input_dir.join(format!("{}_{}.csv", self.name, zone))
    }
}

/// Files written for one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneOutputs {
    pub zone: ZoneId,
    pub ws: PathBuf,
    pub upcat: PathBuf,
    pub totals: PathBuf,
    /// Downstream zones a connector was published for.
    pub published: Vec<ZoneId>,
}

/// Size of a zone's closure indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub zone: ZoneId,
    pub ids: usize,
    pub ws_entries: usize,
    pub upcat_entries: usize,
}

/// A configured run over all zones.
pub struct ZonePipeline<'a> {
    config: &'a RunConfig,
    intervpu: InterVpuTable,
    store: IndexStore,
    mode: ProcessingMode,
}

impl<'a> ZonePipeline<'a> {
    /// Reads the InterVPU table named by `config`.
    pub fn new(config: &'a RunConfig) -> Result<Self> {
        let intervpu = read_intervpu(&config.intervpu)?;
        Ok(Self::with_intervpu(config, intervpu))
    }

    pub fn with_intervpu(config: &'a RunConfig, intervpu: InterVpuTable) -> Self {
        Self {
            config,
            intervpu,
            store: IndexStore::new(&config.index_dir),
            mode: ProcessingMode::from_threads(config.threads),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn intervpu(&self) -> &InterVpuTable {
        &self.intervpu
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn order(&self) -> Result<ZoneOrder> {
        ZoneOrder::resolve(&self.config.zone_names(), &self.intervpu)
    }

    /// Valid catchment COMIDs across every configured zone, loaded from the
    /// index directory when already computed.
    pub fn universe(&self) -> Result<HashSet<Comid>> {
        if let Some(ids) = self.store.load_universe()? {
            return Ok(ids.into_iter().collect());
        }
        let exclusions: HashSet<Comid> = self.config.universe_exclusions.iter().copied().collect();
        let mut ids = Vec::new();
        for zone in &self.config.zones {
            ids.extend(
                read_catchment_ids(&zone.catchments)?
                    .into_iter()
                    .filter(|id| !exclusions.contains(id)),
            );
        }
        ids.sort_unstable();
        ids.dedup();
        self.store.save_universe(&ids)?;
        info!("Catchment universe: {} COMIDs", ids.len());
        Ok(ids.into_iter().collect())
    }

    /// The ids indexed for `zone`: its catchments plus the boundary COMIDs
    /// flowing into it.
    pub fn zone_query_ids(&self, zone: &str) -> Result<Vec<Comid>> {
        let config = self.config.zone(zone)?;
        let mut seen = HashSet::new();
        let ids = read_catchment_ids(&config.catchments)?
            .into_iter()
            .chain(self.intervpu.incoming_thru(zone))
            .filter(|&id| is_valid_comid(id) && seen.insert(id))
            .collect();
        Ok(ids)
    }

    pub fn build_graph(&self, zone: &str) -> Result<FlowGraph> {
        let config = self.config.zone(zone)?;
        let edges = read_flow_edges(&config.flow_table)?;
        let flowlines = read_flowlines(&config.flowlines)?;
        let catchments = read_catchment_ids(&config.catchments)?;

        let graph = FlowGraphBuilder::new(zone)
            .members(flowlines.members.iter().copied().chain(catchments))
            .coastline(flowlines.coastline.iter().copied())
            .removals(self.intervpu.removals())
            .corrections(&self.intervpu)
            .build(&edges);
        Ok(graph)
    }

    /// Loads the persisted indexes of `zone`, building them when absent.
    pub fn ensure_indexes(&self, zone: &str) -> Result<ZoneIndexes> {
        ClosureIndexCache::new(&self.store).get_or_build(zone, || {
            let universe = self.universe()?;
            let graph = self.build_graph(zone)?;
            let cyclic = graph.cyclic_nodes();
            if !cyclic.is_empty() {
                warn!(
                    "Zone {}: {} nodes on or below a flow cycle; closures through them stop at the first revisit",
                    zone,
                    cyclic.len()
                );
            }
            let ids = self.zone_query_ids(zone)?;
            Ok(build_zone_indexes(zone, &graph, &ids, Some(&universe), self.mode))
        })
    }

    /// Ensures indexes for every configured zone.
    pub fn index_all(&self) -> Result<Vec<IndexSummary>> {
        let mut summaries = Vec::with_capacity(self.config.zones.len());
        for zone in self.config.zone_names() {
            let indexes = self.ensure_indexes(&zone)?;
            summaries.push(IndexSummary {
                ids: indexes.inclusive.len(),
                ws_entries: indexes.inclusive.flat_upstream.len(),
                upcat_entries: indexes.exclusive.flat_upstream.len(),
                zone,
            });
        }
        Ok(summaries)
    }

    pub fn output_path(&self, metric: &str, zone: &str, suffix: &str) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{metric}_{zone}_{suffix}.csv"))
    }

    /// Catchment-local metric table of `zone`, as read from the inputs.
    pub fn load_catchments(&self, metric: &MetricSource, zone: &str) -> Result<MetricTable> {
        let path = metric.catchment_path(zone);
        if !path.exists() {
            return Err(Error::MissingArtifact {
                kind: "catchment table",
                zone: zone.to_string(),
                path,
            });
        }
        read_metric_table(&path)
    }

    /// Connector tables published for `zone`.
    ///
    /// Connectors from configured zones are required, since those zones run
    /// earlier; connectors from other zones are picked up when present.
    pub fn incoming_connectors(&self, connectors: &ConnectorStore, zone: &str) -> Result<Vec<MetricTable>> {
        let configured: HashSet<ZoneId> = self.config.zone_names().into_iter().collect();
        let mut sources: Vec<&str> = Vec::new();
        for record in self.intervpu.to_zone(zone) {
            if record.from_zone != zone && !sources.contains(&record.from_zone.as_str()) {
                sources.push(&record.from_zone);
            }
        }

        let mut tables = Vec::with_capacity(sources.len());
        for from in sources {
            if configured.contains(from) {
                tables.push(connectors.require(from, zone)?);
            } else if let Some(table) = connectors.load(from, zone)? {
                tables.push(table);
            } else {
                debug!("Zone {}: no connector from zone {}", zone, from);
            }
        }
        Ok(tables)
    }

    /// Accumulates one zone and publishes its connectors.
    pub fn accumulate_zone(&self, metric: &MetricSource, zone: &str) -> Result<ZoneOutputs> {
        let indexes = self.ensure_indexes(zone)?;
        let connectors = ConnectorStore::new(&self.config.connector_dir, &metric.name);

        let mut cat = self.load_catchments(metric, zone)?;
        let incoming = self.incoming_connectors(&connectors, zone)?;
        if !incoming.is_empty() {
            cat = append_connectors(&cat, &incoming, zone, &self.intervpu)?;
        }

        let params = AccumulationParams {
            kind: Some(metric.kind),
            mode: self.mode,
        };
        let ws = accumulate(&cat, &indexes.inclusive, params)?;
        let upcat = accumulate(&cat, &indexes.exclusive, params)?;
        let totals = ws.as_catchment_table(cat.columns())?;

        let outputs = ZoneOutputs {
            zone: zone.to_string(),
            ws: self.output_path(&metric.name, zone, "Ws"),
            upcat: self.output_path(&metric.name, zone, "UpCat"),
            totals: self.output_path(&metric.name, zone, "totals"),
            published: Vec::new(),
        };
        write_metric_table(&ws.table, &outputs.ws)?;
        write_metric_table(&upcat.table, &outputs.upcat)?;
        write_metric_table(&totals, &outputs.totals)?;

        let published = publish_connectors(zone, &totals, &self.intervpu, &connectors, |other| {
            self.load_catchments(metric, other)
        })?;
        info!("Zone {}: accumulated {} catchments of {}", zone, ws.table.nrows(), metric.name);
        Ok(ZoneOutputs { published, ..outputs })
    }

    /// Accumulates every zone in dependency order.
    pub fn run(&self, metric: &MetricSource) -> Result<Vec<ZoneOutputs>> {
        let order = self.order()?;
        info!("Zone order: {}", order.zones().join(" -> "));
        order
            .zones()
            .iter()
            .map(|zone| self.accumulate_zone(metric, zone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use surtcat_core::network::InterVpuRecord;
    use surtcat_core::ZoneConfig;

    fn zone_files(dir: &Path, zone: &str, catchments: &[Comid]) -> ZoneConfig {
        let flow = dir.join(format!("flow_{zone}.csv"));
        fs::write(&flow, "FROMCOMID,TOCOMID\n").unwrap();
        let flowlines = dir.join(format!("flowlines_{zone}.csv"));
        fs::write(&flowlines, "COMID,FTYPE\n").unwrap();
        let cat = dir.join(format!("catchments_{zone}.csv"));
        let mut text = String::from("FEATUREID,AREASQKM\n");
        for id in catchments {
            text.push_str(&format!("{id},1.0\n"));
        }
        fs::write(&cat, text).unwrap();
        ZoneConfig {
            name: zone.to_string(),
            flow_table: flow,
            flowlines,
            catchments: cat,
        }
    }

    fn config(dir: &Path, zones: Vec<ZoneConfig>) -> RunConfig {
        RunConfig {
            index_dir: dir.join("index"),
            output_dir: dir.join("out"),
            connector_dir: dir.join("connectors"),
            intervpu: dir.join("intervpu.csv"),
            threads: Some(1),
            universe_exclusions: vec![3],
            zones,
        }
    }

    #[test]
    fn test_universe_excludes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let zones = vec![zone_files(dir.path(), "A", &[1, 2, 3]), zone_files(dir.path(), "B", &[4, 2])];
        let config = config(dir.path(), zones);
        let pipeline = ZonePipeline::with_intervpu(&config, InterVpuTable::default());

        let universe = pipeline.universe().unwrap();
        let mut ids: Vec<_> = universe.into_iter().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 4]);
        assert!(pipeline.store().universe_path().exists());
    }

    #[test]
    fn test_zone_query_ids_include_incoming_thru() {
        let dir = tempfile::tempdir().unwrap();
        let zones = vec![zone_files(dir.path(), "A", &[1, 2]), zone_files(dir.path(), "B", &[5])];
        let config = config(dir.path(), zones);
        let intervpu = InterVpuTable::new(vec![
            InterVpuRecord::new(2, "A", "B"),
            InterVpuRecord::new(1, "A", "B").with_drop(1),
        ]);
        let pipeline = ZonePipeline::with_intervpu(&config, intervpu);

        assert_eq!(pipeline.zone_query_ids("B").unwrap(), vec![5, 2]);
        assert_eq!(pipeline.zone_query_ids("A").unwrap(), vec![1, 2]);
        assert!(matches!(pipeline.zone_query_ids("Z"), Err(Error::UnknownZone(_))));
    }

    #[test]
    fn test_load_catchments_reports_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let zones = vec![zone_files(dir.path(), "A", &[1])];
        let config = config(dir.path(), zones);
        let pipeline = ZonePipeline::with_intervpu(&config, InterVpuTable::default());
        let metric = MetricSource::new("elev", dir.path(), AccumKind::Continuous);

        assert!(matches!(
            pipeline.load_catchments(&metric, "A"),
            Err(Error::MissingArtifact { kind: "catchment table", .. })
        ));
        fs::write(metric.catchment_path("A"), "COMID,CatAreaSqKm\n1,2.5\n").unwrap();
        let cat = pipeline.load_catchments(&metric, "A").unwrap();
        assert_eq!(cat.get(1, "CatAreaSqKm"), Some(2.5));
    }

    #[test]
    fn test_to_comid_connector_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let zones = vec![zone_files(dir.path(), "A", &[1]), zone_files(dir.path(), "B", &[5])];
        let config = config(dir.path(), zones);
        let intervpu = InterVpuTable::new(vec![InterVpuRecord::new(1, "A", "B").with_to_comid(5)]);
        let pipeline = ZonePipeline::with_intervpu(&config, intervpu);
        let store = ConnectorStore::new(&config.connector_dir, "metric");

        assert!(matches!(
            pipeline.incoming_connectors(&store, "B"),
            Err(Error::MissingArtifact { kind: "connector table", .. })
        ));
    }

    #[test]
    fn test_missing_upstream_connector_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let zones = vec![zone_files(dir.path(), "A", &[1]), zone_files(dir.path(), "B", &[5])];
        let config = config(dir.path(), zones);
        let intervpu = InterVpuTable::new(vec![InterVpuRecord::new(1, "A", "B")]);
        let pipeline = ZonePipeline::with_intervpu(&config, intervpu);
        let store = ConnectorStore::new(&config.connector_dir, "metric");

        assert!(matches!(
            pipeline.incoming_connectors(&store, "B"),
            Err(Error::MissingArtifact { .. })
        ));
        assert!(pipeline.incoming_connectors(&store, "A").unwrap().is_empty());
    }
}
