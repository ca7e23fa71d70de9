//! Two-zone run with a connector table across the zone boundary.
//!
//! Zone `U` holds catchments 1 -> 2; catchment 2 drains into catchment 10
//! of zone `D`, which drains to 11.

use std::fs;
use std::path::Path;
use surtcat_algorithms::accumulation::AccumKind;
use surtcat_algorithms::pipeline::{MetricSource, ZonePipeline};
use surtcat_core::io::{read_metric_table, ConnectorStore};
use surtcat_core::network::ClosureScope;
use surtcat_core::{Error, RunConfig};

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

/// Writes every input table and returns the loaded configuration.
fn setup(dir: &Path) -> RunConfig {
    write(dir, "flow_U.csv", "FROMCOMID,TOCOMID\n0,1\n1,2\n2,10\n");
    write(dir, "flowlines_U.csv", "COMID,FTYPE\n1,StreamRiver\n2,StreamRiver\n");
    write(dir, "catchments_U.csv", "FEATUREID,AREASQKM\n1,1.0\n2,2.0\n");

    write(dir, "flow_D.csv", "FROMCOMID,TOCOMID\n2,10\n10,11\n11,0\n");
    write(dir, "flowlines_D.csv", "COMID,FTYPE\n10,StreamRiver\n11,StreamRiver\n12,Coastline\n");
    write(dir, "catchments_D.csv", "FEATUREID,AREASQKM\n10,1.0\n11,1.0\n");

    write(
        dir,
        "intervpu.csv",
        "thruCOMIDs,FromZone,ToZone,AdjustCOMs,toCOMIDs,DropCOMID,UpCOMs,removeCOMs\n2,U,D,0,0,0,0,0\n",
    );

    fs::create_dir_all(dir.join("metrics")).unwrap();
    let header = "COMID,CatAreaSqKm,CatCount,CatSum,CatPctFull\n";
    write(
        &dir.join("metrics"),
        "elev_U.csv",
        &format!("{header}1,1.0,10,3.0,100\n2,2.0,20,5.0,50\n"),
    );
    write(
        &dir.join("metrics"),
        "elev_D.csv",
        &format!("{header}10,1.0,10,1.0,100\n11,1.0,10,1.0,\n"),
    );

    // Zones listed downstream first; the run must reorder them.
    write(
        dir,
        "surtcat.toml",
        r#"
index_dir = "index"
output_dir = "out"
connector_dir = "connectors"
intervpu = "intervpu.csv"
threads = 2

[[zones]]
name = "D"
flow_table = "flow_D.csv"
flowlines = "flowlines_D.csv"
catchments = "catchments_D.csv"

[[zones]]
name = "U"
flow_table = "flow_U.csv"
flowlines = "flowlines_U.csv"
catchments = "catchments_U.csv"
"#,
    );
    RunConfig::load(&dir.join("surtcat.toml")).unwrap()
}

#[test]
fn run_in_dependency_order_with_connectors() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let pipeline = ZonePipeline::new(&config).unwrap();
    let metric = MetricSource::new("elev", dir.path().join("metrics"), AccumKind::Continuous);

    assert_eq!(pipeline.order().unwrap().zones(), &["U".to_string(), "D".to_string()]);

    let outputs = pipeline.run(&metric).unwrap();
    assert_eq!(outputs[0].zone, "U");
    assert_eq!(outputs[0].published, vec!["D".to_string()]);

    let connector = ConnectorStore::new(&config.connector_dir, "elev").require("U", "D").unwrap();
    assert_eq!(connector.ids(), &[2]);
    assert_eq!(connector.get(2, "CatSum"), Some(8.0));

    let ws = read_metric_table(&outputs[1].ws).unwrap();
    assert_eq!(ws.get(11, "WsAreaSqKm"), Some(5.0));
    assert_eq!(ws.get(11, "WsSum"), Some(10.0));
    assert_eq!(ws.get(11, "WsCount"), Some(50.0));
    // 1 of 5 km2 without data, 3 km2 at two-thirds coverage
    let pct = ws.get(11, "WsPctFull").unwrap();
    assert!((pct - 60.0).abs() < 1e-9, "WsPctFull was {}", pct);

    let upcat = read_metric_table(&outputs[1].upcat).unwrap();
    assert_eq!(upcat.get(11, "UpCatAreaSqKm"), Some(4.0));
    assert_eq!(upcat.get(11, "UpCatSum"), Some(9.0));
}

#[test]
fn to_comid_row_moves_upstream_totals_out_of_downstream_catchment() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    // Catchment 11 of zone D already covers the area drained by 2; its
    // local values are reduced by the totals of 2 before D accumulates.
    write(
        dir.path(),
        "intervpu.csv",
        "thruCOMIDs,FromZone,ToZone,AdjustCOMs,toCOMIDs,DropCOMID,UpCOMs,removeCOMs\n2,U,D,0,11,0,0,0\n",
    );
    write(
        &dir.path().join("metrics"),
        "elev_D.csv",
        "COMID,CatAreaSqKm,CatCount,CatSum,CatPctFull\n10,1.0,10,1.0,100\n11,5.0,40,9.0,100\n",
    );
    let pipeline = ZonePipeline::new(&config).unwrap();
    let metric = MetricSource::new("elev", dir.path().join("metrics"), AccumKind::Continuous);

    assert_eq!(pipeline.order().unwrap().zones(), &["U".to_string(), "D".to_string()]);
    let outputs = pipeline.run(&metric).unwrap();
    assert_eq!(outputs[0].published, vec!["D".to_string()]);

    let connector = ConnectorStore::new(&config.connector_dir, "elev").require("U", "D").unwrap();
    assert_eq!(connector.ids(), &[2, 11]);
    assert_eq!(connector.get(11, "CatAreaSqKm"), Some(2.0));
    assert_eq!(connector.get(11, "CatSum"), Some(1.0));
    assert_eq!(connector.get(11, "CatPctFull"), Some(100.0));

    let ws = read_metric_table(&outputs[1].ws).unwrap();
    assert_eq!(ws.get(11, "WsAreaSqKm"), Some(6.0));
    assert_eq!(ws.get(11, "WsSum"), Some(10.0));
    assert_eq!(ws.get(11, "WsCount"), Some(50.0));
}

#[test]
fn indexes_are_built_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let pipeline = ZonePipeline::new(&config).unwrap();

    let first = pipeline.index_all().unwrap();
    assert_eq!(first.len(), 2);
    for zone in ["U", "D"] {
        for scope in ClosureScope::ALL {
            assert!(pipeline.store().has_index(zone, scope), "{} {} index missing", zone, scope);
        }
    }

    // Remove an input: a second pass must be served from the persisted index.
    fs::remove_file(dir.path().join("flow_D.csv")).unwrap();
    let second = pipeline.index_all().unwrap();
    assert_eq!(first, second);
}

#[test]
fn downstream_zone_without_connector_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let pipeline = ZonePipeline::new(&config).unwrap();
    let metric = MetricSource::new("elev", dir.path().join("metrics"), AccumKind::Continuous);

    let err = pipeline.accumulate_zone(&metric, "D").unwrap_err();
    assert!(matches!(err, Error::MissingArtifact { kind: "connector table", .. }), "{}", err);
}
