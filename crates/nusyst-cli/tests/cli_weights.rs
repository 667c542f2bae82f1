use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use arrow::array::{Array, AsArray, BooleanArray};
use arrow::datatypes::{Field, Float64Type, Int32Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use nusyst_core::{FourMomentum, InteractionEvent, Particle, ProcessFlags};
use nusyst_hist::{Axis, Histogram3D, HistogramFile};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nusyst"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("nusyst_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("NUSYST_DATA_ROOT")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {}: {e}", bin_path().display()))
}

fn flat(name: &str, e: (f64, f64), value: f64) -> Histogram3D {
    Histogram3D::filled(
        name,
        Axis::uniform(4, e.0, e.1).unwrap(),
        Axis::uniform(6, 0.0, 3.0).unwrap(),
        Axis::uniform(6, 0.0, 3.0).unwrap(),
        value,
    )
}

const TARGET_BASE: i32 = 1000060120;

/// Writes grids, events and a config into `dir`; returns the config path.
/// Event `i` has `target_pdg = TARGET_BASE + i`.
fn setup(dir: &Path, n_events: usize) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let mut doc = HistogramFile::default();
    doc.insert(&flat("low_with", (0.0, 1.5), 2.0));
    doc.insert(&flat("low_without", (0.0, 1.5), 3.0));
    doc.insert(&flat("high_with", (1.5, 20.0), 1.0));
    doc.insert(&flat("high_without", (1.5, 20.0), 1.0));
    doc.write(dir.join("grids.json")).unwrap();

    let events: Vec<InteractionEvent> = (0..n_events)
        .map(|i| InteractionEvent {
            probe: Some(Particle::new(14, FourMomentum::new(0.0, 0.0, 1.0, 1.0))),
            final_state_lepton: Some(Particle::new(13, FourMomentum::new(0.2, 0.0, 0.6, 0.7))),
            process: if i % 3 == 2 {
                ProcessFlags { weak_nc: true, ..ProcessFlags::default() }
            } else {
                ProcessFlags::ccqe()
            },
            target_pdg: TARGET_BASE + i as i32,
            ..InteractionEvent::default()
        })
        .collect();
    nusyst_io::write_events(&dir.join("events.parquet"), &events).unwrap();

    let cfg = r#"
providers:
  - tool: CCQERPAReweight
    parameter:
      name: rpa
      variations: [-1, 0, 1, 2]
    input_manifest:
      energy_boundary: 1.5
      binning_mode: PCTheta
      input_file: grids.json
      inputs:
        - { name: LowE_WithRPA, input_hist: low_with }
        - { name: LowE_WithoutRPA, input_hist: low_without }
        - { name: HighE_WithRPA, input_hist: high_with }
        - { name: HighE_WithoutRPA, input_hist: high_without }
"#;
    let path = dir.join("systematics.yaml");
    std::fs::write(&path, cfg).unwrap();
    path
}

#[test]
fn weights_writes_response_and_metadata_tables() {
    let dir = tmp_path("weights");
    let cfg = setup(&dir, 6);
    let out = dir.join("out.parquet");
    let meta = dir.join("meta.parquet");

    let output = run(&[
        "weights",
        "-c",
        cfg.to_str().unwrap(),
        "-i",
        dir.join("events.parquet").to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--metadata",
        meta.to_str().unwrap(),
        "--data-root",
        dir.to_str().unwrap(),
        "-s",
        "1",
        "-N",
        "4",
    ]);
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));

    let batches = nusyst_io::read_parquet_batches(&out).unwrap();
    let mut index: Vec<i64> = Vec::new();
    let mut targets: Vec<i32> = Vec::new();
    let mut responses: Vec<Vec<f64>> = Vec::new();
    for b in &batches {
        let idx = b.column_by_name("event_index").unwrap().as_primitive::<Int64Type>();
        index.extend(idx.values().iter());
        let tgt = b.column_by_name("target_pdg").unwrap().as_primitive::<Int32Type>();
        targets.extend(tgt.values().iter());
        let list = b.column_by_name("rpa_responses").unwrap().as_list::<i32>();
        for i in 0..list.len() {
            responses.push(list.value(i).as_primitive::<Float64Type>().values().to_vec());
        }
    }
    assert_eq!(index, vec![1, 2, 3, 4]);
    let expected: Vec<i32> = index.iter().map(|&i| TARGET_BASE + i as i32).collect();
    assert_eq!(targets, expected);
    // w(t) = 1 + t/2 for CCQE, neutral for event 2 (NC)
    for (w, expected) in responses[0].iter().zip([0.5, 1.0, 1.5, 2.0]) {
        assert_relative_eq!(*w, expected, epsilon = 1e-12);
    }
    assert_eq!(responses[1], vec![1.0; 4]);

    let meta = nusyst_io::read_parquet_batches(&meta).unwrap();
    assert_eq!(meta[0].num_rows(), 1);
}

/// Replace the `is_qe` column of the events file with one null at `null_row`.
fn corrupt_qe_flag(dir: &Path, null_row: usize) {
    let path = dir.join("events.parquet");
    let batches = nusyst_io::read_parquet_batches(&path).unwrap();
    let batch = arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap();
    let idx = batch.schema().index_of("is_qe").unwrap();
    let mut fields: Vec<Field> =
        batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[idx] = fields[idx].clone().with_nullable(true);
    let mut columns = batch.columns().to_vec();
    let qe = columns[idx].as_boolean().clone();
    columns[idx] = Arc::new(
        (0..qe.len()).map(|i| (i != null_row).then(|| qe.value(i))).collect::<BooleanArray>(),
    );
    let bad = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();
    nusyst_io::write_parquet(&path, &[bad]).unwrap();
}

fn weights_args(dir: &Path, cfg: &Path, out: &Path, skip: &str) -> Vec<String> {
    [
        "weights",
        "-c",
        cfg.to_str().unwrap(),
        "-i",
        dir.join("events.parquet").to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--data-root",
        dir.to_str().unwrap(),
        "-s",
        skip,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn weights_fails_on_undecodable_event() {
    let dir = tmp_path("bad_row");
    let cfg = setup(&dir, 6);
    corrupt_qe_flag(&dir, 3);
    let out = dir.join("out.parquet");
    let args = weights_args(&dir, &cfg, &out, "1");
    let output = run(&args.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("row 3") && stderr.contains("is_qe"), "stderr={stderr}");
}

#[test]
fn weights_skipped_bad_rows_keep_indices_aligned() {
    let dir = tmp_path("skip_bad_row");
    let cfg = setup(&dir, 6);
    corrupt_qe_flag(&dir, 0);
    let out = dir.join("out.parquet");
    let args = weights_args(&dir, &cfg, &out, "1");
    let output = run(&args.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));

    let batches = nusyst_io::read_parquet_batches(&out).unwrap();
    let mut index: Vec<i64> = Vec::new();
    let mut targets: Vec<i32> = Vec::new();
    for b in &batches {
        index.extend(
            b.column_by_name("event_index").unwrap().as_primitive::<Int64Type>().values().iter(),
        );
        targets.extend(
            b.column_by_name("target_pdg").unwrap().as_primitive::<Int32Type>().values().iter(),
        );
    }
    assert_eq!(index, vec![1, 2, 3, 4, 5]);
    assert_eq!(targets, (1..6).map(|i| TARGET_BASE + i).collect::<Vec<_>>());
}

#[test]
fn weights_rejects_skip_past_end() {
    let dir = tmp_path("skip");
    let cfg = setup(&dir, 3);
    let output = run(&[
        "weights",
        "-c",
        cfg.to_str().unwrap(),
        "-i",
        dir.join("events.parquet").to_str().unwrap(),
        "-o",
        dir.join("out.parquet").to_str().unwrap(),
        "--data-root",
        dir.to_str().unwrap(),
        "-s",
        "3",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot skip"));
}

#[test]
fn weights_without_data_root_fails() {
    let dir = tmp_path("no_root");
    let cfg = setup(&dir, 2);
    let output = run(&[
        "weights",
        "-c",
        cfg.to_str().unwrap(),
        "-i",
        dir.join("events.parquet").to_str().unwrap(),
        "-o",
        dir.join("out.parquet").to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("data root"));
}

#[test]
fn params_prints_registry() {
    let dir = tmp_path("params");
    let cfg = setup(&dir, 1);
    let output = run(&["params", "-c", cfg.to_str().unwrap()]);
    assert!(output.status.success(), "stderr={}", String::from_utf8_lossy(&output.stderr));

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let params = v["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["name"], "rpa");
    assert_eq!(params[0]["variations"].as_array().unwrap().len(), 4);
}
