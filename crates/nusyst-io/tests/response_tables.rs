use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use std::sync::Arc;

use arrow::array::{Array, AsArray, BooleanArray};
use arrow::datatypes::{Field, Float64Type, Int32Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use nusyst_core::{
    EventResponseSet, FourMomentum, InteractionEvent, ParameterHeader, ParameterId,
    ParameterRegistry, ParameterResponseWithCentral, Particle, ProcessFlags,
};
use nusyst_io::events::encode_events;
use nusyst_io::{
    EventSummary, IoError, ParquetEventSource, ResponseWriter, read_parquet_batches, write_events,
    write_metadata, write_parquet,
};

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("nusyst_io_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn events(n: usize) -> Vec<InteractionEvent> {
    (0..n)
        .map(|i| {
            let e = 0.5 + i as f64 * 0.25;
            InteractionEvent {
                probe: Some(Particle::new(14, FourMomentum::new(0.0, 0.0, e, e))),
                final_state_lepton: if i % 4 == 3 {
                    None
                } else {
                    Some(Particle::new(13, FourMomentum::new(0.2, 0.0, 0.5 * e, 0.6 * e)))
                },
                process: if i % 2 == 0 {
                    ProcessFlags::ccqe()
                } else {
                    ProcessFlags { weak_nc: true, ..ProcessFlags::default() }
                },
                target_pdg: 1000060120,
                hit_nucleon_pdg: (i % 3 == 0).then_some(2112),
                w: (i % 5 == 0).then_some(0.94),
            }
        })
        .collect()
}

fn registry() -> ParameterRegistry {
    let mut reg = ParameterRegistry::new();
    reg.register(ParameterHeader::new(ParameterId(0), "rpa", 0.0, vec![-1.0, 0.0, 1.0])).unwrap();
    reg.register(ParameterHeader::correction(ParameterId(1), "rpa_cv", 1.0)).unwrap();
    reg.register(ParameterHeader::new(ParameterId(2), "info", 0.0, vec![]).responseless())
        .unwrap();
    reg
}

#[test]
fn event_source_streams_in_file_order() {
    let path = tmp_path("events.parquet");
    let input = events(11);
    write_events(&path, &input).unwrap();

    let source = ParquetEventSource::open_with_batch_size(&path, 4).unwrap();
    assert_eq!(source.num_rows(), 11);
    let read: Vec<InteractionEvent> = source.collect::<Result<_, _>>().unwrap();
    assert_eq!(read, input);
    let _ = std::fs::remove_file(&path);
}

/// `n` CCQE events with `target_pdg = 100 + row` and a null `is_qe` at `null_row`.
fn write_events_with_null_flag(path: &std::path::Path, n: usize, null_row: usize) {
    let input: Vec<InteractionEvent> = events(n)
        .into_iter()
        .enumerate()
        .map(|(i, ev)| InteractionEvent { target_pdg: 100 + i as i32, ..ev })
        .collect();
    let batch = encode_events(&input).unwrap();
    let idx = batch.schema().index_of("is_qe").unwrap();
    let mut fields: Vec<Field> =
        batch.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[idx] = fields[idx].clone().with_nullable(true);
    let mut columns = batch.columns().to_vec();
    columns[idx] =
        Arc::new((0..n).map(|i| (i != null_row).then_some(true)).collect::<BooleanArray>());
    let bad = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();
    write_parquet(path, &[bad]).unwrap();
}

fn targets(items: &[Result<InteractionEvent, IoError>]) -> Vec<i32> {
    items.iter().filter_map(|r| r.as_ref().ok()).map(|ev| ev.target_pdg).collect()
}

#[test]
fn event_source_stops_after_undecodable_batch() {
    let path = tmp_path("null_flag.parquet");
    write_events_with_null_flag(&path, 6, 4);

    let items: Vec<_> = ParquetEventSource::open_with_batch_size(&path, 3).unwrap().collect();
    assert_eq!(items.len(), 4);
    assert_eq!(targets(&items), vec![100, 101, 102]);
    assert!(
        matches!(&items[3], Err(IoError::NullValue { col, row: 4 }) if col == "is_qe"),
        "{:?}",
        items[3]
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn event_source_range_never_decodes_skipped_rows() {
    let path = tmp_path("skip_null.parquet");
    write_events_with_null_flag(&path, 6, 0);

    let source = ParquetEventSource::open_range(&path, 1, None).unwrap();
    assert_eq!(source.num_rows(), 6);
    assert_eq!(source.first_row(), 1);
    let items: Vec<_> = source.collect();
    assert!(items.iter().all(Result::is_ok));
    assert_eq!(targets(&items), vec![101, 102, 103, 104, 105]);

    let items: Vec<_> = ParquetEventSource::open_range(&path, 2, Some(2)).unwrap().collect();
    assert_eq!(targets(&items), vec![102, 103]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn event_source_range_reports_file_row_of_bad_value() {
    let path = tmp_path("range_null.parquet");
    write_events_with_null_flag(&path, 6, 2);

    let items: Vec<_> = ParquetEventSource::open_range(&path, 1, None).unwrap().collect();
    assert_eq!(items.len(), 1);
    assert!(matches!(&items[0], Err(IoError::NullValue { row: 2, .. })), "{:?}", items[0]);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn write_parquet_rejects_empty_input() {
    assert!(write_parquet(&tmp_path("empty.parquet"), &[]).is_err());
}

#[test]
fn event_source_reports_missing_file() {
    let err = ParquetEventSource::open(&tmp_path("does_not_exist.parquet")).err().unwrap();
    assert!(matches!(err, IoError::Io(_)), "{err}");
}

#[test]
fn response_table_layout_and_neutral_fill() {
    let path = tmp_path("responses.parquet");
    let reg = registry();
    let mut writer = ResponseWriter::with_batch_size(&path, &reg, 2).unwrap();

    let names: Vec<String> = writer.schema().fields().iter().map(|f| f.name().clone()).collect();
    assert!(names.contains(&"rpa_responses".to_string()));
    assert!(names.contains(&"rpa_cv_cv_weight".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("info_")));

    let evs = events(5);
    for (i, ev) in evs.iter().enumerate() {
        let mut set = EventResponseSet::new();
        if ev.process.quasi_elastic {
            set.push(ParameterResponseWithCentral::new(ParameterId(0), vec![0.5, 1.0, 1.5], 1.0));
        }
        // rpa_cv never answers: neutral fill
        writer.write_event(&EventSummary::from_event(i as i64, ev), &set).unwrap();
    }
    assert_eq!(writer.n_rows(), 5);
    assert_eq!(writer.finish().unwrap(), 5);

    let batches = read_parquet_batches(&path).unwrap();
    let mut index: Vec<i64> = Vec::new();
    let mut rpa: Vec<Vec<f64>> = Vec::new();
    let mut corr: Vec<Vec<f64>> = Vec::new();
    let mut ntweaks: Vec<i32> = Vec::new();
    let mut q3: Vec<f64> = Vec::new();
    for b in &batches {
        let col = |name: &str| b.column_by_name(name).unwrap().clone();
        index.extend(col("event_index").as_primitive::<Int64Type>().values().iter());
        ntweaks.extend(col("rpa_ntweaks").as_primitive::<Int32Type>().values().iter());
        q3.extend(col("q3_gev").as_primitive::<Float64Type>().values().iter());
        let list = b.column_by_name("rpa_responses").unwrap().as_list::<i32>();
        for i in 0..list.len() {
            rpa.push(list.value(i).as_primitive::<Float64Type>().values().to_vec());
        }
        let list = b.column_by_name("rpa_cv_responses").unwrap().as_list::<i32>();
        for i in 0..list.len() {
            corr.push(list.value(i).as_primitive::<Float64Type>().values().to_vec());
        }
    }

    assert_eq!(index, vec![0, 1, 2, 3, 4]);
    assert_eq!(ntweaks, vec![3; 5]);
    assert_eq!(rpa[0], vec![0.5, 1.0, 1.5]);
    assert_eq!(rpa[1], vec![1.0, 1.0, 1.0]);
    assert_eq!(corr, vec![vec![1.0]; 5]);
    assert!(q3[3].is_nan());
    assert_relative_eq!(q3[0], (0.04f64 + 0.0625).sqrt(), epsilon = 1e-12);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn response_columns_follow_registry_not_set_order() {
    let path = tmp_path("order.parquet");
    let reg = registry();
    let mut writer = ResponseWriter::create(&path, &reg).unwrap();
    let mut set = EventResponseSet::new();
    set.push(ParameterResponseWithCentral::new(ParameterId(1), vec![0.8], 0.8));
    set.push(ParameterResponseWithCentral::new(ParameterId(0), vec![0.5, 1.0, 1.5], 1.0));
    // unknown parameters are ignored
    set.push(ParameterResponseWithCentral::new(ParameterId(9), vec![7.0], 7.0));
    writer.write_event(&EventSummary::from_event(0, &events(1)[0]), &set).unwrap();
    writer.finish().unwrap();

    let batches = read_parquet_batches(&path).unwrap();
    let b = &batches[0];
    let list = |name: &str| {
        let l = b.column_by_name(name).unwrap().as_list::<i32>();
        l.value(0).as_primitive::<Float64Type>().values().to_vec()
    };
    assert_eq!(list("rpa_responses"), vec![0.5, 1.0, 1.5]);
    assert_eq!(list("rpa_cv_responses"), vec![0.8]);
    let cv = b.column_by_name("rpa_cv_cv_weight").unwrap().as_primitive::<Float64Type>();
    assert_eq!(cv.value(0), 0.8);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn response_writer_rejects_wrong_cardinality() {
    let path = tmp_path("bad.parquet");
    let reg = registry();
    let mut writer = ResponseWriter::create(&path, &reg).unwrap();
    let mut set = EventResponseSet::new();
    set.push(ParameterResponseWithCentral::new(ParameterId(0), vec![1.0], 1.0));
    let err = writer.write_event(&EventSummary::from_event(0, &events(1)[0]), &set).unwrap_err();
    assert!(matches!(
        err,
        IoError::Core(nusyst_core::Error::ResponseCardinalityMismatch { expected: 3, actual: 1, .. })
    ));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn metadata_table_lists_every_parameter() {
    let path = tmp_path("meta.parquet");
    write_metadata(&path, &registry()).unwrap();
    let batches = read_parquet_batches(&path).unwrap();
    assert_eq!(batches.len(), 1);
    let b = &batches[0];
    let names = b.column_by_name("name").unwrap().as_string::<i32>();
    assert_eq!(
        (0..names.len()).map(|i| names.value(i)).collect::<Vec<_>>(),
        vec!["rpa", "rpa_cv", "info"]
    );
    let ntweaks = b.column_by_name("ntweaks").unwrap().as_primitive::<Int32Type>();
    assert_eq!(ntweaks.values().to_vec(), vec![3, 1, 0]);
    let values = b.column_by_name("tweak_values").unwrap().as_list::<i32>();
    assert_eq!(values.value(1).as_primitive::<Float64Type>().values().to_vec(), vec![1.0]);
    let _ = std::fs::remove_file(&path);
}
