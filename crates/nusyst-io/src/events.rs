//! Interaction event tables.
//!
//! One row per event. Columns:
//!
//! | column | type | |
//! |---|---|---|
//! | `nu_pdg`, `nu_px`, `nu_py`, `nu_pz`, `nu_e` | Int32 / Float64 | probe; null ⇒ absent |
//! | `lep_pdg`, `lep_px`, `lep_py`, `lep_pz`, `lep_e` | Int32 / Float64 | final-state lepton; null ⇒ absent |
//! | `is_qe`, `is_cc`, `is_nc`, `is_mec`, `is_res`, `is_dis` | Boolean | process flags |
//! | `target_pdg` | Int32 | target nucleus |
//! | `hit_nucleon_pdg` | Int32, nullable | struck nucleon |
//! | `w_gev` | Float64, nullable | hadronic invariant mass |

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, BooleanBuilder, Float64Builder, Int32Builder,
    PrimitiveArray,
};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Field, Float64Type, Int32Type, Schema, SchemaRef,
};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use nusyst_core::{FourMomentum, InteractionEvent, Particle, ProcessFlags};

use crate::tables::{open_file, write_parquet};
use crate::{IoError, Result};

const FLAG_COLUMNS: [&str; 6] = ["is_qe", "is_cc", "is_nc", "is_mec", "is_res", "is_dis"];

/// Arrow schema of an event table.
pub fn event_schema() -> SchemaRef {
    let mut fields = Vec::with_capacity(21);
    for prefix in ["nu", "lep"] {
        fields.push(Field::new(format!("{prefix}_pdg"), DataType::Int32, true));
        for c in ["px", "py", "pz", "e"] {
            fields.push(Field::new(format!("{prefix}_{c}"), DataType::Float64, true));
        }
    }
    for flag in FLAG_COLUMNS {
        fields.push(Field::new(flag, DataType::Boolean, false));
    }
    fields.push(Field::new("target_pdg", DataType::Int32, false));
    fields.push(Field::new("hit_nucleon_pdg", DataType::Int32, true));
    fields.push(Field::new("w_gev", DataType::Float64, true));
    Arc::new(Schema::new(fields))
}

fn primitive<'a, T: ArrowPrimitiveType>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &str,
) -> Result<&'a PrimitiveArray<T>> {
    let col = batch.column_by_name(name).ok_or_else(|| IoError::MissingColumn(name.into()))?;
    col.as_primitive_opt::<T>().ok_or_else(|| IoError::WrongType {
        col: name.into(),
        expected: expected.into(),
        actual: format!("{:?}", col.data_type()),
    })
}

fn boolean<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray> {
    let col = batch.column_by_name(name).ok_or_else(|| IoError::MissingColumn(name.into()))?;
    col.as_boolean_opt().ok_or_else(|| IoError::WrongType {
        col: name.into(),
        expected: "Boolean".into(),
        actual: format!("{:?}", col.data_type()),
    })
}

fn opt<T: ArrowPrimitiveType>(arr: &PrimitiveArray<T>, i: usize) -> Option<T::Native> {
    if arr.is_null(i) { None } else { Some(arr.value(i)) }
}

/// Typed views over the particle columns with a common prefix.
struct ParticleColumns<'a> {
    pdg: &'a PrimitiveArray<Int32Type>,
    p4: [&'a PrimitiveArray<Float64Type>; 4],
}

impl<'a> ParticleColumns<'a> {
    fn new(batch: &'a RecordBatch, prefix: &str) -> Result<Self> {
        let f = |c: &str| primitive::<Float64Type>(batch, &format!("{prefix}_{c}"), "Float64");
        Ok(Self {
            pdg: primitive::<Int32Type>(batch, &format!("{prefix}_pdg"), "Int32")?,
            p4: [f("px")?, f("py")?, f("pz")?, f("e")?],
        })
    }

    fn get(&self, i: usize) -> Option<Particle> {
        let pdg = opt(self.pdg, i)?;
        let [px, py, pz, e] = [
            opt(self.p4[0], i)?,
            opt(self.p4[1], i)?,
            opt(self.p4[2], i)?,
            opt(self.p4[3], i)?,
        ];
        Some(Particle::new(pdg, FourMomentum::new(px, py, pz, e)))
    }
}

/// Decode every row of an event batch. `first_row` numbers rows in errors.
pub fn decode_events(batch: &RecordBatch, first_row: usize) -> Result<Vec<InteractionEvent>> {
    let nu = ParticleColumns::new(batch, "nu")?;
    let lep = ParticleColumns::new(batch, "lep")?;
    let flags = [
        boolean(batch, FLAG_COLUMNS[0])?,
        boolean(batch, FLAG_COLUMNS[1])?,
        boolean(batch, FLAG_COLUMNS[2])?,
        boolean(batch, FLAG_COLUMNS[3])?,
        boolean(batch, FLAG_COLUMNS[4])?,
        boolean(batch, FLAG_COLUMNS[5])?,
    ];
    let target = primitive::<Int32Type>(batch, "target_pdg", "Int32")?;
    let hit_nucleon = primitive::<Int32Type>(batch, "hit_nucleon_pdg", "Int32")?;
    let w = primitive::<Float64Type>(batch, "w_gev", "Float64")?;

    let mut events = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let mut f = [false; 6];
        for (k, arr) in flags.iter().enumerate() {
            if arr.is_null(i) {
                return Err(IoError::NullValue { col: FLAG_COLUMNS[k].into(), row: first_row + i });
            }
            f[k] = arr.value(i);
        }
        let target_pdg = opt(target, i)
            .ok_or_else(|| IoError::NullValue { col: "target_pdg".into(), row: first_row + i })?;

        events.push(InteractionEvent {
            probe: nu.get(i),
            final_state_lepton: lep.get(i),
            process: ProcessFlags {
                quasi_elastic: f[0],
                weak_cc: f[1],
                weak_nc: f[2],
                mec: f[3],
                resonant: f[4],
                deep_inelastic: f[5],
            },
            target_pdg,
            hit_nucleon_pdg: opt(hit_nucleon, i),
            w: opt(w, i),
        });
    }
    Ok(events)
}

/// Encode events into one batch with [`event_schema`].
pub fn encode_events(events: &[InteractionEvent]) -> Result<RecordBatch> {
    let n = events.len();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(21);

    let particles: [fn(&InteractionEvent) -> Option<Particle>; 2] =
        [|e| e.probe, |e| e.final_state_lepton];
    for particle in particles {
        let mut pdg = Int32Builder::with_capacity(n);
        let mut p4: [Float64Builder; 4] = std::array::from_fn(|_| Float64Builder::with_capacity(n));
        for ev in events {
            let p = particle(ev);
            pdg.append_option(p.map(|p| p.pdg));
            p4[0].append_option(p.map(|p| p.p4.px));
            p4[1].append_option(p.map(|p| p.p4.py));
            p4[2].append_option(p.map(|p| p.p4.pz));
            p4[3].append_option(p.map(|p| p.p4.e));
        }
        columns.push(Arc::new(pdg.finish()));
        for mut b in p4 {
            columns.push(Arc::new(b.finish()));
        }
    }

    let flag_of: [fn(&ProcessFlags) -> bool; 6] = [
        |f| f.quasi_elastic,
        |f| f.weak_cc,
        |f| f.weak_nc,
        |f| f.mec,
        |f| f.resonant,
        |f| f.deep_inelastic,
    ];
    for get in flag_of {
        let mut b = BooleanBuilder::with_capacity(n);
        for ev in events {
            b.append_value(get(&ev.process));
        }
        columns.push(Arc::new(b.finish()));
    }

    let mut target = Int32Builder::with_capacity(n);
    let mut hit = Int32Builder::with_capacity(n);
    let mut w = Float64Builder::with_capacity(n);
    for ev in events {
        target.append_value(ev.target_pdg);
        hit.append_option(ev.hit_nucleon_pdg);
        w.append_option(ev.w);
    }
    columns.push(Arc::new(target.finish()));
    columns.push(Arc::new(hit.finish()));
    columns.push(Arc::new(w.finish()));

    Ok(RecordBatch::try_new(event_schema(), columns)?)
}

/// Write events to a Parquet file.
pub fn write_events(path: &Path, events: &[InteractionEvent]) -> Result<()> {
    write_parquet(path, &[encode_events(events)?])?;
    log::debug!("wrote {} events to {}", events.len(), path.display());
    Ok(())
}

/// Streaming reader over an event table, in file order.
///
/// Rows before the requested start are never decoded. The stream ends after
/// the first error: a batch that fails to decode is reported once and no
/// later row is yielded, so every `Ok` item sits at
/// [`first_row`](Self::first_row) plus its position in the stream.
pub struct ParquetEventSource {
    reader: ParquetRecordBatchReader,
    pending: std::vec::IntoIter<InteractionEvent>,
    num_rows: usize,
    first_row: usize,
    rows_decoded: usize,
    failed: bool,
}

impl ParquetEventSource {
    /// Default number of rows decoded per batch.
    pub const DEFAULT_BATCH_SIZE: usize = 8192;

    /// Open an event table.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_batch_size(path, Self::DEFAULT_BATCH_SIZE)
    }

    /// Open an event table, decoding `batch_size` rows at a time.
    pub fn open_with_batch_size(path: &Path, batch_size: usize) -> Result<Self> {
        Self::open_rows(path, 0, None, batch_size)
    }

    /// Open an event table for the rows `skip..skip + limit` (to the end when
    /// `limit` is `None`). Skipped rows are dropped by the Parquet reader.
    pub fn open_range(path: &Path, skip: usize, limit: Option<usize>) -> Result<Self> {
        Self::open_rows(path, skip, limit, Self::DEFAULT_BATCH_SIZE)
    }

    fn open_rows(
        path: &Path,
        skip: usize,
        limit: Option<usize>,
        batch_size: usize,
    ) -> Result<Self> {
        let mut builder = ParquetRecordBatchReaderBuilder::try_new(open_file(path)?)?
            .with_batch_size(batch_size.max(1));
        let num_rows = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
        if skip > 0 {
            builder = builder.with_offset(skip);
        }
        if let Some(limit) = limit {
            builder = builder.with_limit(limit);
        }
        let reader = builder.build()?;
        log::debug!("opened {} ({num_rows} events, starting at row {skip})", path.display());
        Ok(Self {
            reader,
            pending: Vec::new().into_iter(),
            num_rows,
            first_row: skip,
            rows_decoded: skip,
            failed: false,
        })
    }

    /// Total number of events in the file.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// File row of the first event the stream yields.
    pub fn first_row(&self) -> usize {
        self.first_row
    }
}

impl Iterator for ParquetEventSource {
    type Item = Result<InteractionEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ev) = self.pending.next() {
                return Some(Ok(ev));
            }
            if self.failed {
                return None;
            }
            let decoded = match self.reader.next()? {
                Ok(batch) => decode_events(&batch, self.rows_decoded).map(|events| {
                    self.rows_decoded += batch.num_rows();
                    events
                }),
                Err(e) => Err(e.into()),
            };
            match decoded {
                Ok(events) => self.pending = events.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
