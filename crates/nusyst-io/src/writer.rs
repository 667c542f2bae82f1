//! Per-event response tables.
//!
//! The event table has one row per processed event, in input order: a block of
//! event summary columns followed, for every responding parameter in registry
//! order, by `{name}_ntweaks` (Int32), `{name}_responses` (List<Float64>) and
//! `{name}_cv_weight` (Float64).
//!
//! The metadata table has one row per registered parameter:
//! `name` (Utf8), `ntweaks` (Int32), `tweak_values` (List<Float64>).

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int32Builder, Int64Builder, ListBuilder,
    StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use nusyst_core::{
    EventResponseSet, InteractionEvent, ParameterId, ParameterRegistry, ResponseEntry,
};

use crate::tables::{create_writer, write_parquet};
use crate::{IoError, Result};

/// Event-level columns written ahead of the response columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSummary {
    /// Position of the event in the input.
    pub event_index: i64,
    /// Probe PDG code, 0 if absent.
    pub nu_pdg: i32,
    /// Probe energy (GeV), NaN if absent.
    pub e_nu: f64,
    /// Energy transfer (GeV), NaN without both leptons.
    pub q0: f64,
    /// Three-momentum transfer (GeV), NaN without both leptons.
    pub q3: f64,
    /// Q² = −q² (GeV²), NaN without both leptons.
    pub q2: f64,
    /// Final-state lepton momentum (GeV), NaN if absent.
    pub plep: f64,
    /// Weak charged current.
    pub is_cc: bool,
    /// Quasi-elastic.
    pub is_qe: bool,
    /// Meson-exchange current.
    pub is_mec: bool,
    /// Target nucleus PDG code.
    pub target_pdg: i32,
}

impl EventSummary {
    /// Summarize `event` at input position `event_index`.
    pub fn from_event(event_index: i64, event: &InteractionEvent) -> Self {
        let q = event.momentum_transfer();
        Self {
            event_index,
            nu_pdg: event.probe.map_or(0, |p| p.pdg),
            e_nu: event.probe.map_or(f64::NAN, |p| p.p4.e),
            q0: q.map_or(f64::NAN, |q| q.e),
            q3: q.map_or(f64::NAN, |q| q.p()),
            q2: q.map_or(f64::NAN, |q| -q.mag2()),
            plep: event.final_state_lepton.map_or(f64::NAN, |l| l.p4.p()),
            is_cc: event.process.weak_cc,
            is_qe: event.process.quasi_elastic,
            is_mec: event.process.mec,
            target_pdg: event.target_pdg,
        }
    }
}

/// Column builders for one responding parameter.
struct ParameterColumns {
    id: ParameterId,
    n_responses: usize,
    ntweaks: Int32Builder,
    responses: ListBuilder<Float64Builder>,
    cv_weight: Float64Builder,
}

/// Batched writer of the per-event response table.
pub struct ResponseWriter {
    path: PathBuf,
    schema: SchemaRef,
    writer: ArrowWriter<File>,
    batch_size: usize,
    buffered: usize,
    n_written: usize,

    event_index: Int64Builder,
    nu_pdg: Int32Builder,
    e_nu: Float64Builder,
    q0: Float64Builder,
    q3: Float64Builder,
    q2: Float64Builder,
    plep: Float64Builder,
    is_cc: BooleanBuilder,
    is_qe: BooleanBuilder,
    is_mec: BooleanBuilder,
    target_pdg: Int32Builder,
    parameters: Vec<ParameterColumns>,
    column_of: HashMap<ParameterId, usize>,
}

fn list_f64() -> DataType {
    DataType::List(Arc::new(Field::new_list_field(DataType::Float64, true)))
}

impl ResponseWriter {
    /// Default number of rows buffered before a batch is written.
    pub const DEFAULT_BATCH_SIZE: usize = 4096;

    /// Create the output file with columns for every responding parameter.
    pub fn create(path: &Path, registry: &ParameterRegistry) -> Result<Self> {
        Self::with_batch_size(path, registry, Self::DEFAULT_BATCH_SIZE)
    }

    /// Like [`create`](Self::create), buffering `batch_size` rows per batch.
    pub fn with_batch_size(
        path: &Path,
        registry: &ParameterRegistry,
        batch_size: usize,
    ) -> Result<Self> {
        let mut fields = vec![
            Field::new("event_index", DataType::Int64, false),
            Field::new("nu_pdg", DataType::Int32, false),
            Field::new("e_nu_gev", DataType::Float64, false),
            Field::new("q0_gev", DataType::Float64, false),
            Field::new("q3_gev", DataType::Float64, false),
            Field::new("q2_gev2", DataType::Float64, false),
            Field::new("plep_gev", DataType::Float64, false),
            Field::new("is_cc", DataType::Boolean, false),
            Field::new("is_qe", DataType::Boolean, false),
            Field::new("is_mec", DataType::Boolean, false),
            Field::new("target_pdg", DataType::Int32, false),
        ];
        let mut parameters = Vec::new();
        for hdr in registry.responding() {
            fields.push(Field::new(format!("{}_ntweaks", hdr.name), DataType::Int32, false));
            fields.push(Field::new(format!("{}_responses", hdr.name), list_f64(), false));
            fields.push(Field::new(format!("{}_cv_weight", hdr.name), DataType::Float64, false));
            parameters.push(ParameterColumns {
                id: hdr.id,
                n_responses: hdr.n_responses(),
                ntweaks: Int32Builder::new(),
                responses: ListBuilder::new(Float64Builder::new()),
                cv_weight: Float64Builder::new(),
            });
        }
        let schema = Arc::new(Schema::new(fields));
        let writer = create_writer(path, schema.clone())?;
        log::debug!(
            "response table {}: {} parameter column groups",
            path.display(),
            parameters.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            writer,
            batch_size: batch_size.max(1),
            buffered: 0,
            n_written: 0,
            event_index: Int64Builder::new(),
            nu_pdg: Int32Builder::new(),
            e_nu: Float64Builder::new(),
            q0: Float64Builder::new(),
            q3: Float64Builder::new(),
            q2: Float64Builder::new(),
            plep: Float64Builder::new(),
            is_cc: BooleanBuilder::new(),
            is_qe: BooleanBuilder::new(),
            is_mec: BooleanBuilder::new(),
            target_pdg: Int32Builder::new(),
            column_of: parameters.iter().enumerate().map(|(i, col)| (col.id, i)).collect(),
            parameters,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Rows accepted so far (written or buffered).
    pub fn n_rows(&self) -> usize {
        self.n_written + self.buffered
    }

    /// Append one event row.
    ///
    /// Parameters absent from `set` are written with the all-ones response of
    /// their declared length and a central weight of one.
    pub fn write_event<R: ResponseEntry>(
        &mut self,
        summary: &EventSummary,
        set: &EventResponseSet<R>,
    ) -> Result<()> {
        let mut found: Vec<Option<&R>> = vec![None; self.parameters.len()];
        for entry in set {
            if let Some(&c) = self.column_of.get(&entry.id()) {
                found[c].get_or_insert(entry);
            }
        }
        for (col, entry) in self.parameters.iter().zip(&found) {
            let Some(entry) = entry else { continue };
            if entry.responses().len() != col.n_responses {
                return Err(IoError::Core(nusyst_core::Error::ResponseCardinalityMismatch {
                    id: col.id,
                    expected: col.n_responses,
                    actual: entry.responses().len(),
                }));
            }
        }

        self.event_index.append_value(summary.event_index);
        self.nu_pdg.append_value(summary.nu_pdg);
        self.e_nu.append_value(summary.e_nu);
        self.q0.append_value(summary.q0);
        self.q3.append_value(summary.q3);
        self.q2.append_value(summary.q2);
        self.plep.append_value(summary.plep);
        self.is_cc.append_value(summary.is_cc);
        self.is_qe.append_value(summary.is_qe);
        self.is_mec.append_value(summary.is_mec);
        self.target_pdg.append_value(summary.target_pdg);

        for (col, entry) in self.parameters.iter_mut().zip(found) {
            let n = col.n_responses;
            col.ntweaks.append_value(i32::try_from(n).unwrap_or(i32::MAX));
            match entry {
                Some(entry) => {
                    col.responses.values().append_slice(entry.responses());
                    col.cv_weight.append_value(entry.central_response().unwrap_or(1.0));
                }
                None => {
                    let values = col.responses.values();
                    for _ in 0..n {
                        values.append_value(1.0);
                    }
                    col.cv_weight.append_value(1.0);
                }
            }
            col.responses.append(true);
        }

        self.buffered += 1;
        if self.buffered >= self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.event_index.finish()),
            Arc::new(self.nu_pdg.finish()),
            Arc::new(self.e_nu.finish()),
            Arc::new(self.q0.finish()),
            Arc::new(self.q3.finish()),
            Arc::new(self.q2.finish()),
            Arc::new(self.plep.finish()),
            Arc::new(self.is_cc.finish()),
            Arc::new(self.is_qe.finish()),
            Arc::new(self.is_mec.finish()),
            Arc::new(self.target_pdg.finish()),
        ];
        for col in &mut self.parameters {
            columns.push(Arc::new(col.ntweaks.finish()));
            columns.push(Arc::new(col.responses.finish()));
            columns.push(Arc::new(col.cv_weight.finish()));
        }
        let batch = RecordBatch::try_new(self.schema.clone(), columns)?;
        self.writer.write(&batch)?;
        self.n_written += self.buffered;
        self.buffered = 0;
        Ok(())
    }

    /// Write buffered rows and close the file. Returns the number of rows.
    pub fn finish(mut self) -> Result<usize> {
        self.flush_batch()?;
        self.writer.close()?;
        log::debug!("wrote {} rows to {}", self.n_written, self.path.display());
        Ok(self.n_written)
    }
}

/// Write the parameter metadata table: one row per registered parameter.
pub fn write_metadata(path: &Path, registry: &ParameterRegistry) -> Result<()> {
    let mut name = StringBuilder::new();
    let mut ntweaks = Int32Builder::new();
    let mut tweak_values = ListBuilder::new(Float64Builder::new());
    for hdr in registry.headers() {
        name.append_value(&hdr.name);
        let values = hdr.dial_values();
        ntweaks.append_value(i32::try_from(values.len()).unwrap_or(i32::MAX));
        tweak_values.values().append_slice(values);
        tweak_values.append(true);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("ntweaks", DataType::Int32, false),
        Field::new("tweak_values", list_f64(), false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(name.finish()) as ArrayRef,
            Arc::new(ntweaks.finish()) as ArrayRef,
            Arc::new(tweak_values.finish()) as ArrayRef,
        ],
    )?;
    write_parquet(path, &[batch])?;
    log::debug!("wrote {} parameter rows to {}", registry.len(), path.display());
    Ok(())
}
