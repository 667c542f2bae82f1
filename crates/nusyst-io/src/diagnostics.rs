//! Parquet-backed diagnostic sink.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use nusyst_core::{DiagnosticRecord, DiagnosticSink};

use crate::Result;
use crate::tables::create_writer;

/// Schema of the diagnostic table.
pub fn diagnostic_schema() -> SchemaRef {
    let f64_col = |name: &str| Field::new(name, DataType::Float64, false);
    Arc::new(Schema::new(vec![
        Field::new("parameter_id", DataType::UInt32, false),
        Field::new("nu_pdg", DataType::Int32, false),
        Field::new("lepton_pdg", DataType::Int32, false),
        f64_col("e_nu"),
        f64_col("lepton_momentum"),
        f64_col("lepton_cos_theta"),
        f64_col("q0"),
        f64_col("q3"),
        f64_col("q2"),
        f64_col("w"),
        Field::new("target_pdg", DataType::Int32, false),
        Field::new("regime", DataType::Utf8, true),
        f64_col("weight"),
    ]))
}

fn records_to_batch(schema: SchemaRef, rows: &[DiagnosticRecord]) -> Result<RecordBatch> {
    let f64s = |get: fn(&DiagnosticRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(get)))
    };
    let i32s = |get: fn(&DiagnosticRecord) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from_iter_values(rows.iter().map(get)))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.parameter_id.0))),
        i32s(|r| r.nu_pdg),
        i32s(|r| r.lepton_pdg),
        f64s(|r| r.e_nu),
        f64s(|r| r.lepton_momentum),
        f64s(|r| r.lepton_cos_theta),
        f64s(|r| r.q0),
        f64s(|r| r.q3),
        f64s(|r| r.q2),
        f64s(|r| r.w),
        i32s(|r| r.target_pdg),
        Arc::new(rows.iter().map(|r| r.regime.map(|g| g.as_str())).collect::<StringArray>()),
        f64s(|r| r.weight),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Writes [`DiagnosticRecord`]s to a Parquet file in batches.
///
/// The file is complete once [`flush`](DiagnosticSink::flush) has been called;
/// recording after that is an error.
pub struct ParquetDiagnosticSink {
    path: PathBuf,
    schema: SchemaRef,
    writer: Option<ArrowWriter<File>>,
    pending: Vec<DiagnosticRecord>,
    batch_size: usize,
    n_written: usize,
}

impl ParquetDiagnosticSink {
    /// Default number of records per written batch.
    pub const DEFAULT_BATCH_SIZE: usize = 4096;

    /// Create (truncate) the diagnostic file.
    pub fn create(path: &Path) -> Result<Self> {
        let schema = diagnostic_schema();
        let writer = create_writer(path, schema.clone())?;
        log::info!("writing diagnostics to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            schema,
            writer: Some(writer),
            pending: Vec::new(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            n_written: 0,
        })
    }

    /// Records written or buffered so far.
    pub fn n_records(&self) -> usize {
        self.n_written + self.pending.len()
    }

    fn write_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let writer = self.writer.as_mut().ok_or_else(|| {
            std::io::Error::other(format!("{} is already closed", self.path.display()))
        })?;
        let batch = records_to_batch(self.schema.clone(), &self.pending)?;
        writer.write(&batch)?;
        self.n_written += self.pending.len();
        self.pending.clear();
        Ok(())
    }
}

impl DiagnosticSink for ParquetDiagnosticSink {
    fn record(&mut self, record: &DiagnosticRecord) -> nusyst_core::Result<()> {
        if self.writer.is_none() {
            return Err(nusyst_core::Error::Io(std::io::Error::other(format!(
                "{} is already closed",
                self.path.display()
            ))));
        }
        self.pending.push(record.clone());
        if self.pending.len() >= self.batch_size {
            self.write_pending()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> nusyst_core::Result<()> {
        if self.writer.is_none() {
            return Ok(());
        }
        self.write_pending()?;
        if let Some(writer) = self.writer.take() {
            writer.close().map_err(crate::IoError::from)?;
        }
        log::debug!("wrote {} diagnostic rows to {}", self.n_written, self.path.display());
        Ok(())
    }
}
