//! Parquet plumbing shared by the event, response and diagnostic tables.

use std::fs::File;
use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::{IoError, Result};

/// Writer properties used for every table: Snappy compression.
pub(crate) fn writer_properties() -> WriterProperties {
    WriterProperties::builder().set_compression(Compression::SNAPPY).build()
}

/// Open an existing table, naming the path in the error.
pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        IoError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })
}

/// Open a Parquet writer for `schema` at `path`, truncating any existing file.
pub(crate) fn create_writer(path: &Path, schema: SchemaRef) -> Result<ArrowWriter<File>> {
    let file = File::create(path).map_err(|e| {
        IoError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    Ok(ArrowWriter::try_new(file, schema, Some(writer_properties()))?)
}

/// Read a whole table (response, metadata, diagnostic or event) into memory.
pub fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(open_file(path)?)?.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    log::debug!(
        "read {} rows from {}",
        batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        path.display()
    );
    Ok(batches)
}

/// Write complete batches sharing one schema as a single table.
///
/// An empty slice is rejected: the file would carry no schema.
pub fn write_parquet(path: &Path, batches: &[RecordBatch]) -> Result<()> {
    let first = batches.first().ok_or_else(|| {
        IoError::Io(std::io::Error::other(format!("{}: no batches to write", path.display())))
    })?;
    let mut writer = create_writer(path, first.schema())?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}
