//! # nusyst-io
//!
//! Parquet plumbing around the response engine:
//!
//! - [`events`]: one-row-per-event interaction tables (read as a stream, or written)
//! - [`writer`]: the per-event response table and the parameter metadata table
//! - [`diagnostics`]: a Parquet-backed [`nusyst_core::DiagnosticSink`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostics;
pub mod events;
pub mod tables;
pub mod writer;

pub use diagnostics::ParquetDiagnosticSink;
pub use events::{ParquetEventSource, write_events};
pub use tables::{read_parquet_batches, write_parquet};
pub use writer::{EventSummary, ResponseWriter, write_metadata};

/// Error type for table I/O.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Parquet read/write failure.
    #[error("Parquet read/write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow array or schema failure.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// File system failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required column absent from the table.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Column present with an unexpected type.
    #[error("column '{col}' has wrong type: expected {expected}, got {actual}")]
    WrongType {
        /// Column name.
        col: String,
        /// Expected Arrow type.
        expected: String,
        /// Found Arrow type.
        actual: String,
    },

    /// Null in a column that must be set.
    #[error("row {row}: column '{col}' is null")]
    NullValue {
        /// Column name.
        col: String,
        /// Row within the file.
        row: usize,
    },

    /// Error raised by the response engine.
    #[error(transparent)]
    Core(#[from] nusyst_core::Error),
}

/// Result alias for table I/O.
pub type Result<T> = std::result::Result<T, IoError>;

impl From<IoError> for nusyst_core::Error {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Core(inner) => inner,
            IoError::Io(inner) => nusyst_core::Error::Io(inner),
            other => nusyst_core::Error::Io(std::io::Error::other(other.to_string())),
        }
    }
}
