//! JSON histogram documents and data-path resolution.
//!
//! Document layout:
//!
//! ```text
//! { "histograms": {
//!     "<name>": {
//!       "x": { "edges": [..] } | { "n_bins": N, "min": a, "max": b },
//!       "y": ..., "z": ...,
//!       "contents": [ nx*ny*nz values, x fastest, then y, then z ]
//!     }, ... } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nusyst_core::{Error, Result};

use crate::axis::Axis;
use crate::histogram::Histogram3D;

/// Axis description in a histogram document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    /// Variable-width bins.
    Edges {
        /// Bin edges.
        edges: Vec<f64>,
    },
    /// Equal-width bins.
    Uniform {
        /// Number of bins.
        n_bins: usize,
        /// Lower edge of the first bin.
        min: f64,
        /// Upper edge of the last bin.
        max: f64,
    },
}

impl AxisSpec {
    /// Build the axis.
    pub fn to_axis(&self) -> Result<Axis> {
        match self {
            AxisSpec::Edges { edges } => Axis::from_edges(edges.clone()),
            AxisSpec::Uniform { n_bins, min, max } => Axis::uniform(*n_bins, *min, *max),
        }
    }
}

impl From<&Axis> for AxisSpec {
    fn from(axis: &Axis) -> Self {
        AxisSpec::Edges { edges: axis.edges().to_vec() }
    }
}

/// One histogram in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSpec {
    /// X axis
    pub x: AxisSpec,
    /// Y axis
    pub y: AxisSpec,
    /// Z axis
    pub z: AxisSpec,
    /// Bin contents, x fastest.
    pub contents: Vec<f64>,
}

impl From<&Histogram3D> for HistogramSpec {
    fn from(h: &Histogram3D) -> Self {
        Self {
            x: h.x_axis().into(),
            y: h.y_axis().into(),
            z: h.z_axis().into(),
            contents: h.contents().to_vec(),
        }
    }
}

/// A parsed histogram document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramFile {
    /// Histograms by name.
    pub histograms: BTreeMap<String, HistogramSpec>,
}

impl HistogramFile {
    /// Read and parse a histogram document.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
        })?;
        let file: HistogramFile = serde_json::from_slice(&bytes)?;
        log::debug!("read {} histograms from {}", file.histograms.len(), path.display());
        Ok(file)
    }

    /// Histogram names in the document.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Build the named histogram.
    pub fn histogram(&self, name: &str) -> Result<Histogram3D> {
        let spec = self.histograms.get(name).ok_or_else(|| {
            Error::InvalidConfiguration(format!("histogram '{name}' not found in document"))
        })?;
        Histogram3D::new(
            name,
            spec.x.to_axis()?,
            spec.y.to_axis()?,
            spec.z.to_axis()?,
            spec.contents.clone(),
        )
    }

    /// Add (or replace) a histogram under its own name.
    pub fn insert(&mut self, h: &Histogram3D) {
        self.histograms.insert(h.name.clone(), HistogramSpec::from(h));
    }

    /// Write the document as JSON.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Resolve a histogram source path.
///
/// Absolute paths are returned unchanged; relative paths are joined onto
/// `data_root`, which must then be set.
pub fn resolve_data_path(path: &Path, data_root: Option<&Path>) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    match data_root {
        Some(root) if !root.as_os_str().is_empty() => Ok(root.join(path)),
        _ => Err(Error::InvalidDataPath(format!(
            "installation data root not set but got relative path: {}",
            path.display()
        ))),
    }
}
