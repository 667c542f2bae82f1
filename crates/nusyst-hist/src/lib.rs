//! # nusyst-hist
//!
//! Binned 3-D grids used as cross-section tables by the response calculators.
//!
//! Grids are read from JSON histogram documents (see [`source`]) and queried by
//! trilinear interpolation between bin centers.
//!
//! ```no_run
//! use nusyst_hist::HistogramFile;
//!
//! let f = HistogramFile::open("xsec.json").unwrap();
//! let h = f.histogram("low_with").unwrap();
//! println!("{}", h.interpolate(0.8, 0.4, 0.2));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod histogram;
pub mod source;

pub use axis::Axis;
pub use histogram::Histogram3D;
pub use source::{AxisSpec, HistogramFile, HistogramSpec, resolve_data_path};
