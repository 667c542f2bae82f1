//! # nusyst-calc
//!
//! Response calculators and the providers that drive them.
//!
//! - [`HistogramRatioCalculator`]: binned cross-section ratio with energy
//!   regimes, range clamping and numerical guards
//! - [`CcqeRpaProvider`]: charged-current quasi-elastic RPA dial
//! - [`config`]: systematics configuration documents → registry + providers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod config;
pub mod kinematics;
pub mod manifest;
pub mod provider;
pub mod rpa;

pub use binning::BinningMode;
pub use config::{ParameterConfig, ProviderConfig, SystematicsConfig, VariationSpec, read_config};
pub use kinematics::LeptonKinematics;
pub use manifest::{GridInput, GridRole, RpaManifest};
pub use provider::CcqeRpaProvider;
pub use rpa::{AxisBounds, DEFAULT_CLAMP_EPSILON, HistogramRatioCalculator, RegimeGrids};
