//! Input manifest of the histogram-ratio calculator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use nusyst_core::{EnergyRegime, Error, Result};

use crate::binning::BinningMode;

/// Which of a regime's two grids an input fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridRole {
    /// Cross-section with the suppression effect (the central value).
    Reference,
    /// Cross-section without it.
    Modified,
}

/// One grid source: slot name, histogram name, optional file override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInput {
    /// Slot, e.g. `LowE_WithRPA` or `high_modified`.
    pub name: String,
    /// Histogram name inside the document.
    pub input_hist: String,
    /// Document path; defaults to the manifest's `input_file`.
    #[serde(default)]
    pub input_file: Option<PathBuf>,
}

impl GridInput {
    /// Regime and role addressed by the slot name.
    pub fn slot(&self) -> Result<(EnergyRegime, GridRole)> {
        match self.name.as_str() {
            "LowE_WithRPA" | "low_reference" => Ok((EnergyRegime::Low, GridRole::Reference)),
            "LowE_WithoutRPA" | "low_modified" => Ok((EnergyRegime::Low, GridRole::Modified)),
            "HighE_WithRPA" | "high_reference" => Ok((EnergyRegime::High, GridRole::Reference)),
            "HighE_WithoutRPA" | "high_modified" => Ok((EnergyRegime::High, GridRole::Modified)),
            other => Err(Error::InvalidConfiguration(format!("unknown grid slot '{other}'"))),
        }
    }
}

/// Calculator manifest as written in the configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RpaManifest {
    /// Energy (GeV) separating the low and high regimes.
    #[serde(default, alias = "ENuBoundary")]
    pub energy_boundary: Option<f64>,
    /// Binning-mode selector (`q3q0`, `PCTheta`, `PSTheta`, `PTheta`).
    #[serde(default, alias = "RWMode")]
    pub binning_mode: Option<String>,
    /// Default histogram document for all inputs.
    #[serde(default)]
    pub input_file: Option<PathBuf>,
    /// Clamping margin inside the outer bin centers.
    #[serde(default)]
    pub clamp_epsilon: Option<f64>,
    /// Grid sources.
    #[serde(default)]
    pub inputs: Vec<GridInput>,
}

impl RpaManifest {
    /// Energy boundary; required.
    pub fn energy_boundary(&self) -> Result<f64> {
        let b = self.energy_boundary.ok_or_else(|| {
            Error::InvalidConfiguration("input manifest is missing energy_boundary".into())
        })?;
        if !b.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "energy_boundary must be finite, got {b}"
            )));
        }
        Ok(b)
    }

    /// Binning mode; required.
    pub fn binning_mode(&self) -> Result<BinningMode> {
        self.binning_mode
            .as_deref()
            .ok_or_else(|| {
                Error::InvalidConfiguration("input manifest is missing binning_mode".into())
            })?
            .parse()
    }
}
