//! Histogram-ratio reweighting.
//!
//! For each energy regime the calculator holds a reference cross-section grid
//! (central value) and a modified one. The weight at dial value `t` is
//!
//! ```text
//! w(t) = (σ_ref · (1 − t) + σ_mod · t) / σ_ref
//! ```
//!
//! with both grids interpolated trilinearly at `(E, k1, k2)`, each coordinate
//! first clamped to `[first_center + ε, last_center − ε]` of the reference
//! grid's axes. `t = 0` is the reference, `t = 1` the fully modified model.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use nusyst_core::{EnergyRegime, Error, ResponseCalculator, Result};
use nusyst_hist::{Histogram3D, HistogramFile, resolve_data_path};

use crate::manifest::{GridRole, RpaManifest};

/// Default margin kept inside the outermost bin centers.
pub const DEFAULT_CLAMP_EPSILON: f64 = 1e-6;

/// Outer bin centers of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    /// Center of the first bin.
    pub first_center: f64,
    /// Center of the last bin.
    pub last_center: f64,
}

impl AxisBounds {
    /// Clamp `v` into `[first_center + eps, last_center − eps]`.
    #[inline]
    pub fn clamp(&self, v: f64, eps: f64) -> f64 {
        v.max(self.first_center + eps).min(self.last_center - eps)
    }
}

/// Reference and modified grids of one energy regime.
#[derive(Debug, Clone)]
pub struct RegimeGrids {
    reference: Histogram3D,
    modified: Histogram3D,
    bounds: [AxisBounds; 3],
}

impl RegimeGrids {
    /// Pair the grids and cache the reference grid's outer bin centers.
    pub fn new(reference: Histogram3D, modified: Histogram3D) -> Self {
        let b = |ax: &nusyst_hist::Axis| AxisBounds {
            first_center: ax.first_bin_center(),
            last_center: ax.last_bin_center(),
        };
        let bounds = [b(reference.x_axis()), b(reference.y_axis()), b(reference.z_axis())];
        Self { reference, modified, bounds }
    }

    /// Reference (central-value) grid.
    pub fn reference(&self) -> &Histogram3D {
        &self.reference
    }

    /// Modified grid.
    pub fn modified(&self) -> &Histogram3D {
        &self.modified
    }

    /// Outer bin centers of the (energy, k1, k2) axes.
    pub fn bounds(&self) -> &[AxisBounds; 3] {
        &self.bounds
    }
}

/// Binned cross-section ratio calculator with two energy regimes.
#[derive(Debug, Clone)]
pub struct HistogramRatioCalculator {
    energy_boundary: f64,
    clamp_epsilon: f64,
    low: RegimeGrids,
    high: RegimeGrids,
}

impl HistogramRatioCalculator {
    /// Build from in-memory grids.
    pub fn new(energy_boundary: f64, low: RegimeGrids, high: RegimeGrids) -> Result<Self> {
        if !energy_boundary.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "energy boundary must be finite, got {energy_boundary}"
            )));
        }
        Ok(Self { energy_boundary, clamp_epsilon: DEFAULT_CLAMP_EPSILON, low, high })
    }

    /// Override the clamping margin.
    pub fn with_clamp_epsilon(mut self, eps: f64) -> Result<Self> {
        if !(eps.is_finite() && eps >= 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "clamp epsilon must be finite and >= 0, got {eps}"
            )));
        }
        self.clamp_epsilon = eps;
        Ok(self)
    }

    /// Load all four grids named by `manifest`.
    ///
    /// Relative document paths are resolved against `data_root`.
    pub fn from_manifest(manifest: &RpaManifest, data_root: Option<&Path>) -> Result<Self> {
        let energy_boundary = manifest.energy_boundary()?;
        log::info!("HistogramRatioCalculator: energy boundary = {energy_boundary:.2}");

        let mut documents: HashMap<PathBuf, HistogramFile> = HashMap::new();
        let mut slots: HashMap<(EnergyRegime, GridRole), Histogram3D> = HashMap::new();

        for input in &manifest.inputs {
            let slot = input.slot()?;
            let file = input.input_file.as_ref().or(manifest.input_file.as_ref()).ok_or_else(
                || {
                    Error::InvalidConfiguration(format!(
                        "grid '{}' has no input_file and the manifest sets no default",
                        input.name
                    ))
                },
            )?;
            let path = resolve_data_path(file, data_root)?;
            if !documents.contains_key(&path) {
                let doc = HistogramFile::open(&path)?;
                documents.insert(path.clone(), doc);
            }
            let hist = documents[&path].histogram(&input.input_hist)?;
            if slots.insert(slot, hist).is_some() {
                return Err(Error::InvalidConfiguration(format!(
                    "grid slot '{}' is given more than once",
                    input.name
                )));
            }
        }

        let mut take = |regime: EnergyRegime, role: GridRole| {
            slots.remove(&(regime, role)).ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "input manifest has no {} {} grid",
                    regime.as_str(),
                    match role {
                        GridRole::Reference => "reference",
                        GridRole::Modified => "modified",
                    }
                ))
            })
        };
        let low = RegimeGrids::new(
            take(EnergyRegime::Low, GridRole::Reference)?,
            take(EnergyRegime::Low, GridRole::Modified)?,
        );
        let high = RegimeGrids::new(
            take(EnergyRegime::High, GridRole::Reference)?,
            take(EnergyRegime::High, GridRole::Modified)?,
        );

        let mut calc = Self::new(energy_boundary, low, high)?;
        if let Some(eps) = manifest.clamp_epsilon {
            calc = calc.with_clamp_epsilon(eps)?;
        }
        for regime in EnergyRegime::ALL {
            let [x, y, z] = calc.grids(regime).bounds;
            log::info!(
                "{} energy regime: x [{:.3}, {:.3}], y [{:.3}, {:.3}], z [{:.3}, {:.3}]",
                regime.as_str(),
                x.first_center,
                x.last_center,
                y.first_center,
                y.last_center,
                z.first_center,
                z.last_center
            );
        }
        Ok(calc)
    }

    /// Energy separating the regimes.
    pub fn energy_boundary(&self) -> f64 {
        self.energy_boundary
    }

    /// Clamping margin.
    pub fn clamp_epsilon(&self) -> f64 {
        self.clamp_epsilon
    }

    /// `Low` below the boundary, `High` at or above it.
    pub fn select_regime(&self, energy: f64) -> EnergyRegime {
        if energy < self.energy_boundary { EnergyRegime::Low } else { EnergyRegime::High }
    }

    /// Grids of `regime`.
    pub fn grids(&self, regime: EnergyRegime) -> &RegimeGrids {
        match regime {
            EnergyRegime::Low => &self.low,
            EnergyRegime::High => &self.high,
        }
    }

    /// Coordinates actually used for interpolation in `regime`.
    pub fn clamp(&self, regime: EnergyRegime, point: [f64; 3]) -> [f64; 3] {
        let bounds = &self.grids(regime).bounds;
        let eps = self.clamp_epsilon;
        [bounds[0].clamp(point[0], eps), bounds[1].clamp(point[1], eps), bounds[2].clamp(point[2], eps)]
    }

    /// Interpolated `(reference, modified)` cross sections at the clamped point.
    pub fn cross_sections(&self, energy: f64, kinematics: [f64; 2]) -> (f64, f64) {
        let regime = self.select_regime(energy);
        let grids = self.grids(regime);
        let [x, y, z] = self.clamp(regime, [energy, kinematics[0], kinematics[1]]);
        (grids.reference.interpolate(x, y, z), grids.modified.interpolate(x, y, z))
    }
}

impl ResponseCalculator for HistogramRatioCalculator {
    fn weight(&self, energy: f64, kinematics: [f64; 2], dial: f64) -> f64 {
        let regime = self.select_regime(energy);
        let grids = self.grids(regime);
        let [x, y, z] = self.clamp(regime, [energy, kinematics[0], kinematics[1]]);

        let xsec_reference = grids.reference.interpolate(x, y, z);
        let xsec_modified = grids.modified.interpolate(x, y, z);

        if xsec_reference == 0.0 {
            log::warn!(
                "zero reference cross section at (E, k1, k2) = ({energy:.3}, {:.3}, {:.3}) -> ({x:.3}, {y:.3}, {z:.3}), {} regime; using weight 1",
                kinematics[0],
                kinematics[1],
                regime.as_str()
            );
            return 1.0;
        }

        let weight = (xsec_reference * (1.0 - dial) + xsec_modified * dial) / xsec_reference;
        if !weight.is_finite() {
            log::warn!(
                "non-finite weight {weight} at (E, k1, k2) = ({energy:.3}, {:.3}, {:.3}) -> ({x:.3}, {y:.3}, {z:.3}), {} regime; using weight 1",
                kinematics[0],
                kinematics[1],
                regime.as_str()
            );
            return 1.0;
        }
        weight
    }

    fn regime(&self, energy: f64) -> Option<EnergyRegime> {
        Some(self.select_regime(energy))
    }

    fn name(&self) -> &str {
        "HistogramRatioCalculator"
    }
}
