//! Binned axis (fixed or variable width).

use nusyst_core::{Error, Result};

/// A binned axis described by its edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Bin edges (length = n_bins + 1).
    edges: Vec<f64>,
    /// Bin centers (length = n_bins).
    centers: Vec<f64>,
}

impl Axis {
    /// Axis from explicit edges. Edges must be finite and strictly increasing.
    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "axis requires at least 2 bin edges, got {}",
                edges.len()
            )));
        }
        for (i, &e) in edges.iter().enumerate() {
            if !e.is_finite() {
                return Err(Error::InvalidConfiguration(format!(
                    "axis edges[{i}] must be finite, got {e}"
                )));
            }
            if i > 0 && edges[i - 1] >= e {
                return Err(Error::InvalidConfiguration(format!(
                    "axis edges must be strictly increasing, got edges[{}]={} and edges[{}]={}",
                    i - 1,
                    edges[i - 1],
                    i,
                    e
                )));
            }
        }
        let centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Ok(Self { edges, centers })
    }

    /// `n_bins` equal-width bins on `[min, max)`.
    pub fn uniform(n_bins: usize, min: f64, max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::InvalidConfiguration("axis requires at least 1 bin".into()));
        }
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(Error::InvalidConfiguration(format!(
                "uniform axis requires finite min < max, got [{min}, {max}]"
            )));
        }
        let width = (max - min) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| min + width * i as f64).collect();
        edges.push(max);
        Self::from_edges(edges)
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.centers.len()
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Center of bin `i` (0-based).
    pub fn bin_center(&self, i: usize) -> f64 {
        self.centers[i]
    }

    /// Center of the first bin.
    pub fn first_bin_center(&self) -> f64 {
        self.centers[0]
    }

    /// Center of the last bin.
    pub fn last_bin_center(&self) -> f64 {
        self.centers[self.centers.len() - 1]
    }

    /// Interpolation nodes around `x`: `(lower, upper, fraction)`.
    ///
    /// The lower node is the last bin center `<= x`; `fraction` is the
    /// linear weight of the upper node. Queries beyond the outer centers
    /// stick to the edge node.
    ///
    /// A single-bin axis always yields `(0, 0, 0.0)`: the grid is taken as
    /// constant along that axis, so a histogram with a one-bin energy or
    /// kinematic axis still interpolates over the others. ROOT's
    /// `TH3::Interpolate` reads a zero overflow bin there instead, which the
    /// ratio calculator would turn into a neutral weight for every event.
    pub fn bracket(&self, x: f64) -> (usize, usize, f64) {
        let n = self.centers.len();
        if n == 1 {
            return (0, 0, 0.0);
        }
        if x.is_nan() || x <= self.centers[0] {
            return (0, 1, 0.0);
        }
        if x >= self.centers[n - 1] {
            return (n - 2, n - 1, 1.0);
        }
        let lo = (self.centers.partition_point(|&c| c <= x) - 1).min(n - 2);
        let hi = lo + 1;
        let frac = (x - self.centers[lo]) / (self.centers[hi] - self.centers[lo]);
        (lo, hi, frac)
    }
}
