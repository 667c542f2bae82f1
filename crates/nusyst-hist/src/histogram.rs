//! Three-dimensional binned grid.

use nusyst_core::{Error, Result};

use crate::axis::Axis;

/// A 3D histogram: three axes plus one value per bin (no under/overflow).
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram3D {
    /// Histogram name.
    pub name: String,
    x: Axis,
    y: Axis,
    z: Axis,
    /// Bin contents, x fastest, then y, then z (length = nx·ny·nz).
    contents: Vec<f64>,
}

impl Histogram3D {
    /// Build a histogram; `contents` must hold `nx·ny·nz` values, x fastest.
    pub fn new(
        name: impl Into<String>,
        x: Axis,
        y: Axis,
        z: Axis,
        contents: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let expected = x.n_bins() * y.n_bins() * z.n_bins();
        if contents.len() != expected {
            return Err(Error::InvalidConfiguration(format!(
                "histogram '{name}' contents length mismatch: expected {expected} ({}x{}x{}), got {}",
                x.n_bins(),
                y.n_bins(),
                z.n_bins(),
                contents.len()
            )));
        }
        Ok(Self { name, x, y, z, contents })
    }

    /// Histogram with every bin set to `value`.
    pub fn filled(name: impl Into<String>, x: Axis, y: Axis, z: Axis, value: f64) -> Self {
        let n = x.n_bins() * y.n_bins() * z.n_bins();
        Self { name: name.into(), x, y, z, contents: vec![value; n] }
    }

    /// X axis.
    pub fn x_axis(&self) -> &Axis {
        &self.x
    }

    /// Y axis.
    pub fn y_axis(&self) -> &Axis {
        &self.y
    }

    /// Z axis.
    pub fn z_axis(&self) -> &Axis {
        &self.z
    }

    /// Raw contents, x fastest.
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    #[inline]
    fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + self.x.n_bins() * (iy + self.y.n_bins() * iz)
    }

    /// Content of bin `(ix, iy, iz)` (0-based).
    pub fn bin_content(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.contents[self.index(ix, iy, iz)]
    }

    /// Overwrite bin `(ix, iy, iz)`.
    pub fn set_bin_content(&mut self, ix: usize, iy: usize, iz: usize, value: f64) {
        let i = self.index(ix, iy, iz);
        self.contents[i] = value;
    }

    /// Trilinear interpolation between bin centers.
    ///
    /// Coordinates outside the outer bin centers are held at the edge node.
    pub fn interpolate(&self, x: f64, y: f64, z: f64) -> f64 {
        let (x0, x1, xd) = self.x.bracket(x);
        let (y0, y1, yd) = self.y.bracket(y);
        let (z0, z1, zd) = self.z.bracket(z);

        let c = |ix, iy, iz| self.bin_content(ix, iy, iz);

        let i1 = c(x0, y0, z0) * (1.0 - zd) + c(x0, y0, z1) * zd;
        let i2 = c(x0, y1, z0) * (1.0 - zd) + c(x0, y1, z1) * zd;
        let j1 = c(x1, y0, z0) * (1.0 - zd) + c(x1, y0, z1) * zd;
        let j2 = c(x1, y1, z0) * (1.0 - zd) + c(x1, y1, z1) * zd;

        let w1 = i1 * (1.0 - yd) + i2 * yd;
        let w2 = j1 * (1.0 - yd) + j2 * yd;

        w1 * (1.0 - xd) + w2 * xd
    }
}
