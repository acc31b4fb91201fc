use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

const ORTHOGONALITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum CellError {
    #[error("Cell matrix is singular (volume {volume:.3e} A^3)")]
    Singular { volume: f64 },
    #[error("Cell matrix contains non-finite entries")]
    NonFinite,
}

/// A periodic lattice described by three lattice vectors.
///
/// The vectors are stored as the rows of a 3x3 matrix, matching the layout of the
/// lattice block in POSCAR files. The inverse of the transposed matrix is cached so
/// that Cartesian/fractional conversions do not repeat the inversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    matrix: Matrix3<f64>,
    to_fractional: Matrix3<f64>,
}

impl Cell {
    /// Builds a cell from a matrix whose rows are the lattice vectors `a`, `b` and `c`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::NonFinite`] for NaN or infinite entries and
    /// [`CellError::Singular`] when the lattice vectors are linearly dependent.
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, CellError> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(CellError::NonFinite);
        }
        let to_fractional = matrix
            .transpose()
            .try_inverse()
            .ok_or(CellError::Singular {
                volume: matrix.determinant().abs(),
            })?;
        Ok(Self {
            matrix,
            to_fractional,
        })
    }

    /// Builds an axis-aligned orthogonal box with edge lengths `lx`, `ly` and `lz`.
    pub fn orthogonal(lx: f64, ly: f64, lz: f64) -> Result<Self, CellError> {
        Self::new(Matrix3::from_diagonal(&Vector3::new(lx, ly, lz)))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Returns the lattice vector with index `i` (0 = a, 1 = b, 2 = c).
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// Returns `(Lx, Ly, Lz)` if the cell is an axis-aligned box with positive edges.
    ///
    /// Any off-diagonal entry larger than a small absolute tolerance, or a non-positive
    /// diagonal entry, yields `None`.
    pub fn orthogonal_extent(&self) -> Option<Vector3<f64>> {
        let off_diagonal_ok = (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
            .all(|(i, j)| self.matrix[(i, j)].abs() <= ORTHOGONALITY_TOLERANCE);
        let diagonal = self.matrix.diagonal();
        if off_diagonal_ok && diagonal.iter().all(|&l| l > 0.0) {
            Some(diagonal)
        } else {
            None
        }
    }

    pub fn to_fractional(&self, position: &Point3<f64>) -> Vector3<f64> {
        self.to_fractional * position.coords
    }

    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * fractional)
    }

    /// Maps a Cartesian position back into the cell, so every fractional coordinate lies
    /// in `[0, 1)`. Positions already inside are returned bit-for-bit.
    pub fn wrap(&self, position: &Point3<f64>) -> Point3<f64> {
        let mut fractional = self.to_fractional(position);
        if fractional.iter().all(|f| (0.0..1.0).contains(f)) {
            return *position;
        }
        for f in fractional.iter_mut() {
            *f -= f.floor();
            // floor of a tiny negative value can round the result up to exactly 1.0
            if *f >= 1.0 {
                *f = 0.0;
            }
        }
        self.to_cartesian(&fractional)
    }

    /// Returns the displacement `b - a` reduced to its minimum periodic image.
    ///
    /// The reduction rounds each fractional component to the nearest integer, which is
    /// exact for orthogonal cells.
    pub fn minimum_image(&self, a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
        let mut s = self.to_fractional * (b - a);
        for v in s.iter_mut() {
            *v -= v.round();
        }
        self.matrix.transpose() * s
    }

    /// Distance between `a` and `b` under the minimum-image convention.
    pub fn distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_image(a, b).norm()
    }
}
