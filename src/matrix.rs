//! Fixed-size stage matrices.
//!
//! Rows index the destination size class and columns the source size class,
//! so `m[i][j]` is the contribution of one colony in stage `j` to stage `i`.

use crate::error::DemographyError;
use crate::population::{N_STAGES, StageVector};
use serde::{Deserialize, Serialize};

/// Tolerance on column sums of a transition matrix.
pub const TRANSITION_TOL: f64 = 1e-3;

/// Default iteration budget of [`StageMatrix::dominant_eigenvalue`].
pub const EIGEN_ITERATIONS: usize = 100;

/// A `5 x 5` matrix acting on [`StageVector`]s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageMatrix([[f64; N_STAGES]; N_STAGES]);

impl StageMatrix {
    pub const fn new(rows: [[f64; N_STAGES]; N_STAGES]) -> Self {
        Self(rows)
    }

    pub const fn zeros() -> Self {
        Self([[0.0; N_STAGES]; N_STAGES])
    }

    pub fn identity() -> Self {
        let mut mat = Self::zeros();
        for i in 0..N_STAGES {
            mat.0[i][i] = 1.0;
        }
        mat
    }

    /// Build a matrix from dynamically sized rows.
    ///
    /// # Errors
    /// Returns [`DemographyError::InvalidDimension`] if there are not exactly
    /// five rows of five entries each.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DemographyError> {
        if rows.len() != N_STAGES {
            return Err(DemographyError::InvalidDimension {
                expected: N_STAGES,
                found: rows.len(),
            });
        }
        let mut mat = Self::zeros();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != N_STAGES {
                return Err(DemographyError::InvalidDimension {
                    expected: N_STAGES,
                    found: row.len(),
                });
            }
            mat.0[i].copy_from_slice(row);
        }
        Ok(mat)
    }

    /// Diagonal survival matrix with `rates[i]` at `(i, i)`.
    ///
    /// # Errors
    /// Returns [`DemographyError::InvalidDimension`] unless `rates` has five entries.
    pub fn survival(rates: &[f64]) -> Result<Self, DemographyError> {
        if rates.len() != N_STAGES {
            return Err(DemographyError::InvalidDimension {
                expected: N_STAGES,
                found: rates.len(),
            });
        }
        let mut mat = Self::zeros();
        for (i, &rate) in rates.iter().enumerate() {
            mat.0[i][i] = rate;
        }
        Ok(mat)
    }

    /// Combine growth and shrinkage probabilities into a transition matrix.
    ///
    /// Entries below the diagonal come from `growth`, entries above it from
    /// `shrinkage`. Each diagonal entry (stasis) takes whatever probability
    /// remains in its column, clamped at zero. A column whose growth and
    /// shrinkage already exceed 1 therefore does not sum to 1; callers must
    /// check the result with [`StageMatrix::is_valid_transition`].
    pub fn transition(growth: &Self, shrinkage: &Self) -> Self {
        let mut mat = Self::zeros();
        for i in 0..N_STAGES {
            for j in 0..N_STAGES {
                if i > j {
                    mat.0[i][j] = growth.0[i][j];
                } else if i < j {
                    mat.0[i][j] = shrinkage.0[i][j];
                }
            }
        }

        for j in 0..N_STAGES {
            let off_diag: f64 = (0..N_STAGES).filter(|&i| i != j).map(|i| mat.0[i][j]).sum();
            mat.0[j][j] = (1.0 - off_diag).max(0.0);
        }

        mat
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[row][col]
    }

    pub fn column_sums(&self) -> [f64; N_STAGES] {
        let mut sums = [0.0; N_STAGES];
        for row in &self.0 {
            for (sum, &ele) in sums.iter_mut().zip(row) {
                *sum += ele;
            }
        }
        sums
    }

    /// Check the matrix against the transition invariants and report the
    /// first offending column.
    ///
    /// # Errors
    /// Returns [`DemographyError::InvalidTransitionMatrix`] if a column has a
    /// negative entry or does not sum to 1 within [`TRANSITION_TOL`].
    pub fn check_transition(&self) -> Result<(), DemographyError> {
        for (column, sum) in self.column_sums().into_iter().enumerate() {
            let negative = (0..N_STAGES).any(|i| self.0[i][column] < 0.0);
            if negative || (sum - 1.0).abs() > TRANSITION_TOL {
                return Err(DemographyError::InvalidTransitionMatrix { column, sum });
            }
        }
        Ok(())
    }

    pub fn is_valid_transition(&self) -> bool {
        self.check_transition().is_ok()
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut mat = Self::zeros();
        for i in 0..N_STAGES {
            for j in 0..N_STAGES {
                mat.0[i][j] = self.0[i][j] + other.0[i][j];
            }
        }
        mat
    }

    pub fn multiply(&self, other: &Self) -> Self {
        let mut mat = Self::zeros();
        for i in 0..N_STAGES {
            for j in 0..N_STAGES {
                for k in 0..N_STAGES {
                    mat.0[i][j] += self.0[i][k] * other.0[k][j];
                }
            }
        }
        mat
    }

    pub fn apply(&self, vec: &StageVector) -> StageVector {
        StageVector::new(self.apply_array(vec.as_array()))
    }

    fn apply_array(&self, vec: &[f64; N_STAGES]) -> [f64; N_STAGES] {
        let mut res = [0.0; N_STAGES];
        for (i, row) in self.0.iter().enumerate() {
            res[i] = row.iter().zip(vec).map(|(m, v)| m * v).sum();
        }
        res
    }

    /// Estimate the dominant eigenvalue by power iteration.
    ///
    /// Starts from the all-ones vector, renormalizes by the Euclidean norm
    /// after each of `iterations` products, and returns the Rayleigh quotient
    /// of the final vector. This is an approximation whose accuracy depends
    /// on the iteration budget and the spectral gap, not an exact eigensolver.
    /// A matrix that maps the iterate to zero yields `0.0`.
    pub fn dominant_eigenvalue(&self, iterations: usize) -> f64 {
        let mut vec = [1.0; N_STAGES];

        for _ in 0..iterations {
            let new_vec = self.apply_array(&vec);
            let norm = dot(&new_vec, &new_vec).sqrt();
            if norm == 0.0 {
                return 0.0;
            }
            vec = new_vec.map(|ele| ele / norm);
        }

        let mat_vec = self.apply_array(&vec);
        dot(&mat_vec, &vec) / dot(&vec, &vec)
    }
}

fn dot(a: &[f64; N_STAGES], b: &[f64; N_STAGES]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
