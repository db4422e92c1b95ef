//! Unitary matrices and their composition.

use ndarray::Array2;
use num_complex::Complex64;

use crate::location::Location;

/// A square complex matrix representing a gate or circuit transformation.
///
/// Basis convention: qudit 0 is the most significant digit of a basis-state
/// index, so for two qubits the basis order is |00>, |01>, |10>, |11> with
/// the first digit belonging to qudit 0.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitaryMatrix {
    matrix: Array2<Complex64>,
}

impl UnitaryMatrix {
    /// Wrap a square matrix.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not square.
    pub fn new(matrix: Array2<Complex64>) -> Self {
        assert_eq!(
            matrix.nrows(),
            matrix.ncols(),
            "unitary matrix must be square"
        );
        Self { matrix }
    }

    /// The identity transformation of the given dimension.
    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: Array2::eye(dim),
        }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Borrow the underlying matrix.
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// Matrix product `self · other` (`other` applied first under the
    /// column-vector convention).
    pub fn dot(&self, other: &UnitaryMatrix) -> UnitaryMatrix {
        UnitaryMatrix {
            matrix: self.matrix.dot(&other.matrix),
        }
    }

    /// Embed this matrix into a `num_qudits`-qudit system at `location`,
    /// acting as the identity on every other qudit.
    ///
    /// `location[t]` carries the t-th (most-significant-first) digit of this
    /// matrix's local basis index, so a permuted location tuple permutes the
    /// local basis accordingly.
    pub fn embed(&self, location: &Location, num_qudits: usize) -> UnitaryMatrix {
        let dim = 1usize << num_qudits;
        let k = location.len();
        let ldim = 1usize << k;
        debug_assert_eq!(self.dim(), ldim, "matrix dimension must match location");

        // Bit position of global qudit q, counted from the least significant bit.
        let shift = |q: usize| num_qudits - 1 - q;
        let mask: usize = location.iter().map(|&q| 1usize << shift(q)).sum();

        let mut out = Array2::zeros((dim, dim));
        for row in 0..dim {
            let mut lrow = 0usize;
            for (t, &q) in location.iter().enumerate() {
                if (row >> shift(q)) & 1 == 1 {
                    lrow |= 1 << (k - 1 - t);
                }
            }
            let rest = row & !mask;
            for lcol in 0..ldim {
                let mut col = rest;
                for (t, &q) in location.iter().enumerate() {
                    if (lcol >> (k - 1 - t)) & 1 == 1 {
                        col |= 1 << shift(q);
                    }
                }
                out[[row, col]] = self.matrix[[lrow, lcol]];
            }
        }
        UnitaryMatrix { matrix: out }
    }

    /// Distance to another unitary, insensitive to global phase:
    /// `sqrt(1 - |tr(A† B)|² / dim²)`. Zero for equal unitaries.
    pub fn distance_from(&self, other: &UnitaryMatrix) -> f64 {
        debug_assert_eq!(self.dim(), other.dim());
        let mut trace = Complex64::new(0.0, 0.0);
        for i in 0..self.dim() {
            for j in 0..self.dim() {
                trace += self.matrix[[j, i]].conj() * other.matrix[[j, i]];
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let normalized = trace.norm() / self.dim() as f64;
        (1.0 - normalized * normalized).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn x_matrix() -> UnitaryMatrix {
        UnitaryMatrix::new(array![
            [c(0.0, 0.0), c(1.0, 0.0)],
            [c(1.0, 0.0), c(0.0, 0.0)],
        ])
    }

    #[test]
    fn test_identity() {
        let id = UnitaryMatrix::identity(4);
        assert_eq!(id.dim(), 4);
        assert!(id.distance_from(&UnitaryMatrix::identity(4)) < 1e-12);
    }

    #[test]
    fn test_embed_x_on_second_qudit() {
        // X on qudit 1 of 2 = I ⊗ X: swaps |00>↔|01> and |10>↔|11>.
        let loc = Location::new(vec![1]).unwrap();
        let full = x_matrix().embed(&loc, 2);
        let m = full.matrix();
        assert_eq!(m[[0, 1]], c(1.0, 0.0));
        assert_eq!(m[[1, 0]], c(1.0, 0.0));
        assert_eq!(m[[2, 3]], c(1.0, 0.0));
        assert_eq!(m[[3, 2]], c(1.0, 0.0));
        assert_eq!(m[[0, 0]], c(0.0, 0.0));
    }

    #[test]
    fn test_embed_permuted_location() {
        // CX embedded at (1, 0): control is qudit 1, target qudit 0.
        let cx = UnitaryMatrix::new(array![
            [c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            [c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            [c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0), c(0.0, 0.0)],
        ]);
        let loc = Location::new(vec![1, 0]).unwrap();
        let full = cx.embed(&loc, 2);
        // |01> (q1 = 1) flips q0: |01> -> |11>, i.e. index 1 -> 3.
        let m = full.matrix();
        assert_eq!(m[[3, 1]], c(1.0, 0.0));
        assert_eq!(m[[1, 3]], c(1.0, 0.0));
        assert_eq!(m[[0, 0]], c(1.0, 0.0));
        assert_eq!(m[[2, 2]], c(1.0, 0.0));
    }

    #[test]
    fn test_distance_ignores_global_phase() {
        let x = x_matrix();
        let phased = UnitaryMatrix::new(x.matrix() * Complex64::from_polar(1.0, 0.7));
        assert!(x.distance_from(&phased) < 1e-12);
    }

    #[test]
    fn test_distance_detects_difference() {
        let x = x_matrix();
        let id = UnitaryMatrix::identity(2);
        assert!(x.distance_from(&id) > 0.9);
    }
}
