//! Lower-triangular dissimilarity matrix over training observations.

use crate::error::ProximityError;

/// Tolerance for the symmetry check on dense proximity input.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Symmetric dissimilarity matrix stored as a lower-triangular flat vector.
///
/// For `n` observations, stores `n*(n-1)/2` entries in [0, 1]. Access is
/// symmetric: `get(i, j) == get(j, i)`. Diagonal is always zero. The matrix
/// is never mutated after construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DissimilarityMatrix {
    n: usize,
    data: Vec<f64>,
}

/// Flat offset of `(row, col)` with `row > col`.
#[inline]
pub(crate) fn tri_offset(row: usize, col: usize) -> usize {
    row * (row - 1) / 2 + col
}

/// Number of strictly-lower-triangular entries for `n` observations.
#[inline]
pub(crate) fn n_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

impl DissimilarityMatrix {
    /// Create a matrix from pre-computed lower-triangular data.
    ///
    /// `data` must contain exactly `n*(n-1)/2` elements, stored as
    /// `data[row*(row-1)/2 + col]` where `row > col`.
    pub(crate) fn from_raw(n: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n_pairs(n));
        Self { n, data }
    }

    /// Build a dissimilarity matrix from a dense proximity matrix.
    ///
    /// Each entry becomes `1 - proximity`. The diagonal is ignored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ProximityError::NoObservations`] | `rows` is empty |
    /// | [`ProximityError::NotSquare`] | a row length differs from the row count |
    /// | [`ProximityError::ProximityOutOfRange`] | an entry is outside [0, 1] or not finite |
    /// | [`ProximityError::Asymmetric`] | `rows[i][j]` and `rows[j][i]` differ |
    pub fn from_proximity_rows(rows: &[Vec<f64>]) -> Result<Self, ProximityError> {
        let n = rows.len();
        if n == 0 {
            return Err(ProximityError::NoObservations);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(ProximityError::NotSquare {
                    row,
                    expected: n,
                    got: values.len(),
                });
            }
        }

        let mut data = Vec::with_capacity(n_pairs(n));
        for i in 1..n {
            for j in 0..i {
                let lower = rows[i][j];
                let upper = rows[j][i];
                for (r, c, value) in [(i, j, lower), (j, i, upper)] {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(ProximityError::ProximityOutOfRange { i: r, j: c, value });
                    }
                }
                if (lower - upper).abs() > SYMMETRY_TOLERANCE {
                    return Err(ProximityError::Asymmetric {
                        i: j,
                        j: i,
                        upper,
                        lower,
                    });
                }
                data.push(1.0 - 0.5 * (lower + upper));
            }
        }
        Ok(Self::from_raw(n, data))
    }

    /// Build the co-assignment distance implied by a partition.
    ///
    /// Entry `(i, j)` is `0.0` when `groups[i] == groups[j]` and `1.0`
    /// otherwise.
    #[must_use]
    pub fn from_partition<G: PartialEq>(groups: &[G]) -> Self {
        let n = groups.len();
        let mut data = Vec::with_capacity(n_pairs(n));
        for i in 1..n {
            for j in 0..i {
                data.push(if groups[i] == groups[j] { 0.0 } else { 1.0 });
            }
        }
        Self::from_raw(n, data)
    }

    /// Return the number of observations in the matrix.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the matrix covers no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the dissimilarity between observations `i` and `j`.
    ///
    /// Returns zero for `i == j` (diagonal).
    ///
    /// # Panics
    ///
    /// Panics if `i >= n` or `j >= n`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n, "row index {i} out of bounds for matrix of size {}", self.n);
        assert!(j < self.n, "column index {j} out of bounds for matrix of size {}", self.n);
        if i == j {
            return 0.0;
        }
        let (row, col) = if i > j { (i, j) } else { (j, i) };
        self.data[tri_offset(row, col)]
    }

    /// Iterate over all unique pairs `(i, j, dissimilarity)` where `i > j`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (1..self.n).flat_map(move |i| (0..i).map(move |j| (i, j, self.data[tri_offset(i, j)])))
    }

    /// Return the strictly-lower-triangular entries in row-major order.
    #[must_use]
    pub fn lower_triangle(&self) -> &[f64] {
        &self.data
    }

    /// Return all dissimilarities from observation `i` to every observation.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.n).map(|j| self.get(i, j)).collect()
    }
}
