//! Pairwise squared Euclidean distances between point sets.

use crate::error::{GtmError, Result};
use nalgebra::DMatrix;

/// Squared Euclidean distance between row `i` of `a` and row `j` of `b`.
#[inline]
fn row_distance_squared(a: &DMatrix<f64>, i: usize, b: &DMatrix<f64>, j: usize) -> f64 {
    (0..a.ncols())
        .map(|k| {
            let diff = a[(i, k)] - b[(j, k)];
            diff * diff
        })
        .sum()
}

/// Computes all squared distances between the rows of `a` (n×d) and `b` (m×d).
///
/// The result is m×n: entry `(i, j)` is `||a[j] - b[i]||²`. Rows follow `b`,
/// columns follow `a`.
pub fn squared_distances(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let mut out = DMatrix::zeros(b.nrows(), a.nrows());
    squared_distances_into(a, b, &mut out)?;
    Ok(out)
}

/// Same as [`squared_distances`], writing into a caller-owned m×n buffer.
pub fn squared_distances_into(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    out: &mut DMatrix<f64>,
) -> Result<()> {
    if a.ncols() != b.ncols() {
        return Err(GtmError::InvalidArgument(format!(
            "Point dimension mismatch: {} vs {}",
            a.ncols(),
            b.ncols()
        )));
    }
    if out.shape() != (b.nrows(), a.nrows()) {
        return Err(GtmError::InvalidArgument(format!(
            "Distance buffer is {:?}, expected {:?}",
            out.shape(),
            (b.nrows(), a.nrows())
        )));
    }

    for j in 0..a.nrows() {
        for i in 0..b.nrows() {
            out[(i, j)] = row_distance_squared(a, j, b, i);
        }
    }

    Ok(())
}
