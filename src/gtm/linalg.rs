//! Dense linear-algebra helpers shared by initialization and the M-step.

use crate::error::{GtmError, Result};
use nalgebra::DMatrix;

/// Solves `lhs · X = rhs` for `X` via LU decomposition.
///
/// `context` names the caller in the error message. Fails with
/// [`GtmError::SingularMatrix`] when `lhs` is not invertible or the solution
/// is not finite.
pub fn solve_normal_equations(
    lhs: DMatrix<f64>,
    rhs: &DMatrix<f64>,
    context: &str,
) -> Result<DMatrix<f64>> {
    if !lhs.is_square() || lhs.nrows() != rhs.nrows() {
        return Err(GtmError::InvalidArgument(format!(
            "{}: cannot solve {:?} system against {:?} right-hand side",
            context,
            lhs.shape(),
            rhs.shape()
        )));
    }

    let order = lhs.nrows();
    let solution = lhs.lu().solve(rhs).ok_or_else(|| {
        GtmError::SingularMatrix(format!(
            "{}: {}x{} matrix is not invertible",
            context, order, order
        ))
    })?;

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(GtmError::SingularMatrix(format!(
            "{}: solution is not finite",
            context
        )));
    }

    Ok(solution)
}
