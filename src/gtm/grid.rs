//! Uniform rectangular lattices on the latent hypercube.

use crate::error::{GtmError, Result};
use nalgebra::DMatrix;

/// Returns `dims` copies of `per_axis`.
pub fn uniform_counts(per_axis: usize, dims: usize) -> Vec<usize> {
    vec![per_axis; dims]
}

/// Builds a uniform grid over `[-1, 1]^L` with `counts[i]` samples on axis `i`.
///
/// One point per row, `∏counts` rows. The row index is read as a mixed-radix
/// number whose digit `i` ranges over `counts[i]`, with axis 0 as the
/// fastest-varying digit. Digit `d` on axis `i` maps to
/// `-1 + d * 2 / (counts[i] - 1)`, so both ends of each axis are included.
pub fn build_grid(counts: &[usize]) -> Result<DMatrix<f64>> {
    if counts.is_empty() {
        return Err(GtmError::InvalidArgument(
            "Grid needs at least one axis".to_string(),
        ));
    }
    if let Some((axis, &count)) = counts.iter().enumerate().find(|(_, &c)| c < 2) {
        return Err(GtmError::InvalidArgument(format!(
            "Grid axis {} has {} samples, at least 2 required",
            axis, count
        )));
    }

    let total = counts
        .iter()
        .try_fold(1usize, |acc, &c| acc.checked_mul(c))
        .ok_or_else(|| GtmError::InvalidArgument("Grid point count overflows".to_string()))?;
    let dims = counts.len();
    let steps: Vec<f64> = counts.iter().map(|&c| 2.0 / (c as f64 - 1.0)).collect();

    let mut grid = DMatrix::zeros(total, dims);
    let mut digits = vec![0usize; dims];

    for row in 0..total {
        for axis in 0..dims {
            grid[(row, axis)] = -1.0 + steps[axis] * digits[axis] as f64;
        }

        // Increment the mixed-radix counter, carrying into slower axes.
        for axis in 0..dims {
            digits[axis] += 1;
            if digits[axis] < counts[axis] {
                break;
            }
            digits[axis] = 0;
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_dimensional_grid() {
        let grid = build_grid(&[5]).unwrap();
        assert_eq!(grid.nrows(), 5);
        assert_eq!(grid.ncols(), 1);

        let expected = [-1.0, -0.5, 0.0, 0.5, 1.0];
        for (row, &value) in expected.iter().enumerate() {
            assert!((grid[(row, 0)] - value).abs() < 1e-12);
        }
    }

    #[test]
    fn test_axis_zero_varies_fastest() {
        let grid = build_grid(&[3, 2]).unwrap();
        assert_eq!(grid.nrows(), 6);

        let expected = [
            [-1.0, -1.0],
            [0.0, -1.0],
            [1.0, -1.0],
            [-1.0, 1.0],
            [0.0, 1.0],
            [1.0, 1.0],
        ];
        for (row, point) in expected.iter().enumerate() {
            assert!((grid[(row, 0)] - point[0]).abs() < 1e-12);
            assert!((grid[(row, 1)] - point[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cartesian_product() {
        let counts = [4, 3, 2];
        let grid = build_grid(&counts).unwrap();
        assert_eq!(grid.nrows(), 24);

        let axis_values: Vec<Vec<f64>> = counts
            .iter()
            .map(|&c| (0..c).map(|d| -1.0 + 2.0 * d as f64 / (c as f64 - 1.0)).collect())
            .collect();

        // Every product tuple appears exactly once.
        let mut seen = vec![false; grid.nrows()];
        for a in &axis_values[0] {
            for b in &axis_values[1] {
                for c in &axis_values[2] {
                    let hit = (0..grid.nrows()).find(|&r| {
                        (grid[(r, 0)] - a).abs() < 1e-12
                            && (grid[(r, 1)] - b).abs() < 1e-12
                            && (grid[(r, 2)] - c).abs() < 1e-12
                    });
                    let r = hit.expect("grid point missing");
                    assert!(!seen[r]);
                    seen[r] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert!(grid.iter().all(|&v| (-1.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_invalid_counts() {
        assert!(matches!(build_grid(&[]), Err(GtmError::InvalidArgument(_))));
        assert!(matches!(build_grid(&[1]), Err(GtmError::InvalidArgument(_))));
        assert!(matches!(build_grid(&[5, 0]), Err(GtmError::InvalidArgument(_))));
    }

    #[test]
    fn test_minimum_count() {
        let grid = build_grid(&[2, 2]).unwrap();
        assert_eq!(grid.nrows(), 4);
        assert_eq!(grid[(3, 0)], 1.0);
        assert_eq!(grid[(3, 1)], 1.0);
    }

    #[test]
    fn test_uniform_counts() {
        assert_eq!(uniform_counts(20, 2), vec![20, 20]);
        assert!(uniform_counts(5, 0).is_empty());
    }
}
