//! Radial basis function network over the latent grid.

use crate::config::GtmConfig;
use crate::error::{GtmError, Result};
use crate::gtm::distance::squared_distances;
use crate::gtm::grid::build_grid;
use nalgebra::DMatrix;

/// Kernel width for `basis_per_axis` centers spread over `[-1, 1]`.
#[inline]
pub fn kernel_width(spacing_scale: f64, basis_per_axis: usize) -> f64 {
    spacing_scale * (2.0 / (basis_per_axis as f64 - 1.0))
}

/// Builds the n×(m+1) design matrix Φ.
///
/// Row `k` holds the Gaussian responses `exp(-||x_k - μ_j||² / (2σ²))` of
/// latent sample `k` to every center `j`, followed by a constant 1 bias feature.
pub fn build_design_matrix(
    centers: &DMatrix<f64>,
    samples: &DMatrix<f64>,
    kernel_width: f64,
) -> Result<DMatrix<f64>> {
    if !(kernel_width.is_finite() && kernel_width > 0.0) {
        return Err(GtmError::InvalidArgument(format!(
            "Kernel width must be positive, got {}",
            kernel_width
        )));
    }

    // centers × samples, read transposed below.
    let dist = squared_distances(samples, centers)?;
    let scale = -1.0 / (2.0 * kernel_width * kernel_width);
    let num_centers = centers.nrows();

    let design = DMatrix::from_fn(samples.nrows(), num_centers + 1, |k, j| {
        if j == num_centers {
            1.0
        } else {
            (dist[(j, k)] * scale).exp()
        }
    });

    Ok(design)
}

/// Latent grid, RBF centers and the design matrix built from them.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct BasisNetwork {
    latent_grid: DMatrix<f64>,
    centers: DMatrix<f64>,
    kernel_width: f64,
    design: DMatrix<f64>,
}

impl BasisNetwork {
    /// Builds the latent grid, the center grid and Φ for `config`.
    pub fn new(config: &GtmConfig) -> Result<Self> {
        let latent_grid = build_grid(&config.latent_counts())?;
        let centers = build_grid(&config.basis_counts())?;
        let kernel_width = config.kernel_width();
        let design = build_design_matrix(&centers, &latent_grid, kernel_width)?;

        Ok(Self {
            latent_grid,
            centers,
            kernel_width,
            design,
        })
    }

    /// Latent sample grid, one point per row.
    #[inline]
    pub fn latent_grid(&self) -> &DMatrix<f64> {
        &self.latent_grid
    }

    /// RBF centers, one point per row.
    #[inline]
    pub fn centers(&self) -> &DMatrix<f64> {
        &self.centers
    }

    /// Gaussian kernel width σ.
    #[inline]
    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
    }

    /// Design matrix Φ.
    #[inline]
    pub fn design(&self) -> &DMatrix<f64> {
        &self.design
    }

    /// Number of latent grid points.
    #[inline]
    pub fn num_latent_samples(&self) -> usize {
        self.latent_grid.nrows()
    }

    /// Number of features per row of Φ (centers plus bias).
    #[inline]
    pub fn num_features(&self) -> usize {
        self.design.ncols()
    }
}
