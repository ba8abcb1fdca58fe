//! Principal-component initialization of the manifold embedding.
//!
//! The initial map sends the latent grid onto the plane spanned by the top-L
//! principal axes of the data, each axis scaled by its standard deviation.
//! The initial noise precision comes from the spacing of the resulting
//! embedding, capped by the variance left in the discarded components.

use crate::config::BiasRow;
use crate::error::{GtmError, Result};
use crate::gtm::distance::squared_distances;
use crate::gtm::linalg::solve_normal_equations;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Sample covariance of the columns of `data` (denominator `n - 1`).
pub fn covariance(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = data.nrows();
    if n < 2 {
        return Err(GtmError::InvalidArgument(format!(
            "Covariance needs at least 2 points, got {}",
            n
        )));
    }

    let means = data.row_mean();
    let centered = DMatrix::from_fn(n, data.ncols(), |i, j| data[(i, j)] - means[j]);

    Ok(centered.transpose() * &centered / (n as f64 - 1.0))
}

/// Eigen-decomposition of the data covariance, largest eigenvalue first.
#[derive(Debug, Clone)]
pub struct PrincipalComponents {
    /// Eigenvalues in descending order.
    pub eigenvalues: DVector<f64>,
    /// Unit eigenvectors, column `i` belonging to `eigenvalues[i]`.
    pub eigenvectors: DMatrix<f64>,
}

impl PrincipalComponents {
    /// Decomposes the covariance of `data`.
    pub fn from_data(data: &DMatrix<f64>) -> Result<Self> {
        let eigen = covariance(data)?.symmetric_eigen();
        let dims = eigen.eigenvalues.len();

        let mut order: Vec<usize> = (0..dims).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let eigenvalues = DVector::from_fn(dims, |i, _| eigen.eigenvalues[order[i]]);
        let eigenvectors = DMatrix::from_fn(dims, dims, |r, c| eigen.eigenvectors[(r, order[c])]);

        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    /// Number of data dimensions.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.eigenvalues.len()
    }

    /// The D×L basis of the top `l` eigenvectors, each scaled by `sqrt(λ)`.
    ///
    /// Round-off can leave tiny negative eigenvalues; those scale to zero.
    pub fn scaled_basis(&self, l: usize) -> DMatrix<f64> {
        DMatrix::from_fn(self.dimensions(), l, |r, c| {
            self.eigenvectors[(r, c)] * self.eigenvalues[c].max(0.0).sqrt()
        })
    }
}

/// Initial weights, embedding and noise precision.
#[derive(Debug, Clone)]
pub struct InitialState {
    /// (M+1)×D weight matrix.
    pub weights: DMatrix<f64>,
    /// Φ·W.
    pub embedding: DMatrix<f64>,
    /// Initial noise precision β.
    pub beta: f64,
    /// Principal components of the data.
    pub components: PrincipalComponents,
}

/// Average squared distance from each embedding node to its nearest other node.
pub fn mean_nearest_neighbour_distance(embedding: &DMatrix<f64>) -> Result<f64> {
    let n = embedding.nrows();
    if n < 2 {
        return Err(GtmError::InvalidArgument(
            "Nearest-neighbour spacing needs at least 2 nodes".to_string(),
        ));
    }

    let mut inter = squared_distances(embedding, embedding)?;
    for i in 0..n {
        inter[(i, i)] = f64::MAX;
    }

    let total: f64 = inter.row_iter().map(|row| row.min()).sum();
    Ok(total / n as f64)
}

/// Places the initial embedding on the principal subspace of `data`.
///
/// `design` is Φ (n_lat×(M+1)) and `latent_grid` the n_lat×L latent samples.
pub fn initialize(
    data: &DMatrix<f64>,
    design: &DMatrix<f64>,
    latent_grid: &DMatrix<f64>,
    bias_row: BiasRow,
) -> Result<InitialState> {
    let dims = data.ncols();
    let latent_dims = latent_grid.ncols();

    if design.nrows() != latent_grid.nrows() {
        return Err(GtmError::InvalidArgument(format!(
            "Design matrix has {} rows but latent grid has {}",
            design.nrows(),
            latent_grid.nrows()
        )));
    }
    if latent_dims == 0 || latent_dims > dims {
        return Err(GtmError::InvalidArgument(format!(
            "Latent dimensionality {} incompatible with data dimensionality {}",
            latent_dims, dims
        )));
    }

    let components = PrincipalComponents::from_data(data)?;
    debug!("Covariance eigenvalues: {:?}", components.eigenvalues.as_slice());

    let target = latent_grid * components.scaled_basis(latent_dims).transpose();
    let design_t = design.transpose();
    let gram = &design_t * design;
    let mut weights = solve_normal_equations(gram, &(&design_t * target), "PCA initialization")?;

    let bias = weights.nrows() - 1;
    match bias_row {
        BiasRow::FirstDimensionMean => {
            let mean = data.column(0).mean();
            weights.row_mut(bias).fill(mean);
        }
        BiasRow::ColumnMeans => {
            let means = data.row_mean();
            weights.row_mut(bias).copy_from(&means);
        }
    }

    let embedding = design * &weights;

    let mut beta = 2.0 / mean_nearest_neighbour_distance(&embedding)?;
    if latent_dims < dims {
        let discarded = components.eigenvalues[latent_dims];
        if discarded > 0.0 {
            beta = beta.min(1.0 / discarded);
        }
    }

    if !(beta.is_finite() && beta > 0.0) {
        return Err(GtmError::NumericInstability(format!(
            "Initial noise precision is {}",
            beta
        )));
    }

    Ok(InitialState {
        weights,
        embedding,
        beta,
        components,
    })
}
