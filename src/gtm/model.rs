//! Fitted GTM and the queries it answers.

use crate::config::Config;
use crate::error::{GtmError, Result};
use crate::gtm::distance::squared_distances;
use crate::gtm::trainer::normalize_responsibilities;
use crate::storage::{write_log_likelihoods, ModelFormat};
use nalgebra::DMatrix;
use std::path::Path;
use std::time::Duration;

/// The result of a training run.
///
/// Holds the input points, the fitted embedding (one row per latent node),
/// the weight matrix, the noise precision β and the log-likelihood trace.
#[derive(Debug, Clone)]
pub struct GtmModel {
    config: Config,
    input: DMatrix<f64>,
    latent_grid: DMatrix<f64>,
    weights: DMatrix<f64>,
    embedding: DMatrix<f64>,
    beta: f64,
    log_likelihoods: Vec<f64>,
}

impl GtmModel {
    pub(crate) fn from_parts(
        config: Config,
        input: DMatrix<f64>,
        latent_grid: DMatrix<f64>,
        weights: DMatrix<f64>,
        embedding: DMatrix<f64>,
        beta: f64,
        log_likelihoods: Vec<f64>,
    ) -> Self {
        Self {
            config,
            input,
            latent_grid,
            weights,
            embedding,
            beta,
            log_likelihoods,
        }
    }

    /// Configuration the model was trained with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Training points, one per row.
    pub fn input(&self) -> &DMatrix<f64> {
        &self.input
    }

    /// Latent grid, one node per row.
    pub fn latent_grid(&self) -> &DMatrix<f64> {
        &self.latent_grid
    }

    /// Weight matrix W.
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Fitted embedding of the latent grid in data space.
    pub fn embedding(&self) -> &DMatrix<f64> {
        &self.embedding
    }

    /// Noise precision β.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Noise standard deviation `sqrt(1/β)`, used as a marker radius when plotting.
    pub fn noise_radius(&self) -> f64 {
        (1.0 / self.beta).sqrt()
    }

    /// Log-likelihood of every training iteration.
    pub fn log_likelihoods(&self) -> &[f64] {
        &self.log_likelihoods
    }

    /// Posterior responsibilities (nodes × points) of the model for `points`.
    pub fn responsibilities(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if points.ncols() != self.embedding.ncols() {
            return Err(GtmError::InvalidArgument(format!(
                "Points have {} dimensions, model has {}",
                points.ncols(),
                self.embedding.ncols()
            )));
        }

        let distances = squared_distances(points, &self.embedding)?;
        let mut responsibilities = DMatrix::zeros(distances.nrows(), distances.ncols());
        normalize_responsibilities(&distances, self.beta, true, &mut responsibilities)?;
        Ok(responsibilities)
    }

    /// Responsibility-weighted mean latent position of each point (points × L).
    pub fn latent_means(&self, points: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let responsibilities = self.responsibilities(points)?;
        Ok(responsibilities.transpose() * &self.latent_grid)
    }

    /// Index of the most responsible latent node for each point.
    pub fn latent_modes(&self, points: &DMatrix<f64>) -> Result<Vec<usize>> {
        let responsibilities = self.responsibilities(points)?;
        Ok(responsibilities
            .column_iter()
            .map(|column| column.imax())
            .collect())
    }

    /// Writes the embedding and fitted parameters to a binary model file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ModelFormat::write(path, self)
    }

    /// Writes the log-likelihood trace as text, followed by `elapsed`.
    pub fn save_log_likelihoods<P: AsRef<Path>>(&self, path: P, elapsed: Duration) -> Result<()> {
        write_log_likelihoods(path, &self.log_likelihoods, elapsed)
    }
}
