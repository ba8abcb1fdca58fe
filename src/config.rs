//! Configuration for the GTM training engine.

use crate::error::{GtmError, Result};
use crate::gtm::basis::kernel_width;
use crate::gtm::grid::uniform_counts;
use crate::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Main configuration: model shape plus training loop settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Latent grid and basis network shape.
    pub model: GtmConfig,

    /// EM loop settings.
    pub training: TrainingConfig,
}

/// How the bias row of the initial weight matrix is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasRow {
    /// Every entry gets the mean of data dimension 0.
    ///
    /// Reproduces the reference numbers exactly; only meaningful when the data
    /// dimensions share a common scale.
    #[default]
    FirstDimensionMean,

    /// Entry `d` gets the mean of data dimension `d`.
    ColumnMeans,
}

/// Shape of the latent space and the RBF network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtmConfig {
    /// Dimensionality L of the latent space.
    /// Default: 1.
    pub latent_dimensions: usize,

    /// Number of latent samples along each latent axis.
    /// Default: 20.
    pub latent_samples_per_axis: usize,

    /// Number of RBF centers along each latent axis (at least 2).
    /// Default: 5.
    pub basis_functions_per_axis: usize,

    /// Kernel width as a multiple of the center spacing.
    /// Default: 2.0.
    pub spacing_scale: f64,

    /// Bias row initialization.
    /// Default: first dimension mean.
    pub bias_row: BiasRow,
}

impl Default for GtmConfig {
    fn default() -> Self {
        Self {
            latent_dimensions: 1,
            latent_samples_per_axis: 20,
            basis_functions_per_axis: 5,
            spacing_scale: 2.0,
            bias_row: BiasRow::FirstDimensionMean,
        }
    }
}

impl GtmConfig {
    /// Checks the configuration against a data set of `data_dimensions` columns.
    pub fn validate(&self, data_dimensions: usize) -> Result<()> {
        if self.latent_dimensions == 0 {
            return Err(GtmError::InvalidArgument(
                "latent_dimensions must be at least 1".to_string(),
            ));
        }
        if self.latent_dimensions > data_dimensions {
            return Err(GtmError::InvalidArgument(format!(
                "latent_dimensions {} exceeds data dimensions {}",
                self.latent_dimensions, data_dimensions
            )));
        }
        if self.latent_samples_per_axis < 2 {
            return Err(GtmError::InvalidArgument(format!(
                "latent_samples_per_axis must be at least 2, got {}",
                self.latent_samples_per_axis
            )));
        }
        if self.basis_functions_per_axis < 2 {
            return Err(GtmError::InvalidArgument(format!(
                "basis_functions_per_axis must be at least 2, got {}",
                self.basis_functions_per_axis
            )));
        }
        if !(self.spacing_scale.is_finite() && self.spacing_scale > 0.0) {
            return Err(GtmError::InvalidArgument(format!(
                "spacing_scale must be positive, got {}",
                self.spacing_scale
            )));
        }
        Ok(())
    }

    /// Gaussian kernel width: the spacing scale times the center spacing on [-1, 1].
    #[inline]
    pub fn kernel_width(&self) -> f64 {
        kernel_width(self.spacing_scale, self.basis_functions_per_axis)
    }

    /// Per-axis sample counts of the latent grid.
    pub fn latent_counts(&self) -> Vec<usize> {
        uniform_counts(self.latent_samples_per_axis, self.latent_dimensions)
    }

    /// Per-axis counts of the basis center grid.
    pub fn basis_counts(&self) -> Vec<usize> {
        uniform_counts(self.basis_functions_per_axis, self.latent_dimensions)
    }

    /// Total number of latent grid points.
    pub fn total_latent_samples(&self) -> usize {
        self.latent_samples_per_axis.pow(self.latent_dimensions as u32)
    }

    /// Total number of RBF centers (excluding the bias feature).
    pub fn total_basis_functions(&self) -> usize {
        self.basis_functions_per_axis.pow(self.latent_dimensions as u32)
    }
}

/// EM loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Hard cap on EM iterations.
    /// Default: 1000.
    pub max_iterations: usize,

    /// Stop once successive log-likelihoods differ by at most this much.
    /// Default: 0.01.
    pub tolerance: f64,

    /// Subtract each column minimum before exponentiating in the E-step.
    /// Default: true.
    pub stabilized_responsibilities: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            stabilized_responsibilities: true,
        }
    }
}

impl TrainingConfig {
    /// Checks the loop settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(GtmError::InvalidArgument(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(GtmError::InvalidArgument(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.latent_dimensions, 1);
        assert_eq!(config.model.total_latent_samples(), 20);
        assert_eq!(config.model.total_basis_functions(), 5);
        assert_eq!(config.training.max_iterations, 1000);
        assert!((config.training.tolerance - 0.01).abs() < 1e-12);
        assert_eq!(config.model.bias_row, BiasRow::FirstDimensionMean);
    }

    #[test]
    fn test_kernel_width() {
        let config = GtmConfig::default();
        // s = 2, spacing 2 / 4
        assert!((config.kernel_width() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_totals_2d() {
        let config = GtmConfig {
            latent_dimensions: 2,
            latent_samples_per_axis: 10,
            basis_functions_per_axis: 4,
            ..Default::default()
        };
        assert_eq!(config.total_latent_samples(), 100);
        assert_eq!(config.total_basis_functions(), 16);
        assert_eq!(config.latent_counts(), vec![10, 10]);
        assert_eq!(config.basis_counts(), vec![4, 4]);
    }

    #[test]
    fn test_validate() {
        let config = GtmConfig::default();
        assert!(config.validate(2).is_ok());
        assert!(config.validate(1).is_ok());

        let too_many_latent = GtmConfig {
            latent_dimensions: 3,
            ..Default::default()
        };
        assert!(too_many_latent.validate(2).is_err());

        let one_basis = GtmConfig {
            basis_functions_per_axis: 1,
            ..Default::default()
        };
        assert!(matches!(
            one_basis.validate(2),
            Err(GtmError::InvalidArgument(_))
        ));

        let bad_scale = GtmConfig {
            spacing_scale: 0.0,
            ..Default::default()
        };
        assert!(bad_scale.validate(2).is_err());
    }

    #[test]
    fn test_minimum_basis_functions() {
        let config = GtmConfig {
            basis_functions_per_axis: 2,
            ..Default::default()
        };
        assert!(config.validate(2).is_ok());
        assert!((config.kernel_width() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_training_validate() {
        assert!(TrainingConfig::default().validate().is_ok());
        let config = TrainingConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
