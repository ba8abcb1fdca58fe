//! Expectation-Maximization training of the GTM.
//!
//! Each iteration runs an E-step, which turns the node-to-point squared
//! distances into posterior responsibilities, followed by an M-step, which
//! re-solves the weight map and the noise precision from those
//! responsibilities. The loop stops when the log-likelihood stops moving or
//! the iteration cap is reached.

use crate::config::Config;
use crate::error::{GtmError, Result};
use crate::gtm::basis::BasisNetwork;
use crate::gtm::distance::{squared_distances, squared_distances_into};
use crate::gtm::linalg::solve_normal_equations;
use crate::gtm::model::GtmModel;
use crate::gtm::pca::{self, InitialState};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

/// Writes normalized responsibilities for `distances` (nodes × points) into `out`.
///
/// Column `n` of `out` becomes `exp(-β/2 · distances[:, n])` divided by its sum.
/// Returns the sum over points of the log of each column's normalizer. With
/// `stabilized`, each column minimum is subtracted before exponentiating and
/// added back to the log normalizer, which leaves both results unchanged but
/// keeps the largest term at `exp(0)`.
pub(crate) fn normalize_responsibilities(
    distances: &DMatrix<f64>,
    beta: f64,
    stabilized: bool,
    out: &mut DMatrix<f64>,
) -> Result<f64> {
    if out.shape() != distances.shape() {
        return Err(GtmError::InvalidArgument(format!(
            "Responsibility buffer is {:?}, expected {:?}",
            out.shape(),
            distances.shape()
        )));
    }

    let half_beta = beta / 2.0;
    let mut log_sum = 0.0;

    for n in 0..distances.ncols() {
        let dist = distances.column(n);
        let shift = if stabilized { dist.min() } else { 0.0 };
        let mut resp = out.column_mut(n);

        let mut normalizer = 0.0;
        for k in 0..dist.len() {
            let value = (-half_beta * (dist[k] - shift)).exp();
            resp[k] = value;
            normalizer += value;
        }

        if !(normalizer.is_finite() && normalizer > 0.0) {
            return Err(GtmError::NumericInstability(format!(
                "Responsibility normalizer of data point {} is {}",
                n, normalizer
            )));
        }

        log_sum += normalizer.ln() - half_beta * shift;
        resp *= 1.0 / normalizer;
    }

    Ok(log_sum)
}

/// Outcome of a call to [`GtmTrainer::train`].
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Completed EM iterations (length of the log-likelihood trace).
    pub iterations: usize,
    /// Whether the log-likelihood settled before the iteration cap.
    pub converged: bool,
    /// Last log-likelihood in the trace.
    pub log_likelihood: f64,
    /// Final noise precision.
    pub beta: f64,
    /// Wall-clock time spent in this call.
    pub elapsed: Duration,
}

/// GTM trainer owning every matrix of one training run.
///
/// The latent grid, centers and design matrix are fixed at construction.
/// Weights, embedding, responsibilities, distances and β are rewritten once
/// per iteration. After an error the run is invalid; call [`reset`](Self::reset)
/// before training again.
#[derive(Debug, Clone)]
pub struct GtmTrainer {
    config: Config,
    data: DMatrix<f64>,
    network: BasisNetwork,
    initial: InitialState,
    weights: DMatrix<f64>,
    embedding: DMatrix<f64>,
    /// R: nodes × points posterior probabilities.
    responsibilities: DMatrix<f64>,
    /// DIST: nodes × points squared distances to the current embedding.
    distances: DMatrix<f64>,
    beta: f64,
    log_likelihoods: Vec<f64>,
}

impl GtmTrainer {
    /// Sets up the basis network and the PCA initialization for `data` (one point per row).
    pub fn new(config: Config, data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(GtmError::EmptyInput(format!(
                "Training data is {}x{}",
                data.nrows(),
                data.ncols()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(GtmError::InvalidArgument(
                "Training data contains non-finite values".to_string(),
            ));
        }
        config.model.validate(data.ncols())?;
        config.training.validate()?;

        let start = Instant::now();

        let network = BasisNetwork::new(&config.model)?;
        let initial = pca::initialize(
            &data,
            network.design(),
            network.latent_grid(),
            config.model.bias_row,
        )?;
        let distances = squared_distances(&data, &initial.embedding)?;
        let responsibilities = DMatrix::zeros(distances.nrows(), distances.ncols());

        info!(
            "GTM setup: {} points, {} dims, {} latent nodes, {} basis functions, beta={:.6} ({:?})",
            data.nrows(),
            data.ncols(),
            network.num_latent_samples(),
            network.num_features() - 1,
            initial.beta,
            start.elapsed()
        );

        Ok(Self {
            weights: initial.weights.clone(),
            embedding: initial.embedding.clone(),
            beta: initial.beta,
            config,
            data,
            network,
            initial,
            responsibilities,
            distances,
            log_likelihoods: Vec::new(),
        })
    }

    /// E-step: recomputes the responsibilities from β and the current distances.
    ///
    /// Returns the summed log normalizers used by the log-likelihood. Only R is
    /// written, so calling this twice in a row yields identical results.
    pub fn compute_responsibilities(&mut self) -> Result<f64> {
        normalize_responsibilities(
            &self.distances,
            self.beta,
            self.config.training.stabilized_responsibilities,
            &mut self.responsibilities,
        )
    }

    /// M-step: records the log-likelihood, then re-solves W, Y, DIST and β.
    ///
    /// `log_sum` is the value returned by the preceding E-step. Returns the
    /// log-likelihood appended to the trace.
    pub fn reestimate(&mut self, log_sum: f64) -> Result<f64> {
        let num_points = self.data.nrows() as f64;
        let dims = self.data.ncols() as f64;
        let num_nodes = self.network.num_latent_samples() as f64;

        let llh = log_sum + num_points * ((dims / 2.0) * (self.beta / TAU).ln() - num_nodes.ln());
        self.log_likelihoods.push(llh);

        let design = self.network.design();

        // Φᵀ·G with G = diag(row sums of R).
        let node_mass = self.responsibilities.column_sum();
        let mut weighted_t = design.transpose();
        for (k, mut column) in weighted_t.column_iter_mut().enumerate() {
            column *= node_mass[k];
        }

        let lhs = &weighted_t * design;
        let rhs = design.transpose() * (&self.responsibilities * &self.data);
        self.weights = solve_normal_equations(lhs, &rhs, "M-step")?;
        self.embedding = design * &self.weights;

        squared_distances_into(&self.data, &self.embedding, &mut self.distances)?;

        let residual = self.responsibilities.dot(&self.distances);
        if !(residual.is_finite() && residual > 0.0) {
            return Err(GtmError::NumericInstability(format!(
                "Weighted residual is {}",
                residual
            )));
        }
        self.beta = num_points * dims / residual;

        Ok(llh)
    }

    /// Runs one E-step and one M-step, returning the new log-likelihood.
    pub fn step(&mut self) -> Result<f64> {
        let log_sum = self.compute_responsibilities()?;
        self.reestimate(log_sum)
    }

    /// True once at least two iterations ran and the last two log-likelihoods
    /// differ by no more than the tolerance.
    pub fn has_converged(&self) -> bool {
        match self.log_likelihoods.as_slice() {
            [.., previous, last] => (last - previous).abs() <= self.config.training.tolerance,
            _ => false,
        }
    }

    /// Iterates until convergence or the iteration cap.
    pub fn train(&mut self) -> Result<TrainingReport> {
        let start = Instant::now();
        let max_iterations = self.config.training.max_iterations;

        info!(
            "Training GTM: tolerance={}, max_iterations={}",
            self.config.training.tolerance, max_iterations
        );

        let converged = loop {
            let cycle_start = Instant::now();
            let llh = self.step()?;
            let iterations = self.log_likelihoods.len();

            debug!(
                "Iteration {}: llh={:.6}, beta={:.6} ({:?})",
                iterations,
                llh,
                self.beta,
                cycle_start.elapsed()
            );

            if self.has_converged() {
                break true;
            }
            if iterations >= max_iterations {
                warn!(
                    "GTM stopped at the iteration cap ({}) without converging",
                    max_iterations
                );
                break false;
            }
        };

        let report = TrainingReport {
            iterations: self.log_likelihoods.len(),
            converged,
            log_likelihood: self.log_likelihoods.last().copied().unwrap_or(f64::NAN),
            beta: self.beta,
            elapsed: start.elapsed(),
        };

        info!(
            "GTM training finished: {} iterations, llh={:.6}, beta={:.6} ({:?})",
            report.iterations, report.log_likelihood, report.beta, report.elapsed
        );

        Ok(report)
    }

    /// Restores the state right after setup so an independent run can start.
    pub fn reset(&mut self) -> Result<()> {
        self.weights = self.initial.weights.clone();
        self.embedding = self.initial.embedding.clone();
        self.beta = self.initial.beta;
        squared_distances_into(&self.data, &self.embedding, &mut self.distances)?;
        self.responsibilities.fill(0.0);
        self.log_likelihoods.clear();
        Ok(())
    }

    /// Consumes the trainer, keeping the fitted model.
    pub fn into_model(self) -> GtmModel {
        GtmModel::from_parts(
            self.config,
            self.data,
            self.network.latent_grid().clone(),
            self.weights,
            self.embedding,
            self.beta,
            self.log_likelihoods,
        )
    }

    /// Configuration of this run.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Training data, one point per row.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Latent grid, centers and design matrix.
    pub fn network(&self) -> &BasisNetwork {
        &self.network
    }

    /// Design matrix Φ.
    pub fn design_matrix(&self) -> &DMatrix<f64> {
        self.network.design()
    }

    /// Latent sample grid.
    pub fn latent_grid(&self) -> &DMatrix<f64> {
        self.network.latent_grid()
    }

    /// Current weight matrix W.
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Current embedding Y = Φ·W.
    pub fn embedding(&self) -> &DMatrix<f64> {
        &self.embedding
    }

    /// Responsibilities from the most recent E-step.
    pub fn responsibilities(&self) -> &DMatrix<f64> {
        &self.responsibilities
    }

    /// Squared distances from each node to each data point.
    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distances
    }

    /// Current noise precision β.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Log-likelihood of every completed iteration.
    pub fn log_likelihood_trace(&self) -> &[f64] {
        &self.log_likelihoods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GtmConfig, TrainingConfig};
    use crate::dataset::sine_curve;

    fn sine_trainer() -> GtmTrainer {
        GtmTrainer::new(Config::default(), sine_curve()).unwrap()
    }

    fn assert_columns_normalized(r: &DMatrix<f64>) {
        for column in r.column_iter() {
            assert!((column.sum() - 1.0).abs() < 1e-9);
            assert!(column.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_setup_shapes() {
        let trainer = sine_trainer();
        assert_eq!(trainer.design_matrix().shape(), (20, 6));
        assert_eq!(trainer.weights().shape(), (6, 2));
        assert_eq!(trainer.embedding().shape(), (20, 2));
        assert_eq!(trainer.distances().shape(), (20, 59));
        assert_eq!(trainer.responsibilities().shape(), (20, 59));
        assert!(trainer.beta() > 0.0);
        assert!(trainer.log_likelihood_trace().is_empty());
    }

    #[test]
    fn test_responsibility_columns_sum_to_one() {
        let mut trainer = sine_trainer();
        for _ in 0..5 {
            trainer.compute_responsibilities().unwrap();
            assert_columns_normalized(trainer.responsibilities());
            let log_sum = trainer.compute_responsibilities().unwrap();
            trainer.reestimate(log_sum).unwrap();
        }
    }

    #[test]
    fn test_responsibilities_idempotent() {
        let mut trainer = sine_trainer();
        trainer.step().unwrap();

        let first_sum = trainer.compute_responsibilities().unwrap();
        let first = trainer.responsibilities().clone();
        let second_sum = trainer.compute_responsibilities().unwrap();

        assert_eq!(first_sum.to_bits(), second_sum.to_bits());
        assert!(first
            .iter()
            .zip(trainer.responsibilities().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn test_stabilized_matches_plain() {
        let distances = DMatrix::from_row_slice(3, 2, &[
            0.5, 4.0, //
            1.0, 2.0, //
            3.0, 0.25,
        ]);
        let mut plain = DMatrix::zeros(3, 2);
        let mut stable = DMatrix::zeros(3, 2);

        let plain_sum = normalize_responsibilities(&distances, 3.0, false, &mut plain).unwrap();
        let stable_sum = normalize_responsibilities(&distances, 3.0, true, &mut stable).unwrap();

        assert!((plain_sum - stable_sum).abs() < 1e-12);
        assert!((plain - stable).abs().max() < 1e-12);
    }

    #[test]
    fn test_log_sum_value() {
        let distances = DMatrix::from_row_slice(2, 1, &[0.0, 2.0]);
        let mut out = DMatrix::zeros(2, 1);
        let log_sum = normalize_responsibilities(&distances, 1.0, false, &mut out).unwrap();

        let expected = (1.0 + (-1.0f64).exp()).ln();
        assert!((log_sum - expected).abs() < 1e-12);
        assert!((out[(0, 0)] - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_underflow_detected_without_stabilization() {
        let distances = DMatrix::from_row_slice(2, 1, &[1.0e4, 2.0e4]);
        let mut out = DMatrix::zeros(2, 1);

        assert!(matches!(
            normalize_responsibilities(&distances, 1.0, false, &mut out),
            Err(GtmError::NumericInstability(_))
        ));

        let log_sum = normalize_responsibilities(&distances, 1.0, true, &mut out).unwrap();
        assert!((out[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((log_sum + 5.0e3).abs() < 1e-6);
    }

    #[test]
    fn test_beta_stays_positive() {
        let mut trainer = sine_trainer();
        for _ in 0..20 {
            trainer.step().unwrap();
            assert!(trainer.beta() > 0.0 && trainer.beta().is_finite());
        }
        assert_eq!(trainer.log_likelihood_trace().len(), 20);
    }

    #[test]
    fn test_embedding_matches_weights() {
        let mut trainer = sine_trainer();
        trainer.step().unwrap();
        let expected = trainer.design_matrix() * trainer.weights();
        assert!((expected - trainer.embedding()).abs().max() < 1e-12);
    }

    #[test]
    fn test_train_converges() {
        let mut trainer = sine_trainer();
        let report = trainer.train().unwrap();

        assert!(report.converged);
        assert!(report.iterations >= 2);
        assert!(report.iterations < 1000);
        assert_eq!(report.iterations, trainer.log_likelihood_trace().len());

        let trace = trainer.log_likelihood_trace();
        assert!(trace[trace.len() - 1] > trace[0]);
        assert!(trainer.has_converged());
    }

    #[test]
    fn test_iteration_cap() {
        let config = Config {
            training: TrainingConfig {
                max_iterations: 3,
                tolerance: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut trainer = GtmTrainer::new(config, sine_curve()).unwrap();
        let report = trainer.train().unwrap();

        assert_eq!(report.iterations, 3);
        assert!(!report.converged);
    }

    #[test]
    fn test_runs_at_least_two_iterations() {
        let config = Config {
            training: TrainingConfig {
                tolerance: f64::MAX,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut trainer = GtmTrainer::new(config, sine_curve()).unwrap();
        let report = trainer.train().unwrap();
        assert_eq!(report.iterations, 2);
        assert!(report.converged);
    }

    #[test]
    fn test_reset_replays_run() {
        let mut trainer = sine_trainer();
        let first = trainer.train().unwrap();
        let first_embedding = trainer.embedding().clone();

        trainer.reset().unwrap();
        assert!(trainer.log_likelihood_trace().is_empty());

        let second = trainer.train().unwrap();
        assert_eq!(first.iterations, second.iterations);
        assert_eq!(first.beta.to_bits(), second.beta.to_bits());
        assert!((first_embedding - trainer.embedding()).abs().max() == 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let empty = DMatrix::<f64>::zeros(0, 2);
        assert!(matches!(
            GtmTrainer::new(Config::default(), empty),
            Err(GtmError::EmptyInput(_))
        ));

        let mut data = sine_curve();
        data[(3, 1)] = f64::NAN;
        assert!(GtmTrainer::new(Config::default(), data).is_err());

        let config = Config {
            model: GtmConfig {
                latent_dimensions: 3,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            GtmTrainer::new(config, sine_curve()),
            Err(GtmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_identical_points_abort() {
        // Zero spread leaves nothing to set the initial noise precision from.
        let data = DMatrix::from_fn(8, 2, |_, j| if j == 0 { 1.0 } else { 2.0 });

        let result =
            GtmTrainer::new(Config::default(), data).and_then(|mut trainer| trainer.train());
        assert!(matches!(
            result,
            Err(GtmError::NumericInstability(_)) | Err(GtmError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_minimum_basis_functions_train() {
        let config = Config {
            model: GtmConfig {
                basis_functions_per_axis: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut trainer = GtmTrainer::new(config, sine_curve()).unwrap();
        assert_eq!(trainer.design_matrix().ncols(), 3);
        trainer.step().unwrap();
        assert!(trainer.beta() > 0.0);
    }

    #[test]
    fn test_two_dimensional_latent_space() {
        let mut data = DMatrix::zeros(36, 3);
        for i in 0..6 {
            for j in 0..6 {
                let row = i * 6 + j;
                let x = i as f64 / 5.0;
                let y = j as f64 / 5.0;
                data[(row, 0)] = x;
                data[(row, 1)] = y;
                data[(row, 2)] = 0.3 * x * y;
            }
        }
        let config = Config {
            model: GtmConfig {
                latent_dimensions: 2,
                latent_samples_per_axis: 5,
                basis_functions_per_axis: 3,
                spacing_scale: 1.0,
                ..Default::default()
            },
            training: TrainingConfig {
                max_iterations: 30,
                ..Default::default()
            },
        };
        let mut trainer = GtmTrainer::new(config, data).unwrap();
        assert_eq!(trainer.embedding().shape(), (25, 3));

        trainer.train().unwrap();
        assert_columns_normalized(trainer.responsibilities());
        assert!(trainer.beta() > 0.0);
    }
}
