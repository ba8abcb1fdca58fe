//! # GTM - Generative Topographic Mapping
//!
//! A Rust implementation of the Generative Topographic Mapping, an
//! unsupervised latent-variable model that fits a smooth low-dimensional
//! manifold to a set of observed points.
//!
//! ## Overview
//!
//! A uniform grid of latent points is pushed into data space through a
//! radial basis function network. Each mapped grid point is the center of an
//! isotropic Gaussian, and the data is treated as noisy samples from this
//! constrained mixture. Expectation-Maximization alternates between assigning
//! each data point to the grid nodes (responsibilities) and re-solving the
//! network weights and the noise precision β.
//!
//! ## Key Features
//!
//! - **Mixed-radix latent grids** in any number of latent dimensions
//! - **Gaussian RBF design matrix** with a bias feature
//! - **PCA initialization** of the embedding and of β
//! - **Log-sum-exp stabilized E-step**
//! - **Binary model files** and text log-likelihood traces
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gtm::{dataset, Config, GtmTrainer};
//!
//! // 59 points along y = x + 1.25 sin(2x)
//! let data = dataset::sine_curve();
//!
//! let mut trainer = GtmTrainer::new(Config::default(), data)?;
//! let report = trainer.train()?;
//! println!("{} iterations, beta = {}", report.iterations, report.beta);
//!
//! let model = trainer.into_model();
//! model.save("gtm_20^1_5_2.gtm")?;
//! ```
//!
//! ## Architecture
//!
//! - [`gtm`] - Grid, distances, basis network, PCA initialization, EM trainer
//! - [`config`] - Model shape and training loop settings
//! - [`dataset`] - Demonstration data and the text data file
//! - [`storage`] - Model file and log-likelihood trace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod gtm;
pub mod storage;

// Re-export commonly used types
pub use config::{BiasRow, Config, GtmConfig, TrainingConfig};
pub use dataset::{noisy_sine_curve, sine_curve, DataFile};
pub use error::{GtmError, Result};
pub use gtm::{BasisNetwork, GtmModel, GtmTrainer, PrincipalComponents, TrainingReport};
pub use storage::{ModelFormat, ModelHeader, StoredModel};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default cap on EM iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Default log-likelihood change below which training stops.
pub const DEFAULT_TOLERANCE: f64 = 0.01;
