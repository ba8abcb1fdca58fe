//! Generative Topographic Mapping.
//!
//! The pieces, in the order training uses them:
//!
//! - **Grid** (grid.rs): uniform lattices on `[-1, 1]^L` for latent samples and RBF centers
//! - **Basis network** (basis.rs): Gaussian RBF design matrix Φ with a bias column
//! - **PCA initialization** (pca.rs): initial weights and noise precision from
//!   the data's principal axes
//! - **Trainer** (trainer.rs): EM iterations over responsibilities, weights and β
//! - **Model** (model.rs): the fitted embedding and posterior queries

pub mod basis;
pub mod distance;
pub mod grid;
mod linalg;
mod model;
pub mod pca;
pub mod trainer;

pub use basis::{build_design_matrix, kernel_width, BasisNetwork};
pub use distance::{squared_distances, squared_distances_into};
pub use grid::{build_grid, uniform_counts};
pub use linalg::solve_normal_equations;
pub use model::GtmModel;
pub use pca::{initialize, InitialState, PrincipalComponents};
pub use trainer::{GtmTrainer, TrainingReport};
