//! Storage module for fitted models and training traces.

mod format;

pub use format::{write_log_likelihoods, ModelFormat, ModelHeader, StoredModel};
