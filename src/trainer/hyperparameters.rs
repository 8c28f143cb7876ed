use std::ops::Range;

use rand::Rng;
use serde::Serialize;

use crate::error::Error;

/// Ranks tried by the random search.
const SEARCH_RANKS: Range<usize> = 3..40;

/// Regularization values tried by the random search, for both the embeddings and the biases.
const SEARCH_REGULARIZATIONS: [f64; 6] = [0.005, 0.002, 0.02, 0.05, 0.2, 0.5];

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Hyperparameters {
    /// Approximation rank: number of latent features.
    pub rank: usize,

    /// Maximum number of epochs per feature.
    pub n_epochs: usize,

    pub learning_rate: f64,
    pub embedding_regularization: f64,
    pub bias_regularization: f64,

    /// A feature is considered trained once its RMSE changes by less than this between epochs.
    pub epsilon: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            rank: 8,
            n_epochs: 100,
            learning_rate: 0.001,
            embedding_regularization: 0.02,
            bias_regularization: 0.05,
            epsilon: 0.0001,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.rank == 0 {
            return Err(Error::invalid_input("the rank must be positive"));
        }
        if self.n_epochs == 0 {
            return Err(Error::invalid_input("the number of epochs must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::invalid_input(format!(
                "the learning rate must be positive, got {}",
                self.learning_rate,
            )));
        }
        for (name, value) in [
            ("embedding regularization", self.embedding_regularization),
            ("bias regularization", self.bias_regularization),
            ("epsilon", self.epsilon),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::invalid_input(format!(
                    "the {} must be non-negative, got {}",
                    name, value,
                )));
            }
        }
        Ok(())
    }

    /// Replaces the rank and both regularizations with random picks from the search grids.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        Self {
            rank: rng.gen_range(SEARCH_RANKS),
            embedding_regularization: pick_regularization(rng),
            bias_regularization: pick_regularization(rng),
            ..self
        }
    }
}

fn pick_regularization<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    SEARCH_REGULARIZATIONS[rng.gen_range(0..SEARCH_REGULARIZATIONS.len())]
}
