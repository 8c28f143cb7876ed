//! Trains the user and item factors on the observed ratings.
//! Implements the cascaded stochastic gradient descent for biased matrix factorization:
//! latent features are trained one at a time, each one until its RMSE settles,
//! while the user and item biases are co-trained all along.
//!
//! https://sifter.org/~simon/journal/20061211.html

use ndarray::{s, Array2, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::Error;
use crate::helpers::tracing::format_elapsed;
use crate::math::statistics::{global_mean, rmse_observed, Index};
use crate::math::vector::dot;
use crate::prelude::*;
use crate::trainer::hyperparameters::Hyperparameters;
use crate::trainer::model::Model;
use crate::trainer::reconstruction::RatingScale;

pub mod dataset;
pub mod hyperparameters;
pub mod model;
pub mod reconstruction;

/// «Previous» RMSE every feature starts with, larger than any realistic RMSE.
const INITIAL_RMSE: f64 = 5.0;

pub struct Training {
    /// Reconstruction after the last epoch of the last feature.
    pub reconstruction: Array2<f64>,

    pub features: Vec<FeatureReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub feature: usize,

    /// Training RMSE after each epoch.
    pub rmse: Vec<f64>,

    /// Whether the RMSE settled before the epoch limit.
    pub converged: bool,
}

impl FeatureReport {
    #[must_use]
    pub fn n_epochs(&self) -> usize {
        self.rmse.len()
    }

    #[must_use]
    pub fn final_rmse(&self) -> Option<f64> {
        self.rmse.last().copied()
    }
}

/// Refines the model in place, feature by feature.
///
/// The training indices are shuffled with `rng` before every epoch,
/// so a seeded generator makes the whole run reproducible.
/// Returns the reconstruction from the last epoch, not clipped.
///
/// Everything gets validated before the model is touched.
/// Divergence, however, is not an error: non-finite values end up in the reconstruction.
#[instrument(
    skip_all,
    fields(
        rank = hyperparameters.rank,
        n_samples = train_indices.len(),
        lr = hyperparameters.learning_rate,
    ),
)]
pub fn train<R: Rng + ?Sized>(
    ratings: ArrayView2<f64>,
    train_indices: &[Index],
    model: &mut Model,
    hyperparameters: &Hyperparameters,
    rng: &mut R,
) -> Result<Training, Error> {
    hyperparameters.validate()?;
    let (n_users, n_items) = ratings.dim();
    model.check_shape(n_users, n_items, hyperparameters.rank)?;
    check_indices(train_indices, n_users, n_items)?;

    let global_mean = global_mean(ratings)?;
    let mut train_indices = train_indices.to_vec();
    let mut reconstruction = Array2::zeros(ratings.dim());
    info!(global_mean, "training…");

    let mut features = Vec::with_capacity(hyperparameters.rank);
    for feature in 0..hyperparameters.rank {
        let start_instant = Instant::now();
        let mut report = FeatureReport {
            feature,
            rmse: Vec::new(),
            converged: false,
        };
        let mut last_rmse = INITIAL_RMSE;

        for epoch in 0..hyperparameters.n_epochs {
            train_indices.shuffle(rng);
            run_epoch(ratings, &train_indices, model, feature, global_mean, hyperparameters);

            reconstruction = model.reconstruct(feature + 1);
            let rmse = rmse_observed(ratings, reconstruction.view())?;
            debug!(feature, epoch, rmse);
            if !rmse.is_finite() && report.rmse.iter().all(|rmse| rmse.is_finite()) {
                warn!(feature, epoch, rmse, "the training diverged");
            }
            report.rmse.push(rmse);

            if (last_rmse - rmse).abs() < hyperparameters.epsilon {
                report.converged = true;
                break;
            }
            last_rmse = rmse;
        }

        info!(
            feature,
            n_epochs = report.n_epochs(),
            converged = report.converged,
            rmse = report.final_rmse(),
            elapsed = %format_elapsed(start_instant),
            "feature trained",
        );
        features.push(report);
    }

    Ok(Training {
        reconstruction,
        features,
    })
}

/// Runs the prediction end to end: initializes the model unless the factors are given,
/// trains it, and clips the reconstruction to the rating scale.
pub fn predict<R: Rng + ?Sized>(
    ratings: ArrayView2<f64>,
    train_indices: &[Index],
    model: Option<Model>,
    hyperparameters: &Hyperparameters,
    rating_scale: RatingScale,
    rng: &mut R,
) -> Result<(Model, Training), Error> {
    rating_scale.validate()?;
    let mut model = match model {
        Some(model) => model,
        None => {
            debug!(rank = hyperparameters.rank, "initializing the embeddings…");
            let (n_users, n_items) = ratings.dim();
            Model::random(n_users, n_items, hyperparameters.rank, rng)
        }
    };
    let mut training = train(ratings, train_indices, &mut model, hyperparameters, rng)?;
    rating_scale.clip(&mut training.reconstruction);
    Ok((model, training))
}

/// Single pass of the SGD over the training indices, adjusting only the specified feature.
///
/// See: https://sifter.org/~simon/journal/20061211.html.
fn run_epoch(
    ratings: ArrayView2<f64>,
    train_indices: &[Index],
    model: &mut Model,
    feature: usize,
    global_mean: f64,
    hyperparameters: &Hyperparameters,
) {
    let Model {
        user_factors,
        item_factors,
        user_bias,
        item_bias,
    } = model;
    let learning_rate = hyperparameters.learning_rate;
    let embedding_decay = 1.0 - learning_rate * hyperparameters.embedding_regularization;
    let bias_decay = learning_rate * hyperparameters.bias_regularization;
    let prefix = s![..=feature];

    for &(user, item) in train_indices {
        let residual_error = ratings[(user, item)]
            - user_bias[user]
            - item_bias[item]
            - dot(user_factors.row(user).slice(prefix), item_factors.row(item).slice(prefix));
        let bias_lagrangian = user_bias[user] + item_bias[item] - global_mean;

        // Both factors must be updated from the old values.
        let user_factor = user_factors[(user, feature)];
        let item_factor = item_factors[(item, feature)];
        user_factors[(user, feature)] =
            user_factor * embedding_decay + learning_rate * residual_error * item_factor;
        item_factors[(item, feature)] =
            item_factor * embedding_decay + learning_rate * residual_error * user_factor;

        user_bias[user] -= bias_decay * bias_lagrangian;
        user_bias[user] += learning_rate * residual_error;
        item_bias[item] -= bias_decay * bias_lagrangian;
        item_bias[item] += learning_rate * residual_error;
    }
}

fn check_indices(indices: &[Index], n_users: usize, n_items: usize) -> Result<(), Error> {
    if indices.is_empty() {
        return Err(Error::invalid_input("the training index set is empty"));
    }
    match indices
        .iter()
        .find(|(user, item)| *user >= n_users || *item >= n_items)
    {
        Some(index) => Err(Error::invalid_input(format!(
            "training index {:?} is out of the {}×{} rating matrix",
            index, n_users, n_items,
        ))),
        None => Ok(()),
    }
}
