//! CLI options.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::trainer::hyperparameters::Hyperparameters;
use crate::trainer::reconstruction::RatingScale;

pub mod parsers;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Opts {
    /// Sentry DSN
    #[arg(long, env = "SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    /// Performance monitoring sample rate for Sentry
    #[arg(long, default_value = "0", env = "TRACES_SAMPLE_RATE")]
    pub traces_sample_rate: f32,

    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
pub enum Subcommand {
    Train(TrainOpts),
}

/// Trains the factorization model and writes out the predictions
#[derive(Args)]
pub struct TrainOpts {
    /// Input JSON document with the ratings and the training indices
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSON file, standard output if omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub hyperparameters: HyperparameterOpts,

    /// Random seed for the initialization, the shuffling and the random search
    #[arg(long, default_value = "42", env = "RATINGS_SF_SEED")]
    pub seed: u64,

    /// Sample the rank and the regularizations from the search grids
    #[arg(long)]
    pub random_search: bool,

    /// Indices in the input document are one-based
    #[arg(long)]
    pub one_based: bool,

    /// Lowest rating, predictions get clipped to it
    #[arg(long, default_value = "1", value_parser = parsers::finite_f64)]
    pub rating_min: f64,

    /// Highest rating, predictions get clipped to it
    #[arg(long, default_value = "5", value_parser = parsers::finite_f64)]
    pub rating_max: f64,
}

impl TrainOpts {
    pub fn rating_scale(&self) -> crate::Result<RatingScale> {
        let rating_scale = RatingScale {
            min: self.rating_min,
            max: self.rating_max,
        };
        rating_scale.validate()?;
        Ok(rating_scale)
    }
}

#[derive(Args, Copy, Clone)]
pub struct HyperparameterOpts {
    /// Approximation rank, that is the number of latent features
    #[arg(long, default_value = "8", value_parser = parsers::non_zero_usize)]
    pub rank: usize,

    /// Maximum number of epochs per latent feature
    #[arg(long, default_value = "100", value_parser = parsers::non_zero_usize)]
    pub n_epochs: usize,

    /// Learning rate
    #[arg(long = "lr", default_value = "0.001", value_parser = parsers::positive_f64)]
    pub learning_rate: f64,

    /// Embedding regularization
    #[arg(long = "embedding-r", default_value = "0.02", value_parser = parsers::non_negative_f64)]
    pub embedding_regularization: f64,

    /// Bias regularization
    #[arg(long = "bias-r", default_value = "0.05", value_parser = parsers::non_negative_f64)]
    pub bias_regularization: f64,

    /// Minimal RMSE change between epochs to keep training the current feature
    #[arg(long, default_value = "0.0001", value_parser = parsers::non_negative_f64)]
    pub epsilon: f64,
}

impl From<HyperparameterOpts> for Hyperparameters {
    fn from(opts: HyperparameterOpts) -> Self {
        Self {
            rank: opts.rank,
            n_epochs: opts.n_epochs,
            learning_rate: opts.learning_rate,
            embedding_regularization: opts.embedding_regularization,
            bias_regularization: opts.bias_regularization,
            epsilon: opts.epsilon,
        }
    }
}
