//! `train` subcommand: reads the dataset, trains the model and writes the predictions.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{stdout, BufReader, BufWriter, Write};

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::helpers::tracing::format_elapsed;
use crate::math::statistics::{rmse, Index};
use crate::opts::TrainOpts;
use crate::prelude::*;
use crate::trainer::dataset::Dataset;
use crate::trainer::hyperparameters::Hyperparameters;
use crate::trainer::model::Model;
use crate::trainer::{predict, FeatureReport, Training};

#[instrument(skip_all, fields(input = ?opts.input, seed = opts.seed))]
pub fn run(opts: TrainOpts) -> Result {
    sentry::configure_scope(|scope| scope.set_tag("app", "train"));
    let start_instant = Instant::now();

    let rating_scale = opts.rating_scale()?;
    let file = File::open(&opts.input)
        .with_context(|| format!("failed to open `{}`", opts.input.display()))?;
    let dataset = Dataset::from_reader(BufReader::new(file), opts.one_based)?;

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut hyperparameters = Hyperparameters::from(opts.hyperparameters);
    if opts.random_search {
        hyperparameters = hyperparameters.sample(&mut rng);
        info!(?hyperparameters, "sampled");
    }
    let initialization = match dataset.model {
        Some(_) => Initialization::Given,
        None => Initialization::Random,
    };
    let hyperparameters = match &dataset.model {
        Some(model) if model.rank() != hyperparameters.rank => {
            warn!(rank = model.rank(), "the rank is taken from the given factors");
            Hyperparameters {
                rank: model.rank(),
                ..hyperparameters
            }
        }
        _ => hyperparameters,
    };

    let masked_ratings = dataset.masked_ratings();
    let (model, training) = predict(
        masked_ratings.view(),
        &dataset.train_indices,
        dataset.model,
        &hyperparameters,
        rating_scale,
        &mut rng,
    )?;

    let score = Score {
        train_rmse: rmse(
            masked_ratings.view(),
            training.reconstruction.view(),
            &dataset.train_indices,
        )?,
        validation_rmse: score_validation(
            dataset.ratings.view(),
            &training,
            &dataset.validation_indices,
        )?,
        hyperparameters,
        initialization,
    };
    info!(
        train_rmse = score.train_rmse,
        validation_rmse = score.validation_rmse,
        rank = score.hyperparameters.rank,
        embedding_regularization = score.hyperparameters.embedding_regularization,
        bias_regularization = score.hyperparameters.bias_regularization,
        initialization = %score.initialization,
        elapsed = %format_elapsed(start_instant),
        "score",
    );

    let output = Output::new(&model, &training, score);
    match &opts.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create `{}`", path.display()))?;
            output.write(BufWriter::new(file))?;
            info!(path = ?path, "saved");
        }
        None => output.write(stdout().lock())?,
    }
    Ok(())
}

fn score_validation(
    ratings: ArrayView2<f64>,
    training: &Training,
    validation_indices: &[Index],
) -> Result<Option<f64>> {
    if validation_indices.is_empty() {
        return Ok(None);
    }
    let rmse = rmse(ratings, training.reconstruction.view(), validation_indices)
        .context("failed to score the validation set")?;
    Ok(Some(rmse))
}

#[derive(Debug, Copy, Clone, Serialize)]
pub enum Initialization {
    #[serde(rename = "rand")]
    Random,

    #[serde(rename = "given")]
    Given,
}

impl Display for Initialization {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Random => "rand",
            Self::Given => "given",
        })
    }
}

#[derive(Serialize)]
pub struct Score {
    pub train_rmse: f64,
    pub validation_rmse: Option<f64>,

    #[serde(flatten)]
    pub hyperparameters: Hyperparameters,

    pub initialization: Initialization,
}

#[derive(Serialize)]
struct Output<'a> {
    user_factors: Vec<Vec<f64>>,
    item_factors: Vec<Vec<f64>>,
    user_bias: Vec<f64>,
    item_bias: Vec<f64>,

    /// Clipped to the rating scale.
    reconstruction: Vec<Vec<f64>>,

    score: Score,
    features: &'a [FeatureReport],
}

impl<'a> Output<'a> {
    fn new(model: &Model, training: &'a Training, score: Score) -> Self {
        Self {
            user_factors: to_rows(&model.user_factors),
            item_factors: to_rows(&model.item_factors),
            user_bias: model.user_bias.to_vec(),
            item_bias: model.item_bias.to_vec(),
            reconstruction: to_rows(&training.reconstruction),
            score,
            features: &training.features,
        }
    }

    fn write<W: Write>(&self, mut writer: W) -> Result {
        serde_json::to_writer(&mut writer, self).context("failed to serialize the output")?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}
