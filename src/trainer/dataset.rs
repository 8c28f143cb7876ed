//! JSON document the command-line driver reads the ratings from.

use std::collections::HashSet;
use std::io::Read;

use ndarray::Array2;
use serde::Deserialize;

use crate::math::statistics::Index;
use crate::prelude::*;
use crate::trainer::model::Model;

#[derive(Deserialize)]
struct Document {
    ratings: Vec<Vec<f64>>,
    train_indices: Vec<Index>,

    #[serde(default)]
    validation_indices: Vec<Index>,

    #[serde(default)]
    user_factors: Option<Vec<Vec<f64>>>,

    #[serde(default)]
    item_factors: Option<Vec<Vec<f64>>>,
}

pub struct Dataset {
    /// Unmasked ratings, `0` stands for unobserved.
    pub ratings: Array2<f64>,

    pub train_indices: Vec<Index>,

    /// Held out from the training and used only for scoring.
    pub validation_indices: Vec<Index>,

    /// Externally initialized model, if any.
    pub model: Option<Model>,
}

impl Dataset {
    #[instrument(level = "debug", skip_all, fields(one_based = one_based))]
    pub fn from_reader<R: Read>(reader: R, one_based: bool) -> Result<Self> {
        let document: Document =
            serde_json::from_reader(reader).context("failed to parse the dataset")?;
        Self::from_document(document, one_based)
    }

    fn from_document(document: Document, one_based: bool) -> Result<Self> {
        let ratings = to_array2(document.ratings).context("invalid ratings")?;
        let train_indices = normalize_indices(document.train_indices, one_based)
            .context("invalid training indices")?;
        let validation_indices = normalize_indices(document.validation_indices, one_based)
            .context("invalid validation indices")?;
        let model = match (document.user_factors, document.item_factors) {
            (Some(user_factors), Some(item_factors)) => Some(Model::new(
                to_array2(user_factors).context("invalid user factors")?,
                to_array2(item_factors).context("invalid item factors")?,
            )?),
            (None, None) => None,
            _ => return Err(anyhow!("user and item factors must be given together")),
        };
        check_bounds(&train_indices, ratings.dim()).context("invalid training indices")?;
        check_bounds(&validation_indices, ratings.dim()).context("invalid validation indices")?;
        check_disjoint(&train_indices, &validation_indices)?;
        info!(
            dim = ?ratings.dim(),
            n_train = train_indices.len(),
            n_validation = validation_indices.len(),
            has_factors = model.is_some(),
            "loaded",
        );
        Ok(Self {
            ratings,
            train_indices,
            validation_indices,
            model,
        })
    }

    /// Ratings with the validation cells zeroed out.
    #[must_use]
    pub fn masked_ratings(&self) -> Array2<f64> {
        let mut ratings = self.ratings.clone();
        for index in &self.validation_indices {
            ratings[*index] = 0.0;
        }
        ratings
    }
}

fn to_array2(rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_columns = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().position(|row| row.len() != n_columns) {
        return Err(anyhow!(
            "row #{} has {} columns, expected {}",
            row,
            rows[row].len(),
            n_columns,
        ));
    }
    let elements = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_columns), elements)?)
}

fn check_bounds(indices: &[Index], (n_rows, n_columns): (usize, usize)) -> Result {
    match indices
        .iter()
        .find(|(row, column)| *row >= n_rows || *column >= n_columns)
    {
        Some(index) => Err(anyhow!("{:?} is out of the {}×{} matrix", index, n_rows, n_columns)),
        None => Ok(()),
    }
}

fn check_disjoint(train_indices: &[Index], validation_indices: &[Index]) -> Result {
    let validation_indices: HashSet<&Index> = validation_indices.iter().collect();
    match train_indices
        .iter()
        .find(|index| validation_indices.contains(index))
    {
        Some(index) => Err(anyhow!("{:?} is both a training and a validation index", index)),
        None => Ok(()),
    }
}

fn normalize_indices(indices: Vec<Index>, one_based: bool) -> Result<Vec<Index>> {
    if !one_based {
        return Ok(indices);
    }
    indices
        .into_iter()
        .map(|(row, column)| match (row.checked_sub(1), column.checked_sub(1)) {
            (Some(row), Some(column)) => Ok((row, column)),
            _ => Err(anyhow!("({}, {}) is not a one-based index", row, column)),
        })
        .collect()
}
