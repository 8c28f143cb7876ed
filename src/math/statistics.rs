//! Scoring helpers shared by the engine and the command-line driver.

use ndarray::ArrayView2;

use crate::error::Error;

/// Zero-based `(row, column)` coordinate of a rating matrix cell.
pub type Index = (usize, usize);

/// Cells holding `0` are unobserved, so a true zero rating cannot be represented.
#[inline]
#[must_use]
pub fn is_observed(rating: f64) -> bool {
    rating != 0.0
}

/// Observed coordinates of the rating matrix, in the row-major order.
#[must_use]
pub fn observed_indices(ratings: ArrayView2<f64>) -> Vec<Index> {
    ratings
        .indexed_iter()
        .filter(|(_, rating)| is_observed(**rating))
        .map(|(index, _)| index)
        .collect()
}

/// Mean of the observed ratings.
pub fn global_mean(ratings: ArrayView2<f64>) -> Result<f64, Error> {
    let (sum, count) = ratings
        .iter()
        .filter(|rating| is_observed(**rating))
        .fold((0.0, 0_usize), |(sum, count), rating| (sum + rating, count + 1));
    match count {
        0 => Err(Error::invalid_input("the rating matrix has no observed entries")),
        _ => Ok(sum / count as f64),
    }
}

/// Accumulates squared residuals.
#[derive(Default)]
pub struct SquaredError {
    error: f64,
    count: usize,
}

impl SquaredError {
    #[inline]
    pub fn push(&mut self, residual_error: f64) {
        self.error += residual_error * residual_error;
        self.count += 1;
    }

    #[must_use]
    pub fn rmse(&self) -> f64 {
        (self.error / self.count.max(1) as f64).sqrt()
    }
}

/// Root-mean-square error between the two matrices over the specified cells.
pub fn rmse(
    actual: ArrayView2<f64>,
    predicted: ArrayView2<f64>,
    indices: &[Index],
) -> Result<f64, Error> {
    if actual.dim() != predicted.dim() {
        return Err(Error::invalid_input(format!(
            "cannot compare a {:?} matrix with a {:?} one",
            actual.dim(),
            predicted.dim(),
        )));
    }
    if indices.is_empty() {
        return Err(Error::invalid_input("cannot compute RMSE over an empty index set"));
    }

    let mut error = SquaredError::default();
    for &index in indices {
        let (Some(actual), Some(predicted)) = (actual.get(index), predicted.get(index)) else {
            return Err(Error::invalid_input(format!(
                "index {:?} is out of the {:?} matrix",
                index,
                actual.dim(),
            )));
        };
        error.push(actual - predicted);
    }
    Ok(error.rmse())
}

/// Root-mean-square error over all observed cells of `actual`.
pub fn rmse_observed(actual: ArrayView2<f64>, predicted: ArrayView2<f64>) -> Result<f64, Error> {
    rmse(actual, predicted, &observed_indices(actual))
}
