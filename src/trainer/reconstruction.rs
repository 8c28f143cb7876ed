use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::error::Error;

/// Dense reconstruction: `user_bias[u] + item_bias[i] + dot(user_factors[u], item_factors[i])`.
///
/// The factor views may be column prefixes of the full factor matrices.
#[must_use]
pub fn reconstruct(
    user_factors: ArrayView2<f64>,
    item_factors: ArrayView2<f64>,
    user_bias: ArrayView1<f64>,
    item_bias: ArrayView1<f64>,
) -> Array2<f64> {
    debug_assert_eq!(user_factors.ncols(), item_factors.ncols());
    debug_assert_eq!(user_factors.nrows(), user_bias.len());
    debug_assert_eq!(item_factors.nrows(), item_bias.len());

    let mut reconstruction = user_factors.dot(&item_factors.t());
    reconstruction += &user_bias.insert_axis(Axis(1));
    reconstruction += &item_bias.insert_axis(Axis(0));
    reconstruction
}

/// Closed rating scale the predictions are clipped to.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

impl RatingScale {
    pub fn validate(&self) -> Result<(), Error> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "the rating scale [{}, {}] is empty",
                self.min, self.max,
            )))
        }
    }

    pub fn clip(&self, reconstruction: &mut Array2<f64>) {
        debug_assert!(self.min <= self.max);
        reconstruction.mapv_inplace(|rating| rating.clamp(self.min, self.max));
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::math::vector::dot;

    #[test]
    fn reconstruct_matches_definition() {
        let user_factors = array![[0.1, -0.7], [1.5, 0.3], [-0.2, 0.9]];
        let item_factors = array![[0.4, 0.2], [-1.1, 0.6]];
        let user_bias = array![0.5, -0.25, 1.0];
        let item_bias = array![-0.3, 0.8];

        let reconstruction = reconstruct(
            user_factors.view(),
            item_factors.view(),
            user_bias.view(),
            item_bias.view(),
        );

        assert_eq!(reconstruction.dim(), (3, 2));
        for ((user, item), value) in reconstruction.indexed_iter() {
            let expected = user_bias[user]
                + item_bias[item]
                + dot(user_factors.row(user), item_factors.row(item));
            assert!((value - expected).abs() < 1e-12, "({}, {})", user, item);
        }
    }

    #[test]
    fn reconstruct_zero_rank_is_biases() {
        let reconstruction = reconstruct(
            Array2::zeros((2, 0)).view(),
            Array2::zeros((3, 0)).view(),
            array![1.0, 2.0].view(),
            array![0.0, 0.5, -1.0].view(),
        );
        assert_eq!(reconstruction, array![[1.0, 1.5, 0.0], [2.0, 2.5, 1.0]]);
    }

    #[test]
    fn clip_ok() {
        let mut reconstruction = array![[0.2, 3.3], [5.7, 1.0]];
        RatingScale::default().clip(&mut reconstruction);
        assert_eq!(reconstruction, array![[1.0, 3.3], [5.0, 1.0]]);
    }

    #[test]
    fn validate_ok() {
        assert!(RatingScale::default().validate().is_ok());
        assert!(RatingScale { min: 3.0, max: 3.0 }.validate().is_err());
        assert!(RatingScale { min: 1.0, max: f64::INFINITY }.validate().is_err());
    }
}
