use ndarray::{s, Array1, Array2};
use rand::Rng;

use crate::error::Error;
use crate::trainer::reconstruction::reconstruct;

/// Biased latent factor model.
///
/// The caller owns it for its whole lifetime, the trainer only borrows it mutably for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// `n_users × rank`.
    pub user_factors: Array2<f64>,

    /// `n_items × rank`.
    pub item_factors: Array2<f64>,

    pub user_bias: Array1<f64>,
    pub item_bias: Array1<f64>,
}

impl Model {
    /// Wraps externally initialized factors, the biases start at zero.
    pub fn new(user_factors: Array2<f64>, item_factors: Array2<f64>) -> Result<Self, Error> {
        if user_factors.ncols() != item_factors.ncols() {
            return Err(Error::invalid_input(format!(
                "user factors have {} columns, while item factors have {}",
                user_factors.ncols(),
                item_factors.ncols(),
            )));
        }
        let user_bias = Array1::zeros(user_factors.nrows());
        let item_bias = Array1::zeros(item_factors.nrows());
        Ok(Self {
            user_factors,
            item_factors,
            user_bias,
            item_bias,
        })
    }

    /// Random factors and zero biases.
    pub fn random<R: Rng + ?Sized>(n_users: usize, n_items: usize, rank: usize, rng: &mut R) -> Self {
        Self {
            user_factors: random_factors(n_users, rank, rng),
            item_factors: random_factors(n_items, rank, rng),
            user_bias: Array1::zeros(n_users),
            item_bias: Array1::zeros(n_items),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.user_factors.ncols()
    }

    /// Checks the model against the rating matrix shape and the expected rank.
    pub fn check_shape(&self, n_users: usize, n_items: usize, rank: usize) -> Result<(), Error> {
        for (what, expected, actual) in [
            ("user factor rows", n_users, self.user_factors.nrows()),
            ("user factor columns", rank, self.user_factors.ncols()),
            ("item factor rows", n_items, self.item_factors.nrows()),
            ("item factor columns", rank, self.item_factors.ncols()),
            ("user biases", n_users, self.user_bias.len()),
            ("item biases", n_items, self.item_bias.len()),
        ] {
            if expected != actual {
                return Err(Error::invalid_input(format!(
                    "expected {} {}, got {}",
                    expected, what, actual,
                )));
            }
        }
        Ok(())
    }

    /// Reconstructs the rating matrix from the first `n_features` latent features and the biases.
    #[must_use]
    pub fn reconstruct(&self, n_features: usize) -> Array2<f64> {
        let prefix = s![.., ..n_features];
        reconstruct(
            self.user_factors.slice(prefix),
            self.item_factors.slice(prefix),
            self.user_bias.view(),
            self.item_bias.view(),
        )
    }
}

fn random_factors<R: Rng + ?Sized>(n_rows: usize, rank: usize, rng: &mut R) -> Array2<f64> {
    Array2::from_shape_simple_fn((n_rows, rank), || random_factor(rng))
}

/// Generates a factor as a random value from [-0.10, -0.05] ∪ [+0.05, +0.10].
fn random_factor<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let factor = 0.05 + 0.05 * rng.gen::<f64>();
    if rng.gen_bool(0.5) {
        factor
    } else {
        -factor
    }
}
