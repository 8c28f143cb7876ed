/// Errors reported by the factorization core.
///
/// All of them are detected before any caller-owned array is touched.
/// Numeric divergence is deliberately not an error: non-finite values flow into the reconstruction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
