/// Vector dot product.
///
/// Accepts anything that iterates over `&f64`: slices, vectors and `ndarray` views alike.
/// Stops at the end of the shorter operand.
#[must_use]
#[inline]
pub fn dot<'a>(
    x: impl IntoIterator<Item = &'a f64>,
    y: impl IntoIterator<Item = &'a f64>,
) -> f64 {
    x.into_iter()
        .zip(y)
        .fold(0.0, |dot, (xi, yi)| dot + xi * yi)
}
