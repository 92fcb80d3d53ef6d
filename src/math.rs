use num_traits::Float;

/// Order statistic over a numeric sequence.
///
/// Odd counts pick the middle element, even counts average the two central
/// ones, and an empty sequence yields zero. The input order is irrelevant.
pub fn median<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::zero();
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / (T::one() + T::one())
    } else {
        sorted[mid]
    }
}
