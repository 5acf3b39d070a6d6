//! The Leibniz alternating series.

use crate::Segment;

/// Partial alternating sum over one segment:
/// `Σ (-1)^k / (2k + 1)` for `k` in `[start, end)`.
///
/// Accumulated as a single running sum in ascending `k`. The order is
/// load-bearing: the reported error depends on accumulated rounding, so the
/// loop must not be reordered or re-associated.
pub fn partial_sum(segment: Segment) -> f64 {
    let mut total = 0.0;
    for k in segment.start..segment.end {
        let term = 1.0 / (2 * k + 1) as f64;
        if k % 2 == 0 {
            total += term;
        } else {
            total -= term;
        }
    }
    total
}

/// Combine unscaled partials into the final approximation: `4 × Σ`.
///
/// Partial order is irrelevant here (the accumulation is commutative); only
/// the order inside [`partial_sum`] is fixed. The remote backend does not go
/// through this function; its partials arrive already scaled.
pub fn reduce<I>(partials: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    4.0 * partials.into_iter().sum::<f64>()
}
