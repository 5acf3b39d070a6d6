//! Range partitioning policies.
//!
//! Two sizing policies coexist. The fixed fan-out and remote backends split
//! the range into exactly one segment per worker; the queue-fed backends cut
//! ceiling-sized chunks and may produce more segments than workers, letting
//! the excess queue behind busy consumers.

use crate::Segment;
use thiserror::Error;
use tracing::debug;

/// Errors produced when a partition request is unsatisfiable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    /// The worker count was zero; the even-split policy would divide by zero.
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// Split `[0, iterations)` into exactly `workers` contiguous segments.
///
/// `chunk = iterations / workers` (integer division); the last segment
/// absorbs the remainder, so every index is covered even when `iterations`
/// is not divisible by `workers`. When `iterations < workers` the leading
/// segments are empty and the final one carries the whole range.
pub fn even_split(iterations: u64, workers: usize) -> Result<Vec<Segment>, PartitionError> {
    if workers == 0 {
        return Err(PartitionError::NoWorkers);
    }
    let workers = workers as u64;
    let chunk = iterations / workers;
    debug!(iterations, workers, chunk, "even split");
    Ok((0..workers)
        .map(|i| {
            let end = if i + 1 == workers {
                iterations
            } else {
                (i + 1) * chunk
            };
            Segment::new(i * chunk, end)
        })
        .collect())
}

/// Split `[0, iterations)` into chunks of `max(1, iterations / workers)`.
///
/// Produces `ceil(iterations / chunk)` segments, each capped at
/// `iterations`. This can yield more segments than `workers` when the range
/// is small relative to the worker count; that is intentional, the excess
/// simply queues.
pub fn ceiling_chunks(iterations: u64, workers: usize) -> Result<Vec<Segment>, PartitionError> {
    if workers == 0 {
        return Err(PartitionError::NoWorkers);
    }
    let chunk = (iterations / workers as u64).max(1);
    let count = iterations.div_ceil(chunk);
    debug!(iterations, workers, chunk, count, "ceiling chunks");
    Ok((0..count)
        .map(|i| Segment::new(i * chunk, ((i + 1) * chunk).min(iterations)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contiguity from zero through `iterations` implies the segments are
    /// pairwise disjoint and their union is exactly `[0, iterations)`.
    fn assert_disjoint_cover(segments: &[Segment], iterations: u64) {
        let mut cursor = 0;
        for seg in segments {
            assert_eq!(seg.start, cursor, "gap or overlap before {seg}");
            assert!(seg.end >= seg.start);
            cursor = seg.end;
        }
        assert_eq!(cursor, iterations, "segments do not reach the range end");
    }

    #[test]
    fn even_split_divisible() {
        let segments = even_split(1000, 4).unwrap();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], Segment::new(0, 250));
        assert_eq!(segments[3], Segment::new(750, 1000));
        assert_disjoint_cover(&segments, 1000);
    }

    #[test]
    fn even_split_remainder_goes_last() {
        let segments = even_split(1001, 4).unwrap();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[3], Segment::new(750, 1001));
        assert_disjoint_cover(&segments, 1001);
    }

    #[test]
    fn even_split_fewer_iterations_than_workers() {
        let segments = even_split(3, 8).unwrap();
        assert_eq!(segments.len(), 8);
        // chunk is zero: leading segments are empty, the last covers all.
        assert!(segments[..7].iter().all(|s| s.is_empty()));
        assert_eq!(segments[7], Segment::new(0, 3));
        assert_disjoint_cover(&segments, 3);
    }

    #[test]
    fn even_split_single_worker() {
        let segments = even_split(17, 1).unwrap();
        assert_eq!(segments, vec![Segment::new(0, 17)]);
    }

    #[test]
    fn ceiling_chunks_divisible() {
        let segments = ceiling_chunks(1000, 4).unwrap();
        assert_eq!(segments.len(), 4);
        assert_disjoint_cover(&segments, 1000);
    }

    #[test]
    fn ceiling_chunks_indivisible_adds_segment() {
        // chunk = 10 / 3 = 3, so four segments with a short tail.
        let segments = ceiling_chunks(10, 3).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::new(0, 3),
                Segment::new(3, 6),
                Segment::new(6, 9),
                Segment::new(9, 10),
            ]
        );
        assert_disjoint_cover(&segments, 10);
    }

    #[test]
    fn ceiling_chunks_small_range_caps_at_one() {
        // chunk clamps to 1; three unit segments for eight workers.
        let segments = ceiling_chunks(3, 8).unwrap();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.len() == 1));
        assert_disjoint_cover(&segments, 3);
    }

    #[test]
    fn zero_workers_is_rejected_by_both_policies() {
        assert_eq!(even_split(100, 0), Err(PartitionError::NoWorkers));
        assert_eq!(ceiling_chunks(100, 0), Err(PartitionError::NoWorkers));
    }
}
