//! Fixed fan-out thread backend.

use crate::error::ExecError;
use leibniz_core::{even_split, partial_sum, reduce};
use tracing::debug;

/// Launch one thread per even-split segment, each writing into a result slot
/// it exclusively owns, then reduce after the scope's join barrier.
///
/// Slot ownership is disjoint by construction (`iter_mut` hands each thread
/// a distinct `&mut f64` before any of them starts), so no locking is
/// involved and completion order is irrelevant.
pub fn run_fanout(iterations: u64, threads: usize) -> Result<f64, ExecError> {
    let segments = even_split(iterations, threads)?;
    debug!(threads, iterations, "fan-out dispatch");

    let mut slots = vec![0.0f64; segments.len()];
    std::thread::scope(|scope| {
        for (slot, segment) in slots.iter_mut().zip(&segments) {
            let segment = *segment;
            scope.spawn(move || *slot = partial_sum(segment));
        }
    });

    Ok(reduce(slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leibniz_core::Segment;

    #[test]
    fn single_thread_single_term() {
        assert_eq!(run_fanout(1, 1).unwrap(), 4.0);
    }

    #[test]
    fn matches_sequential_evaluation() {
        let parallel = run_fanout(100_000, 4).unwrap();
        let sequential = reduce([partial_sum(Segment::new(0, 100_000))]);
        assert!((parallel - sequential).abs() < 1e-12);
    }

    #[test]
    fn more_threads_than_iterations() {
        let parallel = run_fanout(3, 8).unwrap();
        let sequential = reduce([partial_sum(Segment::new(0, 3))]);
        assert!((parallel - sequential).abs() < 1e-12);
    }

    #[test]
    fn zero_threads_is_invalid() {
        assert!(matches!(
            run_fanout(1000, 0),
            Err(ExecError::Partition(_))
        ));
    }
}
