/// Outcome of a bracketed bisection on a monotone predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Last point where the predicate was false.
    pub lo: f64,
    /// First point where the predicate was true.
    pub hi: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Narrow `[lo, hi]` around the switch point of `predicate`, which must be false at
/// `lo` and true at `hi`. Stops once the bracket is narrower than `tolerance` or after
/// `max_iterations` halvings, whichever comes first.
pub fn bisect<P>(mut lo: f64, mut hi: f64, tolerance: f64, max_iterations: usize, predicate: P) -> Bracket
where
    P: Fn(f64) -> bool,
{
    let mut iterations = 0;
    while hi - lo > tolerance {
        if iterations == max_iterations {
            log::warn!(
                "bisection stopped after {} iterations with bracket width {:.3e}",
                iterations,
                hi - lo
            );
            return Bracket {
                lo,
                hi,
                iterations,
                converged: false,
            };
        }
        let mid = 0.5 * (lo + hi);
        if predicate(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
        iterations += 1;
    }

    Bracket {
        lo,
        hi,
        iterations,
        converged: true,
    }
}
