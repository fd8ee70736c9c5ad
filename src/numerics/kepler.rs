//! Newton–Raphson solution of Kepler's equation on both conic branches.
//!
//! Elliptic: `M = E − e·sin(E)`. Hyperbolic: `M = e·sinh(H) − H`.
//! Both branches are solved on `|M|` and the sign restored at the end.

use crate::constants::PI;

pub const MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    /// Eccentric anomaly `E` (elliptic) or hyperbolic anomaly `H`.
    pub anomaly: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Solve Kepler's equation for the eccentric (or hyperbolic) anomaly.
///
/// On hitting the iteration cap the last estimate is returned with
/// `converged = false`; callers are expected to live with the approximation.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let tolerance = (1e-8 * (1.0 - eccentricity).abs()).max(f64::EPSILON);
    let sign = if mean_anomaly < 0.0 { -1.0 } else { 1.0 };
    let m = mean_anomaly.abs();

    let mut solution = if eccentricity < 1.0 {
        // Reduce to [0, π] so the root is bracketed; keep the whole turns aside
        let turns = ((m + PI) / (2.0 * PI)).floor();
        let reduced = m - turns * 2.0 * PI;
        let (reduced_sign, reduced) = if reduced < 0.0 { (-1.0, -reduced) } else { (1.0, reduced) };

        let seed = elliptic_seed(reduced, eccentricity);
        let mut solution = newton_raphson(seed, 0.0, PI, tolerance, |e_anom| {
            let (sin_e, cos_e) = e_anom.sin_cos();
            (
                e_anom - eccentricity * sin_e - reduced,
                1.0 - eccentricity * cos_e,
            )
        });
        solution.anomaly = reduced_sign * solution.anomaly + turns * 2.0 * PI;
        solution
    } else {
        let seed = hyperbolic_seed(m, eccentricity);
        newton_raphson(seed, 0.0, f64::INFINITY, tolerance, |h_anom| {
            (
                eccentricity * h_anom.sinh() - h_anom - m,
                eccentricity * h_anom.cosh() - 1.0,
            )
        })
    };

    solution.anomaly *= sign;
    if !solution.converged {
        log::warn!(
            "Kepler solver did not converge: M={:.6}, e={:.6}, estimate={:.9}",
            mean_anomaly,
            eccentricity,
            solution.anomaly
        );
    }
    solution
}

/// `m` in [0, π]. For high eccentricity the series `M ≈ (1−e)E + E³/6` gives a seed
/// that avoids the flat derivative near periapsis.
fn elliptic_seed(m: f64, eccentricity: f64) -> f64 {
    if eccentricity < 0.8 {
        m
    } else {
        (6.0 * m).cbrt().min(PI)
    }
}

/// Seeds chosen so Newton starts on or near the convex side of the root.
fn hyperbolic_seed(m: f64, eccentricity: f64) -> f64 {
    if m > 6.0 {
        (m / eccentricity).asinh()
    } else if eccentricity < 2.0 {
        // sinh(x) ≥ x + x³/6 puts this seed at or right of the root
        (6.0 * m / eccentricity).cbrt()
    } else {
        m
    }
}

/// Newton–Raphson shared by both branches. Iterates are clamped to `[lo, hi]`.
fn newton_raphson<F>(seed: f64, lo: f64, hi: f64, tolerance: f64, f: F) -> KeplerSolution
where
    F: Fn(f64) -> (f64, f64),
{
    let mut x = seed.clamp(lo, hi);
    for iteration in 1..=MAX_ITERATIONS {
        let (value, derivative) = f(x);
        if value == 0.0 {
            return KeplerSolution {
                anomaly: x,
                iterations: iteration,
                converged: true,
            };
        }
        let delta = value / derivative;
        let next = (x - delta).clamp(lo, hi);
        let step = (next - x).abs();
        x = next;
        if step <= tolerance {
            return KeplerSolution {
                anomaly: x,
                iterations: iteration,
                converged: true,
            };
        }
    }

    KeplerSolution {
        anomaly: x,
        iterations: MAX_ITERATIONS,
        converged: false,
    }
}

pub fn eccentric_to_true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin()).atan2((1.0 - eccentricity).sqrt() * half.cos())
}

pub fn hyperbolic_to_true_anomaly(hyperbolic_anomaly: f64, eccentricity: f64) -> f64 {
    2.0 * (((eccentricity + 1.0) / (eccentricity - 1.0)).sqrt() * (hyperbolic_anomaly / 2.0).tanh())
        .atan()
}

pub fn true_to_eccentric_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    let (sin_nu, cos_nu) = true_anomaly.sin_cos();
    ((1.0 - eccentricity * eccentricity).sqrt() * sin_nu).atan2(eccentricity + cos_nu)
}

pub fn true_to_hyperbolic_anomaly(true_anomaly: f64, eccentricity: f64) -> f64 {
    let x = ((eccentricity - 1.0) / (eccentricity + 1.0)).sqrt() * (true_anomaly / 2.0).tan();
    2.0 * x.clamp(-1.0 + f64::EPSILON, 1.0 - f64::EPSILON).atanh()
}
