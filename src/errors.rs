use thiserror::Error;

pub type GuidanceResult<T> = Result<T, GuidanceError>;

/// Recoverable failures surfaced by the guidance core.
///
/// Numerical non-convergence is deliberately absent: solvers return their best
/// estimate and log a warning instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuidanceError {
    #[error(
        "too little thrust to land: thrust acceleration {thrust_acceleration:.3} m/s² \
         does not exceed surface gravity {surface_gravity:.3} m/s²"
    )]
    TooLittleThrustToLand {
        thrust_acceleration: f64,
        surface_gravity: f64,
    },

    #[error("degenerate orbit: {0}")]
    DegenerateOrbit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
