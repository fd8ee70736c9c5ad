use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingSite {
    /// Degrees.
    pub latitude: f64,
    /// Degrees, in (-180, 180].
    pub longitude: f64,
    /// Universal time at which the termination altitude is crossed.
    pub time: f64,
    /// Peak drag deceleration along the way, in units of surface gravity.
    pub max_drag_gees: f64,
}

impl LandingSite {
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Outcome of one reentry simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LandingPrediction {
    Landed(LandingSite),
    /// Left the atmosphere again onto an orbit with these apsis altitudes (m).
    Aerobraked {
        apoapsis_altitude: f64,
        periapsis_altitude: f64,
    },
    TimedOut,
    NoReentry,
}

impl LandingPrediction {
    pub fn landing_site(&self) -> Option<&LandingSite> {
        match self {
            LandingPrediction::Landed(site) => Some(site),
            _ => None,
        }
    }

    pub fn is_landed(&self) -> bool {
        matches!(self, LandingPrediction::Landed(_))
    }
}

impl fmt::Display for LandingPrediction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LandingPrediction::Landed(site) => write!(
                f,
                "Landed at ({:.4}°, {:.4}°), t={:.1}s, max drag {:.2} g",
                site.latitude, site.longitude, site.time, site.max_drag_gees
            ),
            LandingPrediction::Aerobraked {
                apoapsis_altitude,
                periapsis_altitude,
            } => write!(
                f,
                "Aerobraked (Ap {:.0} m, Pe {:.0} m)",
                apoapsis_altitude, periapsis_altitude
            ),
            LandingPrediction::TimedOut => write!(f, "TimedOut"),
            LandingPrediction::NoReentry => write!(f, "NoReentry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub surface_speed: f64,
}

/// Everything a simulation run produced. Shared read-only once published.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub prediction: LandingPrediction,
    /// Time of the state the run started from.
    pub start_time: f64,
    /// Time where numerical integration took over from the free-fall projection.
    pub integration_start_time: Option<f64>,
    pub end_time: f64,
    pub steps: usize,
    pub skips: usize,
    pub max_drag_gees: f64,
    pub trajectory: Vec<TrajectoryPoint>,
}

impl SimulationResult {
    pub fn landing_site(&self) -> Option<&LandingSite> {
        self.prediction.landing_site()
    }
}
