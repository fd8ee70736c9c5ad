use crate::config::TargetingConfig;
use crate::coordinates::coordinate_transformation::{great_circle_distance, local_separation};
use crate::gnc::navigation::prediction::{LandingPrediction, LandingSite, SimulationResult};
use crate::gnc::navigation::reentry_simulation::ReentrySimulation;
use crate::models::state::StateVector;
use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSite {
    pub latitude: f64,
    pub longitude: f64,
}

impl TargetSite {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// In-plane axis used to move the landing site along track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownrangeAxis {
    Prograde,
    Up,
}

impl DownrangeAxis {
    pub fn direction(&self, state: &StateVector) -> na::Vector3<f64> {
        match self {
            DownrangeAxis::Prograde => state.velocity.normalize(),
            DownrangeAxis::Up => state.position.normalize(),
        }
    }
}

/// Out-of-plane axis: the orbit normal.
pub fn lateral_direction(state: &StateVector) -> na::Vector3<f64> {
    state.position.cross(&state.velocity).normalize()
}

/// A two-axis velocity change still to be flown.
///
/// Each axis is tracked separately; once an axis has been flown down to zero it stays
/// locked at zero for the lifetime of this correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCorrection {
    downrange_axis: na::Vector3<f64>,
    lateral_axis: na::Vector3<f64>,
    remaining: [f64; 2],
    locked: [bool; 2],
    computed_at: f64,
}

impl VelocityCorrection {
    pub fn new(
        downrange_axis: na::Vector3<f64>,
        lateral_axis: na::Vector3<f64>,
        components: [f64; 2],
        computed_at: f64,
    ) -> Self {
        Self {
            downrange_axis,
            lateral_axis,
            remaining: components,
            locked: [false; 2],
            computed_at,
        }
    }

    pub fn vector(&self) -> na::Vector3<f64> {
        self.downrange_axis * self.remaining[0] + self.lateral_axis * self.remaining[1]
    }

    pub fn magnitude(&self) -> f64 {
        self.vector().magnitude()
    }

    pub fn remaining(&self) -> [f64; 2] {
        self.remaining
    }

    pub fn computed_at(&self) -> f64 {
        self.computed_at
    }

    /// Subtract an applied velocity change from the outstanding components.
    pub fn apply_impulse(&mut self, delta_v: &na::Vector3<f64>) {
        let applied = [delta_v.dot(&self.downrange_axis), delta_v.dot(&self.lateral_axis)];
        for axis in 0..2 {
            if self.locked[axis] {
                continue;
            }
            let before = self.remaining[axis];
            let after = before - applied[axis];
            // Crossing zero means the axis has been fully flown
            if after == 0.0 || after.signum() != before.signum() {
                self.remaining[axis] = 0.0;
                self.locked[axis] = true;
            } else {
                self.remaining[axis] = after;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GiveUpReason {
    BaselineNotLanded(LandingPrediction),
    PerturbedNotLanded(LandingPrediction),
    SingularSensitivity,
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GiveUpReason::BaselineNotLanded(outcome) => {
                write!(f, "unperturbed trajectory does not land ({outcome})")
            }
            GiveUpReason::PerturbedNotLanded(outcome) => {
                write!(f, "perturbed trajectory does not land ({outcome})")
            }
            GiveUpReason::SingularSensitivity => {
                write!(f, "landing site does not respond to velocity changes")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetingOutcome {
    Correction {
        correction: VelocityCorrection,
        baseline: LandingSite,
        /// Great-circle distance from the baseline landing site to the target (m).
        error: f64,
    },
    GiveUp(GiveUpReason),
}

/// Finite-difference targeting: two (or three) perturbed reentry simulations per solve.
pub struct TargetingCorrector {
    config: TargetingConfig,
    downrange_axis: Option<DownrangeAxis>,
}

impl TargetingCorrector {
    pub fn new(config: TargetingConfig) -> Self {
        Self {
            config,
            downrange_axis: None,
        }
    }

    pub fn downrange_axis(&self) -> Option<DownrangeAxis> {
        self.downrange_axis
    }

    /// Forget the axis choice, e.g. after the target or reference body changed.
    pub fn reset(&mut self) {
        self.downrange_axis = None;
    }

    /// Velocity change that moves the predicted landing site onto `target`.
    ///
    /// `baseline` is the unperturbed run of `simulation` from `state` at `time`; only
    /// the perturbed runs happen here. With `choose_direction` set (or no axis chosen
    /// yet) both in-plane axes are probed and the one that shifts the landing site
    /// further is kept.
    pub fn compute(
        &mut self,
        simulation: &ReentrySimulation,
        baseline: &SimulationResult,
        state: &StateVector,
        time: f64,
        target: &TargetSite,
        choose_direction: bool,
    ) -> TargetingOutcome {
        let radius = simulation.body().radius;
        let dv = self.config.perturbation_dv;

        let baseline = match baseline.prediction {
            LandingPrediction::Landed(site) => site,
            other => return TargetingOutcome::GiveUp(GiveUpReason::BaselineNotLanded(other)),
        };

        let sensitivity = |direction: &na::Vector3<f64>| -> Result<na::Vector2<f64>, GiveUpReason> {
            match simulation.run(state, time, &(direction * dv)).prediction {
                LandingPrediction::Landed(site) => {
                    Ok(local_separation(baseline.lat_lon(), site.lat_lon(), radius) / dv)
                }
                other => Err(GiveUpReason::PerturbedNotLanded(other)),
            }
        };

        let axes = match self.downrange_axis {
            Some(axis) if !choose_direction => sensitivity(&axis.direction(state)).map(|s| (axis, s)),
            _ => {
                let prograde = DownrangeAxis::Prograde.direction(state);
                let up = DownrangeAxis::Up.direction(state);
                sensitivity(&prograde).and_then(|prograde_shift| {
                    sensitivity(&up).map(|up_shift| {
                        if up_shift.norm() > prograde_shift.norm() {
                            (DownrangeAxis::Up, up_shift)
                        } else {
                            (DownrangeAxis::Prograde, prograde_shift)
                        }
                    })
                })
            }
        };
        let (axis, downrange_shift) = match axes {
            Ok(chosen) => chosen,
            Err(reason) => return TargetingOutcome::GiveUp(reason),
        };
        if self.downrange_axis != Some(axis) {
            log::debug!("targeting along {:?}", axis);
        }
        self.downrange_axis = Some(axis);

        let lateral = lateral_direction(state);
        let lateral_shift = match sensitivity(&lateral) {
            Ok(shift) => shift,
            Err(reason) => return TargetingOutcome::GiveUp(reason),
        };

        let jacobian = na::Matrix2::from_columns(&[downrange_shift, lateral_shift]);
        let inverse = match invert_2x2(&jacobian) {
            Some(inverse) => inverse,
            None => return TargetingOutcome::GiveUp(GiveUpReason::SingularSensitivity),
        };

        let miss = local_separation(baseline.lat_lon(), target.lat_lon(), radius);
        let components = inverse * miss;

        TargetingOutcome::Correction {
            correction: VelocityCorrection::new(
                axis.direction(state),
                lateral,
                [components.x, components.y],
                time,
            ),
            baseline,
            error: great_circle_distance(baseline.lat_lon(), target.lat_lon(), radius),
        }
    }
}

/// Closed-form inverse; `None` when the columns are (numerically) parallel.
fn invert_2x2(m: &na::Matrix2<f64>) -> Option<na::Matrix2<f64>> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    let scale = m.column(0).norm() * m.column(1).norm();
    if !(det.abs() > 1e-9 * scale) {
        return None;
    }
    Some(na::Matrix2::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)]) / det)
}
