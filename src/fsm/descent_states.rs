use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescentState {
    DeorbitBurn,
    CourseCorrecting,
    OnCourse,
    Decelerating,
    KillingLateralVelocity,
    FinalDescent,
    Landed,
}

impl DescentState {
    /// Phases in which a coasting vessel may be time-warped.
    pub fn permits_time_warp(&self) -> bool {
        matches!(self, DescentState::DeorbitBurn | DescentState::OnCourse)
    }
}

impl fmt::Display for DescentState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DescentState::DeorbitBurn => write!(f, "Deorbit Burn"),
            DescentState::CourseCorrecting => write!(f, "Course Correcting"),
            DescentState::OnCourse => write!(f, "On Course"),
            DescentState::Decelerating => write!(f, "Decelerating"),
            DescentState::KillingLateralVelocity => write!(f, "Killing Lateral Velocity"),
            DescentState::FinalDescent => write!(f, "Final Descent"),
            DescentState::Landed => write!(f, "Landed"),
        }
    }
}
