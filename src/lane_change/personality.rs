use crate::step::{DualAccelerationStep, LaneCandidate};
use crate::units::Acceleration;

/// Weighs the accelerations of a lane candidate into a single utility.
pub trait DriverPersonality {
    /// A short name of the personality.
    fn name(&self) -> &str;

    /// The utility of a candidate lane, as an acceleration.
    fn utility(&self, step: &DualAccelerationStep) -> Acceleration;
}

/// Only cares about its own acceleration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Egoistic;

/// Weighs its own acceleration and that of the new follower equally.
#[derive(Clone, Copy, Debug, Default)]
pub struct Altruistic;

impl DriverPersonality for Egoistic {
    fn name(&self) -> &str {
        "Egoistic"
    }

    fn utility(&self, step: &DualAccelerationStep) -> Acceleration {
        step.leader_acceleration()
    }
}

impl DriverPersonality for Altruistic {
    fn name(&self) -> &str {
        "Altruistic"
    }

    fn utility(&self, step: &DualAccelerationStep) -> Acceleration {
        (step.leader_acceleration() + step.follower_acceleration()) * 0.5
    }
}

impl LaneCandidate {
    /// The utility of the candidate, or `None` if it was rejected as too dangerous.
    pub fn utility(&self, personality: &dyn DriverPersonality) -> Option<Acceleration> {
        self.admissible().map(|step| personality.utility(step))
    }
}
