//! The results of a planning step.

use crate::units::{Acceleration, Duration, Time};

/// A side relative to the direction of travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LateralDirection {
    Left,
    Right,
}

impl LateralDirection {
    /// The other side.
    pub fn flip(self) -> Self {
        match self {
            LateralDirection::Left => LateralDirection::Right,
            LateralDirection::Right => LateralDirection::Left,
        }
    }
}

/// An acceleration, together with the time window it applies to.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelerationStep {
    acceleration: Acceleration,
    valid_until: Time,
    duration: Duration,
}

impl AccelerationStep {
    /// Creates an acceleration step.
    pub fn new(acceleration: Acceleration, valid_until: Time, duration: Duration) -> Self {
        Self {
            acceleration,
            valid_until,
            duration,
        }
    }

    /// Creates a step that starts at `now` and lasts `duration`.
    pub fn starting_at(acceleration: Acceleration, now: Time, duration: Duration) -> Self {
        Self::new(acceleration, now + duration, duration)
    }

    /// The acceleration.
    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    /// The absolute time until which the step is valid.
    pub fn valid_until(&self) -> Time {
        self.valid_until
    }

    /// The time span covered by the step.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// The accelerations of the subject (leader role) and of the vehicle that
/// would follow it (follower role) in a candidate lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualAccelerationStep {
    leader: AccelerationStep,
    follower: AccelerationStep,
}

impl DualAccelerationStep {
    /// Creates a dual acceleration step.
    pub fn new(leader: AccelerationStep, follower: AccelerationStep) -> Self {
        Self { leader, follower }
    }

    /// The step of the subject vehicle.
    pub fn leader_step(&self) -> &AccelerationStep {
        &self.leader
    }

    /// The step of the (new) follower.
    pub fn follower_step(&self) -> &AccelerationStep {
        &self.follower
    }

    /// The acceleration of the subject vehicle.
    pub fn leader_acceleration(&self) -> Acceleration {
        self.leader.acceleration
    }

    /// The acceleration of the (new) follower.
    pub fn follower_acceleration(&self) -> Acceleration {
        self.follower.acceleration
    }
}

/// The outcome of evaluating one lane for the subject vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LaneCandidate {
    /// The lane can be entered; these are the resulting accelerations.
    Admissible(DualAccelerationStep),
    /// Entering the lane would force the new follower to brake harder than
    /// comfortable, or the lane is physically occupied alongside the subject.
    TooDangerous,
}

impl LaneCandidate {
    /// The dual step, unless the lane was rejected.
    pub fn admissible(&self) -> Option<&DualAccelerationStep> {
        match self {
            LaneCandidate::Admissible(step) => Some(step),
            LaneCandidate::TooDangerous => None,
        }
    }

    /// The subject's own acceleration step in the lane, unless it was rejected.
    pub fn leader_step(&self) -> Option<&AccelerationStep> {
        self.admissible().map(DualAccelerationStep::leader_step)
    }

    /// Whether the candidate was rejected by safety screening.
    pub fn is_too_dangerous(&self) -> bool {
        matches!(self, LaneCandidate::TooDangerous)
    }
}

/// The lane change part of a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeDirection {
    /// Stay in the current lane.
    None,
    /// Merge towards the side traffic keeps to by default.
    Preferred,
    /// Merge towards the overtaking side.
    NonPreferred,
}

/// The decision of a planning step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneMovementStep {
    step: AccelerationStep,
    direction: MergeDirection,
}

impl LaneMovementStep {
    /// Creates a lane movement step.
    pub fn new(step: AccelerationStep, direction: MergeDirection) -> Self {
        Self { step, direction }
    }

    /// The longitudinal part of the decision.
    pub fn acceleration_step(&self) -> &AccelerationStep {
        &self.step
    }

    /// The lateral part of the decision.
    pub fn direction(&self) -> MergeDirection {
        self.direction
    }

    /// Resolves the lateral part of the decision into an absolute side.
    pub fn lateral(&self, preferred_side: LateralDirection) -> Option<LateralDirection> {
        match self.direction {
            MergeDirection::None => None,
            MergeDirection::Preferred => Some(preferred_side),
            MergeDirection::NonPreferred => Some(preferred_side.flip()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn step_window() {
        let step = AccelerationStep::starting_at(Acceleration::new(1.0), Time::new(12.0), Duration::new(0.5));
        assert_eq!(step.valid_until(), Time::new(12.5));
        assert_eq!(step.duration(), Duration::new(0.5));
    }

    #[test]
    fn lateral_follows_preferred_side() {
        let step = AccelerationStep::starting_at(Acceleration::ZERO, Time::ZERO, Duration::new(0.5));
        let keep_right = LateralDirection::Right;
        assert_eq!(LaneMovementStep::new(step, MergeDirection::None).lateral(keep_right), None);
        assert_eq!(
            LaneMovementStep::new(step, MergeDirection::Preferred).lateral(keep_right),
            Some(LateralDirection::Right)
        );
        assert_eq!(
            LaneMovementStep::new(step, MergeDirection::NonPreferred).lateral(keep_right),
            Some(LateralDirection::Left)
        );
    }

    #[test]
    fn rejected_candidate_has_no_step() {
        let leader = AccelerationStep::starting_at(Acceleration::new(0.7), Time::ZERO, Duration::new(0.5));
        let follower = AccelerationStep::starting_at(Acceleration::new(-1.0), Time::ZERO, Duration::new(0.5));
        let candidate = LaneCandidate::Admissible(DualAccelerationStep::new(leader, follower));
        assert_eq!(candidate.leader_step(), Some(&leader));
        assert_eq!(LaneCandidate::TooDangerous.leader_step(), None);
    }
}
