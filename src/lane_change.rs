//! Lane change decisions.
//!
//! [Mobil] evaluates the current lane and both adjacent lanes, rejects lanes
//! where the new follower would have to brake too hard, weighs the remaining
//! ones with a [DriverPersonality] and applies lane incentives and a small
//! hysteresis before deciding.

pub use self::dual::{adjacent_lane_candidate, compute_dual_acceleration_step, current_lane_step, screen};
pub use self::personality::{Altruistic, DriverPersonality, Egoistic};
use crate::debug::debug_utilities;
use crate::following::{CarFollowingModel, SpeedInfo};
use crate::headway::PerceivedGtu;
use crate::params::{ParameterError, Parameters};
use crate::step::{LaneCandidate, LaneMovementStep, MergeDirection};
use crate::units::{Acceleration, Length, Speed, Time};

mod dual;
mod personality;

/// Default hysteresis used to break near-ties, in m/s<sup>2</sup>.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// The subject vehicle, as seen by the lane change models.
#[derive(Clone, Copy)]
pub struct GtuContext<'a> {
    /// The driver's behavioural parameters.
    pub params: &'a Parameters,
    /// The driver's car-following model.
    pub model: &'a dyn CarFollowingModel,
    /// The current speed.
    pub speed: Speed,
    /// The current simulation time.
    pub now: Time,
}

/// The traffic in one lane around the subject vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneView {
    /// Vehicles ahead, with the gap ahead of the subject.
    pub leaders: Vec<PerceivedGtu>,
    /// Vehicles behind, with the gap behind the subject.
    pub followers: Vec<PerceivedGtu>,
    /// The desired speed inputs that apply in this lane.
    pub speed_info: SpeedInfo,
}

impl LaneView {
    /// Creates a view of an empty lane.
    pub fn empty(speed_info: SpeedInfo) -> Self {
        Self {
            leaders: vec![],
            followers: vec![],
            speed_info,
        }
    }
}

/// Accelerations added to the utility of each lane.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneIncentives {
    /// Added to the utility of the lane on the preferred side.
    pub preferred: Acceleration,
    /// Added to the utility of staying; a threshold against needless changes.
    pub stay: Acceleration,
    /// Added to the utility of the lane on the non-preferred side.
    pub non_preferred: Acceleration,
}

impl Default for LaneIncentives {
    fn default() -> Self {
        Self {
            preferred: Acceleration::new(0.3),
            stay: Acceleration::new(0.1),
            non_preferred: Acceleration::new(-0.3),
        }
    }
}

/// How well a lane serves the route of the vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteSuitability {
    /// The lane can be followed as far as the route horizon reaches.
    NoChangeNeeded,
    /// The lane must be left within the given distance; zero means right now.
    LeaveWithin(Length),
}

impl RouteSuitability {
    /// The deceleration needed to stop before the lane must be left.
    fn acceleration(self, speed: Speed) -> Acceleration {
        match self {
            RouteSuitability::NoChangeNeeded => Acceleration::ZERO,
            RouteSuitability::LeaveWithin(distance) if distance.si() <= 0.0 => Acceleration::NEG_INFINITY,
            RouteSuitability::LeaveWithin(distance) => {
                Acceleration::new(-speed.si() * speed.si() / (2.0 * distance.si()))
            }
        }
    }
}

impl LaneIncentives {
    /// Derives lane incentives from the route suitability of each lane.
    ///
    /// If no lane needs to be left, `defaults` apply unchanged. Otherwise each
    /// adjacent lane gets the deceleration needed to stop where it must be
    /// left, and the current lane does too unless it serves the route.
    pub fn from_route(
        speed: Speed,
        preferred: Option<RouteSuitability>,
        current: RouteSuitability,
        non_preferred: Option<RouteSuitability>,
        defaults: &LaneIncentives,
    ) -> Self {
        use RouteSuitability::NoChangeNeeded;

        let all_fine = current == NoChangeNeeded
            && preferred.map_or(true, |s| s == NoChangeNeeded)
            && non_preferred.map_or(true, |s| s == NoChangeNeeded);
        if all_fine {
            return *defaults;
        }

        let side = |s: Option<RouteSuitability>| {
            s.map_or(Acceleration::NEG_INFINITY, |s| s.acceleration(speed))
        };
        Self {
            preferred: side(preferred),
            stay: match current {
                NoChangeNeeded => defaults.stay,
                _ => current.acceleration(speed),
            },
            non_preferred: side(non_preferred),
        }
    }
}

/// The lanes and incentives a lane change decision is based on.
#[derive(Clone, Copy)]
pub struct LaneChangeInputs<'a> {
    /// The current lane.
    pub current: &'a LaneView,
    /// The adjacent lane on the preferred side, if it exists.
    pub preferred: Option<&'a LaneView>,
    /// The adjacent lane on the non-preferred side, if it exists.
    pub non_preferred: Option<&'a LaneView>,
    /// The incentives of the three lanes.
    pub incentives: LaneIncentives,
}

/// A lane change model.
pub trait LaneChangeModel {
    /// A short name of the model.
    fn name(&self) -> &str;

    /// Decides on the acceleration and whether to change lanes.
    fn compute_lane_change_and_acceleration(
        &self,
        ctx: &GtuContext,
        inputs: &LaneChangeInputs,
    ) -> Result<LaneMovementStep, ParameterError>;
}

/// Configuration of the [Mobil] decision engine.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MobilConfig {
    /// The margin used to break near-ties between lanes.
    pub epsilon: Acceleration,
}

impl Default for MobilConfig {
    fn default() -> Self {
        Self {
            epsilon: Acceleration::new(DEFAULT_EPSILON),
        }
    }
}

/// A MOBIL-style lane change model with a pluggable driver personality.
#[derive(Clone, Debug, Default)]
pub struct Mobil<P> {
    personality: P,
    config: MobilConfig,
}

impl<P: DriverPersonality> Mobil<P> {
    /// Creates a lane change model.
    pub fn new(personality: P, config: MobilConfig) -> Self {
        Self { personality, config }
    }

    /// The driver personality.
    pub fn personality(&self) -> &P {
        &self.personality
    }
}

impl<P: DriverPersonality> LaneChangeModel for Mobil<P> {
    fn name(&self) -> &str {
        self.personality.name()
    }

    fn compute_lane_change_and_acceleration(
        &self,
        ctx: &GtuContext,
        inputs: &LaneChangeInputs,
    ) -> Result<LaneMovementStep, ParameterError> {
        let straight = current_lane_step(ctx, inputs.current)?;
        let preferred = inputs
            .preferred
            .map(|lane| adjacent_lane_candidate(ctx, lane))
            .transpose()?;
        let non_preferred = inputs
            .non_preferred
            .map(|lane| adjacent_lane_candidate(ctx, lane))
            .transpose()?;

        let personality = &self.personality as &dyn DriverPersonality;
        let straight_u = personality.utility(&straight) + inputs.incentives.stay;
        let preferred_u = preferred
            .and_then(|c| c.utility(personality))
            .map(|u| u + inputs.incentives.preferred);
        let non_preferred_u = non_preferred
            .and_then(|c| c.utility(personality))
            .map(|u| u + inputs.incentives.non_preferred);
        log::trace!(
            "{} utilities: straight {}, preferred {:?}, non-preferred {:?}",
            self.name(),
            straight_u,
            preferred_u,
            non_preferred_u
        );

        let direction = resolve(straight_u, preferred_u, non_preferred_u, self.config.epsilon);
        debug_utilities(straight_u, preferred_u, non_preferred_u, direction);

        // `resolve` only picks a side that has a utility, hence an admissible step
        let merge_step = match direction {
            MergeDirection::None => None,
            MergeDirection::Preferred => preferred.as_ref().and_then(LaneCandidate::leader_step),
            MergeDirection::NonPreferred => non_preferred.as_ref().and_then(LaneCandidate::leader_step),
        };
        if direction != MergeDirection::None {
            log::debug!("{} merges {:?}", self.name(), direction);
        }
        let step = merge_step.copied().unwrap_or(*straight.leader_step());
        Ok(LaneMovementStep::new(step, direction))
    }
}

/// Picks a lane from the utilities of staying and of the two adjacent lanes.
///
/// A side is `None` if the lane does not exist or was rejected as too dangerous.
/// The non-preferred side must beat staying by more than `epsilon`, while the
/// preferred side may be up to `epsilon` worse than staying and still win.
pub fn resolve(
    straight: Acceleration,
    preferred: Option<Acceleration>,
    non_preferred: Option<Acceleration>,
    epsilon: Acceleration,
) -> MergeDirection {
    match (preferred, non_preferred) {
        (None, None) => MergeDirection::None,
        (None, Some(non_preferred)) => {
            if non_preferred > straight + epsilon {
                MergeDirection::NonPreferred
            } else {
                MergeDirection::None
            }
        }
        (Some(preferred), None) => {
            if preferred + epsilon >= straight {
                MergeDirection::Preferred
            } else {
                MergeDirection::None
            }
        }
        (Some(preferred), Some(non_preferred)) => {
            let preferred_attr = attractiveness(preferred - straight + epsilon);
            let non_preferred_attr = attractiveness(non_preferred - straight - epsilon);
            if preferred_attr <= Acceleration::ZERO && non_preferred_attr <= Acceleration::ZERO {
                MergeDirection::None
            } else if preferred_attr >= non_preferred_attr {
                MergeDirection::Preferred
            } else {
                MergeDirection::NonPreferred
            }
        }
    }
}

/// Differences of two infinite utilities are NaN; those never attract.
fn attractiveness(diff: Acceleration) -> Acceleration {
    if diff.si().is_nan() {
        Acceleration::NEG_INFINITY
    } else {
        diff
    }
}

/// Always heads for the same side, without considering other traffic.
/// Produces reproducible decisions for testing.
#[derive(Clone, Copy, Debug)]
pub struct FixedLaneChange {
    direction: MergeDirection,
}

impl FixedLaneChange {
    /// Creates a model that always merges in `direction` when that lane exists.
    pub fn new(direction: MergeDirection) -> Self {
        Self { direction }
    }
}

impl LaneChangeModel for FixedLaneChange {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn compute_lane_change_and_acceleration(
        &self,
        ctx: &GtuContext,
        inputs: &LaneChangeInputs,
    ) -> Result<LaneMovementStep, ParameterError> {
        let target = match self.direction {
            MergeDirection::None => None,
            MergeDirection::Preferred => inputs.preferred,
            MergeDirection::NonPreferred => inputs.non_preferred,
        };
        match target {
            Some(lane) => {
                let step = current_lane_step(ctx, lane)?;
                Ok(LaneMovementStep::new(*step.leader_step(), self.direction))
            }
            None => {
                let step = current_lane_step(ctx, inputs.current)?;
                Ok(LaneMovementStep::new(*step.leader_step(), MergeDirection::None))
            }
        }
    }
}
