//! Accelerations of the subject and its (new) follower in a candidate lane.

use super::{GtuContext, LaneView};
use crate::following::{CarFollowing, FollowingError};
use crate::headway::{NeighborSet, UndefinedRegime};
use crate::params::{self, ParameterError};
use crate::step::{AccelerationStep, DualAccelerationStep, LaneCandidate};
use crate::units::Acceleration;

/// Computes the acceleration of the subject reacting to the leaders in `lane`.
pub fn leader_acceleration(ctx: &GtuContext, lane: &LaneView) -> Result<Acceleration, FollowingError> {
    let lookahead = ctx.params.get(&params::LOOKAHEAD)?;
    let leaders = NeighborSet::try_from_headways(
        lane.leaders
            .iter()
            .filter(|gtu| gtu.distance <= lookahead)
            .map(|gtu| (gtu.distance, gtu.speed)),
    )?;
    ctx.model
        .following_acceleration_multi(ctx.params, ctx.speed, &lane.speed_info, &leaders)
}

/// Computes the acceleration of the nearest follower in `lane` reacting to the subject.
/// Zero if there is no follower in range.
///
/// The follower is assumed to drive with the subject's own model and parameters.
pub fn follower_acceleration(ctx: &GtuContext, lane: &LaneView) -> Result<Acceleration, FollowingError> {
    let lookahead = ctx.params.get(&params::LOOKAHEAD)?;
    let follower = lane
        .followers
        .iter()
        .filter(|gtu| gtu.distance <= lookahead)
        .min_by(|a, b| a.distance.si().total_cmp(&b.distance.si()));

    match follower {
        Some(follower) => ctx.model.following_acceleration(
            ctx.params,
            follower.speed,
            &lane.speed_info,
            follower.distance,
            ctx.speed,
        ),
        None => Ok(Acceleration::ZERO),
    }
}

/// Computes the dual acceleration step for a lane.
pub fn compute_dual_acceleration_step(
    ctx: &GtuContext,
    lane: &LaneView,
) -> Result<DualAccelerationStep, FollowingError> {
    let dt = ctx.params.get(&params::DT)?;
    let leader = leader_acceleration(ctx, lane)?;
    let follower = follower_acceleration(ctx, lane)?;
    Ok(DualAccelerationStep::new(
        AccelerationStep::starting_at(leader, ctx.now, dt),
        AccelerationStep::starting_at(follower, ctx.now, dt),
    ))
}

/// Screens the outcome for an adjacent lane.
///
/// The lane is too dangerous if someone is alongside the subject, or if the
/// new follower would have to brake harder than `comf_dec`.
pub fn screen(
    outcome: Result<DualAccelerationStep, FollowingError>,
    comf_dec: Acceleration,
) -> Result<LaneCandidate, ParameterError> {
    match outcome {
        Ok(step) if step.follower_acceleration() < -comf_dec => Ok(LaneCandidate::TooDangerous),
        Ok(step) => Ok(LaneCandidate::Admissible(step)),
        Err(FollowingError::UndefinedRegime(_)) => Ok(LaneCandidate::TooDangerous),
        Err(FollowingError::Parameter(err)) => Err(err),
    }
}

/// Evaluates and screens an adjacent lane.
pub fn adjacent_lane_candidate(ctx: &GtuContext, lane: &LaneView) -> Result<LaneCandidate, ParameterError> {
    let comf_dec = ctx.params.get(&params::B)?;
    screen(compute_dual_acceleration_step(ctx, lane), comf_dec)
}

/// Evaluates the current lane, which is never screened.
///
/// An undefined regime with the leader falls back to emergency braking; one with
/// the follower is ignored, as the subject does not change its relation to it.
pub fn current_lane_step(ctx: &GtuContext, lane: &LaneView) -> Result<DualAccelerationStep, ParameterError> {
    let dt = ctx.params.get(&params::DT)?;
    let leader = match leader_acceleration(ctx, lane) {
        Ok(acc) => acc,
        Err(FollowingError::UndefinedRegime(UndefinedRegime { headway })) => {
            log::warn!("Leader in current lane at headway {}; applying emergency braking", headway);
            -ctx.params.get(&params::EMERGENCY_DECELERATION)?
        }
        Err(FollowingError::Parameter(err)) => return Err(err),
    };
    let follower = match follower_acceleration(ctx, lane) {
        Ok(acc) => acc,
        Err(FollowingError::UndefinedRegime(_)) => Acceleration::ZERO,
        Err(FollowingError::Parameter(err)) => return Err(err),
    };
    Ok(DualAccelerationStep::new(
        AccelerationStep::starting_at(leader, ctx.now, dt),
        AccelerationStep::starting_at(follower, ctx.now, dt),
    ))
}
