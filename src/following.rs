//! Car-following models.
//!
//! A model only implements [CarFollowingModel::accelerate], which reacts to an
//! ordered set of leaders. The free-flow and single-leader call shapes are
//! provided for every model by the [CarFollowing] extension trait.

pub use self::idm::{Idm, IdmPlus};
use crate::headway::{NeighborSet, UndefinedRegime};
use crate::params::{self, ParameterError, Parameters};
use crate::units::{Acceleration, Length, Speed};
use thiserror::Error;

mod idm;

/// An error computing a car-following acceleration.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FollowingError {
    /// No acceleration is defined; the caller must pick a braking policy.
    #[error(transparent)]
    UndefinedRegime(#[from] UndefinedRegime),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// The inputs a driver derives its desired speed from.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedInfo {
    /// The legal speed limit.
    pub speed_limit: Speed,
    /// The maximum speed of the vehicle itself.
    pub max_vehicle_speed: Speed,
}

impl SpeedInfo {
    /// Creates speed info where the vehicle can drive up to `max_vehicle_speed`.
    pub fn new(speed_limit: Speed, max_vehicle_speed: Speed) -> Self {
        Self {
            speed_limit,
            max_vehicle_speed,
        }
    }
}

/// A car-following law.
pub trait CarFollowingModel {
    /// A short name of the model.
    fn name(&self) -> &str;

    /// The desired speed of a driver.
    ///
    /// The default is the speed limit times the adherence factor, but never
    /// more than the vehicle can do.
    fn desired_speed(&self, params: &Parameters, speed_info: &SpeedInfo) -> Result<Speed, ParameterError> {
        let fspeed = params.get(&params::FSPEED)?;
        Ok((speed_info.speed_limit * fspeed).min(speed_info.max_vehicle_speed))
    }

    /// The desired gap to a leader driving at the same speed.
    fn desired_headway(&self, params: &Parameters, speed: Speed) -> Result<Length, ParameterError> {
        let s0 = params.get(&params::S0)?;
        let t = params.get(&params::T)?;
        Ok(s0 + speed * t)
    }

    /// Computes the acceleration when following `leaders`.
    ///
    /// Implementations may assume `leaders` is non-empty; callers go through
    /// [CarFollowing], which guarantees it.
    fn accelerate(
        &self,
        params: &Parameters,
        speed: Speed,
        desired_speed: Speed,
        desired_headway: Length,
        leaders: &NeighborSet,
    ) -> Result<Acceleration, ParameterError>;
}

/// The call shapes available on every car-following model.
pub trait CarFollowing: CarFollowingModel {
    /// The acceleration without a leader.
    ///
    /// Modelled as a leader at infinite distance driving at our own speed,
    /// which leaves only the free-road term active.
    fn free_acceleration(
        &self,
        params: &Parameters,
        speed: Speed,
        speed_info: &SpeedInfo,
    ) -> Result<Acceleration, FollowingError> {
        self.following_acceleration(params, speed, speed_info, Length::INFINITY, speed)
    }

    /// The acceleration when following a single leader.
    fn following_acceleration(
        &self,
        params: &Parameters,
        speed: Speed,
        speed_info: &SpeedInfo,
        headway: Length,
        leader_speed: Speed,
    ) -> Result<Acceleration, FollowingError> {
        let leaders = NeighborSet::single(headway, leader_speed)?;
        self.following_acceleration_multi(params, speed, speed_info, &leaders)
    }

    /// The acceleration when following a set of leaders. An empty set means free flow.
    fn following_acceleration_multi(
        &self,
        params: &Parameters,
        speed: Speed,
        speed_info: &SpeedInfo,
        leaders: &NeighborSet,
    ) -> Result<Acceleration, FollowingError> {
        let desired_speed = self.desired_speed(params, speed_info)?;
        let desired_headway = self.desired_headway(params, speed)?;
        let acc = if leaders.is_empty() {
            let free = NeighborSet::single(Length::INFINITY, speed)?;
            self.accelerate(params, speed, desired_speed, desired_headway, &free)?
        } else {
            self.accelerate(params, speed, desired_speed, desired_headway, leaders)?
        };
        Ok(acc)
    }
}

impl<M: CarFollowingModel + ?Sized> CarFollowing for M {}
