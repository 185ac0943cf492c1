use crate::anticipation::RelativeLane;
use crate::params::ParameterError;
use crate::units::Speed;
use crate::GtuId;
use thiserror::Error;

/// An error that aborts the planning step of one GTU.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PlanningError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// The speed of the GTU is not a usable number.
    #[error("cannot determine GTU speed (got {speed:?})")]
    UnknownSpeed { speed: Speed },

    /// A lane the caller claims to exist has no perception data.
    #[error("lane {lane:?} was expected to exist but is not perceived")]
    MissingLane { lane: RelativeLane },

    #[error("no GTU {0:?} is registered")]
    UnknownGtu(GtuId),

    #[error("invalid speed adjustment distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),
}
