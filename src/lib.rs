pub use anticipation::{Anticipation, NeighborSource, RelativeLane};
pub use error::PlanningError;
pub use following::{CarFollowing, CarFollowingModel, FollowingError, Idm, IdmPlus, SpeedInfo};
pub use headway::{Neighbor, NeighborSet, PerceivedGtu, UndefinedRegime};
pub use lane_change::{
    Altruistic, DriverPersonality, Egoistic, FixedLaneChange, LaneChangeModel, LaneIncentives, Mobil,
    MobilConfig, RouteSuitability,
};
pub use params::{ParameterError, Parameters};
pub use planner::{Driver, LaneTraffic, Planner, PlannerConfig, Surroundings};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use step::{
    AccelerationStep, DualAccelerationStep, LaneCandidate, LaneMovementStep, LateralDirection, MergeDirection,
};

pub mod anticipation;
mod debug;
mod error;
pub mod following;
pub mod headway;
pub mod lane_change;
pub mod params;
mod planner;
pub mod step;
pub mod units;

new_key_type! {
    /// Unique ID of a GTU registered with a [Planner].
    pub struct GtuId;
}
