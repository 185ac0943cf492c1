//! Runs planning steps for a set of GTUs.

use crate::anticipation::{Anticipation, NeighborSource, RelativeLane};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::error::PlanningError;
use crate::following::{CarFollowingModel, SpeedInfo};
use crate::headway::PerceivedGtu;
use crate::lane_change::{
    GtuContext, LaneChangeInputs, LaneChangeModel, LaneIncentives, LaneView, RouteSuitability,
};
use crate::params::{self, Parameters};
use crate::step::{AccelerationStep, LaneMovementStep, LateralDirection, MergeDirection};
use crate::units::{Acceleration, Duration, Speed, Time};
use crate::GtuId;
use rand::Rng;
use rand_distr::Distribution;
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// GTUs that cannot go faster than this are not planned for.
const DRIFTING_SPEED: Speed = Speed::new(0.1); // m/s

/// How long the plan of a GTU that cannot move stays valid.
const STAND_STILL_DURATION: Duration = Duration::new(1.0); // s

/// Configuration shared by all drivers of a [Planner].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// The side traffic keeps to when not overtaking.
    pub preferred_side: LateralDirection,
    /// The lane incentives used when the route does not require a lane change.
    pub default_incentives: LaneIncentives,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            preferred_side: LateralDirection::Right,
            default_incentives: LaneIncentives::default(),
        }
    }
}

/// A driver: its parameters, its models and what it anticipates.
pub struct Driver {
    params: Parameters,
    car_following: Box<dyn CarFollowingModel>,
    lane_change: Box<dyn LaneChangeModel>,
    anticipation: Anticipation,
}

impl Driver {
    /// Creates a driver.
    pub fn new(
        params: Parameters,
        car_following: impl CarFollowingModel + 'static,
        lane_change: impl LaneChangeModel + 'static,
    ) -> Self {
        Self {
            params,
            car_following: Box::new(car_following),
            lane_change: Box::new(lane_change),
            anticipation: Anticipation::new(),
        }
    }

    /// The behavioural parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The behavioural parameters, for modification.
    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// The car-following model.
    pub fn car_following(&self) -> &dyn CarFollowingModel {
        self.car_following.as_ref()
    }

    /// The lane change model.
    pub fn lane_change(&self) -> &dyn LaneChangeModel {
        self.lane_change.as_ref()
    }

    /// The anticipation cache of this driver.
    pub fn anticipation(&self) -> &Anticipation {
        &self.anticipation
    }

    fn plan(
        &mut self,
        surroundings: &Surroundings,
        now: Time,
        config: &PlannerConfig,
    ) -> Result<LaneMovementStep, PlanningError> {
        let speed = surroundings.speed;
        if !speed.is_finite() {
            return Err(PlanningError::UnknownSpeed { speed });
        }
        if surroundings.max_vehicle_speed < DRIFTING_SPEED {
            let step = AccelerationStep::starting_at(Acceleration::ZERO, now, STAND_STILL_DURATION);
            return Ok(LaneMovementStep::new(step, MergeDirection::None));
        }

        let preferred = RelativeLane::CURRENT.towards(config.preferred_side);
        let non_preferred = RelativeLane::CURRENT.towards(config.preferred_side.flip());
        let current_view = self.lane_view(surroundings, RelativeLane::CURRENT, now)?;
        let preferred_view = match surroundings.lane(preferred) {
            Some(_) => Some(self.lane_view(surroundings, preferred, now)?),
            None => None,
        };
        let non_preferred_view = match surroundings.lane(non_preferred) {
            Some(_) => Some(self.lane_view(surroundings, non_preferred, now)?),
            None => None,
        };

        let suitability = |lane: RelativeLane| surroundings.lane(lane).map(|traffic| traffic.suitability);
        let incentives = LaneIncentives::from_route(
            speed,
            suitability(preferred),
            suitability(RelativeLane::CURRENT).unwrap_or(RouteSuitability::NoChangeNeeded),
            suitability(non_preferred),
            &config.default_incentives,
        );

        let ctx = GtuContext {
            params: &self.params,
            model: self.car_following.as_ref(),
            speed,
            now,
        };
        let inputs = LaneChangeInputs {
            current: &current_view,
            preferred: preferred_view.as_ref(),
            non_preferred: non_preferred_view.as_ref(),
            incentives,
        };
        let step = self.lane_change.compute_lane_change_and_acceleration(&ctx, &inputs)?;

        let target = match step.direction() {
            MergeDirection::None => None,
            MergeDirection::Preferred => Some(preferred),
            MergeDirection::NonPreferred => Some(non_preferred),
        };
        if let Some(lane) = target.filter(|lane| surroundings.lane(*lane).is_none()) {
            return Err(PlanningError::MissingLane { lane });
        }
        Ok(step)
    }

    /// Builds the view of a lane the lane change model works with.
    ///
    /// The desired speed in the lane is capped by the speed anticipated there,
    /// and vehicles in the adjacent lanes indicating to merge in count as leaders.
    fn lane_view(
        &mut self,
        surroundings: &Surroundings,
        lane: RelativeLane,
        now: Time,
    ) -> Result<LaneView, PlanningError> {
        let traffic = surroundings.lane(lane).ok_or(PlanningError::MissingLane { lane })?;
        let speed_info = SpeedInfo::new(traffic.speed_limit, surroundings.max_vehicle_speed);
        let desired_speed = self.car_following.desired_speed(&self.params, &speed_info)?;
        let anticipated = self
            .anticipation
            .get_speed(now, surroundings, &self.params, lane, desired_speed)?;

        let mut leaders = traffic.leaders.clone();
        leaders.extend(surroundings.merging_into(lane));
        Ok(LaneView {
            leaders,
            followers: traffic.followers.clone(),
            speed_info: SpeedInfo::new(
                traffic.speed_limit,
                surroundings.max_vehicle_speed.min(anticipated),
            ),
        })
    }
}

/// The perceived traffic in one lane.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneTraffic {
    /// Vehicles ahead.
    pub leaders: Vec<PerceivedGtu>,
    /// Vehicles behind.
    pub followers: Vec<PerceivedGtu>,
    /// The legal speed limit.
    pub speed_limit: Speed,
    /// How well the lane serves the route.
    pub suitability: RouteSuitability,
}

impl LaneTraffic {
    /// Creates an empty lane that serves the route.
    pub fn new(speed_limit: Speed) -> Self {
        Self {
            leaders: vec![],
            followers: vec![],
            speed_limit,
            suitability: RouteSuitability::NoChangeNeeded,
        }
    }

    /// Adds a vehicle ahead.
    pub fn with_leader(mut self, leader: PerceivedGtu) -> Self {
        self.leaders.push(leader);
        self
    }

    /// Adds a vehicle behind.
    pub fn with_follower(mut self, follower: PerceivedGtu) -> Self {
        self.followers.push(follower);
        self
    }

    /// Sets the route suitability.
    pub fn with_suitability(mut self, suitability: RouteSuitability) -> Self {
        self.suitability = suitability;
        self
    }
}

/// Everything a GTU perceives at the start of a planning step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surroundings {
    /// The speed of the GTU.
    pub speed: Speed,
    /// The maximum speed of the GTU.
    pub max_vehicle_speed: Speed,
    /// The lanes around the GTU; absent lanes do not exist.
    pub lanes: BTreeMap<RelativeLane, LaneTraffic>,
}

impl Surroundings {
    /// Creates surroundings without any lanes.
    pub fn new(speed: Speed, max_vehicle_speed: Speed) -> Self {
        Self {
            speed,
            max_vehicle_speed,
            lanes: BTreeMap::new(),
        }
    }

    /// Adds a lane.
    pub fn with_lane(mut self, lane: RelativeLane, traffic: LaneTraffic) -> Self {
        self.lanes.insert(lane, traffic);
        self
    }

    /// Gets the traffic in a lane, if it exists.
    pub fn lane(&self, lane: RelativeLane) -> Option<&LaneTraffic> {
        self.lanes.get(&lane)
    }

    /// Vehicles ahead in the adjacent lanes that indicate to merge into `lane`.
    fn merging_into(&self, lane: RelativeLane) -> impl Iterator<Item = PerceivedGtu> + '_ {
        let from_left = self
            .lane(lane.left())
            .into_iter()
            .flat_map(|t| t.leaders.iter())
            .filter(|gtu| gtu.indicator == Some(LateralDirection::Right));
        let from_right = self
            .lane(lane.right())
            .into_iter()
            .flat_map(|t| t.leaders.iter())
            .filter(|gtu| gtu.indicator == Some(LateralDirection::Left));
        from_left
            .chain(from_right)
            .filter(|gtu| gtu.distance.si() > 0.0)
            .copied()
    }
}

impl NeighborSource for Surroundings {
    fn leaders(&self, lane: RelativeLane) -> Option<&[PerceivedGtu]> {
        self.lane(lane).map(|traffic| traffic.leaders.as_slice())
    }
}

/// A registry of drivers, each planned for independently.
#[derive(Default)]
pub struct Planner {
    /// The registered drivers.
    drivers: SlotMap<GtuId, Driver>,
    /// Configuration shared by all drivers.
    config: PlannerConfig,
    /// Debugging information from the previous batch of planning steps.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Planner {
    /// Creates a new planner.
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// The shared configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Registers a driver.
    pub fn add_driver(&mut self, driver: Driver) -> GtuId {
        self.drivers.insert(driver)
    }

    /// Removes a driver, returning it if it was registered.
    pub fn remove_driver(&mut self, id: GtuId) -> Option<Driver> {
        self.drivers.remove(id)
    }

    /// Gets a registered driver.
    pub fn driver(&self, id: GtuId) -> Option<&Driver> {
        self.drivers.get(id)
    }

    /// Gets a registered driver for modification.
    pub fn driver_mut(&mut self, id: GtuId) -> Option<&mut Driver> {
        self.drivers.get_mut(id)
    }

    /// Iterates over the registered drivers.
    pub fn iter_drivers(&self) -> impl Iterator<Item = (GtuId, &Driver)> {
        self.drivers.iter()
    }

    /// Randomly assigns a speed limit adherence factor to each driver,
    /// which is sampled from a normal distribution with a mean of 1 (no adjustment)
    /// and standard deviation of `stddev`.
    pub fn randomise_speed_adjusts(&mut self, stddev: f64) -> Result<(), PlanningError> {
        self.randomise_speed_adjusts_with(stddev, &mut rand::thread_rng())
    }

    /// Like [Self::randomise_speed_adjusts], with a given random number generator.
    pub fn randomise_speed_adjusts_with(&mut self, stddev: f64, rng: &mut impl Rng) -> Result<(), PlanningError> {
        let distr = rand_distr::Normal::new(1.0, stddev)?;
        for (_, driver) in &mut self.drivers {
            let factor = distr.sample(rng).clamp(0.75, 1.25);
            driver.params.set(&params::FSPEED, factor)?;
        }
        Ok(())
    }

    /// Runs one planning step for a GTU.
    pub fn plan(
        &mut self,
        id: GtuId,
        surroundings: &Surroundings,
        now: Time,
    ) -> Result<LaneMovementStep, PlanningError> {
        let driver = self.drivers.get_mut(id).ok_or(PlanningError::UnknownGtu(id))?;
        driver.plan(surroundings, now, &self.config)
    }

    /// Runs one planning step for each of the given GTUs.
    ///
    /// A GTU that fails is logged and reported in its result; the others are planned regardless.
    pub fn plan_all<'a>(
        &mut self,
        gtus: impl IntoIterator<Item = (GtuId, &'a Surroundings)>,
        now: Time,
    ) -> Vec<(GtuId, Result<LaneMovementStep, PlanningError>)> {
        let results = gtus
            .into_iter()
            .map(|(id, surroundings)| {
                let result = self.plan(id, surroundings, now);
                if let Err(err) = &result {
                    match err {
                        PlanningError::MissingLane { lane } => {
                            log::error!("Planning GTU {:?} failed in lane {:?} at t={}: {}", id, lane, now, err)
                        }
                        _ => log::error!("Planning GTU {:?} failed at t={}: {}", id, now, err),
                    }
                }
                (id, result)
            })
            .collect();

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        results
    }

    /// Gets the debugging information for the previous batch of planning steps as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&self) -> serde_json::Value {
        self.debug.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::following::{CarFollowing, IdmPlus};
    use crate::lane_change::{Egoistic, FixedLaneChange, Mobil, MobilConfig};
    use crate::params::ParameterError;
    use crate::units::Length;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn driver() -> Driver {
        Driver::new(
            Parameters::default_set(),
            IdmPlus,
            Mobil::new(Egoistic, MobilConfig::default()),
        )
    }

    fn gtu(distance: f64, speed: f64) -> PerceivedGtu {
        PerceivedGtu::new(Length::new(distance), Speed::new(speed))
    }

    fn single_lane(traffic: LaneTraffic) -> Surroundings {
        Surroundings::new(Speed::new(20.0), Speed::new(40.0)).with_lane(RelativeLane::CURRENT, traffic)
    }

    fn limit() -> Speed {
        Speed::new(30.0)
    }

    #[test]
    fn unknown_gtu() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        planner.remove_driver(id);
        let err = planner
            .plan(id, &single_lane(LaneTraffic::new(limit())), Time::ZERO)
            .unwrap_err();
        assert_eq!(err, PlanningError::UnknownGtu(id));
    }

    #[test]
    fn unknown_speed_is_an_error() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let mut surroundings = single_lane(LaneTraffic::new(limit()));
        surroundings.speed = Speed::new(f64::NAN);
        let err = planner.plan(id, &surroundings, Time::ZERO).unwrap_err();
        assert!(matches!(err, PlanningError::UnknownSpeed { .. }));
    }

    #[test]
    fn stand_still() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        // No lanes at all: nothing is evaluated.
        let surroundings = Surroundings::new(Speed::ZERO, Speed::new(0.05));
        let step = planner.plan(id, &surroundings, Time::new(7.0)).unwrap();
        assert_eq!(step.direction(), MergeDirection::None);
        assert_eq!(step.acceleration_step().acceleration(), Acceleration::ZERO);
        assert_eq!(step.acceleration_step().valid_until(), Time::new(8.0));
    }

    #[test]
    fn missing_current_lane() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let surroundings = Surroundings::new(Speed::new(20.0), Speed::new(40.0));
        let err = planner.plan(id, &surroundings, Time::ZERO).unwrap_err();
        assert_eq!(err, PlanningError::MissingLane { lane: RelativeLane::CURRENT });
    }

    #[test]
    fn free_road() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let step = planner
            .plan(id, &single_lane(LaneTraffic::new(limit())), Time::ZERO)
            .unwrap();
        let free = IdmPlus
            .free_acceleration(
                &Parameters::default_set(),
                Speed::new(20.0),
                &SpeedInfo::new(limit(), Speed::new(40.0)),
            )
            .unwrap();
        assert_eq!(step.direction(), MergeDirection::None);
        assert_approx_eq!(step.acceleration_step().acceleration().si(), free.si());
        assert_eq!(step.acceleration_step().duration(), Duration::new(0.5));
    }

    #[test]
    fn zero_speed_limit_brakes_finitely() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let step = planner
            .plan(id, &single_lane(LaneTraffic::new(Speed::ZERO)), Time::ZERO)
            .unwrap();
        let acc = step.acceleration_step().acceleration();
        assert!(acc.is_finite());
        assert_approx_eq!(acc.si(), -1.25);
    }

    #[test]
    fn slow_traffic_ahead_is_anticipated() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let free = planner
            .plan(id, &single_lane(LaneTraffic::new(limit())), Time::ZERO)
            .unwrap();
        let slow = planner
            .plan(
                id,
                &single_lane(LaneTraffic::new(limit()).with_leader(gtu(200.0, 5.0))),
                Time::new(0.5),
            )
            .unwrap();
        assert!(slow.acceleration_step().acceleration() < free.acceleration_step().acceleration());
    }

    #[test]
    fn merging_vehicle_is_followed() {
        let mut planner = Planner::default();
        let id = planner.add_driver(driver());
        let surroundings = |merger: PerceivedGtu| {
            single_lane(LaneTraffic::new(limit()))
                .with_lane(RelativeLane::LEFT, LaneTraffic::new(limit()).with_leader(merger))
        };

        let ignoring = planner
            .plan(id, &surroundings(gtu(10.0, 5.0)), Time::ZERO)
            .unwrap();
        assert_eq!(ignoring.direction(), MergeDirection::None);
        assert!(ignoring.acceleration_step().acceleration() > Acceleration::ZERO);

        let merging = planner
            .plan(
                id,
                &surroundings(gtu(10.0, 5.0).indicating(LateralDirection::Right)),
                Time::new(0.5),
            )
            .unwrap();
        assert!(merging.acceleration_step().acceleration() < Acceleration::ZERO);
    }

    #[test]
    fn fixed_model_towards_missing_lane_stays() {
        let mut planner = Planner::default();
        let id = planner.add_driver(Driver::new(
            Parameters::default_set(),
            IdmPlus,
            FixedLaneChange::new(MergeDirection::Preferred),
        ));
        let step = planner
            .plan(id, &single_lane(LaneTraffic::new(limit())), Time::ZERO)
            .unwrap();
        assert_eq!(step.direction(), MergeDirection::None);
    }

    #[test]
    fn batch_continues_after_failure() {
        let mut planner = Planner::default();
        let mut params = Parameters::default_set();
        params.remove(&params::A);
        let broken = planner.add_driver(Driver::new(
            params,
            IdmPlus,
            Mobil::new(Egoistic, MobilConfig::default()),
        ));
        let fine = planner.add_driver(driver());

        let surroundings = single_lane(LaneTraffic::new(limit()));
        let results = planner.plan_all([(broken, &surroundings), (fine, &surroundings)], Time::ZERO);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, broken);
        assert_eq!(
            results[0].1,
            Err(PlanningError::Parameter(ParameterError::Missing { id: "a" }))
        );
        assert_eq!(results[1].0, fine);
        assert!(results[1].1.is_ok());
    }

    #[test]
    fn anticipation_is_per_driver() {
        let mut planner = Planner::default();
        let a = planner.add_driver(driver());
        let b = planner.add_driver(driver());
        planner
            .plan(a, &single_lane(LaneTraffic::new(limit())), Time::new(2.0))
            .unwrap();
        assert_eq!(planner.driver(a).unwrap().anticipation().cached_at(), Some(Time::new(2.0)));
        assert_eq!(planner.driver(b).unwrap().anticipation().cached_at(), None);
    }

    #[test]
    fn speed_adjusts_are_clamped() {
        let mut planner = Planner::default();
        let ids: Vec<_> = (0..50).map(|_| planner.add_driver(driver())).collect();
        let mut rng = StdRng::seed_from_u64(7);
        planner.randomise_speed_adjusts_with(10.0, &mut rng).unwrap();
        for id in ids {
            let factor = planner.driver(id).unwrap().params().get(&params::FSPEED).unwrap();
            assert!((0.75..=1.25).contains(&factor));
        }
    }

    #[test]
    fn invalid_stddev_is_rejected() {
        let mut planner = Planner::default();
        planner.add_driver(driver());
        assert!(matches!(
            planner.randomise_speed_adjusts(-1.0),
            Err(PlanningError::Distribution(_))
        ));
    }
}
