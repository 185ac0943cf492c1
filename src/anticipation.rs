//! Anticipated speed and density per lane.
//!
//! Values are cached for one simulation instant. Lanes depend on each other
//! through vehicles indicating to merge, so the whole cache is dropped as soon
//! as it is accessed at a different time.

use crate::error::PlanningError;
use crate::headway::PerceivedGtu;
use crate::params::{self, Parameters};
use crate::step::LateralDirection;
use crate::units::{LinearDensity, Length, Speed, Time};
use std::collections::HashMap;

/// A lane relative to the current lane of the subject vehicle.
/// Negative numbers are to the left, positive numbers to the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeLane(i8);

impl RelativeLane {
    /// The current lane.
    pub const CURRENT: Self = Self(0);
    /// The lane directly to the left.
    pub const LEFT: Self = Self(-1);
    /// The lane directly to the right.
    pub const RIGHT: Self = Self(1);

    /// The lane `n` lanes to the right (negative: to the left).
    pub const fn new(n: i8) -> Self {
        Self(n)
    }

    /// The adjacent lane towards `side`.
    pub fn towards(self, side: LateralDirection) -> Self {
        match side {
            LateralDirection::Left => Self(self.0.saturating_sub(1)),
            LateralDirection::Right => Self(self.0.saturating_add(1)),
        }
    }

    /// The adjacent lane to the left.
    pub fn left(self) -> Self {
        self.towards(LateralDirection::Left)
    }

    /// The adjacent lane to the right.
    pub fn right(self) -> Self {
        self.towards(LateralDirection::Right)
    }
}

/// Perception data the anticipation is computed from.
pub trait NeighborSource {
    /// The vehicles ahead in `lane`, or `None` if the lane does not exist.
    fn leaders(&self, lane: RelativeLane) -> Option<&[PerceivedGtu]>;
}

/// Whether a cache computed at `cached_at` may be used at `now`.
pub fn is_stale(now: Time, cached_at: Option<Time>) -> bool {
    cached_at != Some(now)
}

/// The anticipated speed contributions originating from one lane.
#[derive(Clone, Copy, Debug)]
struct Contributions {
    /// From all vehicles in the lane, for the lane itself.
    in_lane: Speed,
    /// From vehicles indicating left, for the lane to the left.
    to_left: Speed,
    /// From vehicles indicating right, for the lane to the right.
    to_right: Speed,
}

/// Speeds anticipated for a lane depend on the desired speed they were
/// computed with, which differs between lanes with different speed limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SpeedKey {
    lane: RelativeLane,
    desired_speed: u64,
}

impl SpeedKey {
    fn new(lane: RelativeLane, desired_speed: Speed) -> Self {
        Self {
            lane,
            desired_speed: desired_speed.si().to_bits(),
        }
    }
}

#[derive(Default)]
struct Entries {
    contributions: HashMap<SpeedKey, Contributions>,
    speed: HashMap<SpeedKey, Speed>,
    density: HashMap<RelativeLane, LinearDensity>,
}

/// A per-vehicle cache of anticipated speed and density.
#[derive(Default)]
pub struct Anticipation {
    cached_at: Option<Time>,
    entries: Entries,
}

impl Anticipation {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Default::default()
    }

    /// The time the cached values belong to, if any.
    pub fn cached_at(&self) -> Option<Time> {
        self.cached_at
    }

    /// Drops all cached values if they belong to another instant.
    fn refresh(&mut self, now: Time) {
        if is_stale(now, self.cached_at) {
            if let Some(at) = self.cached_at {
                log::debug!("Anticipation cache from t={} invalidated at t={}", at, now);
            }
            self.entries = Entries::default();
            self.cached_at = Some(now);
        }
    }

    /// The anticipated speed in `lane`.
    ///
    /// The minimum of the speed anticipated from vehicles in the lane itself and
    /// from vehicles in the adjacent lanes indicating to merge into it, all
    /// relative to the given desired speed in that lane.
    pub fn get_speed(
        &mut self,
        now: Time,
        source: &dyn NeighborSource,
        params: &Parameters,
        lane: RelativeLane,
        desired_speed: Speed,
    ) -> Result<Speed, PlanningError> {
        self.refresh(now);
        let key = SpeedKey::new(lane, desired_speed);
        if let Some(speed) = self.entries.speed.get(&key) {
            return Ok(*speed);
        }

        let x0 = params.get(&params::X0)?;
        let own = self
            .contributions(source, lane, desired_speed, x0)
            .ok_or(PlanningError::MissingLane { lane })?;
        let from_left = self
            .contributions(source, lane.left(), desired_speed, x0)
            .map(|c| c.to_right);
        let from_right = self
            .contributions(source, lane.right(), desired_speed, x0)
            .map(|c| c.to_left);

        let speed = [from_left, from_right]
            .into_iter()
            .flatten()
            .fold(own.in_lane, Speed::min);
        self.entries.speed.insert(key, speed);
        Ok(speed)
    }

    /// The density of vehicles ahead in `lane`, within the look-ahead distance.
    pub fn get_density(
        &mut self,
        now: Time,
        source: &dyn NeighborSource,
        params: &Parameters,
        lane: RelativeLane,
    ) -> Result<LinearDensity, PlanningError> {
        self.refresh(now);
        if let Some(density) = self.entries.density.get(&lane) {
            return Ok(*density);
        }

        let lookahead = params.get(&params::LOOKAHEAD)?;
        let leaders = source.leaders(lane).ok_or(PlanningError::MissingLane { lane })?;
        let (count, farthest) = leaders
            .iter()
            .filter(|gtu| gtu.distance.si() > 0.0 && gtu.distance <= lookahead)
            .fold((0, Length::ZERO), |(n, far), gtu| (n + 1, far.max(gtu.distance)));
        let density = LinearDensity::from_count(count, farthest);
        self.entries.density.insert(lane, density);
        Ok(density)
    }

    /// Gets or computes the contributions of `lane`, all three at once.
    fn contributions(
        &mut self,
        source: &dyn NeighborSource,
        lane: RelativeLane,
        desired_speed: Speed,
        x0: Length,
    ) -> Option<Contributions> {
        let key = SpeedKey::new(lane, desired_speed);
        if let Some(c) = self.entries.contributions.get(&key) {
            return Some(*c);
        }
        let leaders = source.leaders(lane)?;
        let indicating = |side: LateralDirection| leaders.iter().filter(move |gtu| gtu.indicator == Some(side));
        let c = Contributions {
            in_lane: anticipate(leaders.iter(), desired_speed, x0),
            to_left: anticipate(indicating(LateralDirection::Left), desired_speed, x0),
            to_right: anticipate(indicating(LateralDirection::Right), desired_speed, x0),
        };
        self.entries.contributions.insert(key, c);
        Some(c)
    }
}

/// Anticipates the speed from leaders ahead, within `x0`.
///
/// Each leader pulls the speed down to its own, with less weight the further it is:
/// `v_j + (x_j / x0) * (v_des - v_j)`. Vehicles alongside or behind are not ahead
/// and do not count.
fn anticipate<'a>(leaders: impl Iterator<Item = &'a PerceivedGtu>, desired_speed: Speed, x0: Length) -> Speed {
    leaders
        .filter(|gtu| gtu.distance.si() > 0.0 && gtu.distance <= x0)
        .map(|gtu| {
            let weight = gtu.distance / x0;
            gtu.speed + (desired_speed - gtu.speed) * weight
        })
        .fold(desired_speed, Speed::min)
}
