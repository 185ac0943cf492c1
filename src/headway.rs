use crate::step::LateralDirection;
use crate::units::{Length, Speed};
use smallvec::SmallVec;
use thiserror::Error;

/// The car-following law has no defined answer: a neighbour overlaps
/// with, or is behind, the subject vehicle.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("undefined car-following regime at headway {headway}")]
pub struct UndefinedRegime {
    /// The offending (non-positive) headway.
    pub headway: Length,
}

/// A vehicle ahead in a lane, as seen by the subject vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Neighbor {
    /// The net gap between the subject's front and the neighbour's rear, in m.
    pub distance: Length,
    /// The speed of the neighbour.
    pub speed: Speed,
}

/// The vehicles ahead of the subject in one lane, closest first.
///
/// Distances are strictly positive and strictly increasing. Infinite
/// distances are allowed and model a leader that is not there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborSet {
    neighbors: SmallVec<[Neighbor; 4]>,
}

impl NeighborSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a set containing a single leader.
    pub fn single(distance: Length, speed: Speed) -> Result<Self, UndefinedRegime> {
        let mut set = Self::new();
        set.insert(distance, speed)?;
        Ok(set)
    }

    /// Builds a set from headways in any order.
    pub fn try_from_headways(
        headways: impl IntoIterator<Item = (Length, Speed)>,
    ) -> Result<Self, UndefinedRegime> {
        let mut set = Self::new();
        for (distance, speed) in headways {
            set.insert(distance, speed)?;
        }
        Ok(set)
    }

    /// Inserts a neighbour, keeping the set ordered.
    ///
    /// A non-positive (or NaN) distance is rejected and leaves the set unchanged.
    /// If a neighbour at exactly the same distance exists, the slower speed is kept.
    pub fn insert(&mut self, distance: Length, speed: Speed) -> Result<(), UndefinedRegime> {
        if !(distance.si() > 0.0) {
            return Err(UndefinedRegime { headway: distance });
        }
        let idx = self
            .neighbors
            .iter()
            .position(|n| n.distance >= distance)
            .unwrap_or(self.neighbors.len());
        match self.neighbors.get_mut(idx) {
            Some(n) if n.distance == distance => n.speed = n.speed.min(speed),
            _ => self.neighbors.insert(idx, Neighbor { distance, speed }),
        }
        Ok(())
    }

    /// The closest neighbour.
    pub fn nearest(&self) -> Option<&Neighbor> {
        self.neighbors.first()
    }

    /// Iterates the neighbours, closest first.
    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> + '_ {
        self.neighbors.iter()
    }

    /// The number of neighbours.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// A perceived surrounding vehicle in some lane.
///
/// Unlike [NeighborSet] entries, the distance may be zero or negative when the
/// vehicle is alongside the subject.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerceivedGtu {
    /// The net gap to the vehicle in m, measured in the direction it was perceived in.
    pub distance: Length,
    /// The vehicle's speed.
    pub speed: Speed,
    /// The side the vehicle is indicating towards, if any.
    pub indicator: Option<LateralDirection>,
}

impl PerceivedGtu {
    /// Creates a perceived vehicle without an active indicator.
    pub fn new(distance: Length, speed: Speed) -> Self {
        Self {
            distance,
            speed,
            indicator: None,
        }
    }

    /// Sets the indicator of the perceived vehicle.
    pub fn indicating(self, side: LateralDirection) -> Self {
        Self {
            indicator: Some(side),
            ..self
        }
    }
}
