use super::CarFollowingModel;
use crate::headway::NeighborSet;
use crate::params::{self, ParameterError, Parameters};
use crate::units::{Acceleration, Length, Speed};

/// The Intelligent Driver Model.
#[derive(Clone, Copy, Debug, Default)]
pub struct Idm;

/// IDM+, which takes the more restrictive of the free-road and interaction
/// terms instead of subtracting both.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdmPlus;

/// The two terms of the IDM family, each in units of the maximum acceleration.
struct Terms {
    /// `1 - (v / v0)^delta`
    free: f64,
    /// `1 - (s* / s)^2`
    interaction: f64,
    /// The maximum acceleration.
    max_acc: Acceleration,
}

/// Computes the dynamic desired gap `s*` to a leader.
///
/// # Arguments
/// * `desired_headway` - The desired gap at equal speeds.
/// * `speed` - The speed of the subject vehicle.
/// * `leader_speed` - The speed of the leader.
pub fn dynamic_desired_gap(
    params: &Parameters,
    desired_headway: Length,
    speed: Speed,
    leader_speed: Speed,
) -> Result<Length, ParameterError> {
    let max_acc = params.get(&params::A)?.si();
    let comf_dec = params.get(&params::B)?.si();
    let s0 = params.get(&params::S0)?;

    let appr = (speed - leader_speed).si();
    let factor = 1. / (2. * (max_acc * comf_dec).sqrt());
    let ss = desired_headway + Length::new(speed.si() * appr * factor);
    Ok(ss.max(s0))
}

fn terms(
    params: &Parameters,
    speed: Speed,
    desired_speed: Speed,
    desired_headway: Length,
    leaders: &NeighborSet,
) -> Result<Terms, ParameterError> {
    let max_acc = params.get(&params::A)?;
    let delta = params.get(&params::DELTA)?;

    let free = if desired_speed.si() > 0.0 {
        1. - (speed.max(Speed::ZERO) / desired_speed).powf(delta)
    } else if speed.si() > 0.0 {
        // Nowhere to go: brake at the maximum acceleration.
        -1.
    } else {
        0.
    };
    let interaction = match leaders.nearest() {
        Some(leader) if leader.distance.is_finite() => {
            let ss = dynamic_desired_gap(params, desired_headway, speed, leader.speed)?;
            let term = ss / leader.distance;
            1. - term * term
        }
        _ => 1.,
    };

    Ok(Terms {
        free,
        interaction,
        max_acc,
    })
}

impl CarFollowingModel for Idm {
    fn name(&self) -> &str {
        "IDM"
    }

    fn accelerate(
        &self,
        params: &Parameters,
        speed: Speed,
        desired_speed: Speed,
        desired_headway: Length,
        leaders: &NeighborSet,
    ) -> Result<Acceleration, ParameterError> {
        let t = terms(params, speed, desired_speed, desired_headway, leaders)?;
        // 1 - (v/v0)^d - (s*/s)^2
        Ok(t.max_acc * (t.free + t.interaction - 1.))
    }
}

impl CarFollowingModel for IdmPlus {
    fn name(&self) -> &str {
        "IDM+"
    }

    fn accelerate(
        &self,
        params: &Parameters,
        speed: Speed,
        desired_speed: Speed,
        desired_headway: Length,
        leaders: &NeighborSet,
    ) -> Result<Acceleration, ParameterError> {
        let t = terms(params, speed, desired_speed, desired_headway, leaders)?;
        Ok(t.max_acc * f64::min(t.free, t.interaction))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::following::{CarFollowing, SpeedInfo};
    use assert_approx_eq::assert_approx_eq;

    /// Parameters for which the desired headway at 25 m/s is exactly 25 m.
    fn params() -> Parameters {
        let mut params = Parameters::default_set();
        params.set(&params::A, Acceleration::new(1.0)).unwrap();
        params.set(&params::B, Acceleration::new(2.0)).unwrap();
        params.set(&params::S0, Length::new(3.0)).unwrap();
        params.set(&params::T, crate::units::Duration::new(0.88)).unwrap();
        params
    }

    fn speed_info() -> SpeedInfo {
        SpeedInfo::new(Speed::new(30.0), Speed::new(50.0))
    }

    #[test]
    fn zero_desired_speed_stays_finite() {
        let params = params();
        let stop = SpeedInfo::new(Speed::ZERO, Speed::new(50.0));
        for model in [&Idm as &dyn CarFollowingModel, &IdmPlus] {
            let moving = model.free_acceleration(&params, Speed::new(20.0), &stop).unwrap();
            assert_approx_eq!(moving.si(), -1.0);
            let standing = model.free_acceleration(&params, Speed::ZERO, &stop).unwrap();
            assert_approx_eq!(standing.si(), 0.0);
        }
    }

    #[test]
    fn desired_gap_at_equal_speed() {
        let params = params();
        let headway = IdmPlus.desired_headway(&params, Speed::new(25.0)).unwrap();
        assert_approx_eq!(headway.si(), 25.0);
        let ss = dynamic_desired_gap(&params, headway, Speed::new(25.0), Speed::new(25.0)).unwrap();
        assert_approx_eq!(ss.si(), 25.0);
    }

    #[test]
    fn desired_gap_never_below_stopping_distance() {
        let params = params();
        let headway = IdmPlus.desired_headway(&params, Speed::new(5.0)).unwrap();
        let ss = dynamic_desired_gap(&params, headway, Speed::new(5.0), Speed::new(40.0)).unwrap();
        assert_approx_eq!(ss.si(), 3.0);
    }

    #[test]
    fn idm_plus_tempered_by_gap() {
        let params = params();
        let acc = IdmPlus
            .following_acceleration(&params, Speed::new(25.0), &speed_info(), Length::new(40.0), Speed::new(25.0))
            .unwrap();
        assert!(acc.si() > 0.0);
        assert!(acc.si() < 1.0);
        // The free-road term is the binding one here.
        assert_approx_eq!(acc.si(), 1.0 - (25.0f64 / 30.0).powi(4));
    }

    #[test]
    fn idm_subtracts_both_terms() {
        let params = params();
        let acc = Idm
            .following_acceleration(&params, Speed::new(25.0), &speed_info(), Length::new(40.0), Speed::new(25.0))
            .unwrap();
        let expected = 1.0 - (25.0f64 / 30.0).powi(4) - (25.0f64 / 40.0).powi(2);
        assert_approx_eq!(acc.si(), expected);
        let plus = IdmPlus
            .following_acceleration(&params, Speed::new(25.0), &speed_info(), Length::new(40.0), Speed::new(25.0))
            .unwrap();
        assert!(acc < plus);
    }

    #[test]
    fn idm_plus_bounded_by_max_acceleration() {
        let params = params();
        for v in [0.0, 5.0, 10.0, 20.0, 30.0] {
            for gap in [25.0, 50.0, 200.0, f64::INFINITY] {
                for vl in [0.0, 15.0, 30.0] {
                    let acc = IdmPlus
                        .following_acceleration(&params, Speed::new(v), &speed_info(), Length::new(gap), Speed::new(vl))
                        .unwrap();
                    assert!(acc.si() <= 1.0, "v={v} gap={gap} vl={vl}");
                }
            }
        }
    }

    #[test]
    fn idm_plus_terms_only_negative_when_their_condition_holds() {
        let params = params();
        // Too fast but far from the leader: only the free-road term is negative.
        let acc = IdmPlus
            .following_acceleration(&params, Speed::new(33.0), &speed_info(), Length::new(500.0), Speed::new(33.0))
            .unwrap();
        assert_approx_eq!(acc.si(), 1.0 - (33.0f64 / 30.0).powi(4));

        // Slow but too close: only the interaction term is negative.
        let acc = IdmPlus
            .following_acceleration(&params, Speed::new(10.0), &speed_info(), Length::new(6.0), Speed::new(10.0))
            .unwrap();
        let headway = 3.0 + 10.0 * 0.88;
        assert_approx_eq!(acc.si(), 1.0 - (headway / 6.0f64).powi(2));
    }

    #[test]
    fn only_nearest_leader_matters() {
        let params = params();
        let near = NeighborSet::single(Length::new(30.0), Speed::new(20.0)).unwrap();
        let mut many = near.clone();
        many.insert(Length::new(60.0), Speed::new(0.0)).unwrap();
        let speed = Speed::new(22.0);
        let a = IdmPlus.following_acceleration_multi(&params, speed, &speed_info(), &near).unwrap();
        let b = IdmPlus.following_acceleration_multi(&params, speed, &speed_info(), &many).unwrap();
        assert_eq!(a, b);
    }
}
