//! Car-following through the public interface.

use assert_approx_eq::assert_approx_eq;
use gtu_behavior::units::{Length, Speed};
use gtu_behavior::{CarFollowing, FollowingError, Idm, IdmPlus, NeighborSet, Parameters, SpeedInfo};

fn speed_info() -> SpeedInfo {
    SpeedInfo::new(Speed::new(30.0), Speed::new(50.0))
}

/// Test that both laws agree on a free road.
#[test]
fn free_flow_agrees() {
    let params = Parameters::default_set();
    for v in [0.0, 10.0, 25.0, 35.0] {
        let idm = Idm.free_acceleration(&params, Speed::new(v), &speed_info()).unwrap();
        let idm_plus = IdmPlus.free_acceleration(&params, Speed::new(v), &speed_info()).unwrap();
        assert_approx_eq!(idm.si(), idm_plus.si());
    }
}

/// Test that IDM never accelerates harder than IDM+ behind a leader.
#[test]
fn idm_is_more_cautious() {
    let params = Parameters::default_set();
    for gap in [5.0, 20.0, 50.0, 150.0] {
        for leader in [0.0, 15.0, 30.0] {
            let idm = Idm
                .following_acceleration(&params, Speed::new(20.0), &speed_info(), Length::new(gap), Speed::new(leader))
                .unwrap();
            let idm_plus = IdmPlus
                .following_acceleration(&params, Speed::new(20.0), &speed_info(), Length::new(gap), Speed::new(leader))
                .unwrap();
            assert!(idm <= idm_plus, "gap {gap}, leader {leader}");
        }
    }
}

/// Test that a vehicle brakes harder the closer its leader is.
#[test]
fn closer_leader_brakes_harder() {
    let params = Parameters::default_set();
    let mut previous = None;
    for gap in [100.0, 60.0, 30.0, 10.0, 2.0] {
        let acc = IdmPlus
            .following_acceleration(&params, Speed::new(20.0), &speed_info(), Length::new(gap), Speed::new(10.0))
            .unwrap();
        if let Some(previous) = previous {
            assert!(acc < previous);
        }
        previous = Some(acc);
    }
}

/// Test that overlapping vehicles have no defined acceleration.
#[test]
fn overlap_is_undefined() {
    let params = Parameters::default_set();
    let result =
        IdmPlus.following_acceleration(&params, Speed::new(20.0), &speed_info(), Length::new(-0.5), Speed::new(10.0));
    assert!(matches!(result, Err(FollowingError::UndefinedRegime(_))));
}

/// Test that only the nearest of several leaders matters.
#[test]
fn nearest_leader_counts() {
    let params = Parameters::default_set();
    let set = NeighborSet::try_from_headways([
        (Length::new(80.0), Speed::new(0.0)),
        (Length::new(25.0), Speed::new(12.0)),
    ])
    .unwrap();
    let multi = IdmPlus
        .following_acceleration_multi(&params, Speed::new(20.0), &speed_info(), &set)
        .unwrap();
    let single = IdmPlus
        .following_acceleration(&params, Speed::new(20.0), &speed_info(), Length::new(25.0), Speed::new(12.0))
        .unwrap();
    assert_eq!(multi, single);
}
