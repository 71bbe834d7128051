#![allow(dead_code)]

use rstest::fixture;
use stlmilp::stl::SampledTrajectory;

use crate::common::trajectory;

// ---
// Trajectory Fixtures
// ---

#[fixture]
#[once]
pub fn scenario() -> SampledTrajectory {
    trajectory(&[
        0.0, 1.0, 2.0, 4.0, 8.0, 4.0, 2.0, 1.0, 0.0, 1.0, 2.0, 6.0, 2.0, 1.0, 5.0, 7.0, 8.0, 1.0,
    ])
}

#[fixture]
#[once]
pub fn short() -> SampledTrajectory {
    trajectory(&[5.0, 4.0, 6.0, 2.0, 5.0])
}

#[fixture]
#[once]
pub fn two_signals() -> SampledTrajectory {
    SampledTrajectory::from_states(
        1.0,
        &["x", "y"],
        &[
            vec![1.0, 3.0],
            vec![2.0, -1.0],
            vec![4.0, 0.0],
            vec![-2.0, 2.0],
        ],
    )
    .unwrap()
}
