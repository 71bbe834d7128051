mod common;
mod fixtures;

use pretty_assertions::assert_eq;
use rstest::rstest;
use stlmilp::stl::{
    Evaluator, Formula, SampleLabel, SampledTrajectory, Signal, TimeInterval, Trajectory,
    WindowPolicy, robustness, satisfied,
};
use stlmilp::StlError;

use common::{assert_close, holds, trajectory};
use fixtures::formulas::{
    gt, interval, lt, nested_and_or, scenario_formula, shared_predicate, until_formula,
};
use fixtures::trajectories::{scenario, short, two_signals};

fn clamping() -> Evaluator {
    Evaluator::builder()
        .window_policy(WindowPolicy::Clamp)
        .build()
}

#[rstest]
#[case(Formula::always(interval(0.0, 2.0), gt(3.0)), 0, 1.0)]
#[case(Formula::eventually(interval(0.0, 2.0), gt(3.0)), 0, 3.0)]
#[case(Formula::eventually(interval(0.0, 2.0), gt(3.0)), 2, 3.0)]
#[case(Formula::always(interval(1.0, 1.0), lt(4.5)), 0, 0.5)]
#[case(Formula::always(interval(1.0, 1.0), lt(4.5)), 1, -1.5)]
#[case(Formula::not(gt(3.0)), 0, -2.0)]
#[case(Formula::next(gt(3.0)), 0, 1.0)]
#[case(Formula::next(Formula::next(lt(3.0))), 1, 1.0)]
fn test_robustness_values(
    short: &SampledTrajectory,
    #[case] formula: Formula,
    #[case] anchor: usize,
    #[case] expected: f64,
) {
    assert_eq!(robustness(&formula, short, anchor).unwrap(), expected);
}

#[rstest]
fn test_until_takes_best_switch_time(short: &SampledTrajectory, until_formula: Formula) {
    // psi = x - 4.5 peaks at t'' = 2 while phi = x - 1.5 stays above 2.5 before it.
    assert_close(robustness(&until_formula, short, 0).unwrap(), 1.5);
    assert!(satisfied(&until_formula, short, 0).unwrap());
}

#[rstest]
fn test_until_with_left_failing_early() {
    let x = trajectory(&[0.0, 1.0, 9.0]);
    let formula = Formula::until(interval(0.0, 2.0), gt(0.5), gt(4.5));
    // Switching at 0 or 1 fails psi, switching at 2 needs phi at 0.
    assert_close(robustness(&formula, &x, 0).unwrap(), -0.5);
}

#[rstest]
fn test_negation_flips_sign(short: &SampledTrajectory) {
    let phi = Formula::eventually(interval(0.0, 1.0), lt(4.5));
    let not_phi = Formula::not(phi.clone());
    for t in 0..4 {
        assert_eq!(
            robustness(&not_phi, short, t).unwrap(),
            -robustness(&phi, short, t).unwrap()
        );
    }
}

#[rstest]
fn test_and_is_min_and_order_independent(short: &SampledTrajectory) {
    let a = gt(3.0);
    let b = lt(5.5);
    let ab = Formula::and(vec![a.clone(), b.clone()]).unwrap();
    let ba = Formula::and(vec![b.clone(), a.clone()]).unwrap();
    for t in 0..short.len() {
        let expected = robustness(&a, short, t)
            .unwrap()
            .min(robustness(&b, short, t).unwrap());
        assert_eq!(robustness(&ab, short, t).unwrap(), expected);
        assert_eq!(robustness(&ba, short, t).unwrap(), expected);
    }
}

#[rstest]
fn test_windows_are_order_independent(short: &SampledTrajectory) {
    let samples = short.signal("x").unwrap();
    let always = Formula::always(interval(1.0, 3.0), gt(0.0));
    let eventually = Formula::eventually(interval(1.0, 3.0), gt(0.0));
    let window = &samples[1..=3];
    assert_eq!(
        robustness(&always, short, 0).unwrap(),
        window.iter().copied().fold(f64::INFINITY, f64::min)
    );
    assert_eq!(
        robustness(&eventually, short, 0).unwrap(),
        window.iter().rev().copied().fold(f64::NEG_INFINITY, f64::max)
    );
}

#[rstest]
fn test_boolean_semantics_agree(
    short: &SampledTrajectory,
    nested_and_or: Formula,
    shared_predicate: Formula,
    until_formula: Formula,
) {
    for formula in [nested_and_or, shared_predicate, until_formula] {
        let value = robustness(&formula, short, 0).unwrap();
        assert_ne!(value, 0.0);
        assert_eq!(satisfied(&formula, short, 0).unwrap(), value > 0.0);
        assert_eq!(satisfied(&formula, short, 0).unwrap(), holds(&formula, short, 0));
    }
}

#[rstest]
fn test_inverted_bounds_are_rejected() {
    assert!(matches!(
        TimeInterval::new(5.0, 2.0),
        Err(StlError::InvalidBounds { start, end, .. }) if start == 5.0 && end == 2.0
    ));
    assert!(TimeInterval::new(-1.0, 2.0).is_err());
    assert!(TimeInterval::new(0.0, f64::INFINITY).is_err());
}

#[rstest]
fn test_operators_need_two_arguments() {
    assert!(matches!(
        Formula::and(vec![gt(1.0)]),
        Err(StlError::InvalidArity { found: 1, .. })
    ));
    assert!(matches!(
        Formula::or(vec![]),
        Err(StlError::InvalidArity { found: 0, .. })
    ));
}

#[rstest]
fn test_out_of_range_queries(short: &SampledTrajectory) {
    assert!(matches!(
        robustness(&gt(0.0), short, 5),
        Err(StlError::OutOfRange { index: 5, len: 5 })
    ));
    assert!(matches!(
        robustness(&Formula::always(interval(0.0, 2.0), gt(3.0)), short, 3),
        Err(StlError::OutOfRange { index: 5, len: 5 })
    ));
    assert!(matches!(
        robustness(&Formula::next(gt(0.0)), short, 4),
        Err(StlError::OutOfRange { .. })
    ));
}

#[rstest]
fn test_clamp_clips_windows(short: &SampledTrajectory) {
    let formula = Formula::always(interval(0.0, 2.0), gt(3.0));
    assert_eq!(clamping().robustness(&formula, short, 3).unwrap(), -1.0);
    let past_end = Formula::eventually(interval(2.0, 3.0), gt(3.0));
    assert!(matches!(
        clamping().robustness(&past_end, short, 4),
        Err(StlError::InvalidBounds { .. })
    ));
}

#[rstest]
fn test_unknown_signal(short: &SampledTrajectory) {
    let formula = Formula::predicate(Signal::greater_than("y", 0.0));
    assert!(matches!(
        robustness(&formula, short, 0),
        Err(StlError::UnknownSignal(id)) if &*id.name == "y" && id.index == 0
    ));
}

#[rstest]
fn test_multi_signal_predicates(two_signals: &SampledTrajectory) {
    let difference = Signal::affine(
        vec![Box::new(SampleLabel::new("x")), Box::new(SampleLabel::new("y"))],
        vec![1.0, -1.0],
        0.0,
    )
    .unwrap();
    let formula = Formula::eventually(interval(0.0, 3.0), Formula::predicate(difference));
    assert_eq!(robustness(&formula, two_signals, 0).unwrap(), 4.0);

    let increment = Signal::affine(
        vec![
            Box::new(SampleLabel::with_offset("x", 1)),
            Box::new(SampleLabel::new("x")),
        ],
        vec![1.0, -1.0],
        0.0,
    )
    .unwrap();
    assert_eq!(
        robustness(&Formula::predicate(increment), two_signals, 0).unwrap(),
        1.0
    );

    let square = Signal::nonlinear("square", vec![Box::new(SampleLabel::new("x"))], |v| {
        v[0] * v[0] - 4.0
    });
    assert_eq!(
        robustness(&Formula::predicate(square), two_signals, 2).unwrap(),
        12.0
    );
}

#[rstest]
fn test_robustness_tree_records_witnesses(short: &SampledTrajectory) {
    let formula = Formula::always(interval(0.0, 2.0), gt(3.0));
    let tree = Evaluator::default()
        .robustness_tree(&formula, short, 0)
        .unwrap();
    assert_eq!(tree.robustness, 1.0);
    assert_eq!(tree.index, Some(1));
    let leaves: Vec<f64> = tree.children.iter().map(|c| c.robustness).collect();
    assert_eq!(leaves, vec![2.0, 1.0, 3.0]);
}

#[rstest]
fn test_scenario_needs_clamping(scenario: &SampledTrajectory, scenario_formula: Formula) {
    assert!(matches!(
        robustness(&scenario_formula, scenario, 0),
        Err(StlError::OutOfRange { len: 18, .. })
    ));
    assert_eq!(clamping().robustness(&scenario_formula, scenario, 0).unwrap(), -4.0);
    assert!(!clamping().satisfied(&scenario_formula, scenario, 0).unwrap());
    assert_eq!(scenario_formula.horizon(1.0).unwrap(), 100);
}
