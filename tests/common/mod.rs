#![allow(dead_code)]

use stlmilp::StlResult;
use stlmilp::milp::{
    BigM, InMemoryModel, MilpContext, MilpContextBuilder, SolverModel, VarId, VarKind, encode_at,
};
use stlmilp::stl::{Formula, FormulaKind, Identifier, SampledTrajectory, Trajectory, WindowPolicy};

/// Single-signal trajectory `x` with unit sampling.
pub fn trajectory(values: &[f64]) -> SampledTrajectory {
    SampledTrajectory::new(1.0)
        .with_signal("x", values.to_vec())
        .unwrap()
}

/// Boolean satisfaction written out with plain loops, independent of the evaluator.
/// Windows are clipped to the trajectory, so only use it where they fit or
/// compare against the clamping evaluator.
pub fn holds(formula: &Formula, x: &SampledTrajectory, t: usize) -> bool {
    let last = x.len() - 1;
    match formula.kind() {
        FormulaKind::Predicate(signal) => signal.evaluate(x, t).unwrap() > 0.0,
        FormulaKind::Not(phi) => !holds(phi, x, t),
        FormulaKind::And(args) => {
            for arg in args {
                if !holds(arg, x, t) {
                    return false;
                }
            }
            true
        }
        FormulaKind::Or(args) => {
            for arg in args {
                if holds(arg, x, t) {
                    return true;
                }
            }
            false
        }
        FormulaKind::Always(interval, phi) => {
            let (lo, hi) = interval.discretize(1.0).unwrap();
            for s in t + lo..=(t + hi).min(last) {
                if !holds(phi, x, s) {
                    return false;
                }
            }
            true
        }
        FormulaKind::Eventually(interval, phi) => {
            let (lo, hi) = interval.discretize(1.0).unwrap();
            for s in t + lo..=(t + hi).min(last) {
                if holds(phi, x, s) {
                    return true;
                }
            }
            false
        }
        FormulaKind::Until(interval, phi, psi) => {
            let (lo, hi) = interval.discretize(1.0).unwrap();
            for s in t + lo..=(t + hi).min(last) {
                if !holds(psi, x, s) {
                    continue;
                }
                let mut prefix = true;
                for r in t..s {
                    if !holds(phi, x, r) {
                        prefix = false;
                        break;
                    }
                }
                if prefix {
                    return true;
                }
            }
            false
        }
        FormulaKind::Next(phi) => holds(phi, x, t + 1),
    }
}

/// A model holding one fixed variable per sample of each named signal,
/// bound in a fresh context.
pub fn fixed_model(
    x: &SampledTrajectory,
    names: &[&str],
    big_m: BigM,
    policy: WindowPolicy,
) -> StlResult<(InMemoryModel, MilpContext<VarId>)> {
    let mut model = InMemoryModel::new();
    let mut ctx = MilpContextBuilder::new()
        .big_m(big_m)
        .horizon(x.len())
        .sampling_interval(x.sampling_interval())
        .window_policy(policy)
        .build()?;
    for name in names {
        for (t, value) in x.signal(name).unwrap().iter().enumerate() {
            let var = model.add_variable(&format!("{name}_{t}"), VarKind::Continuous, -1e3, 1e3)?;
            model.fix(var, *value)?;
            ctx.bind_signal(Identifier::new(*name, t), var);
        }
    }
    Ok((model, ctx))
}

/// Encodes `formula` over the fixed samples of `x`, solves, and reads the root back.
pub fn solved_robustness(
    formula: &Formula,
    x: &SampledTrajectory,
    big_m: BigM,
    policy: WindowPolicy,
    anchor: usize,
) -> StlResult<f64> {
    let (mut model, mut ctx) = fixed_model(x, &["x"], big_m, policy)?;
    let root = encode_at(formula, &mut model, &mut ctx, anchor)?;
    let solution = model.solve();
    assert!(solution.is_feasible(), "encoding of {formula} is infeasible");
    Ok(solution.value(root).unwrap())
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-6,
        "expected {expected}, got {actual}"
    );
}
