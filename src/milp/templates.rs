//! Big-M encodings of `min` and `max` over already-encoded operands.
//!
//! For `r = min(x_1..x_n)` with binary selectors `d_i`:
//!
//! ```text
//! r <= x_i            for every i
//! r >= x_i - M*d_i    for every i
//! Σ d_i = n - 1
//! ```
//!
//! The single selector left at zero picks the operand `r` equals. `max` uses
//! the mirrored inequalities `r >= x_i` and `r <= x_i + M*d_i`.

use crate::error::{StlError, StlResult};
use crate::milp::context::{BigM, Bounds, Encoded, EncodingStats};
use crate::milp::model::{LinearExpr, Relation, SolverModel, VarKind};
use crate::stl::robustness::RobustnessTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Adds `r = min(operands)` to `model` and returns `r`.
pub fn add_min_constr<M: SolverModel>(
    model: &mut M,
    label: &str,
    operands: &[Encoded<M::Var>],
    big_m: BigM,
) -> StlResult<Encoded<M::Var>> {
    big_m.validate()?;
    add_extremum(
        model,
        &mut EncodingStats::default(),
        label,
        operands,
        Extremum::Min,
        &big_m,
        None,
    )
}

/// Adds `r = max(operands)` to `model` and returns `r`.
pub fn add_max_constr<M: SolverModel>(
    model: &mut M,
    label: &str,
    operands: &[Encoded<M::Var>],
    big_m: BigM,
) -> StlResult<Encoded<M::Var>> {
    big_m.validate()?;
    add_extremum(
        model,
        &mut EncodingStats::default(),
        label,
        operands,
        Extremum::Max,
        &big_m,
        None,
    )
}

/// Shared implementation. A single operand is returned as is. `start` seeds
/// the result and the selectors from the evaluator's robustness tree.
pub(crate) fn add_extremum<M: SolverModel>(
    model: &mut M,
    stats: &mut EncodingStats,
    label: &str,
    operands: &[Encoded<M::Var>],
    extremum: Extremum,
    big_m: &BigM,
    start: Option<&RobustnessTree>,
) -> StlResult<Encoded<M::Var>> {
    match operands {
        [] => {
            return Err(StlError::InvalidArity {
                operator: match extremum {
                    Extremum::Min => "min",
                    Extremum::Max => "max",
                },
                expected: 1,
                found: 0,
            });
        }
        [single] => return Ok(single.clone()),
        _ => {}
    }

    let bounds = operands.iter().map(|o| o.bounds).collect::<Vec<_>>();
    let m = big_m.resolve(&bounds)?;
    let result_bounds = match extremum {
        Extremum::Min => Bounds::min_of(&bounds),
        Extremum::Max => Bounds::max_of(&bounds),
    };

    let r = model.add_variable(label, VarKind::Continuous, result_bounds.lower, result_bounds.upper)?;
    stats.continuous += 1;
    if let Some(tree) = start {
        model.set_start(&r, tree.robustness)?;
    }

    let mut selectors = Vec::with_capacity(operands.len());
    for i in 0..operands.len() {
        let d = model.add_variable(&format!("{label}_d{i}"), VarKind::Binary, 0.0, 1.0)?;
        stats.binaries += 1;
        if let Some(selected) = start.and_then(|tree| tree.index) {
            model.set_start(&d, if i == selected { 0.0 } else { 1.0 })?;
        }
        selectors.push(d);
    }

    for (operand, d) in operands.iter().zip(&selectors) {
        let (bound, relaxed, slack) = match extremum {
            Extremum::Min => (Relation::LessEqual, Relation::GreaterEqual, -m),
            Extremum::Max => (Relation::GreaterEqual, Relation::LessEqual, m),
        };
        model.add_linear_constraint(
            LinearExpr::var(r.clone()),
            bound,
            LinearExpr::var(operand.var.clone()),
        )?;
        model.add_linear_constraint(
            LinearExpr::var(r.clone()),
            relaxed,
            LinearExpr::var(operand.var.clone()).plus(slack, d.clone()),
        )?;
        stats.constraints += 2;
    }
    model.add_linear_constraint(
        LinearExpr::sum(selectors),
        Relation::Equal,
        LinearExpr::constant((operands.len() - 1) as f64),
    )?;
    stats.constraints += 1;

    Ok(Encoded {
        var: r,
        bounds: result_bounds,
    })
}
