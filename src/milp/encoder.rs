//! Reduction of the quantitative semantics to mixed-integer linear constraints.
//!
//! The encoder folds over the formula exactly like the robustness evaluator,
//! but each step emits a variable constrained to equal the sub-formula's
//! robustness instead of computing a number. Predicates become equalities over
//! the trajectory variables bound in the [`MilpContext`], negation a sign
//! flip, and every min/max a big-M group (see [`crate::milp::templates`]).

use log::{debug, trace};

use crate::error::{StlError, StlResult};
use crate::milp::context::{Bounds, Encoded, MilpContext};
use crate::milp::model::{LinearExpr, Relation, SolverModel, VarKind};
use crate::milp::templates::{Extremum, add_extremum};
use crate::stl::core::TimeInterval;
use crate::stl::formula_definition::{Formula, FormulaKind};
use crate::stl::robustness::RobustnessTree;
use crate::stl::signal::Signal;

/// Encodes `formula` at anchor 0 and returns the variable equal to its robustness.
pub fn encode<M: SolverModel>(
    formula: &Formula,
    model: &mut M,
    ctx: &mut MilpContext<M::Var>,
) -> StlResult<M::Var> {
    encode_at(formula, model, ctx, 0)
}

/// Encodes `formula` at `anchor`.
pub fn encode_at<M: SolverModel>(
    formula: &Formula,
    model: &mut M,
    ctx: &mut MilpContext<M::Var>,
    anchor: usize,
) -> StlResult<M::Var> {
    run(formula, model, ctx, anchor, None)
}

/// Encodes `formula` at `anchor`, seeding start values from a robustness tree
/// computed by [`crate::stl::robustness::Evaluator::robustness_tree`] at the
/// same anchor.
pub fn encode_with_start<M: SolverModel>(
    formula: &Formula,
    model: &mut M,
    ctx: &mut MilpContext<M::Var>,
    anchor: usize,
    start: &RobustnessTree,
) -> StlResult<M::Var> {
    run(formula, model, ctx, anchor, Some(start))
}

fn run<M: SolverModel>(
    formula: &Formula,
    model: &mut M,
    ctx: &mut MilpContext<M::Var>,
    anchor: usize,
    start: Option<&RobustnessTree>,
) -> StlResult<M::Var> {
    if anchor >= ctx.horizon() {
        return Err(StlError::OutOfRange {
            index: anchor,
            len: ctx.horizon(),
        });
    }
    debug!("encoding {formula} at anchor {anchor}");
    let before = ctx.stats();
    let mut encoder = Encoder { model, ctx };
    let root = encoder.encode_node(formula, anchor, start)?;
    let after = encoder.ctx.stats();
    debug!(
        "encoded {formula}: {} continuous, {} binary, {} constraints, {} reused subformulas",
        after.continuous - before.continuous,
        after.binaries - before.binaries,
        after.constraints - before.constraints,
        after.memo_hits - before.memo_hits,
    );
    Ok(root.var)
}

fn child(start: Option<&RobustnessTree>, i: usize) -> Option<&RobustnessTree> {
    start.and_then(|tree| tree.children.get(i))
}

struct Encoder<'a, M: SolverModel> {
    model: &'a mut M,
    ctx: &'a mut MilpContext<M::Var>,
}

impl<M: SolverModel> Encoder<'_, M> {
    fn encode_node(
        &mut self,
        formula: &Formula,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        if let Some(hit) = self.ctx.lookup(formula, t) {
            trace!("reusing encoding of {formula} at {t}");
            return Ok(hit);
        }
        let encoded = match formula.kind() {
            FormulaKind::Predicate(signal) => self.encode_predicate(signal, t, start)?,
            FormulaKind::Not(phi) => self.encode_not(phi, t, start)?,
            FormulaKind::And(args) => self.encode_boolean(args, Extremum::Min, "and", t, start)?,
            FormulaKind::Or(args) => self.encode_boolean(args, Extremum::Max, "or", t, start)?,
            FormulaKind::Always(interval, phi) => {
                self.encode_temporal(interval, phi, Extremum::Min, "alw", t, start)?
            }
            FormulaKind::Eventually(interval, phi) => {
                self.encode_temporal(interval, phi, Extremum::Max, "eve", t, start)?
            }
            FormulaKind::Until(interval, phi, psi) => self.encode_until(interval, phi, psi, t, start)?,
            FormulaKind::Next(phi) => {
                let window = self.ctx.window_policy().offsets(t, 1, 1, self.ctx.horizon())?;
                self.encode_node(phi, *window.start(), child(start, 0))?
            }
        };
        trace!("encoded {formula} at {t} as {:?}", encoded.var);
        self.ctx.remember(formula, t, encoded.clone());
        Ok(encoded)
    }

    fn encode_predicate(
        &mut self,
        signal: &Signal,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        let (coefficients, constant) =
            signal
                .function()
                .affine_form()
                .ok_or_else(|| StlError::UnsupportedOperator {
                    operator: "predicate",
                    reason: format!("signal `{signal}` is not affine in its arguments"),
                })?;
        let horizon = self.ctx.horizon();
        if t >= horizon {
            return Err(StlError::OutOfRange {
                index: t,
                len: horizon,
            });
        }

        let mut expr = LinearExpr::constant(constant);
        for (c, id) in coefficients.iter().zip(signal.identifiers(t)?) {
            if id.index >= horizon {
                return Err(StlError::OutOfRange {
                    index: id.index,
                    len: horizon,
                });
            }
            expr = expr.plus(*c, self.ctx.signal_variable(&id)?);
        }

        let (lower, upper) = signal.bounds();
        let label = self.ctx.label("pred", t);
        let y = self.model.add_variable(&label, VarKind::Continuous, lower, upper)?;
        self.ctx.stats.continuous += 1;
        if let Some(tree) = start {
            self.model.set_start(&y, tree.robustness)?;
        }
        self.model
            .add_linear_constraint(LinearExpr::var(y.clone()), Relation::Equal, expr)?;
        self.ctx.stats.constraints += 1;
        Ok(Encoded {
            var: y,
            bounds: Bounds::new(lower, upper),
        })
    }

    fn encode_not(
        &mut self,
        phi: &Formula,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        if let FormulaKind::Not(inner) = phi.kind() {
            return self.encode_node(inner, t, child(child(start, 0), 0));
        }
        let x = self.encode_node(phi, t, child(start, 0))?;
        let bounds = x.bounds.negate();
        let label = self.ctx.label("not", t);
        let y = self
            .model
            .add_variable(&label, VarKind::Continuous, bounds.lower, bounds.upper)?;
        self.ctx.stats.continuous += 1;
        if let Some(tree) = start {
            self.model.set_start(&y, tree.robustness)?;
        }
        self.model.add_linear_constraint(
            LinearExpr::var(y.clone()),
            Relation::Equal,
            LinearExpr::term(-1.0, x.var),
        )?;
        self.ctx.stats.constraints += 1;
        Ok(Encoded { var: y, bounds })
    }

    fn encode_boolean(
        &mut self,
        args: &[Formula],
        extremum: Extremum,
        tag: &str,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        let operands = args
            .iter()
            .enumerate()
            .map(|(i, arg)| self.encode_node(arg, t, child(start, i)))
            .collect::<StlResult<Vec<_>>>()?;
        self.group(&operands, extremum, tag, t, start)
    }

    fn encode_temporal(
        &mut self,
        interval: &TimeInterval,
        phi: &Formula,
        extremum: Extremum,
        tag: &str,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        let window = self.window(interval, t)?;
        let operands = window
            .enumerate()
            .map(|(k, t_prime)| self.encode_node(phi, t_prime, child(start, k)))
            .collect::<StlResult<Vec<_>>>()?;
        self.group(&operands, extremum, tag, t, start)
    }

    /// `max` over candidates `t''` of `min(psi(t''), min_{t <= t' < t''} phi(t'))`,
    /// with the inner minima built incrementally as running prefix minima.
    fn encode_until(
        &mut self,
        interval: &TimeInterval,
        phi: &Formula,
        psi: &Formula,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        let window = self.window(interval, t)?;
        let rights = window
            .clone()
            .enumerate()
            .map(|(k, t_second)| self.encode_node(psi, t_second, child(start, k)))
            .collect::<StlResult<Vec<_>>>()?;
        let n_rights = rights.len();
        let lefts = (t..*window.end())
            .enumerate()
            .map(|(j, t_prime)| self.encode_node(phi, t_prime, child(start, n_rights + j)))
            .collect::<StlResult<Vec<_>>>()?;

        // prefixes[j] = min(phi(t), .., phi(t + j))
        let mut prefixes: Vec<Encoded<M::Var>> = Vec::with_capacity(lefts.len());
        for left in &lefts {
            let prefix = match prefixes.last() {
                None => left.clone(),
                Some(previous) => {
                    let operands = [previous.clone(), left.clone()];
                    self.group(&operands, Extremum::Min, "until_prefix", t, None)?
                }
            };
            prefixes.push(prefix);
        }

        let mut terms = Vec::with_capacity(n_rights);
        for (right, t_second) in rights.into_iter().zip(window) {
            let term = if t_second == t {
                right
            } else {
                let operands = [right, prefixes[t_second - t - 1].clone()];
                self.group(&operands, Extremum::Min, "until_term", t, None)?
            };
            terms.push(term);
        }
        self.group(&terms, Extremum::Max, "until", t, start)
    }

    fn window(&self, interval: &TimeInterval, t: usize) -> StlResult<std::ops::RangeInclusive<usize>> {
        self.ctx.window_policy().window(
            interval,
            self.ctx.sampling_interval(),
            t,
            self.ctx.horizon(),
        )
    }

    fn group(
        &mut self,
        operands: &[Encoded<M::Var>],
        extremum: Extremum,
        tag: &str,
        t: usize,
        start: Option<&RobustnessTree>,
    ) -> StlResult<Encoded<M::Var>> {
        let big_m = self.ctx.big_m();
        let label = self.ctx.label(tag, t);
        add_extremum(
            &mut *self.model,
            &mut self.ctx.stats,
            &label,
            operands,
            extremum,
            &big_m,
            start,
        )
    }
}
