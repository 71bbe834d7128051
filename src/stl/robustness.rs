//! Recursive evaluation of formulas over sampled trajectories.
//!
//! The fold is generic over [`RobustnessSemantics`]: evaluating into `f64`
//! gives the quantitative robustness score, evaluating into `bool` gives the
//! qualitative verdict. Every temporal operator scans its own window, so the
//! cost is bounded by formula size times trajectory length per nesting level.

use log::trace;
use std::ops::RangeInclusive;

use crate::error::{StlError, StlResult};
use crate::stl::core::{RobustnessSemantics, TimeInterval, WindowPolicy};
use crate::stl::formula_definition::{Formula, FormulaKind};
use crate::stl::trajectory::Trajectory;

/// Robustness of `formula` over `trajectory` at `anchor`, with the strict window policy.
pub fn robustness<T>(formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<f64>
where
    T: Trajectory + ?Sized,
{
    Evaluator::default().robustness(formula, trajectory, anchor)
}

/// Boolean satisfaction of `formula` over `trajectory` at `anchor`.
pub fn satisfied<T>(formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<bool>
where
    T: Trajectory + ?Sized,
{
    Evaluator::default().satisfied(formula, trajectory, anchor)
}

/// Robustness of every sub-evaluation visited while scoring a formula.
///
/// `index` names the child that realised a min/max (the first one on ties).
/// Until nodes list the right-operand subtree of each candidate switch time,
/// followed by the left-operand subtrees for `t' ∈ [t, last candidate)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustnessTree {
    pub robustness: f64,
    pub index: Option<usize>,
    pub children: Vec<RobustnessTree>,
}

impl RobustnessTree {
    fn leaf(robustness: f64) -> Self {
        RobustnessTree {
            robustness,
            index: None,
            children: vec![],
        }
    }

    fn select(children: Vec<RobustnessTree>, prefer_max: bool) -> Self {
        let (index, robustness) = extremum(children.iter().map(|c| c.robustness), prefer_max);
        RobustnessTree {
            robustness,
            index: Some(index),
            children,
        }
    }
}

/// Index and value of the first minimum (or maximum) of a non-empty sequence.
fn extremum(values: impl Iterator<Item = f64>, prefer_max: bool) -> (usize, f64) {
    let mut best = (0, if prefer_max { f64::NEG_INFINITY } else { f64::INFINITY });
    for (i, v) in values.enumerate() {
        let better = if prefer_max { v > best.1 } else { v < best.1 };
        if i == 0 || better {
            best = (i, v);
        }
    }
    best
}

/// Configurable evaluator. The default uses [`WindowPolicy::Strict`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    window_policy: WindowPolicy,
}

/// Builder for [`Evaluator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluatorBuilder {
    window_policy: WindowPolicy,
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures how windows running past the trajectory end are handled.
    pub fn window_policy(mut self, policy: WindowPolicy) -> Self {
        self.window_policy = policy;
        self
    }

    pub fn build(self) -> Evaluator {
        Evaluator {
            window_policy: self.window_policy,
        }
    }
}

impl Evaluator {
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    pub fn window_policy(&self) -> WindowPolicy {
        self.window_policy
    }

    pub fn robustness<T>(&self, formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<f64>
    where
        T: Trajectory + ?Sized,
    {
        self.evaluate::<f64, T>(formula, trajectory, anchor)
    }

    pub fn satisfied<T>(&self, formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<bool>
    where
        T: Trajectory + ?Sized,
    {
        self.evaluate::<bool, T>(formula, trajectory, anchor)
    }

    /// Evaluates `formula` at `anchor` in the semantics `Y`.
    pub fn evaluate<Y, T>(&self, formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<Y>
    where
        Y: RobustnessSemantics,
        T: Trajectory + ?Sized,
    {
        check_anchor(trajectory, anchor)?;
        trace!("evaluating {formula} at {anchor}");
        self.eval_at(formula, trajectory, anchor)
    }

    fn eval_at<Y, T>(&self, formula: &Formula, x: &T, t: usize) -> StlResult<Y>
    where
        Y: RobustnessSemantics,
        T: Trajectory + ?Sized,
    {
        match formula.kind() {
            FormulaKind::Predicate(signal) => signal.evaluate(x, t).map(Y::atomic),
            FormulaKind::Not(phi) => self.eval_at(phi, x, t).map(Y::not),
            FormulaKind::And(args) => args
                .iter()
                .try_fold(Y::globally_identity(), |acc, arg| {
                    Ok(Y::and(acc, self.eval_at(arg, x, t)?))
                }),
            FormulaKind::Or(args) => args
                .iter()
                .try_fold(Y::eventually_identity(), |acc, arg| {
                    Ok(Y::or(acc, self.eval_at(arg, x, t)?))
                }),
            FormulaKind::Always(interval, phi) => self.eval_globally(interval, phi, x, t),
            FormulaKind::Eventually(interval, phi) => self.eval_eventually(interval, phi, x, t),
            FormulaKind::Until(interval, phi, psi) => self.eval_until(interval, phi, psi, x, t),
            FormulaKind::Next(phi) => {
                let window = self.window_policy.offsets(t, 1, 1, x.len())?;
                self.eval_at(phi, x, *window.start())
            }
        }
    }

    fn window<T>(&self, interval: &TimeInterval, x: &T, t: usize) -> StlResult<RangeInclusive<usize>>
    where
        T: Trajectory + ?Sized,
    {
        self.window_policy
            .window(interval, x.sampling_interval(), t, x.len())
    }

    fn eval_globally<Y, T>(&self, interval: &TimeInterval, phi: &Formula, x: &T, t: usize) -> StlResult<Y>
    where
        Y: RobustnessSemantics,
        T: Trajectory + ?Sized,
    {
        self.window(interval, x, t)?
            .try_fold(Y::globally_identity(), |acc, t_prime| {
                Ok(Y::and(acc, self.eval_at(phi, x, t_prime)?))
            })
    }

    fn eval_eventually<Y, T>(&self, interval: &TimeInterval, phi: &Formula, x: &T, t: usize) -> StlResult<Y>
    where
        Y: RobustnessSemantics,
        T: Trajectory + ?Sized,
    {
        self.window(interval, x, t)?
            .try_fold(Y::eventually_identity(), |acc, t_prime| {
                Ok(Y::or(acc, self.eval_at(phi, x, t_prime)?))
            })
    }

    fn eval_until<Y, T>(
        &self,
        interval: &TimeInterval,
        phi: &Formula,
        psi: &Formula,
        x: &T,
        t: usize,
    ) -> StlResult<Y>
    where
        Y: RobustnessSemantics,
        T: Trajectory + ?Sized,
    {
        // `prefix` holds the conjunction of phi over [t, next_left).
        let mut prefix = Y::globally_identity();
        let mut next_left = t;
        let mut result = Y::eventually_identity();
        for t_second in self.window(interval, x, t)? {
            while next_left < t_second {
                prefix = Y::and(prefix, self.eval_at(phi, x, next_left)?);
                next_left += 1;
            }
            let term = Y::and(self.eval_at(psi, x, t_second)?, prefix.clone());
            result = Y::or(result, term);
        }
        Ok(result)
    }

    /// Robustness at `anchor` together with the scores of all sub-evaluations.
    pub fn robustness_tree<T>(&self, formula: &Formula, trajectory: &T, anchor: usize) -> StlResult<RobustnessTree>
    where
        T: Trajectory + ?Sized,
    {
        check_anchor(trajectory, anchor)?;
        self.tree_at(formula, trajectory, anchor)
    }

    fn tree_at<T>(&self, formula: &Formula, x: &T, t: usize) -> StlResult<RobustnessTree>
    where
        T: Trajectory + ?Sized,
    {
        let tree = match formula.kind() {
            FormulaKind::Predicate(signal) => RobustnessTree::leaf(signal.evaluate(x, t)?),
            FormulaKind::Not(phi) => {
                let child = self.tree_at(phi, x, t)?;
                RobustnessTree {
                    robustness: -child.robustness,
                    index: None,
                    children: vec![child],
                }
            }
            FormulaKind::And(args) | FormulaKind::Or(args) => {
                let children = args
                    .iter()
                    .map(|arg| self.tree_at(arg, x, t))
                    .collect::<StlResult<Vec<_>>>()?;
                RobustnessTree::select(children, matches!(formula.kind(), FormulaKind::Or(_)))
            }
            FormulaKind::Always(interval, phi) | FormulaKind::Eventually(interval, phi) => {
                let children = self
                    .window(interval, x, t)?
                    .map(|t_prime| self.tree_at(phi, x, t_prime))
                    .collect::<StlResult<Vec<_>>>()?;
                RobustnessTree::select(
                    children,
                    matches!(formula.kind(), FormulaKind::Eventually(..)),
                )
            }
            FormulaKind::Next(phi) => {
                let window = self.window_policy.offsets(t, 1, 1, x.len())?;
                let child = self.tree_at(phi, x, *window.start())?;
                RobustnessTree {
                    robustness: child.robustness,
                    index: None,
                    children: vec![child],
                }
            }
            FormulaKind::Until(interval, phi, psi) => {
                let window = self.window(interval, x, t)?;
                let rights = window
                    .clone()
                    .map(|t_second| self.tree_at(psi, x, t_second))
                    .collect::<StlResult<Vec<_>>>()?;
                let lefts = (t..*window.end())
                    .map(|t_prime| self.tree_at(phi, x, t_prime))
                    .collect::<StlResult<Vec<_>>>()?;
                let terms = window.clone().zip(&rights).map(|(t_second, right)| {
                    lefts[..t_second - t]
                        .iter()
                        .fold(right.robustness, |acc, left| acc.min(left.robustness))
                });
                let (index, robustness) = extremum(terms, true);
                let mut children = rights;
                children.extend(lefts);
                RobustnessTree {
                    robustness,
                    index: Some(index),
                    children,
                }
            }
        };
        Ok(tree)
    }
}

fn check_anchor<T>(trajectory: &T, anchor: usize) -> StlResult<()>
where
    T: Trajectory + ?Sized,
{
    if anchor >= trajectory.len() {
        return Err(StlError::OutOfRange {
            index: anchor,
            len: trajectory.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stl::signal::Signal;
    use crate::stl::trajectory::SampledTrajectory;

    fn signal(values: Vec<f64>) -> SampledTrajectory {
        SampledTrajectory::new(1.0).with_signal("x", values).unwrap()
    }

    fn x_gt(c: f64) -> Formula {
        Formula::predicate(Signal::greater_than("x", c))
    }

    fn interval(a: f64, b: f64) -> TimeInterval {
        TimeInterval::new(a, b).unwrap()
    }

    #[test]
    fn eventually_operator_robustness() {
        let formula = Formula::eventually(interval(0.0, 2.0), x_gt(10.0));
        let x = signal(vec![15.0, 12.0, 8.0, 5.0, 12.0]);
        assert_eq!(robustness(&formula, &x, 0).unwrap(), 5.0);
        assert_eq!(robustness(&formula, &x, 1).unwrap(), 2.0);
        assert_eq!(robustness(&formula, &x, 2).unwrap(), 2.0);
        assert!(matches!(
            robustness(&formula, &x, 3),
            Err(StlError::OutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn globally_operator_robustness() {
        let formula = Formula::always(interval(0.0, 2.0), x_gt(10.0));
        let x = signal(vec![15.0, 12.0, 8.0, 5.0, 12.0]);
        assert_eq!(robustness(&formula, &x, 0).unwrap(), -2.0);
        assert_eq!(robustness(&formula, &x, 1).unwrap(), -5.0);
        assert!(!satisfied(&formula, &x, 0).unwrap());
    }

    #[test]
    fn until_uses_prefix_from_anchor() {
        // phi = x > 0, psi = x > 5, window [1, 3].
        let formula = Formula::until(interval(1.0, 3.0), x_gt(0.0), x_gt(5.0));
        let x = signal(vec![3.0, 2.0, 9.0, 1.0]);
        // t''=1: min(-3, 3) = -3; t''=2: min(4, 3, 2) = 2; t''=3: min(-4, ..) = -4.
        assert_eq!(robustness(&formula, &x, 0).unwrap(), 2.0);
        assert!(satisfied(&formula, &x, 0).unwrap());
    }

    #[test]
    fn next_shifts_by_one_sample() {
        let x = signal(vec![1.0, 7.0]);
        assert_eq!(robustness(&Formula::next(x_gt(5.0)), &x, 0).unwrap(), 2.0);
        assert!(robustness(&Formula::next(x_gt(5.0)), &x, 1).is_err());
    }

    #[test]
    fn clamp_policy_clips_windows() {
        let formula = Formula::always(interval(0.0, 100.0), x_gt(0.0));
        let x = signal(vec![3.0, 2.0, 9.0]);
        assert!(robustness(&formula, &x, 0).is_err());
        let evaluator = Evaluator::builder()
            .window_policy(WindowPolicy::Clamp)
            .build();
        assert_eq!(evaluator.robustness(&formula, &x, 0).unwrap(), 2.0);
    }

    #[test]
    fn anchor_outside_domain_is_rejected() {
        let x = signal(vec![1.0]);
        assert!(matches!(
            robustness(&x_gt(0.0), &x, 1),
            Err(StlError::OutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn tree_matches_score_and_records_argmin() {
        let formula = Formula::always(interval(0.0, 2.0), x_gt(10.0));
        let x = signal(vec![15.0, 8.0, 8.0]);
        let tree = Evaluator::default().robustness_tree(&formula, &x, 0).unwrap();
        assert_eq!(tree.robustness, -2.0);
        assert_eq!(tree.index, Some(1));
        assert_eq!(tree.children.len(), 3);

        let until = Formula::until(interval(1.0, 3.0), x_gt(0.0), x_gt(5.0));
        let x = signal(vec![3.0, 2.0, 9.0, 1.0]);
        let tree = Evaluator::default().robustness_tree(&until, &x, 0).unwrap();
        assert_eq!(tree.robustness, robustness(&until, &x, 0).unwrap());
        assert_eq!(tree.index, Some(1));
        assert_eq!(tree.children.len(), 3 + 3);
    }
}
