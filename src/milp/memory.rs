//! An in-memory [`SolverModel`] with a small feasibility search.
//!
//! [`InMemoryModel`] records every variable and constraint it receives, which
//! makes it useful to inspect an encoding, and can search for a feasible
//! assignment: depth-first over the binary variables (start hints first), with
//! interval bound propagation over the linear constraints at every node. Once
//! all binaries are fixed, remaining continuous variables are pinned one at a
//! time to a point of their propagated domain.
//!
//! The search is exact for models whose continuous variables are determined by
//! propagation once the binaries are fixed. Encodings produced by
//! [`crate::milp::encoder`] with all trajectory variables fixed are such
//! models. It is not a general LP solver and never optimizes an objective.

use log::debug;
use std::collections::BTreeMap;

use crate::milp::model::{LinearExpr, Relation, SolverModel, SolverModelError, VarKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
    pub start: Option<f64>,
}

/// A constraint normalized to `Σ coefficient * var (relation) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(f64, VarId)>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Feasible,
    Infeasible,
    /// The search gave up after exploring its node budget.
    NodeLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: SolveStatus,
    values: Vec<f64>,
}

impl Solution {
    fn without_values(status: SolveStatus) -> Self {
        Solution {
            status,
            values: vec![],
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.status == SolveStatus::Feasible
    }

    /// Value of `var`, if a feasible assignment was found.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.0).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryModel {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    max_variables: Option<usize>,
    tolerance: f64,
    node_limit: usize,
}

impl Default for InMemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryModel {
    pub fn new() -> Self {
        InMemoryModel {
            variables: vec![],
            constraints: vec![],
            max_variables: None,
            tolerance: 1e-7,
            node_limit: 1_000_000,
        }
    }

    /// Rejects any variable past the first `limit`.
    pub fn with_variable_limit(mut self, limit: usize) -> Self {
        self.max_variables = Some(limit);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_node_limit(mut self, nodes: usize) -> Self {
        self.node_limit = nodes;
        self
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(var.0)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn find(&self, name: &str) -> Option<VarId> {
        self.variables.iter().position(|v| v.name == name).map(VarId)
    }

    /// Pins `var` to `value` by collapsing its bounds.
    pub fn fix(&mut self, var: VarId, value: f64) -> Result<(), SolverModelError> {
        if !value.is_finite() {
            return Err(SolverModelError::new(format!(
                "cannot fix a variable to {value}"
            )));
        }
        let variable = self
            .variables
            .get_mut(var.0)
            .ok_or_else(|| SolverModelError::new(format!("unknown variable {}", var.0)))?;
        variable.lower = value;
        variable.upper = value;
        Ok(())
    }

    /// True if `values` satisfies every bound, integrality requirement and constraint.
    pub fn check(&self, values: &[f64]) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let tol = self.tolerance;
        let bounds_ok = self.variables.iter().zip(values).all(|(var, &x)| {
            x >= var.lower - tol
                && x <= var.upper + tol
                && (var.kind == VarKind::Continuous || (x - x.round()).abs() <= tol)
        });
        bounds_ok
            && self.constraints.iter().all(|c| {
                let lhs: f64 = c.terms.iter().map(|(a, v)| a * values[v.0]).sum();
                let slack = tol * (1.0 + c.rhs.abs());
                match c.relation {
                    Relation::LessEqual => lhs <= c.rhs + slack,
                    Relation::GreaterEqual => lhs >= c.rhs - slack,
                    Relation::Equal => (lhs - c.rhs).abs() <= slack,
                }
            })
    }

    /// Searches for a feasible assignment.
    pub fn solve(&self) -> Solution {
        let mut search = Search {
            model: self,
            nodes: 0,
        };
        let lower = self.variables.iter().map(|v| v.lower).collect();
        let upper = self.variables.iter().map(|v| v.upper).collect();
        let solution = match search.explore(Domains { lower, upper }) {
            Outcome::Found(values) if self.check(&values) => Solution {
                status: SolveStatus::Feasible,
                values,
            },
            Outcome::Found(_) | Outcome::Exhausted => Solution::without_values(SolveStatus::Infeasible),
            Outcome::Aborted => Solution::without_values(SolveStatus::NodeLimit),
        };
        debug!(
            "searched {} nodes over {} variables ({} binary) and {} constraints: {:?}",
            search.nodes,
            self.variables.len(),
            self.num_binaries(),
            self.constraints.len(),
            solution.status
        );
        solution
    }

    fn check_var(&self, var: VarId) -> Result<(), SolverModelError> {
        if var.0 >= self.variables.len() {
            return Err(SolverModelError::new(format!(
                "constraint refers to unknown variable {}",
                var.0
            )));
        }
        Ok(())
    }
}

impl SolverModel for InMemoryModel {
    type Var = VarId;

    fn add_variable(
        &mut self,
        name: &str,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> Result<VarId, SolverModelError> {
        if let Some(limit) = self.max_variables {
            if self.variables.len() >= limit {
                return Err(SolverModelError::new(format!(
                    "variable limit of {limit} reached while adding `{name}`"
                )));
            }
        }
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(SolverModelError::new(format!(
                "variable `{name}` has invalid bounds [{lower}, {upper}]"
            )));
        }
        let (lower, upper) = match kind {
            VarKind::Binary => (lower.max(0.0), upper.min(1.0)),
            VarKind::Continuous => (lower, upper),
        };
        self.variables.push(Variable {
            name: name.to_string(),
            kind,
            lower,
            upper,
            start: None,
        });
        Ok(VarId(self.variables.len() - 1))
    }

    fn add_linear_constraint(
        &mut self,
        lhs: LinearExpr<VarId>,
        relation: Relation,
        rhs: LinearExpr<VarId>,
    ) -> Result<(), SolverModelError> {
        let mut merged: BTreeMap<VarId, f64> = BTreeMap::new();
        let signed = lhs
            .terms
            .iter()
            .copied()
            .chain(rhs.terms.iter().map(|&(a, v)| (-a, v)));
        for (a, v) in signed {
            if !a.is_finite() {
                return Err(SolverModelError::new(format!(
                    "non-finite coefficient {a} on variable {}",
                    v.0
                )));
            }
            self.check_var(v)?;
            *merged.entry(v).or_insert(0.0) += a;
        }
        let constant = rhs.constant - lhs.constant;
        if !constant.is_finite() {
            return Err(SolverModelError::new(format!(
                "non-finite constant {constant}"
            )));
        }
        self.constraints.push(Constraint {
            terms: merged
                .into_iter()
                .filter(|(_, a)| *a != 0.0)
                .map(|(v, a)| (a, v))
                .collect(),
            relation,
            rhs: constant,
        });
        Ok(())
    }

    fn set_start(&mut self, var: &VarId, value: f64) -> Result<(), SolverModelError> {
        let variable = self
            .variables
            .get_mut(var.0)
            .ok_or_else(|| SolverModelError::new(format!("unknown variable {}", var.0)))?;
        variable.start = Some(value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Domains {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

enum Outcome {
    Found(Vec<f64>),
    Exhausted,
    Aborted,
}

struct Search<'a> {
    model: &'a InMemoryModel,
    nodes: usize,
}

impl Search<'_> {
    fn explore(&mut self, mut domains: Domains) -> Outcome {
        self.nodes += 1;
        if self.nodes > self.model.node_limit {
            return Outcome::Aborted;
        }
        if !self.propagate(&mut domains) {
            return Outcome::Exhausted;
        }

        let branch = self.model.variables.iter().enumerate().find(|(i, v)| {
            v.kind == VarKind::Binary && domains.upper[*i] - domains.lower[*i] > 0.5
        });
        let Some((i, var)) = branch else {
            return self.pin_continuous(domains);
        };

        let order = if var.start.is_some_and(|s| s >= 0.5) {
            [1.0, 0.0]
        } else {
            [0.0, 1.0]
        };
        for value in order {
            let mut child = domains.clone();
            child.lower[i] = value;
            child.upper[i] = value;
            match self.explore(child) {
                Outcome::Exhausted => continue,
                outcome => return outcome,
            }
        }
        Outcome::Exhausted
    }

    /// Fixes the remaining continuous variables one by one, preferring start
    /// values, then finite bounds.
    fn pin_continuous(&mut self, mut domains: Domains) -> Outcome {
        let tol = self.model.tolerance;
        for (i, var) in self.model.variables.iter().enumerate() {
            let (lo, hi) = (domains.lower[i], domains.upper[i]);
            if hi - lo <= tol {
                continue;
            }
            let value = match var.start {
                Some(s) if s >= lo && s <= hi => s,
                _ if lo.is_finite() && hi.is_finite() => (lo + hi) / 2.0,
                _ if lo.is_finite() => lo,
                _ if hi.is_finite() => hi,
                _ => 0.0,
            };
            domains.lower[i] = value;
            domains.upper[i] = value;
            if !self.propagate(&mut domains) {
                return Outcome::Exhausted;
            }
        }
        let values = domains
            .lower
            .iter()
            .zip(&domains.upper)
            .map(|(lo, hi)| (lo + hi) / 2.0)
            .collect();
        Outcome::Found(values)
    }

    /// Tightens bounds until a fixpoint (or the round cap). False if a
    /// constraint cannot be satisfied.
    fn propagate(&self, domains: &mut Domains) -> bool {
        const MAX_ROUNDS: usize = 200;
        for _ in 0..MAX_ROUNDS {
            let mut changed = false;
            for c in &self.model.constraints {
                let feasible = match c.relation {
                    Relation::LessEqual => self.tighten(&c.terms, 1.0, c.rhs, domains, &mut changed),
                    Relation::GreaterEqual => self.tighten(&c.terms, -1.0, -c.rhs, domains, &mut changed),
                    Relation::Equal => {
                        self.tighten(&c.terms, 1.0, c.rhs, domains, &mut changed)
                            && self.tighten(&c.terms, -1.0, -c.rhs, domains, &mut changed)
                    }
                };
                if !feasible {
                    return false;
                }
            }
            if !changed {
                break;
            }
        }
        true
    }

    /// Propagates `Σ sign * a_i * x_i <= rhs`.
    fn tighten(
        &self,
        terms: &[(f64, VarId)],
        sign: f64,
        rhs: f64,
        domains: &mut Domains,
        changed: &mut bool,
    ) -> bool {
        let tol = self.model.tolerance;
        let contribution = |a: f64, lower: f64, upper: f64| {
            if a > 0.0 { a * lower } else { a * upper }
        };

        // Minimum activity, with unbounded contributions counted separately.
        let mut finite = 0.0;
        let mut unbounded = 0;
        let mut unbounded_at = 0;
        for (k, &(a, v)) in terms.iter().enumerate() {
            let c = contribution(sign * a, domains.lower[v.0], domains.upper[v.0]);
            if c.is_finite() {
                finite += c;
            } else {
                unbounded += 1;
                unbounded_at = k;
            }
        }
        if unbounded == 0 && finite > rhs + tol * (1.0 + rhs.abs()) {
            return false;
        }

        for (k, &(a, v)) in terms.iter().enumerate() {
            let a = sign * a;
            let own = contribution(a, domains.lower[v.0], domains.upper[v.0]);
            let rest = match unbounded {
                0 => finite - own,
                1 if unbounded_at == k => finite,
                _ => continue,
            };
            let bound = (rhs - rest) / a;
            let binary = self.model.variables[v.0].kind == VarKind::Binary;
            let i = v.0;
            if a > 0.0 {
                let bound = if binary { (bound + tol).floor() } else { bound };
                if bound < domains.upper[i] - tol {
                    domains.upper[i] = bound;
                    *changed = true;
                }
            } else {
                let bound = if binary { (bound - tol).ceil() } else { bound };
                if bound > domains.lower[i] + tol {
                    domains.lower[i] = bound;
                    *changed = true;
                }
            }
            let gap = domains.lower[i] - domains.upper[i];
            if gap > tol * (1.0 + domains.lower[i].abs()) {
                return false;
            }
            if gap > 0.0 {
                let mid = (domains.lower[i] + domains.upper[i]) / 2.0;
                domains.lower[i] = mid;
                domains.upper[i] = mid;
            }
        }
        true
    }
}
