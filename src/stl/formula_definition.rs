//! Formula tree for bounded-time Signal Temporal Logic.
//!
//! A [`Formula`] is a cheap, shareable handle on an immutable node. Cloning the
//! handle shares the node, so both clones have the same [`NodeId`]; building the
//! same formula twice yields two distinct nodes. The MILP encoder relies on this
//! to encode a subtree referenced from several places only once.

use std::fmt::Display;
use std::sync::Arc;

use crate::error::{StlError, StlResult};
use crate::stl::core::TimeInterval;
use crate::stl::signal::Signal;

/// The node variants. Constructed only through [`Formula`]'s constructors.
#[derive(Debug)]
pub enum FormulaKind {
    /// Holds iff the signal is strictly positive.
    Predicate(Signal),
    /// Boolean negation: `¬f`.
    Not(Formula),
    /// Conjunction over two or more arguments.
    And(Vec<Formula>),
    /// Disjunction over two or more arguments.
    Or(Vec<Formula>),
    /// `G[a,b] f`.
    Always(TimeInterval, Formula),
    /// `F[a,b] f`.
    Eventually(TimeInterval, Formula),
    /// `lhs U[a,b] rhs`.
    Until(TimeInterval, Formula, Formula),
    /// `f` one sample later.
    Next(Formula),
}

/// Variant tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Predicate,
    Not,
    And,
    Or,
    Always,
    Eventually,
    Until,
    Next,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::Predicate => "predicate",
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Always => "always",
            Operator::Eventually => "eventually",
            Operator::Until => "until",
            Operator::Next => "next",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a formula node, stable for as long as the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Formula {
    node: Arc<FormulaKind>,
}

impl Formula {
    fn from_kind(kind: FormulaKind) -> Self {
        Formula {
            node: Arc::new(kind),
        }
    }

    pub fn predicate(signal: Signal) -> Self {
        Self::from_kind(FormulaKind::Predicate(signal))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(arg: Formula) -> Self {
        Self::from_kind(FormulaKind::Not(arg))
    }

    pub fn and(args: Vec<Formula>) -> StlResult<Self> {
        check_arity("and", &args)?;
        Ok(Self::from_kind(FormulaKind::And(args)))
    }

    pub fn or(args: Vec<Formula>) -> StlResult<Self> {
        check_arity("or", &args)?;
        Ok(Self::from_kind(FormulaKind::Or(args)))
    }

    pub fn always(interval: TimeInterval, arg: Formula) -> Self {
        Self::from_kind(FormulaKind::Always(interval, arg))
    }

    pub fn eventually(interval: TimeInterval, arg: Formula) -> Self {
        Self::from_kind(FormulaKind::Eventually(interval, arg))
    }

    pub fn until(interval: TimeInterval, left: Formula, right: Formula) -> Self {
        Self::from_kind(FormulaKind::Until(interval, left, right))
    }

    pub fn next(arg: Formula) -> Self {
        Self::from_kind(FormulaKind::Next(arg))
    }

    pub fn kind(&self) -> &FormulaKind {
        &self.node
    }

    pub fn operator(&self) -> Operator {
        match self.kind() {
            FormulaKind::Predicate(_) => Operator::Predicate,
            FormulaKind::Not(_) => Operator::Not,
            FormulaKind::And(_) => Operator::And,
            FormulaKind::Or(_) => Operator::Or,
            FormulaKind::Always(..) => Operator::Always,
            FormulaKind::Eventually(..) => Operator::Eventually,
            FormulaKind::Until(..) => Operator::Until,
            FormulaKind::Next(_) => Operator::Next,
        }
    }

    /// Direct children in argument order.
    pub fn children(&self) -> Vec<&Formula> {
        match self.kind() {
            FormulaKind::Predicate(_) => vec![],
            FormulaKind::Not(arg)
            | FormulaKind::Always(_, arg)
            | FormulaKind::Eventually(_, arg)
            | FormulaKind::Next(arg) => vec![arg],
            FormulaKind::And(args) | FormulaKind::Or(args) => args.iter().collect(),
            FormulaKind::Until(_, left, right) => vec![left, right],
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.node) as usize)
    }

    /// True if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Number of samples past the anchor the formula may read, with bounds
    /// discretized against `tinter`. A trajectory of `horizon + 1` samples is
    /// enough to evaluate the formula at anchor 0 under the strict policy.
    pub fn horizon(&self, tinter: f64) -> StlResult<usize> {
        Ok(match self.kind() {
            FormulaKind::Predicate(_) => 0,
            FormulaKind::Not(arg) => arg.horizon(tinter)?,
            FormulaKind::Next(arg) => 1 + arg.horizon(tinter)?,
            FormulaKind::And(args) | FormulaKind::Or(args) => {
                args.iter().try_fold(0, |acc, arg| Ok::<_, StlError>(acc.max(arg.horizon(tinter)?)))?
            }
            FormulaKind::Always(interval, arg) | FormulaKind::Eventually(interval, arg) => {
                interval.discretize(tinter)?.1 + arg.horizon(tinter)?
            }
            FormulaKind::Until(interval, left, right) => {
                let (_, hi) = interval.discretize(tinter)?;
                // The left operand is only read strictly before the last candidate.
                let left = if hi == 0 { 0 } else { hi - 1 + left.horizon(tinter)? };
                left.max(hi + right.horizon(tinter)?)
            }
        })
    }
}

fn check_arity(operator: &'static str, args: &[Formula]) -> StlResult<()> {
    if args.len() < 2 {
        return Err(StlError::InvalidArity {
            operator,
            expected: 2,
            found: args.len(),
        });
    }
    Ok(())
}

/// Renders formulas using compact mathematical notation, as
/// `G[start, end](...)`, `F[start, end](...)` and `(...) U[start, end] (...)`.
impl Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            FormulaKind::Predicate(signal) => write!(f, "{signal}"),
            FormulaKind::Not(arg) => write!(f, "¬({arg})"),
            FormulaKind::And(args) => write_joined(f, args, " ∧ "),
            FormulaKind::Or(args) => write_joined(f, args, " v "),
            FormulaKind::Always(interval, arg) => {
                write!(f, "G[{}, {}]({arg})", interval.start(), interval.end())
            }
            FormulaKind::Eventually(interval, arg) => {
                write!(f, "F[{}, {}]({arg})", interval.start(), interval.end())
            }
            FormulaKind::Until(interval, left, right) => write!(
                f,
                "({left}) U[{}, {}] ({right})",
                interval.start(),
                interval.end()
            ),
            FormulaKind::Next(arg) => write!(f, "X({arg})"),
        }
    }
}

fn write_joined(f: &mut std::fmt::Formatter<'_>, args: &[Formula], sep: &str) -> std::fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "({arg})")?;
    }
    Ok(())
}
