//! Interface of the external solver model the encoder writes into.

use std::fmt::{Debug, Display};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Relation::LessEqual => "<=",
            Relation::GreaterEqual => ">=",
            Relation::Equal => "=",
        })
    }
}

/// `Σ coefficient * var + constant`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr<V> {
    pub terms: Vec<(f64, V)>,
    pub constant: f64,
}

impl<V> LinearExpr<V> {
    pub fn constant(constant: f64) -> Self {
        LinearExpr {
            terms: vec![],
            constant,
        }
    }

    pub fn var(var: V) -> Self {
        Self::term(1.0, var)
    }

    pub fn term(coefficient: f64, var: V) -> Self {
        LinearExpr {
            terms: vec![(coefficient, var)],
            constant: 0.0,
        }
    }

    /// Adds `coefficient * var`.
    pub fn plus(mut self, coefficient: f64, var: V) -> Self {
        self.terms.push((coefficient, var));
        self
    }

    pub fn plus_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// Sum of `vars`, each with coefficient one.
    pub fn sum(vars: impl IntoIterator<Item = V>) -> Self {
        LinearExpr {
            terms: vars.into_iter().map(|v| (1.0, v)).collect(),
            constant: 0.0,
        }
    }
}

/// Raised by a [`SolverModel`] that refuses a variable or a constraint.
#[derive(Debug, Error)]
#[error("solver model rejected the operation: {message}")]
pub struct SolverModelError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SolverModelError {
    pub fn new(message: impl Into<String>) -> Self {
        SolverModelError {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error of the underlying solver binding.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SolverModelError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// An externally owned mixed-integer linear model.
///
/// Implementations wrap a concrete solver binding; the encoder only ever adds
/// variables and constraints and never reads solutions back.
pub trait SolverModel {
    type Var: Clone + Debug;

    fn add_variable(
        &mut self,
        name: &str,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> Result<Self::Var, SolverModelError>;

    fn add_linear_constraint(
        &mut self,
        lhs: LinearExpr<Self::Var>,
        relation: Relation,
        rhs: LinearExpr<Self::Var>,
    ) -> Result<(), SolverModelError>;

    /// Start value hint for a MIP start. Ignored unless the binding supports it.
    fn set_start(&mut self, _var: &Self::Var, _value: f64) -> Result<(), SolverModelError> {
        Ok(())
    }
}
