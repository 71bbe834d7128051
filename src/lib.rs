//! # stlmilp - STL robustness and its MILP encoding
//!
//! `stlmilp` evaluates Signal Temporal Logic (STL) formulas over discretely
//! sampled trajectories and reduces the same robustness semantics to
//! mixed-integer linear constraints, so a solver can search for trajectories
//! that satisfy (or falsify) a formula.
//!
//! It includes:
//! - an immutable, shareable formula tree with affine and nonlinear predicates,
//! - quantitative (`f64`) and qualitative (`bool`) evaluation,
//! - a big-M encoder writing into any [`milp::SolverModel`], with memoization
//!   of shared sub-formulas and warm starts from the evaluator, and
//! - an in-memory model for inspecting and checking encodings.
//!
//! ## Simple usage
//!
//! ```
//! use stlmilp::stl::{Formula, SampledTrajectory, Signal, TimeInterval};
//!
//! let formula = Formula::always(
//!     TimeInterval::new(0.0, 2.0).unwrap(),
//!     Formula::predicate(Signal::greater_than("x", 3.0)),
//! );
//! let trajectory = SampledTrajectory::new(1.0)
//!     .with_signal("x", vec![5.0, 4.0, 7.0])
//!     .unwrap();
//!
//! assert_eq!(stlmilp::robustness(&formula, &trajectory, 0).unwrap(), 1.0);
//! ```

pub mod error;
pub mod milp;
pub mod stl;

pub use error::{StlError, StlResult};
pub use milp::encoder::encode;
pub use stl::robustness::{robustness, satisfied};
