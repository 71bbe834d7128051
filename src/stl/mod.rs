//! Signal Temporal Logic (STL) formulas and their evaluation.
//!
//! - [`core`] intervals, window policies and the semantics trait,
//! - [`signal`] predicate signals and the identifiers they read,
//! - [`trajectory`] sampled trajectories,
//! - [`formula_definition`] the immutable formula tree, and
//! - [`robustness`] quantitative and boolean evaluation.

pub mod core;
pub mod formula_definition;
pub mod robustness;
pub mod signal;
pub mod trajectory;

pub use core::{RobustnessSemantics, TimeInterval, WindowPolicy};
pub use formula_definition::{Formula, FormulaKind, Operator};
pub use robustness::{Evaluator, RobustnessTree, robustness, satisfied};
pub use signal::{Identifier, LabelGenerator, SampleLabel, Signal, SignalFunction};
pub use trajectory::{SampledTrajectory, Trajectory};
