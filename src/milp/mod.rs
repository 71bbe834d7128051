//! Mixed-integer linear encoding of STL robustness.
//!
//! [`encoder::encode`] writes into any [`SolverModel`]; [`memory::InMemoryModel`]
//! is a self-contained model with a small feasibility search.

pub mod context;
pub mod encoder;
pub mod memory;
pub mod model;
pub mod templates;

pub use context::{BigM, Bounds, Encoded, EncodingStats, MilpContext, MilpContextBuilder};
pub use encoder::{encode, encode_at, encode_with_start};
pub use memory::{InMemoryModel, Solution, SolveStatus, VarId};
pub use model::{LinearExpr, Relation, SolverModel, SolverModelError, VarKind};
pub use templates::{add_max_constr, add_min_constr};
