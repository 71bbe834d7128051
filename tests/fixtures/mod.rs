pub mod formulas;
pub mod trajectories;
