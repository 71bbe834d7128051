//! Discrete-time trajectories the evaluators read signal values from.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{StlError, StlResult};
use crate::stl::signal::Identifier;

/// Read-only view over a sampled trajectory with index domain `[0, len)`.
pub trait Trajectory {
    /// Value of one sampled variable.
    fn resolve(&self, id: &Identifier) -> StlResult<f64>;

    /// Time between two consecutive samples.
    fn sampling_interval(&self) -> f64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column-oriented trajectory: one vector of samples per named signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrajectory {
    tinter: f64,
    len: Option<usize>,
    columns: HashMap<Arc<str>, Vec<f64>>,
}

impl SampledTrajectory {
    /// Empty trajectory; columns are added with [`Self::with_signal`].
    pub fn new(tinter: f64) -> Self {
        SampledTrajectory {
            tinter,
            len: None,
            columns: HashMap::new(),
        }
    }

    /// Adds a named column. All columns must have the same length and the
    /// sampling interval must be positive.
    pub fn with_signal(mut self, name: &str, samples: Vec<f64>) -> StlResult<Self> {
        if !(self.tinter.is_finite() && self.tinter > 0.0) {
            return Err(StlError::InvalidTrajectory(format!(
                "sampling interval {} is not positive",
                self.tinter
            )));
        }
        if let Some(len) = self.len {
            if len != samples.len() {
                return Err(StlError::InvalidTrajectory(format!(
                    "signal `{name}` has {} samples, expected {len}",
                    samples.len()
                )));
            }
        }
        self.len = Some(samples.len());
        self.columns.insert(name.into(), samples);
        Ok(self)
    }

    /// Builds a trajectory from a sequence of state vectors, `names[i]`
    /// labelling component `i` of every state.
    pub fn from_states(tinter: f64, names: &[&str], states: &[Vec<f64>]) -> StlResult<Self> {
        let mut columns = vec![Vec::with_capacity(states.len()); names.len()];
        for (t, state) in states.iter().enumerate() {
            if state.len() != names.len() {
                return Err(StlError::InvalidTrajectory(format!(
                    "state {t} has {} components, expected {}",
                    state.len(),
                    names.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(state) {
                column.push(*value);
            }
        }
        names
            .iter()
            .zip(columns)
            .try_fold(SampledTrajectory::new(tinter), |acc, (name, column)| {
                acc.with_signal(name, column)
            })
    }

    pub fn signal(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

impl Trajectory for SampledTrajectory {
    fn resolve(&self, id: &Identifier) -> StlResult<f64> {
        let column = self
            .columns
            .get(&id.name)
            .ok_or_else(|| StlError::UnknownSignal(id.clone()))?;
        column.get(id.index).copied().ok_or(StlError::OutOfRange {
            index: id.index,
            len: column.len(),
        })
    }

    fn sampling_interval(&self) -> f64 {
        self.tinter
    }

    fn len(&self) -> usize {
        self.len.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_name_and_index() {
        let x = SampledTrajectory::new(0.5)
            .with_signal("x", vec![1.0, 2.0])
            .unwrap();
        assert_eq!(x.resolve(&Identifier::new("x", 1)).unwrap(), 2.0);
        assert_eq!(x.len(), 2);
        assert_eq!(x.sampling_interval(), 0.5);
        assert!(matches!(
            x.resolve(&Identifier::new("x", 2)),
            Err(StlError::OutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = SampledTrajectory::new(1.0)
            .with_signal("x", vec![1.0, 2.0])
            .unwrap()
            .with_signal("y", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, StlError::InvalidTrajectory(_)));
    }

    #[test]
    fn rejects_non_positive_sampling_interval() {
        assert!(SampledTrajectory::new(0.0).with_signal("x", vec![]).is_err());
    }

    #[test]
    fn from_states_transposes() {
        let x = SampledTrajectory::from_states(
            1.0,
            &["x", "y"],
            &[vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
        .unwrap();
        assert_eq!(x.signal("y"), Some(&[10.0, 20.0, 30.0][..]));
        assert_eq!(x.len(), 3);
    }
}
