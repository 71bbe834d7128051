//! Per-session encoding state: memo table, big-M policy and signal bindings.

use std::collections::HashMap;

use crate::error::{StlError, StlResult};
use crate::stl::core::WindowPolicy;
use crate::stl::formula_definition::{Formula, NodeId};
use crate::stl::signal::Identifier;

/// How the big-M constant of each disjunctive group is chosen.
///
/// The constant must be at least the spread of the operands of every group it
/// is used in; an undersized value silently admits wrong solutions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BigM {
    /// One caller-chosen constant for every group.
    Constant(f64),
    /// Per group, `max(upper_i) - min(lower_i)` over the operand bounds.
    /// Fails with [`StlError::InvalidBigM`] when an operand is unbounded.
    FromBounds,
}

impl BigM {
    /// Constant for a group whose operands have the given bounds.
    pub fn resolve(&self, bounds: &[Bounds]) -> StlResult<f64> {
        match *self {
            BigM::Constant(m) => Ok(m),
            BigM::FromBounds => {
                let upper = bounds.iter().map(|b| b.upper).fold(f64::NEG_INFINITY, f64::max);
                let lower = bounds.iter().map(|b| b.lower).fold(f64::INFINITY, f64::min);
                let m = upper - lower;
                if !m.is_finite() {
                    return Err(StlError::InvalidBigM(format!(
                        "cannot derive a constant from unbounded operands [{lower}, {upper}]"
                    )));
                }
                Ok(m)
            }
        }
    }

    pub(crate) fn validate(&self) -> StlResult<()> {
        match *self {
            BigM::Constant(m) if !(m.is_finite() && m > 0.0) => Err(StlError::InvalidBigM(
                format!("constant {m} must be positive and finite"),
            )),
            _ => Ok(()),
        }
    }
}

/// Value range of an encoded robustness variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Bounds { lower, upper }
    }

    pub fn negate(self) -> Self {
        Bounds {
            lower: -self.upper,
            upper: -self.lower,
        }
    }

    pub(crate) fn min_of(bounds: &[Bounds]) -> Self {
        Bounds {
            lower: bounds.iter().map(|b| b.lower).fold(f64::INFINITY, f64::min),
            upper: bounds.iter().map(|b| b.upper).fold(f64::INFINITY, f64::min),
        }
    }

    pub(crate) fn max_of(bounds: &[Bounds]) -> Self {
        Bounds {
            lower: bounds
                .iter()
                .map(|b| b.lower)
                .fold(f64::NEG_INFINITY, f64::max),
            upper: bounds
                .iter()
                .map(|b| b.upper)
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// A variable standing for a robustness value, with its range.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded<V> {
    pub var: V,
    pub bounds: Bounds,
}

/// Counts of what an encoding session emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingStats {
    pub continuous: usize,
    pub binaries: usize,
    pub constraints: usize,
    pub memo_hits: usize,
}

struct MemoEntry<V> {
    // Keeps the node alive so its identity cannot be reused by another node.
    _node: Formula,
    encoded: Encoded<V>,
}

/// State of one optimization session. Never share a context between
/// unrelated solver models.
pub struct MilpContext<V> {
    big_m: BigM,
    horizon: usize,
    tinter: f64,
    window_policy: WindowPolicy,
    label_prefix: String,
    bindings: HashMap<Identifier, V>,
    memo: HashMap<(NodeId, usize), MemoEntry<V>>,
    next_label: usize,
    pub(crate) stats: EncodingStats,
}

/// Builder for [`MilpContext`].
pub struct MilpContextBuilder {
    big_m: Option<BigM>,
    horizon: Option<usize>,
    tinter: f64,
    window_policy: WindowPolicy,
    label_prefix: String,
}

impl Default for MilpContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MilpContextBuilder {
    pub fn new() -> Self {
        MilpContextBuilder {
            big_m: None,
            horizon: None,
            tinter: 1.0,
            window_policy: WindowPolicy::Strict,
            label_prefix: "stl".to_string(),
        }
    }

    /// Big-M policy. Required: there is no default constant.
    pub fn big_m(mut self, big_m: BigM) -> Self {
        self.big_m = Some(big_m);
        self
    }

    /// Number of trajectory samples the model describes. Required.
    pub fn horizon(mut self, samples: usize) -> Self {
        self.horizon = Some(samples);
        self
    }

    /// Time between samples, used to discretize interval bounds. Defaults to 1.
    pub fn sampling_interval(mut self, tinter: f64) -> Self {
        self.tinter = tinter;
        self
    }

    pub fn window_policy(mut self, policy: WindowPolicy) -> Self {
        self.window_policy = policy;
        self
    }

    /// Prefix of the names given to created variables. Defaults to `stl`.
    pub fn label_prefix(mut self, prefix: &str) -> Self {
        self.label_prefix = prefix.to_string();
        self
    }

    pub fn build<V>(self) -> StlResult<MilpContext<V>> {
        let big_m = self
            .big_m
            .ok_or_else(|| StlError::InvalidBigM("no big-M policy configured".to_string()))?;
        big_m.validate()?;
        let horizon = self.horizon.ok_or_else(|| {
            StlError::InvalidTrajectory("no encoding horizon configured".to_string())
        })?;
        if !(self.tinter.is_finite() && self.tinter > 0.0) {
            return Err(StlError::InvalidTrajectory(format!(
                "sampling interval {} is not positive",
                self.tinter
            )));
        }
        Ok(MilpContext {
            big_m,
            horizon,
            tinter: self.tinter,
            window_policy: self.window_policy,
            label_prefix: self.label_prefix,
            bindings: HashMap::new(),
            memo: HashMap::new(),
            next_label: 0,
            stats: EncodingStats::default(),
        })
    }
}

impl<V: Clone> MilpContext<V> {
    pub fn builder() -> MilpContextBuilder {
        MilpContextBuilder::new()
    }

    /// Binds a trajectory variable of the solver model to `id`; predicates
    /// reading `id` are encoded over `var`.
    pub fn bind_signal(&mut self, id: Identifier, var: V) {
        self.bindings.insert(id, var);
    }

    pub fn signal_variable(&self, id: &Identifier) -> StlResult<V> {
        self.bindings
            .get(id)
            .cloned()
            .ok_or_else(|| StlError::UnknownSignal(id.clone()))
    }

    pub fn big_m(&self) -> BigM {
        self.big_m
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn sampling_interval(&self) -> f64 {
        self.tinter
    }

    pub fn window_policy(&self) -> WindowPolicy {
        self.window_policy
    }

    pub fn stats(&self) -> EncodingStats {
        self.stats
    }

    /// Number of (node, anchor) pairs encoded so far.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_encoded(&self, formula: &Formula, anchor: usize) -> bool {
        self.memo.contains_key(&(formula.id(), anchor))
    }

    pub(crate) fn lookup(&mut self, formula: &Formula, anchor: usize) -> Option<Encoded<V>> {
        let hit = self
            .memo
            .get(&(formula.id(), anchor))
            .map(|entry| entry.encoded.clone());
        if hit.is_some() {
            self.stats.memo_hits += 1;
        }
        hit
    }

    pub(crate) fn remember(&mut self, formula: &Formula, anchor: usize, encoded: Encoded<V>) {
        self.memo.insert(
            (formula.id(), anchor),
            MemoEntry {
                _node: formula.clone(),
                encoded,
            },
        );
    }

    /// Fresh variable name `<prefix>_<tag><n>_t<anchor>`.
    pub(crate) fn label(&mut self, tag: &str, anchor: usize) -> String {
        let n = self.next_label;
        self.next_label += 1;
        format!("{}_{tag}{n}_t{anchor}", self.label_prefix)
    }
}
