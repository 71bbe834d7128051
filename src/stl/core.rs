use std::fmt::{Debug, Display};
use std::ops::RangeInclusive;

use crate::error::{StlError, StlResult};

/// Closed temporal interval `[start, end]` in continuous time units.
///
/// Both bounds are finite and `0 <= start <= end`; the constructor is the only
/// way to build one, so a malformed interval never exists.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeInterval {
    start: f64,
    end: f64,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> StlResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(StlError::invalid_bounds(start, end, "bounds must be finite"));
        }
        if start < 0.0 {
            return Err(StlError::invalid_bounds(start, end, "lower bound is negative"));
        }
        if start > end {
            return Err(StlError::invalid_bounds(
                start,
                end,
                "lower bound exceeds upper bound",
            ));
        }
        Ok(TimeInterval { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Maps both bounds to sample offsets: `round(b / tinter)`.
    pub fn discretize(&self, tinter: f64) -> StlResult<(usize, usize)> {
        if !(tinter.is_finite() && tinter > 0.0) {
            return Err(StlError::invalid_bounds(
                self.start,
                self.end,
                "sampling interval must be positive and finite",
            ));
        }
        let lo = (self.start / tinter).round();
        let hi = (self.end / tinter).round();
        if lo > hi {
            return Err(StlError::invalid_bounds(
                self.start,
                self.end,
                "discretized window is inverted",
            ));
        }
        Ok((lo as usize, hi as usize))
    }
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// What to do with a temporal window that runs past the last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    /// Fail with [`StlError::OutOfRange`].
    #[default]
    Strict,
    /// Clip the window to the last sample. A window that starts past the end
    /// is empty and fails with [`StlError::InvalidBounds`].
    Clamp,
}

impl WindowPolicy {
    /// Resolves `interval`, anchored at `anchor`, to the inclusive range of
    /// sample indices it covers in a domain of `len` samples. `InvalidBounds`
    /// errors report the interval's time bounds.
    pub fn window(
        self,
        interval: &TimeInterval,
        tinter: f64,
        anchor: usize,
        len: usize,
    ) -> StlResult<RangeInclusive<usize>> {
        let (lo, hi) = interval.discretize(tinter)?;
        self.offsets(anchor, lo, hi, len).map_err(|err| match err {
            StlError::InvalidBounds { reason, .. } => {
                StlError::invalid_bounds(interval.start(), interval.end(), reason)
            }
            other => other,
        })
    }

    /// Same as [`WindowPolicy::window`] for offsets already expressed in
    /// samples. `InvalidBounds` errors report those sample offsets.
    pub fn offsets(
        self,
        anchor: usize,
        lo: usize,
        hi: usize,
        len: usize,
    ) -> StlResult<RangeInclusive<usize>> {
        if lo > hi {
            return Err(StlError::invalid_bounds(
                lo as f64,
                hi as f64,
                "sample offsets are inverted",
            ));
        }
        let start = anchor.saturating_add(lo);
        let end = anchor.saturating_add(hi);
        match self {
            WindowPolicy::Strict => {
                if end >= len {
                    return Err(StlError::OutOfRange { index: end, len });
                }
                Ok(start..=end)
            }
            WindowPolicy::Clamp => {
                if start >= len {
                    return Err(StlError::invalid_bounds(
                        lo as f64,
                        hi as f64,
                        "window is empty once clipped to the trajectory",
                    ));
                }
                Ok(start..=end.min(len - 1))
            }
        }
    }
}

/// Value domain of an evaluation: how predicates are read and how the
/// boolean connectives combine.
pub trait RobustnessSemantics: Clone + PartialEq + Debug {
    fn and(l: Self, r: Self) -> Self;
    fn or(l: Self, r: Self) -> Self;
    fn not(val: Self) -> Self;
    fn eventually_identity() -> Self;
    fn globally_identity() -> Self;
    /// Reads the raw value of a signal function.
    fn atomic(value: f64) -> Self;
}

impl RobustnessSemantics for f64 {
    fn and(l: f64, r: f64) -> f64 {
        l.min(r)
    }
    fn or(l: f64, r: f64) -> f64 {
        l.max(r)
    }
    fn not(val: f64) -> f64 {
        -val
    }
    fn eventually_identity() -> Self {
        f64::NEG_INFINITY
    }
    fn globally_identity() -> Self {
        f64::INFINITY
    }
    fn atomic(value: f64) -> Self {
        value
    }
}

impl RobustnessSemantics for bool {
    fn and(l: bool, r: bool) -> bool {
        l && r
    }
    fn or(l: bool, r: bool) -> bool {
        l || r
    }
    fn not(val: bool) -> bool {
        !val
    }
    fn eventually_identity() -> Self {
        false
    }
    fn globally_identity() -> Self {
        true
    }
    fn atomic(value: f64) -> Self {
        value > 0.0
    }
}
