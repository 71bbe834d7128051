//! Predicate signals: real-valued functions over sampled trajectory variables.

use dyn_clone::{DynClone, clone_trait_object};
use std::fmt::{Debug, Display};
use std::sync::Arc;

use crate::error::{StlError, StlResult};
use crate::stl::trajectory::Trajectory;

/// Name of one sampled variable: signal `name` at sample `index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub name: Arc<str>,
    pub index: usize,
}

impl Identifier {
    pub fn new(name: impl Into<Arc<str>>, index: usize) -> Self {
        Identifier {
            name: name.into(),
            index,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.name, self.index)
    }
}

/// Maps a time index to the identifier of one argument of a signal function.
///
/// `Display` renders the argument relative to the query time, e.g. `y[t-1]`.
pub trait LabelGenerator: DynClone + Debug + Display + Send + Sync {
    fn label(&self, t: usize) -> StlResult<Identifier>;
}

clone_trait_object!(LabelGenerator);

/// `name` sampled `offset` steps away from the query time.
#[derive(Debug, Clone)]
pub struct SampleLabel {
    name: Arc<str>,
    offset: isize,
}

impl SampleLabel {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_offset(name, 0)
    }

    pub fn with_offset(name: impl Into<Arc<str>>, offset: isize) -> Self {
        SampleLabel {
            name: name.into(),
            offset,
        }
    }
}

impl LabelGenerator for SampleLabel {
    fn label(&self, t: usize) -> StlResult<Identifier> {
        let index = t.checked_add_signed(self.offset).ok_or_else(|| {
            StlError::InvalidSignal(format!("`{self}` has no sample at time {t}"))
        })?;
        Ok(Identifier::new(self.name.clone(), index))
    }
}

impl Display for SampleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.offset {
            0 => write!(f, "{}", self.name),
            o if o > 0 => write!(f, "{}[t+{o}]", self.name),
            o => write!(f, "{}[t-{}]", self.name, o.unsigned_abs()),
        }
    }
}

/// Function applied to the resolved argument vector.
pub trait SignalFunction: DynClone + Debug + Send + Sync {
    fn apply(&self, args: &[f64]) -> f64;

    /// Coefficients and constant when the function is affine in its arguments.
    fn affine_form(&self) -> Option<(&[f64], f64)> {
        None
    }
}

clone_trait_object!(SignalFunction);

/// `Σ coefficients[i] * args[i] + constant`.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    pub coefficients: Vec<f64>,
    pub constant: f64,
}

impl SignalFunction for Affine {
    fn apply(&self, args: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(args)
            .fold(self.constant, |acc, (c, x)| acc + c * x)
    }

    fn affine_form(&self) -> Option<(&[f64], f64)> {
        Some((&self.coefficients, self.constant))
    }
}

/// Arbitrary closure; evaluable but not expressible as linear constraints.
#[derive(Clone)]
pub struct Nonlinear {
    name: Arc<str>,
    function: Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>,
}

impl Debug for Nonlinear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nonlinear").field("name", &self.name).finish()
    }
}

impl SignalFunction for Nonlinear {
    fn apply(&self, args: &[f64]) -> f64 {
        (self.function)(args)
    }
}

/// A predicate's signal. The predicate holds at `t` iff `value(t) > 0`.
#[derive(Debug, Clone)]
pub struct Signal {
    labels: Vec<Box<dyn LabelGenerator>>,
    function: Box<dyn SignalFunction>,
    bounds: (f64, f64),
    description: String,
}

impl Signal {
    /// Affine signal over the given label generators.
    pub fn affine(
        labels: Vec<Box<dyn LabelGenerator>>,
        coefficients: Vec<f64>,
        constant: f64,
    ) -> StlResult<Self> {
        if labels.len() != coefficients.len() {
            return Err(StlError::InvalidSignal(format!(
                "{} label generators but {} coefficients",
                labels.len(),
                coefficients.len()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) || !constant.is_finite() {
            return Err(StlError::InvalidSignal(
                "affine coefficients must be finite".to_string(),
            ));
        }
        let description = describe_affine(&labels, &coefficients, constant);
        Ok(Signal {
            labels,
            function: Box::new(Affine {
                coefficients,
                constant,
            }),
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
            description,
        })
    }

    /// Signal computed by an arbitrary function of the labelled arguments.
    pub fn nonlinear<F>(name: &str, labels: Vec<Box<dyn LabelGenerator>>, function: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Signal {
            labels,
            function: Box::new(Nonlinear {
                name: name.into(),
                function: Arc::new(function),
            }),
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
            description: format!("{name}(..) > 0"),
        }
    }

    /// `name > threshold`, i.e. `name - threshold`.
    pub fn greater_than(name: &str, threshold: f64) -> Self {
        Signal {
            labels: vec![Box::new(SampleLabel::new(name))],
            function: Box::new(Affine {
                coefficients: vec![1.0],
                constant: -threshold,
            }),
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
            description: format!("{name} > {threshold}"),
        }
    }

    /// `name < threshold`, i.e. `threshold - name`.
    pub fn less_than(name: &str, threshold: f64) -> Self {
        Signal {
            labels: vec![Box::new(SampleLabel::new(name))],
            function: Box::new(Affine {
                coefficients: vec![-1.0],
                constant: threshold,
            }),
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
            description: format!("{name} < {threshold}"),
        }
    }

    /// Declares the range the signal value can take. Used as the bounds of the
    /// predicate variable in MILP encodings and to derive big-M constants.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> StlResult<Self> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(StlError::InvalidSignal(format!(
                "invalid value bounds [{lower}, {upper}]"
            )));
        }
        self.bounds = (lower, upper);
        Ok(self)
    }

    pub fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    pub fn labels(&self) -> &[Box<dyn LabelGenerator>] {
        &self.labels
    }

    pub fn function(&self) -> &dyn SignalFunction {
        self.function.as_ref()
    }

    /// Identifiers of the arguments at time `t`, in generator order.
    pub fn identifiers(&self, t: usize) -> StlResult<Vec<Identifier>> {
        self.labels.iter().map(|label| label.label(t)).collect()
    }

    /// Value of the signal at time `t` over `trajectory`.
    pub fn evaluate<T>(&self, trajectory: &T, t: usize) -> StlResult<f64>
    where
        T: Trajectory + ?Sized,
    {
        let len = trajectory.len();
        if t >= len {
            return Err(StlError::OutOfRange { index: t, len });
        }
        let args = self
            .labels
            .iter()
            .map(|label| trajectory.resolve(&label.label(t)?))
            .collect::<StlResult<Vec<f64>>>()?;
        Ok(self.function.apply(&args))
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

fn describe_affine(labels: &[Box<dyn LabelGenerator>], coefficients: &[f64], constant: f64) -> String {
    let mut out = String::new();
    for (i, (label, c)) in labels.iter().zip(coefficients).enumerate() {
        let name = label.to_string();
        if i == 0 {
            out.push_str(&format!("{c}*{name}"));
        } else if *c < 0.0 {
            out.push_str(&format!(" - {}*{name}", -c));
        } else {
            out.push_str(&format!(" + {c}*{name}"));
        }
    }
    if constant != 0.0 || out.is_empty() {
        if out.is_empty() {
            out.push_str(&format!("{constant}"));
        } else if constant < 0.0 {
            out.push_str(&format!(" - {}", -constant));
        } else {
            out.push_str(&format!(" + {constant}"));
        }
    }
    out.push_str(" > 0");
    out
}
