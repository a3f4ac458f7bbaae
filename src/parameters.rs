use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::random::{self, RandomDistribution};

/// A pure function of the cell (or edge) index.
#[derive(Clone)]
pub struct IndexFn(Arc<dyn Fn(usize) -> f64 + Send + Sync>);

impl IndexFn {
    pub fn new(f: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, idx: usize) -> f64 {
        (self.0)(idx)
    }
}

impl fmt::Debug for IndexFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IndexFn")
    }
}

#[derive(Debug, Clone)]
pub enum ParameterSpec {
    Constant(f64),
    Array(Vec<f64>),
    Random(RandomDistribution),
    Function(IndexFn),
}

impl ParameterSpec {
    pub fn from_fn(f: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        ParameterSpec::Function(IndexFn::new(f))
    }
}

impl From<f64> for ParameterSpec {
    fn from(value: f64) -> Self {
        ParameterSpec::Constant(value)
    }
}

impl From<Vec<f64>> for ParameterSpec {
    fn from(values: Vec<f64>) -> Self {
        ParameterSpec::Array(values)
    }
}

impl From<RandomDistribution> for ParameterSpec {
    fn from(distribution: RandomDistribution) -> Self {
        ParameterSpec::Random(distribution)
    }
}

/// Resolves `spec` into exactly `n` values.
///
/// Random specs draw from `rng`, or from the process-wide default generator
/// when `rng` is `None`.
pub fn resolve(spec: &ParameterSpec, n: usize, rng: Option<&mut StdRng>) -> Result<Vec<f64>> {
    let values = match spec {
        ParameterSpec::Constant(value) => vec![*value; n],
        ParameterSpec::Array(values) => {
            if values.len() != n {
                return Err(Error::SizeMismatch {
                    expected: n,
                    actual: values.len(),
                });
            }
            values.clone()
        }
        ParameterSpec::Random(distribution) => {
            random::with_rng(rng, |rng| distribution.sample(n, rng))?
        }
        ParameterSpec::Function(f) => (0..n).map(|idx| f.call(idx)).collect(),
    };

    if let Some(idx) = values.iter().position(|value| !value.is_finite()) {
        return Err(Error::InvalidParameterSpec(format!(
            "non-finite value {} at index {}",
            values[idx], idx
        )));
    }

    Ok(values)
}
