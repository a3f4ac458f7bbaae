//! Named random distributions and the random source they draw from.
//!
//! Every sampling API takes an `Option<&mut StdRng>`. Passing `None` falls back
//! to a process-wide default generator that is seeded from entropy on first use,
//! so results are only reproducible when a seeded generator is supplied.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use rand::prelude::Distribution;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Exp, Gamma, LogNormal, Normal, Uniform};

use crate::error::{Error, Result};

const MAX_CLIPPED_DRAWS: usize = 10_000;

static DEFAULT_RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_entropy()));

/// Runs `f` with the supplied generator, or with the process-wide default one.
pub fn with_rng<T>(rng: Option<&mut StdRng>, f: impl FnOnce(&mut StdRng) -> T) -> T {
    match rng {
        Some(rng) => f(rng),
        None => {
            let mut default_rng = DEFAULT_RNG.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut default_rng)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Normal,
    Uniform,
    Exponential,
    Gamma,
    Lognormal,
    NormalClipped,
}

impl DistributionKind {
    pub fn num_params(&self) -> usize {
        match self {
            DistributionKind::Exponential => 1,
            DistributionKind::NormalClipped => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistributionKind::Normal => "normal",
            DistributionKind::Uniform => "uniform",
            DistributionKind::Exponential => "exponential",
            DistributionKind::Gamma => "gamma",
            DistributionKind::Lognormal => "lognormal",
            DistributionKind::NormalClipped => "normal_clipped",
        };
        f.write_str(name)
    }
}

/// A parameterized distribution, e.g. `normal` with `(mu, sigma)`.
///
/// Parameter order per kind: `normal (mu, sigma)`, `uniform (low, high)`,
/// `exponential (beta)`, `gamma (k, theta)`, `lognormal (mu, sigma)`,
/// `normal_clipped (mu, sigma, low, high)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomDistribution {
    pub kind: DistributionKind,
    pub params: Vec<f64>,
}

enum Sampler {
    Normal(Normal),
    Uniform(Uniform),
    Exponential(Exp),
    Gamma(Gamma),
    Lognormal(LogNormal),
    NormalClipped { normal: Normal, low: f64, high: f64 },
}

impl RandomDistribution {
    pub fn new(kind: DistributionKind, params: Vec<f64>) -> Result<Self> {
        let distribution = Self { kind, params };
        distribution.sampler()?;
        Ok(distribution)
    }

    pub fn normal(mu: f64, sigma: f64) -> Result<Self> {
        Self::new(DistributionKind::Normal, vec![mu, sigma])
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        Self::new(DistributionKind::Uniform, vec![low, high])
    }

    /// Draws exactly `n` samples.
    pub fn sample(&self, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        let sampler = self.sampler()?;
        (0..n).map(|_| sampler.draw(rng, self)).collect()
    }

    fn sampler(&self) -> Result<Sampler> {
        if self.params.len() != self.kind.num_params() {
            return Err(self.invalid(format!(
                "expected {} parameters, got {}",
                self.kind.num_params(),
                self.params.len()
            )));
        }

        let p = &self.params;
        let sampler = match self.kind {
            DistributionKind::Normal => Sampler::Normal(self.check(Normal::new(p[0], p[1]))?),
            DistributionKind::Uniform => Sampler::Uniform(self.check(Uniform::new(p[0], p[1]))?),
            DistributionKind::Exponential => {
                if p[0] <= 0.0 {
                    return Err(self.invalid("beta must be strictly positive".to_owned()));
                }
                Sampler::Exponential(self.check(Exp::new(1.0 / p[0]))?)
            }
            DistributionKind::Gamma => {
                if p[1] <= 0.0 {
                    return Err(self.invalid("theta must be strictly positive".to_owned()));
                }
                Sampler::Gamma(self.check(Gamma::new(p[0], 1.0 / p[1]))?)
            }
            DistributionKind::Lognormal => {
                Sampler::Lognormal(self.check(LogNormal::new(p[0], p[1]))?)
            }
            DistributionKind::NormalClipped => {
                if !(p[2] < p[3]) {
                    return Err(self.invalid("low must be less than high".to_owned()));
                }
                Sampler::NormalClipped {
                    normal: self.check(Normal::new(p[0], p[1]))?,
                    low: p[2],
                    high: p[3],
                }
            }
        };

        Ok(sampler)
    }

    fn check<T, E: fmt::Display>(&self, result: std::result::Result<T, E>) -> Result<T> {
        result.map_err(|err| self.invalid(err.to_string()))
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidParameterSpec(format!("{} {:?}: {}", self.kind, self.params, reason))
    }
}

impl Sampler {
    fn draw(&self, rng: &mut StdRng, distribution: &RandomDistribution) -> Result<f64> {
        let value = match self {
            Sampler::Normal(d) => d.sample(rng),
            Sampler::Uniform(d) => d.sample(rng),
            Sampler::Exponential(d) => d.sample(rng),
            Sampler::Gamma(d) => d.sample(rng),
            Sampler::Lognormal(d) => d.sample(rng),
            Sampler::NormalClipped { normal, low, high } => {
                let mut draws = 0;
                loop {
                    let value = normal.sample(rng);
                    if value >= *low && value <= *high {
                        break value;
                    }
                    draws += 1;
                    if draws == MAX_CLIPPED_DRAWS {
                        return Err(distribution.invalid(
                            "clipping interval rejects practically all samples".to_owned(),
                        ));
                    }
                }
            }
        };

        Ok(value)
    }
}
